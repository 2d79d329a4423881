//! Markup escaping for service- and user-derived text.

/// Escape text for insertion into HTML or SVG markup.
///
/// Covers element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<b onclick="x('y')">&</b>"#),
            "&lt;b onclick=&quot;x(&#39;y&#39;)&quot;&gt;&amp;&lt;/b&gt;"
        );
    }

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(escape_html("the cat sat"), "the cat sat");
        assert_eq!(escape_html(""), "");
    }

    #[test]
    fn ampersand_escaped_once() {
        assert_eq!(escape_html("&amp;"), "&amp;amp;");
    }
}
