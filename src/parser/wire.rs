//! Wire shapes of the prediction service reply.
//!
//! These mirror the JSON the service emits and are only used inside the
//! parser. Everything optional on the wire is optional here; placeholder
//! substitution happens when converting to [`crate::state`] types.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

/// Leading Markdown code fence, with or without a `json` language tag.
static OPENING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z]*\s*").expect("valid opening fence regex"));

/// Trailing Markdown code fence.
static CLOSING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```$").expect("valid closing fence regex"));

#[derive(Debug, Deserialize)]
pub(super) struct WirePayload {
    #[serde(default)]
    pub predictions: Option<Vec<WirePrediction>>,
    #[serde(default)]
    pub grammar_context: Option<String>,
    #[serde(default)]
    pub reasoning: Option<WireReasoning>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WirePrediction {
    pub word: String,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub attention: Option<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct WireReasoning {
    #[serde(default)]
    pub syntactic_analysis: Option<String>,
    #[serde(default)]
    pub semantic_context: Option<String>,
    #[serde(default)]
    pub common_patterns: Option<String>,
}

/// Pull the JSON object out of a string-encoded payload.
///
/// Model-backed services sometimes wrap the object in a Markdown fence or
/// surround it with prose. Strips fences, then keeps the span from the first
/// `{` to the last `}`. Returns `None` when no such span exists.
pub(super) fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let start_fence = OPENING_FENCE_RE
        .find(trimmed)
        .map(|m| m.end())
        .unwrap_or(0);
    let unfenced = &trimmed[start_fence..];
    let end_fence = CLOSING_FENCE_RE
        .find(unfenced)
        .map(|m| m.start())
        .unwrap_or(unfenced.len());
    let unfenced = &unfenced[..end_fence];

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&unfenced[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object_passes_through() {
        assert_eq!(extract_json_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn strips_json_fence() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_object(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn strips_bare_fence_and_prose() {
        let text = "```\nHere you go: {\"a\": {\"b\": 2}} hope that helps\n```";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn no_object_returns_none() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }
}
