//! Analysis panel: grammar context, the three reasoning fields, and the
//! dominant-attention callout.

use crate::config::schema::AttentionMode;
use crate::state::VisualizationState;

use super::surface::{MountPoint, Surface};

/// Callout text when no attention data is available or the views are off.
pub const NO_ATTENTION: &str = "Attention data not available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPanel {
    pub grammar_context: String,
    pub syntactic_analysis: String,
    pub semantic_context: String,
    pub common_patterns: String,
    pub callout: String,
}

impl AnalysisPanel {
    pub fn from_state(state: &VisualizationState, mode: AttentionMode) -> Self {
        let analysis = &state.analysis;
        Self {
            grammar_context: analysis.grammar_context.clone(),
            syntactic_analysis: analysis.reasoning.syntactic_analysis.clone(),
            semantic_context: analysis.reasoning.semantic_context.clone(),
            common_patterns: analysis.reasoning.common_patterns.clone(),
            callout: callout_text(state, mode),
        }
    }

    /// Write every field as literal text.
    pub fn write_to(&self, surface: &mut dyn Surface) {
        surface.set_text(MountPoint::GrammarContext, &self.grammar_context);
        surface.set_text(MountPoint::SyntacticAnalysis, &self.syntactic_analysis);
        surface.set_text(MountPoint::SemanticContext, &self.semantic_context);
        surface.set_text(MountPoint::CommonPatterns, &self.common_patterns);
        surface.set_text(MountPoint::AttentionCallout, &self.callout);
    }
}

/// `Most attention on token 1 ("cat")`, with a 0-based token index.
pub fn callout_text(state: &VisualizationState, mode: AttentionMode) -> String {
    if mode == AttentionMode::Off {
        return NO_ATTENTION.to_string();
    }
    match state.dominant_attention() {
        Some((index, token)) => format!("Most attention on token {index} (\"{token}\")"),
        None => NO_ATTENTION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::HtmlSurface;
    use crate::state::{AnalysisBundle, PLACEHOLDER, Prediction, tokenize};

    fn attended(weights: Option<Vec<f64>>) -> VisualizationState {
        VisualizationState {
            tokens: tokenize("the cat"),
            predictions: vec![Prediction {
                word: "sat".to_string(),
                confidence: 0.9,
                reasoning: PLACEHOLDER.to_string(),
                attention: weights,
            }],
            analysis: AnalysisBundle::default(),
        }
    }

    #[test]
    fn callout_names_dominant_token() {
        let state = attended(Some(vec![0.1, 0.9]));
        assert_eq!(
            callout_text(&state, AttentionMode::Auto),
            r#"Most attention on token 1 ("cat")"#
        );
    }

    #[test]
    fn callout_without_attention() {
        assert_eq!(callout_text(&attended(None), AttentionMode::Auto), NO_ATTENTION);
        assert_eq!(
            callout_text(&VisualizationState::default(), AttentionMode::Auto),
            NO_ATTENTION
        );
    }

    #[test]
    fn callout_suppressed_when_off() {
        let state = attended(Some(vec![0.1, 0.9]));
        assert_eq!(callout_text(&state, AttentionMode::Off), NO_ATTENTION);
    }

    #[test]
    fn panel_text_is_escaped_by_surface() {
        let mut state = attended(None);
        state.analysis.grammar_context = "<em>noun phrase</em>".to_string();

        let mut surface = HtmlSurface::new();
        AnalysisPanel::from_state(&state, AttentionMode::Auto).write_to(&mut surface);

        assert_eq!(
            surface.markup(MountPoint::GrammarContext),
            "&lt;em&gt;noun phrase&lt;/em&gt;"
        );
        assert_eq!(surface.markup(MountPoint::CommonPatterns), PLACEHOLDER);
    }
}
