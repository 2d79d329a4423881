//! Visualization state: the single source of truth every view renders from.
//!
//! The store holds exactly one [`VisualizationState`] behind an `Rc`. A
//! successful response replaces it whole; a failure resets it to the
//! empty-but-valid shape. Readers take a [`StateStore::snapshot`], which
//! stays valid (and unchanged) even if the store is replaced or reset while
//! the snapshot is in use.

use std::rc::Rc;

use serde::Serialize;

/// Text shown wherever an analysis string or reasoning is missing.
pub const PLACEHOLDER: &str = "Not available";

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// One candidate next word, in service-ranked order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub word: String,
    /// Nominally in `[0, 1]`; out-of-range values are kept as received.
    pub confidence: f64,
    pub reasoning: String,
    /// Per-token attention weights, aligned with [`VisualizationState::tokens`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attention: Option<Vec<f64>>,
}

impl Prediction {
    /// Attention weight this prediction puts on `token`.
    ///
    /// Missing vectors and out-of-range indices both read as `0.0`.
    pub fn attention_weight(&self, token: usize) -> f64 {
        self.attention
            .as_ref()
            .and_then(|weights| weights.get(token).copied())
            .unwrap_or(0.0)
    }
}

/// Free-text analysis fields returned alongside the predictions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningBundle {
    pub syntactic_analysis: String,
    pub semantic_context: String,
    pub common_patterns: String,
}

impl Default for ReasoningBundle {
    fn default() -> Self {
        Self {
            syntactic_analysis: PLACEHOLDER.to_string(),
            semantic_context: PLACEHOLDER.to_string(),
            common_patterns: PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisBundle {
    pub grammar_context: String,
    pub reasoning: ReasoningBundle,
}

impl Default for AnalysisBundle {
    fn default() -> Self {
        Self {
            grammar_context: PLACEHOLDER.to_string(),
            reasoning: ReasoningBundle::default(),
        }
    }
}

/// Everything the render pipeline needs for one response.
///
/// `Default` is the empty-but-valid shape: no tokens, no predictions, and
/// placeholder analysis text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisualizationState {
    pub tokens: Vec<String>,
    pub predictions: Vec<Prediction>,
    pub analysis: AnalysisBundle,
}

impl VisualizationState {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.predictions.is_empty()
    }

    /// Whether any prediction carries an attention vector.
    pub fn has_attention(&self) -> bool {
        self.predictions.iter().any(|p| p.attention.is_some())
    }

    /// Index and text of the token the top-ranked prediction attends to most.
    ///
    /// Ties resolve to the lowest index. Returns `None` when there are no
    /// tokens or the top prediction has no attention vector.
    pub fn dominant_attention(&self) -> Option<(usize, &str)> {
        let top = self.predictions.first()?;
        top.attention.as_ref()?;

        let mut best: Option<(usize, f64)> = None;
        for index in 0..self.tokens.len() {
            let weight = top.attention_weight(index);
            match best {
                Some((_, best_weight)) if weight <= best_weight => {}
                _ => best = Some((index, weight)),
            }
        }

        best.map(|(index, _)| (index, self.tokens[index].as_str()))
    }
}

/// Split a phrase into display tokens: whitespace-separated, empties dropped.
pub fn tokenize(phrase: &str) -> Vec<String> {
    phrase.split_whitespace().map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Holds the current visualization state. No history, no merging.
#[derive(Debug, Default)]
pub struct StateStore {
    current: Rc<VisualizationState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole state.
    pub fn replace(&mut self, state: VisualizationState) -> Rc<VisualizationState> {
        self.current = Rc::new(state);
        Rc::clone(&self.current)
    }

    /// Return to the empty-but-valid shape.
    pub fn reset(&mut self) -> Rc<VisualizationState> {
        self.replace(VisualizationState::default())
    }

    /// Immutable view of the current state.
    pub fn snapshot(&self) -> Rc<VisualizationState> {
        Rc::clone(&self.current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(word: &str, attention: Option<Vec<f64>>) -> Prediction {
        Prediction {
            word: word.to_string(),
            confidence: 0.5,
            reasoning: PLACEHOLDER.to_string(),
            attention,
        }
    }

    #[test]
    fn tokenize_drops_empty_entries() {
        assert_eq!(tokenize("  the   quick\tcat \n"), vec!["the", "quick", "cat"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn attention_weight_out_of_range_is_zero() {
        let p = prediction("sat", Some(vec![0.3]));
        assert_eq!(p.attention_weight(0), 0.3);
        assert_eq!(p.attention_weight(5), 0.0);
        assert_eq!(prediction("sat", None).attention_weight(0), 0.0);
    }

    #[test]
    fn dominant_attention_picks_maximum() {
        let state = VisualizationState {
            tokens: tokenize("the cat"),
            predictions: vec![prediction("sat", Some(vec![0.1, 0.9]))],
            analysis: AnalysisBundle::default(),
        };
        assert_eq!(state.dominant_attention(), Some((1, "cat")));
    }

    #[test]
    fn dominant_attention_ties_resolve_to_first() {
        let state = VisualizationState {
            tokens: tokenize("a b c"),
            predictions: vec![prediction("d", Some(vec![0.2, 0.4, 0.4]))],
            analysis: AnalysisBundle::default(),
        };
        assert_eq!(state.dominant_attention(), Some((1, "b")));
    }

    #[test]
    fn dominant_attention_uses_top_ranked_only() {
        let state = VisualizationState {
            tokens: tokenize("the cat"),
            predictions: vec![
                prediction("sat", None),
                prediction("ran", Some(vec![0.0, 1.0])),
            ],
            analysis: AnalysisBundle::default(),
        };
        assert_eq!(state.dominant_attention(), None);
    }

    #[test]
    fn short_vector_reads_missing_entries_as_zero() {
        let state = VisualizationState {
            tokens: tokenize("one two three"),
            predictions: vec![prediction("four", Some(vec![0.0]))],
            analysis: AnalysisBundle::default(),
        };
        assert_eq!(state.dominant_attention(), Some((0, "one")));
    }

    #[test]
    fn snapshot_survives_reset() {
        let mut store = StateStore::new();
        store.replace(VisualizationState {
            tokens: tokenize("the cat"),
            predictions: vec![prediction("sat", None)],
            analysis: AnalysisBundle::default(),
        });

        let snapshot = store.snapshot();
        store.reset();

        assert_eq!(snapshot.predictions.len(), 1);
        assert!(store.snapshot().is_empty());
        assert_eq!(store.snapshot().analysis.grammar_context, PLACEHOLDER);
    }
}
