//! Prediction list: one card per prediction in service-ranked order.

use crate::state::VisualizationState;

use super::escape::escape_html;
use super::format_percent;

/// Shown instead of an empty list.
pub const NO_PREDICTIONS: &str = "No predictions available";

/// View model for a single card.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionCard {
    /// 1-based rank.
    pub rank: usize,
    pub word: String,
    pub reasoning: String,
    /// Confidence percentage rounded to a whole number, e.g. `"83"`.
    pub percent: String,
    /// Bar width in percent, clamped to `0..=100`.
    pub fill: f64,
}

pub fn build_cards(state: &VisualizationState) -> Vec<PredictionCard> {
    state
        .predictions
        .iter()
        .enumerate()
        .map(|(index, prediction)| PredictionCard {
            rank: index + 1,
            word: prediction.word.clone(),
            reasoning: prediction.reasoning.clone(),
            percent: format_percent(prediction.confidence, 0),
            fill: (prediction.confidence * 100.0).clamp(0.0, 100.0),
        })
        .collect()
}

/// Card list markup. Word and reasoning are escaped.
pub fn cards_markup(cards: &[PredictionCard]) -> String {
    if cards.is_empty() {
        return format!(r#"<p class="empty-state">{NO_PREDICTIONS}</p>"#);
    }

    cards
        .iter()
        .map(|card| {
            format!(
                r#"<div class="prediction-card">
  <div class="prediction-rank">{rank}</div>
  <div class="prediction-content">
    <div class="prediction-word">{word}</div>
    <div class="prediction-reasoning">{reasoning}</div>
  </div>
  <div class="prediction-confidence">
    <span class="confidence-value">{percent}%</span>
    <div class="confidence-bar"><div class="confidence-fill" style="width: {fill:.1}%"></div></div>
  </div>
</div>"#,
                rank = card.rank,
                word = escape_html(&card.word),
                reasoning = escape_html(&card.reasoning),
                percent = card.percent,
                fill = card.fill,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AnalysisBundle, Prediction};

    fn state(predictions: &[(&str, f64)]) -> VisualizationState {
        VisualizationState {
            tokens: vec!["the".to_string()],
            predictions: predictions
                .iter()
                .map(|(word, confidence)| Prediction {
                    word: word.to_string(),
                    confidence: *confidence,
                    reasoning: "because".to_string(),
                    attention: None,
                })
                .collect(),
            analysis: AnalysisBundle::default(),
        }
    }

    #[test]
    fn cards_keep_service_order_and_rank() {
        let cards = build_cards(&state(&[("dog", 0.1), ("cat", 0.8342)]));
        assert_eq!(cards[0].rank, 1);
        assert_eq!(cards[0].word, "dog");
        assert_eq!(cards[0].percent, "10");
        assert_eq!(cards[1].rank, 2);
        assert_eq!(cards[1].percent, "83");
    }

    #[test]
    fn bar_width_uses_unrounded_fill() {
        let markup = cards_markup(&build_cards(&state(&[("cat", 0.8342)])));
        assert!(markup.contains(r#"<span class="confidence-value">83%</span>"#));
        assert!(markup.contains(r#"style="width: 83.4%""#));
    }

    #[test]
    fn bar_width_is_clamped() {
        let cards = build_cards(&state(&[("over", 1.4), ("under", -0.2)]));
        assert_eq!(cards[0].fill, 100.0);
        assert_eq!(cards[1].fill, 0.0);
        assert!(cards_markup(&cards).contains(r#"style="width: 100.0%""#));
    }

    #[test]
    fn empty_list_renders_placeholder() {
        let markup = cards_markup(&[]);
        assert!(markup.contains(NO_PREDICTIONS));
        assert!(!markup.contains("prediction-card"));
    }

    #[test]
    fn word_markup_is_literal() {
        let markup = cards_markup(&build_cards(&state(&[("<script>x</script>", 0.5)])));
        assert!(markup.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(!markup.contains("<script>"));
    }
}
