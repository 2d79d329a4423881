//! Terminal rendering of a visualization state.
//!
//! Reuses the same view models as the HTML pipeline (cards, chart specs,
//! analysis panel) and draws them as text. [`TerminalChart`] is the
//! text-mode [`ChartBackend`].

use colored::Colorize;

use crate::config::schema::{AttentionMode, RenderConfig};
use crate::render::analysis::AnalysisPanel;
use crate::render::cards::{self, NO_PREDICTIONS};
use crate::render::chart::{self, Animation, ChartBackend, ChartKind, ChartSpec};
use crate::state::VisualizationState;

/// Bar width in characters at 100%.
const BAR_WIDTH: usize = 40;

/// Text-mode chart backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalChart;

impl ChartBackend for TerminalChart {
    fn construct(&self, spec: &ChartSpec) -> String {
        match &spec.kind {
            ChartKind::Bar(series) => {
                let label_width = series
                    .categories
                    .iter()
                    .map(|c| c.chars().count())
                    .max()
                    .unwrap_or(0)
                    .min(16);
                series
                    .categories
                    .iter()
                    .zip(&series.values)
                    .zip(&series.display)
                    .map(|((category, value), display)| {
                        let filled = bar_cells(*value, spec.y_max);
                        format!(
                            "  {:<label_width$} │{}{} {display}%",
                            truncate(category, label_width),
                            "█".repeat(filled),
                            " ".repeat(BAR_WIDTH - filled),
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            ChartKind::Heatmap(grid) => {
                let mut lines = Vec::with_capacity(grid.rows.len() + 1);
                let header: String = grid
                    .columns
                    .iter()
                    .map(|c| format!("{:>8}", truncate(c, 7)))
                    .collect();
                lines.push(format!("  {:<12}{header}", ""));
                for (row, cells) in grid.rows.iter().zip(&grid.display) {
                    let cells: String = cells.iter().map(|c| format!("{c:>8}")).collect();
                    lines.push(format!("  {:<12}{cells}", truncate(row, 11)));
                }
                lines.join("\n")
            }
        }
    }
}

fn bar_cells(value: f64, y_max: f64) -> usize {
    if !value.is_finite() || y_max <= 0.0 {
        return 0;
    }
    let ratio = (value / y_max).clamp(0.0, 1.0);
    (ratio * BAR_WIDTH as f64).round() as usize
}

/// Truncate to `max_len` characters, appending "…" if truncated.
pub(super) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Print every view of `state`.
pub fn print_state(state: &VisualizationState, phrase: &str, render: &RenderConfig) {
    println!("{} {}", "Predictions for".bold().cyan(), format!("\"{phrase}\"").bold());
    println!("{}", "=".repeat(60));

    let cards = cards::build_cards(state);
    if cards.is_empty() {
        println!("  {}", NO_PREDICTIONS.yellow());
    }
    for card in &cards {
        println!(
            "  {} {:<20} {:>4}%",
            format!("{:>2}.", card.rank).dimmed(),
            truncate(&card.word, 20).bold(),
            card.percent,
        );
        println!("      {}", card.reasoning.dimmed());
    }
    println!();

    let animation = Animation::from_config(render);
    println!("{}", "Confidence".bold().cyan());
    println!(
        "{}",
        TerminalChart.construct(&chart::confidence_chart(state, animation.clone()))
    );
    println!();

    let panel = AnalysisPanel::from_state(state, render.attention);
    println!("{}", "Analysis".bold().cyan());
    println!("  {} {}", "Grammar context:   ".bold(), panel.grammar_context);
    println!("  {} {}", "Syntactic analysis:".bold(), panel.syntactic_analysis);
    println!("  {} {}", "Semantic context:  ".bold(), panel.semantic_context);
    println!("  {} {}", "Common patterns:   ".bold(), panel.common_patterns);
    println!("  {} {}", "Attention:         ".bold(), panel.callout);

    if render.attention == AttentionMode::Auto && state.has_attention() {
        println!();
        println!("{}", "Attention (% per token)".bold().cyan());
        println!(
            "{}",
            TerminalChart.construct(&chart::attention_heatmap(state, animation))
        );
    }
}

/// Print a failure in the error style.
pub fn print_error(message: &str) {
    println!("{} {}", "✗".red().bold(), message.red());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AnalysisBundle, PLACEHOLDER, Prediction, tokenize};

    fn state() -> VisualizationState {
        VisualizationState {
            tokens: tokenize("the cat"),
            predictions: vec![
                Prediction {
                    word: "sat".to_string(),
                    confidence: 0.5,
                    reasoning: PLACEHOLDER.to_string(),
                    attention: Some(vec![0.25, 0.75]),
                },
                Prediction {
                    word: "ran".to_string(),
                    confidence: 0.1,
                    reasoning: PLACEHOLDER.to_string(),
                    attention: None,
                },
            ],
            analysis: AnalysisBundle::default(),
        }
    }

    fn animation() -> Animation {
        Animation::from_config(&RenderConfig::default())
    }

    #[test]
    fn bar_length_tracks_percentage() {
        let out = TerminalChart.construct(&chart::confidence_chart(&state(), animation()));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].matches('█').count(), 20);
        assert!(lines[0].ends_with("50.0%"));
        assert_eq!(lines[1].matches('█').count(), 4);
    }

    #[test]
    fn heatmap_prints_grid() {
        let out = TerminalChart.construct(&chart::attention_heatmap(&state(), animation()));
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("the") && lines[0].contains("cat"));
        assert!(lines[1].contains("25.0") && lines[1].contains("75.0"));
        assert!(lines[2].contains("0.0"));
    }

    #[test]
    fn over_range_values_are_capped() {
        assert_eq!(bar_cells(150.0, 100.0), BAR_WIDTH);
        assert_eq!(bar_cells(-5.0, 100.0), 0);
        assert_eq!(bar_cells(f64::NAN, 100.0), 0);
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("héllo", 5), "héllo");
    }
}
