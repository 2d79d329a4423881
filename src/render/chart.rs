//! Charts: the confidence bar series and the attention heatmap.
//!
//! Drawing is delegated to a [`ChartBackend`], which only has to turn a
//! [`ChartSpec`] into output. A [`ChartSlot`] owns the live instance for one
//! mount point and never updates it in place: every state replacement tears
//! the old chart down and constructs a new one.

use std::fmt::Write as _;

use crate::config::schema::RenderConfig;
use crate::state::VisualizationState;

use super::escape::escape_html;
use super::format_percent;

/// Upper bound of the value axis, in percent.
pub const Y_AXIS_MAX: f64 = 100.0;

// ---------------------------------------------------------------------------
// Specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub duration_ms: u64,
    pub easing: String,
}

impl Animation {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            duration_ms: config.chart_animation_ms,
            easing: config.chart_easing.clone(),
        }
    }

    /// CSS timing function for the configured easing name.
    pub fn css_easing(&self) -> &'static str {
        match self.easing.as_str() {
            "easeOutQuart" => "cubic-bezier(0.25, 1, 0.5, 1)",
            "easeOutCubic" => "cubic-bezier(0.33, 1, 0.68, 1)",
            "easeInOutQuad" => "cubic-bezier(0.45, 0, 0.55, 1)",
            "linear" => "linear",
            _ => "ease-out",
        }
    }
}

/// One labeled bar series.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub label: String,
    pub categories: Vec<String>,
    /// Percentages rounded to one decimal.
    pub values: Vec<f64>,
    /// `values` formatted with one decimal, e.g. `"83.4"`.
    pub display: Vec<String>,
}

/// Predictions (rows) × tokens (columns) attention grid.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapGrid {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// Weight percentages rounded to one decimal, `cells[row][column]`.
    pub cells: Vec<Vec<f64>>,
    pub display: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartKind {
    Bar(BarSeries),
    Heatmap(HeatmapGrid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub y_max: f64,
    pub animation: Animation,
}

/// Confidence chart spec: one bar per prediction, labeled by word.
pub fn confidence_chart(state: &VisualizationState, animation: Animation) -> ChartSpec {
    let categories = state.predictions.iter().map(|p| p.word.clone()).collect();
    let display: Vec<String> = state
        .predictions
        .iter()
        .map(|p| format_percent(p.confidence, 1))
        .collect();
    let values = display.iter().map(|d| d.parse().unwrap_or(0.0)).collect();

    ChartSpec {
        kind: ChartKind::Bar(BarSeries {
            label: "Confidence %".to_string(),
            categories,
            values,
            display,
        }),
        y_max: Y_AXIS_MAX,
        animation,
    }
}

/// Attention heatmap spec. Missing vectors and entries read as `0.0`.
pub fn attention_heatmap(state: &VisualizationState, animation: Animation) -> ChartSpec {
    let display: Vec<Vec<String>> = state
        .predictions
        .iter()
        .map(|p| {
            (0..state.tokens.len())
                .map(|t| format_percent(p.attention_weight(t), 1))
                .collect()
        })
        .collect();
    let cells = display
        .iter()
        .map(|row| row.iter().map(|d| d.parse().unwrap_or(0.0)).collect())
        .collect();

    ChartSpec {
        kind: ChartKind::Heatmap(HeatmapGrid {
            rows: state.predictions.iter().map(|p| p.word.clone()).collect(),
            columns: state.tokens.clone(),
            cells,
            display,
        }),
        y_max: Y_AXIS_MAX,
        animation,
    }
}

// ---------------------------------------------------------------------------
// Backend and slot
// ---------------------------------------------------------------------------

/// The charting capability: draw a spec, get renderable output back.
pub trait ChartBackend {
    fn construct(&self, spec: &ChartSpec) -> String;
}

/// A constructed chart instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Monotonic per slot; a rebuilt chart always has a new id.
    pub id: u64,
    pub spec: ChartSpec,
    pub output: String,
}

/// Owner of the live chart for one mount point.
#[derive(Debug, Default)]
pub struct ChartSlot {
    current: Option<Chart>,
    built: u64,
    destroyed: u64,
}

impl ChartSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destroy the current chart (if any), then construct one from `spec`.
    pub fn rebuild(&mut self, spec: ChartSpec, backend: &dyn ChartBackend) -> &Chart {
        self.destroy();
        self.built += 1;
        let output = backend.construct(&spec);
        self.current.insert(Chart {
            id: self.built,
            spec,
            output,
        })
    }

    pub fn destroy(&mut self) {
        if self.current.take().is_some() {
            self.destroyed += 1;
        }
    }

    pub fn current(&self) -> Option<&Chart> {
        self.current.as_ref()
    }

    pub fn built(&self) -> u64 {
        self.built
    }

    pub fn destroyed(&self) -> u64 {
        self.destroyed
    }
}

// ---------------------------------------------------------------------------
// SVG backend
// ---------------------------------------------------------------------------

const BAR_COLOR: &str = "rgba(99, 102, 241, 0.8)";
const GRID_COLOR: &str = "#f1f5f9";
const AXIS_TEXT: &str = "#94a3b8";
const LABEL_TEXT: &str = "#64748b";

/// Inline SVG charts for the HTML surface.
#[derive(Debug, Clone)]
pub struct SvgChartBackend {
    pub width: f64,
    pub height: f64,
}

impl Default for SvgChartBackend {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 300.0,
        }
    }
}

impl ChartBackend for SvgChartBackend {
    fn construct(&self, spec: &ChartSpec) -> String {
        match &spec.kind {
            ChartKind::Bar(series) => self.bar_chart(series, spec),
            ChartKind::Heatmap(grid) => self.heatmap(grid, spec),
        }
    }
}

impl SvgChartBackend {
    fn bar_chart(&self, series: &BarSeries, spec: &ChartSpec) -> String {
        let (left, right, top, bottom) = (44.0, 12.0, 12.0, 36.0);
        let plot_w = self.width - left - right;
        let plot_h = self.height - top - bottom;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg class="chart bar-chart" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w:.0} {h:.0}" role="img" aria-label="{label}">"#,
            w = self.width,
            h = self.height,
            label = escape_html(&series.label),
        );

        // Value axis: fixed 0..y_max, ticks every 20%.
        for step in 0..=5 {
            let value = spec.y_max * f64::from(step) / 5.0;
            let y = top + plot_h - plot_h * value / spec.y_max;
            let _ = writeln!(
                svg,
                r#"  <line x1="{left:.1}" y1="{y:.1}" x2="{x2:.1}" y2="{y:.1}" stroke="{GRID_COLOR}"/>"#,
                x2 = left + plot_w,
            );
            let _ = writeln!(
                svg,
                r#"  <text x="{x:.1}" y="{ty:.1}" font-size="11" fill="{AXIS_TEXT}" text-anchor="end">{value:.0}%</text>"#,
                x = left - 6.0,
                ty = y + 4.0,
            );
        }

        let count = series.values.len().max(1) as f64;
        let slot_w = plot_w / count;
        let bar_w = slot_w * 0.6;
        for (i, value) in series.values.iter().enumerate() {
            let clamped = value.clamp(0.0, spec.y_max);
            let bar_h = plot_h * clamped / spec.y_max;
            let x = left + slot_w * i as f64 + (slot_w - bar_w) / 2.0;
            let y = top + plot_h - bar_h;
            let display = series.display.get(i).map(String::as_str).unwrap_or("");
            let category = series.categories.get(i).map(String::as_str).unwrap_or("");
            let _ = writeln!(
                svg,
                r#"  <rect class="bar" x="{x:.1}" y="{y:.1}" width="{bar_w:.1}" height="{bar_h:.1}" rx="6" fill="{BAR_COLOR}" style="animation: bar-grow {dur}ms {ease} both"><title>{display}% confidence</title></rect>"#,
                dur = spec.animation.duration_ms,
                ease = spec.animation.css_easing(),
            );
            let _ = writeln!(
                svg,
                r#"  <text x="{cx:.1}" y="{ly:.1}" font-size="12" font-weight="500" fill="{LABEL_TEXT}" text-anchor="middle">{category}</text>"#,
                cx = x + bar_w / 2.0,
                ly = top + plot_h + 20.0,
                category = escape_html(category),
            );
        }

        svg.push_str("</svg>");
        svg
    }

    fn heatmap(&self, grid: &HeatmapGrid, spec: &ChartSpec) -> String {
        let (left, top) = (110.0, 30.0);
        let cols = grid.columns.len().max(1) as f64;
        let rows = grid.rows.len().max(1) as f64;
        let cell_w = ((self.width - left - 10.0) / cols).max(24.0);
        let cell_h = ((self.height - top - 10.0) / rows).clamp(22.0, 48.0);
        let width = left + cell_w * cols + 10.0;
        let height = top + cell_h * rows + 10.0;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg class="chart heatmap" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width:.0} {height:.0}" role="img" aria-label="Attention heatmap">"#,
        );

        for (c, token) in grid.columns.iter().enumerate() {
            let _ = writeln!(
                svg,
                r#"  <text x="{x:.1}" y="{y:.1}" font-size="12" fill="{LABEL_TEXT}" text-anchor="middle">{token}</text>"#,
                x = left + cell_w * c as f64 + cell_w / 2.0,
                y = top - 10.0,
                token = escape_html(token),
            );
        }

        for (r, word) in grid.rows.iter().enumerate() {
            let y = top + cell_h * r as f64;
            let _ = writeln!(
                svg,
                r#"  <text x="{x:.1}" y="{ty:.1}" font-size="12" fill="{LABEL_TEXT}" text-anchor="end">{word}</text>"#,
                x = left - 8.0,
                ty = y + cell_h / 2.0 + 4.0,
                word = escape_html(word),
            );
            for (c, value) in grid.cells.get(r).into_iter().flatten().enumerate() {
                let alpha = (value / spec.y_max).clamp(0.0, 1.0);
                let display = grid
                    .display
                    .get(r)
                    .and_then(|row| row.get(c))
                    .map(String::as_str)
                    .unwrap_or("");
                let x = left + cell_w * c as f64;
                let _ = writeln!(
                    svg,
                    r##"  <rect class="cell" x="{x:.1}" y="{y:.1}" width="{cw:.1}" height="{ch:.1}" fill="rgba(99, 102, 241, {alpha:.3})" stroke="#e2e8f0" style="animation: cell-fade {dur}ms {ease} both"/>"##,
                    cw = cell_w,
                    ch = cell_h,
                    dur = spec.animation.duration_ms,
                    ease = spec.animation.css_easing(),
                );
                let _ = writeln!(
                    svg,
                    r##"  <text x="{tx:.1}" y="{ty:.1}" font-size="11" fill="{fill}" text-anchor="middle">{display}</text>"##,
                    tx = x + cell_w / 2.0,
                    ty = y + cell_h / 2.0 + 4.0,
                    fill = if alpha > 0.55 { "#ffffff" } else { "#1e293b" },
                );
            }
        }

        svg.push_str("</svg>");
        svg
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::state::{AnalysisBundle, Prediction};

    fn state() -> VisualizationState {
        VisualizationState {
            tokens: vec!["the".to_string(), "cat".to_string()],
            predictions: vec![
                Prediction {
                    word: "cat".to_string(),
                    confidence: 0.8342,
                    reasoning: String::new(),
                    attention: Some(vec![0.1, 0.9]),
                },
                Prediction {
                    word: "dog".to_string(),
                    confidence: 0.1,
                    reasoning: String::new(),
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
    fn confidence_values_use_one_decimal() {
        let spec = confidence_chart(&state(), animation());
        let ChartKind::Bar(series) = spec.kind else {
            panic!("expected bar series");
        };
        assert_eq!(series.categories, vec!["cat", "dog"]);
        assert_eq!(series.display, vec!["83.4", "10.0"]);
        assert_eq!(series.values, vec![83.4, 10.0]);
        assert_eq!(spec.y_max, 100.0);
    }

    #[test]
    fn heatmap_fills_missing_vectors_with_zero() {
        let spec = attention_heatmap(&state(), animation());
        let ChartKind::Heatmap(grid) = spec.kind else {
            panic!("expected heatmap");
        };
        assert_eq!(grid.display[0], vec!["10.0", "90.0"]);
        assert_eq!(grid.display[1], vec!["0.0", "0.0"]);
    }

    /// Records construct calls and what was live at the time.
    struct Recording {
        calls: RefCell<Vec<String>>,
    }

    impl ChartBackend for Recording {
        fn construct(&self, spec: &ChartSpec) -> String {
            let label = match &spec.kind {
                ChartKind::Bar(s) => s.categories.join(","),
                ChartKind::Heatmap(_) => "heatmap".to_string(),
            };
            self.calls.borrow_mut().push(label.clone());
            label
        }
    }

    #[test]
    fn rebuild_destroys_previous_instance_first() {
        let backend = Recording {
            calls: RefCell::new(Vec::new()),
        };
        let mut slot = ChartSlot::new();

        let first_id = slot.rebuild(confidence_chart(&state(), animation()), &backend).id;
        assert_eq!(slot.destroyed(), 0);

        let second = slot
            .rebuild(
                confidence_chart(&VisualizationState::default(), animation()),
                &backend,
            )
            .clone();
        assert_ne!(first_id, second.id);
        assert_eq!(slot.destroyed(), 1);
        assert_eq!(slot.built(), 2);
        assert_eq!(second.output, "");
        assert_eq!(*backend.calls.borrow(), vec!["cat,dog".to_string(), String::new()]);
    }

    #[test]
    fn svg_bar_chart_escapes_labels() {
        let mut s = state();
        s.predictions[0].word = "<b>".to_string();
        let svg = SvgChartBackend::default().construct(&confidence_chart(&s, animation()));
        assert!(svg.contains("&lt;b&gt;"));
        assert!(!svg.contains("<b>"));
        assert!(svg.contains("83.4% confidence"));
        assert!(svg.contains("100%"));
    }

    #[test]
    fn svg_bar_chart_carries_entrance_animation() {
        let svg = SvgChartBackend::default().construct(&confidence_chart(&state(), animation()));
        assert!(svg.contains("bar-grow 800ms cubic-bezier(0.25, 1, 0.5, 1)"));
    }

    #[test]
    fn empty_bar_chart_still_draws_axis() {
        let svg = SvgChartBackend::default()
            .construct(&confidence_chart(&VisualizationState::default(), animation()));
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("0%"));
        assert!(!svg.contains("class=\"bar\""));
    }
}
