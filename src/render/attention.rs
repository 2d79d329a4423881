//! Attention graph: token nodes on the left, prediction nodes on the right,
//! and one edge per (prediction, token) pair weighted by attention.
//!
//! The graph is redrawn from scratch on every tick. [`layout`] is a pure
//! function of the state snapshot and the geometry; [`AttentionRenderer`]
//! only adds the frame counter used for the pulse on the top-ranked node.

use std::fmt::Write as _;

use crate::config::schema::{AttentionMode, GraphConfig};
use crate::state::VisualizationState;

use super::escape::escape_html;
use super::format_percent;

// Palette
const EDGE_RGB: (u8, u8, u8) = (99, 102, 241);
const TOKEN_FILL: Rgba = Rgba::rgb(14, 165, 233);
const PREDICTION_FILL: Rgba = Rgba::rgb(99, 102, 241);
const TOP_FILL: Rgba = Rgba::rgb(236, 72, 153);
const LABEL_COLOR: Rgba = Rgba::rgb(30, 41, 59);
const DIM_COLOR: Rgba = Rgba::rgb(100, 116, 139);

/// Room kept right of the prediction column for word labels.
const LABEL_ROOM: f64 = 120.0;

pub const NO_DATA: &str = "No data";

// ---------------------------------------------------------------------------
// Drawing primitives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn css(&self) -> String {
        format!("rgba({}, {}, {}, {:.3})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

/// A 2D drawing target.
pub trait Canvas {
    /// Drop everything drawn so far and resize.
    fn clear(&mut self, width: f64, height: f64);
    fn line(&mut self, from: Point, to: Point, width: f64, color: Rgba);
    fn circle(&mut self, center: Point, radius: f64, fill: Rgba);
    fn text(&mut self, at: Point, text: &str, size: f64, color: Rgba, anchor: Anchor);
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub label: String,
    pub center: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub prediction: usize,
    pub token: usize,
    pub from: Point,
    pub to: Point,
    pub weight: f64,
    pub stroke: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphLayout {
    pub width: f64,
    pub height: f64,
    pub tokens: Vec<Node>,
    /// Labeled with the word; the confidence label is drawn separately.
    pub predictions: Vec<Node>,
    pub edges: Vec<Edge>,
}

fn unit(weight: f64) -> f64 {
    if weight.is_finite() {
        weight.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Stroke width for an edge: proportional to weight, never below `min`.
pub fn edge_stroke(weight: f64, min: f64, max: f64) -> f64 {
    (unit(weight) * max).max(min)
}

/// Edge opacity: the weight itself, so a zero weight is fully transparent.
pub fn edge_opacity(weight: f64) -> f64 {
    unit(weight)
}

/// Position every node and edge for `state`.
///
/// The canvas grows past the configured size when the tokens or the
/// prediction stack would not fit.
pub fn layout(
    state: &VisualizationState,
    geometry: &GraphConfig,
    mode: AttentionMode,
) -> GraphLayout {
    let token_x = |i: usize| geometry.margin + geometry.token_spacing * i as f64;
    let prediction_x = match state.tokens.len() {
        0 => geometry.margin + geometry.prediction_offset,
        n => token_x(n - 1) + geometry.prediction_offset,
    };

    let stack = state.predictions.len().saturating_sub(1) as f64 * geometry.prediction_spacing;
    let width = geometry.width.max(prediction_x + LABEL_ROOM + geometry.margin);
    let height = geometry.height.max(stack + 2.0 * geometry.margin);
    let mid = height / 2.0;

    let tokens: Vec<Node> = state
        .tokens
        .iter()
        .enumerate()
        .map(|(i, token)| Node {
            label: token.clone(),
            center: Point {
                x: token_x(i),
                y: mid,
            },
        })
        .collect();

    let predictions: Vec<Node> = state
        .predictions
        .iter()
        .enumerate()
        .map(|(i, prediction)| Node {
            label: prediction.word.clone(),
            center: Point {
                x: prediction_x,
                y: mid - stack / 2.0 + geometry.prediction_spacing * i as f64,
            },
        })
        .collect();

    let mut edges = Vec::new();
    if mode == AttentionMode::Auto {
        for (p, prediction) in state.predictions.iter().enumerate() {
            if prediction.attention.is_none() {
                continue;
            }
            for (t, token) in tokens.iter().enumerate() {
                let weight = prediction.attention_weight(t);
                edges.push(Edge {
                    prediction: p,
                    token: t,
                    from: token.center,
                    to: predictions[p].center,
                    weight,
                    stroke: edge_stroke(weight, geometry.min_stroke, geometry.max_stroke),
                    opacity: edge_opacity(weight),
                });
            }
        }
    }

    GraphLayout {
        width,
        height,
        tokens,
        predictions,
        edges,
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Pull-based redraw loop: each [`tick`](Self::tick) draws one full frame.
#[derive(Debug, Clone)]
pub struct AttentionRenderer {
    geometry: GraphConfig,
    mode: AttentionMode,
    frame: u64,
}

impl AttentionRenderer {
    pub fn new(geometry: GraphConfig, mode: AttentionMode) -> Self {
        Self {
            geometry,
            mode,
            frame: 0,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Clear `canvas` and draw `state`. Returns the frame number drawn.
    pub fn tick(&mut self, state: &VisualizationState, canvas: &mut dyn Canvas) -> u64 {
        self.frame = self.frame.wrapping_add(1);

        if state.is_empty() {
            let (width, height) = (self.geometry.width, self.geometry.height);
            canvas.clear(width, height);
            canvas.text(
                Point {
                    x: width / 2.0,
                    y: height / 2.0,
                },
                NO_DATA,
                16.0,
                DIM_COLOR,
                Anchor::Middle,
            );
            return self.frame;
        }

        let graph = layout(state, &self.geometry, self.mode);
        canvas.clear(graph.width, graph.height);

        for edge in &graph.edges {
            let (r, g, b) = EDGE_RGB;
            let color = Rgba { r, g, b, a: edge.opacity };
            canvas.line(edge.from, edge.to, edge.stroke, color);
        }

        let radius = self.geometry.node_radius;
        for token in &graph.tokens {
            canvas.circle(token.center, radius, TOKEN_FILL);
            canvas.text(
                Point {
                    x: token.center.x,
                    y: token.center.y + radius + 18.0,
                },
                &token.label,
                14.0,
                LABEL_COLOR,
                Anchor::Middle,
            );
        }

        let pulse = 1.0 + 0.08 * (self.frame as f64 * 0.15).sin();
        let ranked = graph.predictions.iter().zip(&state.predictions).enumerate();
        for (rank, (node, prediction)) in ranked {
            let (r, fill) = if rank == 0 {
                (radius * pulse, TOP_FILL)
            } else {
                (radius, PREDICTION_FILL)
            };
            canvas.circle(node.center, r, fill);
            canvas.text(
                Point {
                    x: node.center.x + radius + 10.0,
                    y: node.center.y,
                },
                &node.label,
                14.0,
                LABEL_COLOR,
                Anchor::Start,
            );
            canvas.text(
                Point {
                    x: node.center.x + radius + 10.0,
                    y: node.center.y + 16.0,
                },
                &format!("{}%", format_percent(prediction.confidence, 1)),
                11.0,
                DIM_COLOR,
                Anchor::Start,
            );
        }

        self.frame
    }
}

// ---------------------------------------------------------------------------
// SVG canvas
// ---------------------------------------------------------------------------

/// Canvas that accumulates SVG elements. Text is escaped.
#[derive(Debug, Default)]
pub struct SvgCanvas {
    width: f64,
    height: f64,
    body: String,
}

impl SvgCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" id=\"attentionGraph\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.0} {h:.0}\">\n{body}</svg>",
            w = self.width,
            h = self.height,
            body = self.body,
        )
    }
}

impl Canvas for SvgCanvas {
    fn clear(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.body.clear();
    }

    fn line(&mut self, from: Point, to: Point, width: f64, color: Rgba) {
        let _ = writeln!(
            self.body,
            "  <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"{}\" stroke-width=\"{:.2}\" stroke-linecap=\"round\"/>",
            from.x,
            from.y,
            to.x,
            to.y,
            color.css(),
            width,
        );
    }

    fn circle(&mut self, center: Point, radius: f64, fill: Rgba) {
        let _ = writeln!(
            self.body,
            "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.2}\" fill=\"{}\"/>",
            center.x,
            center.y,
            radius,
            fill.css(),
        );
    }

    fn text(&mut self, at: Point, text: &str, size: f64, color: Rgba, anchor: Anchor) {
        let anchor = match anchor {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        };
        let _ = writeln!(
            self.body,
            "  <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"{size:.0}\" fill=\"{}\" text-anchor=\"{anchor}\" dominant-baseline=\"middle\">{}</text>",
            at.x,
            at.y,
            color.css(),
            escape_html(text),
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AnalysisBundle, PLACEHOLDER, Prediction, tokenize};

    fn prediction(word: &str, attention: Option<Vec<f64>>) -> Prediction {
        Prediction {
            word: word.to_string(),
            confidence: 0.5,
            reasoning: PLACEHOLDER.to_string(),
            attention,
        }
    }

    fn state(phrase: &str, predictions: Vec<Prediction>) -> VisualizationState {
        VisualizationState {
            tokens: tokenize(phrase),
            predictions,
            analysis: AnalysisBundle::default(),
        }
    }

    #[derive(Default)]
    struct Recorder {
        clears: usize,
        lines: Vec<(f64, f64)>,
        circles: Vec<f64>,
        texts: Vec<String>,
    }

    impl Canvas for Recorder {
        fn clear(&mut self, _width: f64, _height: f64) {
            self.clears += 1;
            self.lines.clear();
            self.circles.clear();
            self.texts.clear();
        }
        fn line(&mut self, _from: Point, _to: Point, width: f64, color: Rgba) {
            self.lines.push((width, color.a));
        }
        fn circle(&mut self, _center: Point, radius: f64, _fill: Rgba) {
            self.circles.push(radius);
        }
        fn text(&mut self, _at: Point, text: &str, _size: f64, _color: Rgba, _anchor: Anchor) {
            self.texts.push(text.to_string());
        }
    }

    #[test]
    fn stroke_has_floor_and_opacity_tracks_weight() {
        assert_eq!(edge_stroke(0.0, 0.5, 8.0), 0.5);
        assert_eq!(edge_stroke(1.0, 0.5, 8.0), 8.0);
        assert_eq!(edge_stroke(0.5, 0.5, 8.0), 4.0);
        assert_eq!(edge_opacity(0.0), 0.0);
        assert_eq!(edge_opacity(0.25), 0.25);
        assert_eq!(edge_opacity(f64::NAN), 0.0);
        assert_eq!(edge_opacity(3.0), 1.0);
    }

    #[test]
    fn tokens_left_to_right_predictions_to_the_right() {
        let s = state(
            "the quick cat",
            vec![prediction("sat", Some(vec![0.2, 0.3, 0.5])), prediction("ran", None)],
        );
        let g = GraphConfig::default();
        let graph = layout(&s, &g, AttentionMode::Auto);

        let xs: Vec<f64> = graph.tokens.iter().map(|n| n.center.x).collect();
        assert_eq!(xs, vec![50.0, 160.0, 270.0]);
        assert!(graph.predictions.iter().all(|n| n.center.x == 270.0 + 220.0));
        assert!(graph.predictions[0].center.y < graph.predictions[1].center.y);
    }

    #[test]
    fn edges_only_for_predictions_with_attention() {
        let s = state(
            "the cat",
            vec![prediction("sat", Some(vec![0.1, 0.9])), prediction("ran", None)],
        );
        let graph = layout(&s, &GraphConfig::default(), AttentionMode::Auto);
        assert_eq!(graph.edges.len(), 2);
        assert!(graph.edges.iter().all(|e| e.prediction == 0));
        assert_eq!(graph.predictions.len(), 2);
    }

    #[test]
    fn short_vector_entries_read_as_zero() {
        let s = state("a b c", vec![prediction("d", Some(vec![0.7]))]);
        let graph = layout(&s, &GraphConfig::default(), AttentionMode::Auto);
        let weights: Vec<f64> = graph.edges.iter().map(|e| e.weight).collect();
        assert_eq!(weights, vec![0.7, 0.0, 0.0]);
        assert_eq!(graph.edges[2].stroke, 0.5);
        assert_eq!(graph.edges[2].opacity, 0.0);
    }

    #[test]
    fn attention_off_draws_no_edges() {
        let s = state("the cat", vec![prediction("sat", Some(vec![0.1, 0.9]))]);
        let graph = layout(&s, &GraphConfig::default(), AttentionMode::Off);
        assert!(graph.edges.is_empty());
        assert_eq!(graph.predictions.len(), 1);
    }

    #[test]
    fn canvas_grows_for_long_phrases() {
        let s = state(
            "one two three four five six seven eight",
            vec![prediction("nine", None)],
        );
        let graph = layout(&s, &GraphConfig::default(), AttentionMode::Auto);
        assert!(graph.width > 800.0);
    }

    #[test]
    fn tick_clears_and_redraws_every_frame() {
        let s = state("the cat", vec![prediction("sat", Some(vec![0.1, 0.9]))]);
        let mut renderer = AttentionRenderer::new(GraphConfig::default(), AttentionMode::Auto);
        let mut canvas = Recorder::default();

        assert_eq!(renderer.tick(&s, &mut canvas), 1);
        assert_eq!(renderer.tick(&s, &mut canvas), 2);
        assert_eq!(canvas.clears, 2);
        assert_eq!(canvas.lines.len(), 2);
        assert_eq!(canvas.circles.len(), 3);
        assert!(canvas.texts.contains(&"50.0%".to_string()));
    }

    #[test]
    fn empty_state_draws_placeholder() {
        let mut renderer = AttentionRenderer::new(GraphConfig::default(), AttentionMode::Auto);
        let mut canvas = Recorder::default();
        renderer.tick(&VisualizationState::default(), &mut canvas);
        assert_eq!(canvas.texts, vec![NO_DATA.to_string()]);
        assert!(canvas.circles.is_empty());
    }

    #[test]
    fn svg_canvas_escapes_labels() {
        let s = state("<b> cat", vec![prediction("&", None)]);
        let mut renderer = AttentionRenderer::new(GraphConfig::default(), AttentionMode::Auto);
        let mut canvas = SvgCanvas::new();
        renderer.tick(&s, &mut canvas);
        let svg = canvas.finish();
        assert!(svg.contains("&lt;b&gt;"));
        assert!(svg.contains(">&amp;<"));
        assert!(!svg.contains("<b>"));
    }
}
