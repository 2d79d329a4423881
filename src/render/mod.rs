//! Render pipeline: fan-out from one state snapshot to independent views.
//!
//! Every view reads the same [`VisualizationState`] and writes into its own
//! mount points on a [`Surface`]. Views never read each other's output, so a
//! render after `reset()` simply produces placeholders everywhere.

pub mod analysis;
pub mod attention;
pub mod cards;
pub mod chart;
pub mod escape;
pub mod surface;

use crate::config::schema::{AttentionMode, RenderConfig};
use crate::state::VisualizationState;

use analysis::{AnalysisPanel, NO_ATTENTION};
use chart::{Animation, ChartBackend, ChartSlot, SvgChartBackend};
use surface::{MountPoint, Surface};

/// `confidence * 100` rounded half away from zero to `decimals` places.
///
/// `0.8342` gives `"83"` at 0 decimals and `"83.4"` at 1.
pub fn format_percent(confidence: f64, decimals: usize) -> String {
    let scale = 10f64.powi(decimals as i32);
    let mut rounded = (confidence * 100.0 * scale).round() / scale;
    if rounded == 0.0 {
        rounded = 0.0;
    }
    format!("{rounded:.decimals$}")
}

pub struct RenderPipeline {
    config: RenderConfig,
    chart: ChartSlot,
    heatmap: ChartSlot,
    backend: Box<dyn ChartBackend>,
}

impl RenderPipeline {
    pub fn new(config: RenderConfig) -> Self {
        Self::with_backend(config, Box::new(SvgChartBackend::default()))
    }

    pub fn with_backend(config: RenderConfig, backend: Box<dyn ChartBackend>) -> Self {
        Self {
            config,
            chart: ChartSlot::new(),
            heatmap: ChartSlot::new(),
            backend,
        }
    }

    pub fn confidence_chart(&self) -> &ChartSlot {
        &self.chart
    }

    pub fn heatmap(&self) -> &ChartSlot {
        &self.heatmap
    }

    /// Re-render every view from `state`.
    pub fn render(&mut self, state: &VisualizationState, surface: &mut dyn Surface) {
        let cards = cards::build_cards(state);
        surface.set_markup(MountPoint::Predictions, cards::cards_markup(&cards));

        let animation = Animation::from_config(&self.config);
        let chart = self.chart.rebuild(
            chart::confidence_chart(state, animation.clone()),
            self.backend.as_ref(),
        );
        surface.set_markup(MountPoint::ConfidenceChart, chart.output.clone());

        AnalysisPanel::from_state(state, self.config.attention).write_to(surface);

        if self.config.attention == AttentionMode::Auto && state.has_attention() {
            let heatmap = self.heatmap.rebuild(
                chart::attention_heatmap(state, animation),
                self.backend.as_ref(),
            );
            surface.set_markup(MountPoint::Heatmap, heatmap.output.clone());
        } else {
            self.heatmap.destroy();
            surface.set_text(MountPoint::Heatmap, NO_ATTENTION);
        }
    }
}
