/// Configuration schema and defaults for wordlens.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[service]`, `[cooldown]`, `[render]`, `[graph]`, `[web]`, and `[logging]`.
///
/// Every field has a built-in default. Users only need to set the values they
/// want to override.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level wordlens configuration.
///
/// Maps directly to `~/.wordlens/config.toml` and `.wordlens.toml`. Missing
/// sections and fields fall back to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WordlensConfig {
    pub service: ServiceConfig,
    pub cooldown: CooldownConfig,
    pub render: RenderConfig,
    pub graph: GraphConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [service]
// ---------------------------------------------------------------------------

/// Where the prediction service lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the prediction service.
    pub url: String,
    /// Path of the prediction endpoint, appended to `url`.
    pub predict_path: String,
    /// Request timeout in milliseconds. `0` waits for the transport to
    /// resolve the call on its own.
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5000".to_string(),
            predict_path: "/predict".to_string(),
            timeout_ms: 0,
        }
    }
}

impl ServiceConfig {
    /// Full URL of the prediction endpoint.
    pub fn endpoint(&self) -> String {
        let base = self.url.trim_end_matches('/');
        let path = self.predict_path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

// ---------------------------------------------------------------------------
// [cooldown]
// ---------------------------------------------------------------------------

/// Submission rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    /// Minimum interval between accepted submissions (milliseconds).
    pub window_ms: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            window_ms: crate::safety::cooldown::COOLDOWN_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// [render]
// ---------------------------------------------------------------------------

/// Whether the attention views are drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttentionMode {
    /// Draw attention views whenever the response carries attention vectors.
    #[default]
    Auto,
    /// Never draw attention edges, heatmap, or the dominant-token callout.
    Off,
}

impl std::fmt::Display for AttentionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Off => write!(f, "off"),
        }
    }
}

/// Render pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Attention view mode: `auto` or `off`.
    pub attention: AttentionMode,
    /// Entrance animation duration for freshly built charts (milliseconds).
    pub chart_animation_ms: u64,
    /// Entrance animation easing name.
    pub chart_easing: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            attention: AttentionMode::default(),
            chart_animation_ms: 800,
            chart_easing: "easeOutQuart".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [graph]
// ---------------------------------------------------------------------------

/// Attention graph canvas geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub width: f64,
    pub height: f64,
    /// Padding around the drawing area.
    pub margin: f64,
    /// Horizontal distance between consecutive token nodes.
    pub token_spacing: f64,
    /// Horizontal distance between the last token and the prediction column.
    pub prediction_offset: f64,
    /// Vertical distance between stacked prediction nodes.
    pub prediction_spacing: f64,
    pub node_radius: f64,
    /// Stroke width drawn for a zero-weight edge.
    pub min_stroke: f64,
    /// Stroke width drawn for a weight-1.0 edge.
    pub max_stroke: f64,
    /// Interval between render ticks requested by the dashboard (milliseconds).
    pub frame_interval_ms: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
            margin: 50.0,
            token_spacing: 110.0,
            prediction_offset: 220.0,
            prediction_spacing: 70.0,
            node_radius: 18.0,
            min_stroke: 0.5,
            max_stroke: 8.0,
            frame_interval_ms: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// Local dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Address the dashboard binds to.
    pub addr: String,
    /// Open the dashboard in the default browser on start.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Developer diagnostics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether diagnostics are recorded.
    pub enabled: bool,
    /// Path to the JSONL diagnostics file. `~` is expanded to the home directory.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.wordlens/diagnostics.jsonl".to_string(),
        }
    }
}

impl WordlensConfig {
    /// Annotated default configuration written by `wordlens config init`.
    pub fn default_toml() -> String {
        r#"# wordlens configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (WORDLENS_*)
#   2. Project config (.wordlens.toml in current directory)
#   3. User global config (~/.wordlens/config.toml)
#   4. Built-in defaults

[service]
url = "http://127.0.0.1:5000"
predict_path = "/predict"
timeout_ms = 0                 # 0 = no explicit timeout

[cooldown]
window_ms = 3000               # Minimum interval between submissions

[render]
attention = "auto"             # auto | off
chart_animation_ms = 800
chart_easing = "easeOutQuart"

[graph]
width = 800.0
height = 400.0
margin = 50.0
token_spacing = 110.0
prediction_offset = 220.0
prediction_spacing = 70.0
node_radius = 18.0
min_stroke = 0.5
max_stroke = 8.0
frame_interval_ms = 50

[web]
addr = "127.0.0.1:9747"
open_browser = true

[logging]
enabled = true
path = "~/.wordlens/diagnostics.jsonl"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toml_parses_back() {
        let toml_str = WordlensConfig::default_toml();
        let config: WordlensConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.cooldown.window_ms, 3000);
        assert_eq!(config.render.attention, AttentionMode::Auto);
        assert_eq!(config.service.predict_path, "/predict");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[service]
url = "http://predict.local:8080/"
"#;
        let config: WordlensConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.service.url, "http://predict.local:8080/");
        assert_eq!(config.service.timeout_ms, 0);
        assert_eq!(config.graph.frame_interval_ms, 50);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let mut service = ServiceConfig::default();
        service.url = "http://localhost:5000/".to_string();
        assert_eq!(service.endpoint(), "http://localhost:5000/predict");

        service.predict_path = "api/predict".to_string();
        assert_eq!(service.endpoint(), "http://localhost:5000/api/predict");
    }

    #[test]
    fn attention_mode_display() {
        assert_eq!(AttentionMode::Auto.to_string(), "auto");
        assert_eq!(AttentionMode::Off.to_string(), "off");
    }
}
