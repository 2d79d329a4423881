//! CLI command implementations for wordlens.
//!
//! Provides subcommand handlers for:
//! - `wordlens predict <phrase>`: one submission through the full lifecycle
//! - `wordlens render <file> --phrase P`: render a saved reply offline
//! - `wordlens repl`: interactive submissions, cooldown enforced
//! - `wordlens serve`: local dashboard
//! - `wordlens health`: config, service reachability, diagnostics log
//! - `wordlens config show|init|set|reset`: configuration management

pub mod terminal;

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::config::schema::AttentionMode;
use crate::config::{self, WordlensConfig};
use crate::diagnostics::DiagnosticLog;
use crate::render::attention::{AttentionRenderer, SvgCanvas};
use crate::render::format_percent;
use crate::render::surface::HtmlSurface;
use crate::service::{HttpPredictionClient, RawReply};
use crate::session::{Session, SubmitOutcome};
use crate::state::VisualizationState;
use crate::web;

/// Output format for prediction commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// JSON report
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PredictionReport<'a> {
    rank: usize,
    word: &'a str,
    confidence: f64,
    /// Card label, whole percent.
    percent: String,
    /// Chart value, one decimal.
    chart_value: String,
    reasoning: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attention: Option<&'a [f64]>,
}

#[derive(Debug, Serialize)]
struct DominantReport<'a> {
    index: usize,
    token: &'a str,
}

#[derive(Debug, Serialize)]
struct StateReport<'a> {
    status: &'static str,
    tokens: &'a [String],
    predictions: Vec<PredictionReport<'a>>,
    grammar_context: &'a str,
    syntactic_analysis: &'a str,
    semantic_context: &'a str,
    common_patterns: &'a str,
    dominant_attention: Option<DominantReport<'a>>,
}

#[derive(Debug, Serialize)]
struct FailureReport {
    status: &'static str,
    kind: &'static str,
    message: String,
}

fn state_report(state: &VisualizationState, attention: AttentionMode) -> StateReport<'_> {
    StateReport {
        status: "ok",
        tokens: &state.tokens,
        predictions: state
            .predictions
            .iter()
            .enumerate()
            .map(|(i, p)| PredictionReport {
                rank: i + 1,
                word: &p.word,
                confidence: p.confidence,
                percent: format_percent(p.confidence, 0),
                chart_value: format_percent(p.confidence, 1),
                reasoning: &p.reasoning,
                attention: p.attention.as_deref(),
            })
            .collect(),
        grammar_context: &state.analysis.grammar_context,
        syntactic_analysis: &state.analysis.reasoning.syntactic_analysis,
        semantic_context: &state.analysis.reasoning.semantic_context,
        common_patterns: &state.analysis.reasoning.common_patterns,
        dominant_attention: match attention {
            AttentionMode::Auto => state
                .dominant_attention()
                .map(|(index, token)| DominantReport { index, token }),
            AttentionMode::Off => None,
        },
    }
}

/// Print the outcome of a submission. Returns the failure kind, if any.
fn report_outcome(
    outcome: &SubmitOutcome,
    phrase: &str,
    format: OutputFormat,
    cfg: &WordlensConfig,
) -> Result<Option<&'static str>> {
    let (kind, message) = match outcome {
        SubmitOutcome::Rendered(state) => {
            match format {
                OutputFormat::Json => {
                    let report = state_report(state, cfg.render.attention);
                    let json = serde_json::to_string_pretty(&report)?;
                    println!("{json}");
                }
                OutputFormat::Table => terminal::print_state(state, phrase.trim(), &cfg.render),
            }
            return Ok(None);
        }
        SubmitOutcome::Rejected(rejection) => (rejection.kind(), rejection.user_message()),
        SubmitOutcome::Failed(error) => (error.kind(), error.user_message()),
    };

    match format {
        OutputFormat::Json => {
            let report = FailureReport {
                status: "failed",
                kind,
                message,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => terminal::print_error(&message),
    }
    Ok(Some(kind))
}

/// Write a static HTML snapshot of the current views.
fn export_html(
    path: &Path,
    surface: &HtmlSurface,
    state: &VisualizationState,
    cfg: &WordlensConfig,
) -> Result<()> {
    let mut graph = AttentionRenderer::new(cfg.graph.clone(), cfg.render.attention);
    let mut canvas = SvgCanvas::new();
    graph.tick(state, &mut canvas);

    let page = web::frontend::static_page(surface, &canvas.finish());
    std::fs::write(path, page)
        .with_context(|| format!("failed to write HTML snapshot to {}", path.display()))?;
    println!("{} HTML written to {}", "✓".green().bold(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// wordlens predict
// ---------------------------------------------------------------------------

/// Submit one phrase to the prediction service and render the result.
pub fn run_predict(phrase: &str, format: OutputFormat, html: Option<&Path>) -> Result<()> {
    let cfg = config::load();
    let client = HttpPredictionClient::from_config(&cfg.service);
    let mut session = Session::new(&cfg);
    let mut surface = HtmlSurface::new();

    let outcome = session.submit(&client, phrase, &mut surface);
    let failed = report_outcome(&outcome, phrase, format, &cfg)?;

    if let Some(path) = html {
        export_html(path, &surface, &session.snapshot(), &cfg)?;
    }

    match failed {
        Some(kind) => anyhow::bail!("prediction failed ({kind})"),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// wordlens render
// ---------------------------------------------------------------------------

/// Parse a saved reply envelope and render it without touching the network.
pub fn run_render(
    envelope: &Path,
    phrase: &str,
    format: OutputFormat,
    html: Option<&Path>,
) -> Result<()> {
    let body = std::fs::read_to_string(envelope)
        .with_context(|| format!("failed to read {}", envelope.display()))?;

    let cfg = config::load();
    let mut session = Session::new(&cfg);
    let mut surface = HtmlSurface::new();

    let outcome = match session.resolve(phrase, Ok(RawReply::ok(body)), &mut surface) {
        Ok(state) => SubmitOutcome::Rendered(state),
        Err(error) => SubmitOutcome::Failed(error),
    };
    let failed = report_outcome(&outcome, phrase, format, &cfg)?;

    if let Some(path) = html {
        export_html(path, &surface, &session.snapshot(), &cfg)?;
    }

    match failed {
        Some(kind) => anyhow::bail!("could not render {} ({kind})", envelope.display()),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// wordlens repl
// ---------------------------------------------------------------------------

/// Read phrases from stdin, one submission per line.
pub fn run_repl() -> Result<()> {
    let cfg = config::load();
    let client = HttpPredictionClient::from_config(&cfg.service);
    let mut session = Session::new(&cfg);
    let mut surface = HtmlSurface::new();

    println!("{}", "wordlens interactive mode".bold().cyan());
    println!(
        "  {}",
        format!(
            "Service: {}  Cooldown: {}ms  Type `exit` to quit.",
            client.endpoint(),
            session.cooldown().window_ms()
        )
        .dimmed()
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", "wordlens>".bold());
        io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("failed to read from stdin")?;
        if matches!(line.trim(), "exit" | "quit") {
            break;
        }

        let outcome = session.submit(&client, &line, &mut surface);
        report_outcome(&outcome, &line, OutputFormat::Table, &cfg)?;
        println!();
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// wordlens serve
// ---------------------------------------------------------------------------

/// Start the local dashboard.
pub fn run_serve(addr: Option<&str>) -> Result<()> {
    let cfg = config::load();
    let addr = addr.unwrap_or(cfg.web.addr.as_str()).to_string();
    web::serve(&cfg, &addr)
}

// ---------------------------------------------------------------------------
// wordlens health
// ---------------------------------------------------------------------------

/// Check config files, the prediction service, and the diagnostics log.
pub fn run_health() -> Result<()> {
    println!("{}", "wordlens Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let cfg = config::load();
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.wordlens/config.toml found"
        } else {
            "not found (run `wordlens config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".wordlens.toml found"
        } else {
            "none (optional)"
        },
    );

    let client = HttpPredictionClient::from_config(&cfg.service);
    let reachable = client.is_reachable();
    print_health_item(
        "Prediction service",
        reachable,
        &if reachable {
            format!("reachable at {}", client.endpoint())
        } else {
            format!("not reachable at {}", client.endpoint())
        },
    );
    print_health_item(
        "Cooldown",
        true,
        &format!("{}ms between submissions", cfg.cooldown.window_ms),
    );
    print_health_item("Attention views", true, &cfg.render.attention.to_string());

    let log = DiagnosticLog::from_config(&cfg.logging);
    match log.path() {
        None => print_health_item("Diagnostics log", false, "disabled"),
        Some(path) if path.exists() => print_health_item(
            "Diagnostics log",
            true,
            &format!("{} entries in {}", log.read_all().len(), path.display()),
        ),
        Some(_) => print_health_item("Diagnostics log", true, "no log file yet"),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// wordlens config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective wordlens Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.wordlens/config.toml", global_exists);
    print_source(".wordlens.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "WORDLENS_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.wordlens/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} Config written to {}", "✓".green().bold(), path.display());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AnalysisBundle, Prediction, tokenize};

    #[test]
    fn output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Table);
    }

    fn two_token_state() -> VisualizationState {
        VisualizationState {
            tokens: tokenize("the cat"),
            predictions: vec![Prediction {
                word: "cat".to_string(),
                confidence: 0.8342,
                reasoning: "noun".to_string(),
                attention: Some(vec![0.1, 0.9]),
            }],
            analysis: AnalysisBundle::default(),
        }
    }

    #[test]
    fn json_report_carries_both_roundings() {
        let state = two_token_state();
        let json = serde_json::to_value(state_report(&state, AttentionMode::Auto)).unwrap();
        assert_eq!(json["predictions"][0]["percent"], "83");
        assert_eq!(json["predictions"][0]["chart_value"], "83.4");
        assert_eq!(json["dominant_attention"]["index"], 1);
        assert_eq!(json["dominant_attention"]["token"], "cat");
    }

    #[test]
    fn json_report_for_reset_state() {
        let state = VisualizationState::default();
        let json = serde_json::to_value(state_report(&state, AttentionMode::Auto)).unwrap();
        assert_eq!(json["predictions"].as_array().map(Vec::len), Some(0));
        assert!(json["dominant_attention"].is_null());
        assert_eq!(json["grammar_context"], "Not available");
    }

    #[test]
    fn json_report_omits_dominant_token_when_attention_off() {
        let state = two_token_state();
        let json = serde_json::to_value(state_report(&state, AttentionMode::Off)).unwrap();
        assert!(json["dominant_attention"].is_null());
        assert_eq!(json["predictions"][0]["word"], "cat");
    }
}
