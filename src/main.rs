use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use wordlens::cli;

#[derive(Debug, Parser)]
#[command(name = "wordlens")]
#[command(about = "Visualize next-word predictions, confidence, and attention")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit a phrase to the prediction service and render the result
    Predict {
        /// The phrase to complete
        #[arg(trailing_var_arg = true, required = true)]
        phrase: Vec<String>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
        /// Also write a static HTML snapshot to this file
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Render a saved service reply without calling the service
    Render {
        /// File holding the JSON reply envelope
        envelope: PathBuf,
        /// The phrase the reply answers (drives the token list)
        #[arg(long)]
        phrase: String,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
        /// Also write a static HTML snapshot to this file
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Submit phrases interactively, one per line
    Repl,
    /// Start the local dashboard
    Serve {
        /// Bind address (default from config: 127.0.0.1:9747)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Check config, prediction service reachability, and diagnostics log
    Health,
    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default config to ~/.wordlens/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `service.url http://localhost:5000`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Predict {
            phrase,
            format,
            html,
        } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_predict(&phrase.join(" "), fmt, html.as_deref())
        }
        Commands::Render {
            envelope,
            phrase,
            format,
            html,
        } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_render(&envelope, &phrase, fmt, html.as_deref())
        }
        Commands::Repl => cli::run_repl(),
        Commands::Serve { addr } => cli::run_serve(addr.as_deref()),
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
