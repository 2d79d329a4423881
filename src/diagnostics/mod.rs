use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::expand_home;
use crate::config::schema::LoggingConfig;

/// Raw payloads longer than this are cut before logging.
pub const MAX_PAYLOAD_CHARS: usize = 2000;

// ---------------------------------------------------------------------------
// Diagnostic entry (JSONL developer channel)
// ---------------------------------------------------------------------------

/// A single entry in the diagnostics log (`~/.wordlens/diagnostics.jsonl`).
///
/// One entry is written per failed or rejected submission. The user sees a
/// short message; this entry keeps the detail and the raw payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub timestamp: String,
    /// Failure class, e.g. `"too_soon"` or `"malformed_payload"`.
    pub kind: String,
    pub phrase: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw_payload: Option<String>,
}

fn truncate_payload(raw: &str) -> String {
    match raw.char_indices().nth(MAX_PAYLOAD_CHARS) {
        Some((cut, _)) => format!("{}...", &raw[..cut]),
        None => raw.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Log handle
// ---------------------------------------------------------------------------

/// Best-effort JSONL sink. A disabled log accepts and drops every entry.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    path: Option<PathBuf>,
}

impl DiagnosticLog {
    pub fn from_config(config: &LoggingConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self {
            path: expand_home(&config.path),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an entry. Write failures are swallowed.
    pub fn record(&self, kind: &str, phrase: &str, detail: &str, raw_payload: Option<&str>) {
        let entry = DiagnosticEntry {
            timestamp: Utc::now().to_rfc3339(),
            kind: kind.to_string(),
            phrase: phrase.to_string(),
            detail: detail.to_string(),
            raw_payload: raw_payload.map(truncate_payload),
        };
        let _ = self.append(&entry);
    }

    /// Read every entry, skipping malformed lines.
    ///
    /// Returns an empty vec if the log is disabled or the file is missing.
    pub fn read_all(&self) -> Vec<DiagnosticEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };

        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<DiagnosticEntry>(&line).ok())
            .collect()
    }

    fn append(&self, entry: &DiagnosticEntry) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{json}")?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
