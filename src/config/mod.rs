/// Configuration system for wordlens.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::WordlensConfig::default()`]
/// 2. **User global config**: `~/.wordlens/config.toml`
/// 3. **Project local config**: `.wordlens.toml` in the current working directory
/// 4. **Environment variables**: `WORDLENS_*` overrides (highest precedence)
///
/// Later layers override earlier ones key by key. Keys a file does not set
/// keep the value from the layers below it.
///
/// # Usage
///
/// ```rust,ignore
/// use wordlens::config;
///
/// let cfg = config::load();
/// let endpoint = cfg.service.endpoint();
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::WordlensConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved wordlens configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> WordlensConfig {
    // Layers 2 and 3: ~/.wordlens/config.toml, then .wordlens.toml
    let mut config = load_layers(&[global_config_path(), project_config_path()]);

    // Layer 4: environment variable overrides
    apply_env_overrides(&mut config);

    config
}

/// Merge TOML files over the built-in defaults, in order.
///
/// Files are merged key by key, so a later file only overrides the keys it
/// sets. A file that is missing, not TOML, or would make the merged config
/// invalid is skipped as a whole.
fn load_layers(paths: &[Option<PathBuf>]) -> WordlensConfig {
    let Ok(mut merged) = toml::Value::try_from(WordlensConfig::default()) else {
        return WordlensConfig::default();
    };

    for path in paths.iter().flatten() {
        let Some(layer) = load_toml_value(path) else {
            continue;
        };
        let mut candidate = merged.clone();
        merge_values(&mut candidate, layer);
        let valid: Result<WordlensConfig, _> = candidate.clone().try_into();
        if valid.is_ok() {
            merged = candidate;
        }
    }

    merged.try_into().unwrap_or_default()
}

/// Read a TOML file as a raw table. `None` if missing or malformed.
fn load_toml_value(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    value.is_table().then_some(value)
}

/// Overlay `overlay` onto `base`: tables merge recursively, anything else
/// replaces.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.wordlens/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".wordlens").join("config.toml"))
}

/// Path to the project local config: `.wordlens.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".wordlens.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None if path == "~" => dirs::home_dir(),
        None => Some(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `WORDLENS_SERVICE_URL`: prediction service base URL
/// - `WORDLENS_SERVICE_TIMEOUT_MS`: request timeout (`0` = none)
/// - `WORDLENS_COOLDOWN_MS`: minimum interval between submissions
/// - `WORDLENS_ATTENTION`: attention view mode (`auto`, `off`)
/// - `WORDLENS_WEB_ADDR`: dashboard bind address
/// - `WORDLENS_LOGGING`: diagnostics on/off (`1`/`true`/`yes`/`on`)
fn apply_env_overrides(config: &mut WordlensConfig) {
    if let Ok(val) = std::env::var("WORDLENS_SERVICE_URL")
        && !val.is_empty()
    {
        config.service.url = val;
    }
    if let Ok(val) = std::env::var("WORDLENS_SERVICE_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.service.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("WORDLENS_COOLDOWN_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.cooldown.window_ms = ms;
    }
    if let Ok(val) = std::env::var("WORDLENS_ATTENTION")
        && let Some(mode) = parse_attention_mode(&val)
    {
        config.render.attention = mode;
    }
    if let Ok(val) = std::env::var("WORDLENS_WEB_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
    if let Ok(val) = std::env::var("WORDLENS_LOGGING") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse an attention mode string.
fn parse_attention_mode(val: &str) -> Option<schema::AttentionMode> {
    match val.to_ascii_lowercase().as_str() {
        "auto" | "on" => Some(schema::AttentionMode::Auto),
        "off" | "none" => Some(schema::AttentionMode::Off),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.wordlens/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.wordlens/ directory")?;
    }

    fs::write(&path, WordlensConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Reads the current global config (or serialized defaults), updates the
/// dotted key (e.g. `service.url`), and writes the result back.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&WordlensConfig::default())
            .context("failed to serialize default config")?
    };

    let mut value_table: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;

    set_toml_value(&mut value_table, key, value)?;

    // Reject edits that no longer deserialize (e.g. an unknown enum variant).
    let updated =
        toml::to_string_pretty(&value_table).context("failed to serialize updated config")?;
    toml::from_str::<WordlensConfig>(&updated)
        .with_context(|| format!("invalid value '{value}' for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, updated).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        anyhow::bail!("empty config key segment in '{key}'");
    }

    let mut current = root;
    for &part in &parts[..parts.len() - 1] {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let leaf = parts[parts.len() - 1];

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(leaf) {
        None => anyhow::bail!("config key not found: '{key}'"),
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("YES"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn parse_attention_mode_handles_variants() {
        assert_eq!(
            parse_attention_mode("auto"),
            Some(schema::AttentionMode::Auto)
        );
        assert_eq!(parse_attention_mode("OFF"), Some(schema::AttentionMode::Off));
        assert_eq!(parse_attention_mode("sometimes"), None);
    }

    #[test]
    fn set_toml_value_updates_string() {
        let toml_str = r#"
[service]
url = "http://127.0.0.1:5000"
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        set_toml_value(&mut root, "service.url", "http://predict:9000").unwrap();

        let service = root["service"].as_table().unwrap();
        assert_eq!(service["url"].as_str(), Some("http://predict:9000"));
    }

    #[test]
    fn set_toml_value_updates_integer_and_bool() {
        let toml_str = r#"
[cooldown]
window_ms = 3000

[logging]
enabled = true
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        set_toml_value(&mut root, "cooldown.window_ms", "5000").unwrap();
        set_toml_value(&mut root, "logging.enabled", "off").unwrap();

        assert_eq!(root["cooldown"]["window_ms"].as_integer(), Some(5000));
        assert_eq!(root["logging"]["enabled"].as_bool(), Some(false));
    }

    #[test]
    fn set_toml_value_rejects_bad_integer() {
        let toml_str = r#"
[cooldown]
window_ms = 3000
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        assert!(set_toml_value(&mut root, "cooldown.window_ms", "soon").is_err());
    }

    #[test]
    fn set_toml_value_rejects_unknown_key() {
        let toml_str = r#"
[service]
url = "x"
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "value").is_err());
        assert!(set_toml_value(&mut root, "service.nope", "value").is_err());
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(
            expand_home("/var/log/wordlens.jsonl"),
            Some(PathBuf::from("/var/log/wordlens.jsonl"))
        );
    }

    fn write_layer(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn layer_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("wordlens-config-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn project_layer_keeps_unset_global_keys() {
        let dir = layer_dir("merge");
        let global = write_layer(
            &dir,
            "global.toml",
            "[service]\nurl = \"http://global:7000\"\n\n[cooldown]\nwindow_ms = 5000\n",
        );
        let project = write_layer(&dir, "project.toml", "[web]\naddr = \"127.0.0.1:9999\"\n");

        let config = load_layers(&[Some(global), Some(project)]);

        assert_eq!(config.service.url, "http://global:7000");
        assert_eq!(config.cooldown.window_ms, 5000);
        assert_eq!(config.web.addr, "127.0.0.1:9999");
        assert_eq!(config.service.predict_path, "/predict");
        assert!(config.web.open_browser);
    }

    #[test]
    fn project_layer_overrides_same_key() {
        let dir = layer_dir("override");
        let global = write_layer(&dir, "global.toml", "[cooldown]\nwindow_ms = 5000\n");
        let project = write_layer(&dir, "project.toml", "[cooldown]\nwindow_ms = 1000\n");

        let config = load_layers(&[Some(global), Some(project)]);
        assert_eq!(config.cooldown.window_ms, 1000);
    }

    #[test]
    fn invalid_layer_is_skipped_whole() {
        let dir = layer_dir("invalid");
        let global = write_layer(
            &dir,
            "global.toml",
            "[service]\nurl = \"http://global:7000\"\n",
        );
        let broken = write_layer(
            &dir,
            "project.toml",
            "[web]\naddr = \"127.0.0.1:9999\"\n\n[render]\nattention = \"sometimes\"\n",
        );
        let missing = dir.join("absent.toml");

        let config = load_layers(&[Some(global), Some(broken), Some(missing), None]);

        assert_eq!(config.service.url, "http://global:7000");
        assert_eq!(config.web.addr, "127.0.0.1:9747");
        assert_eq!(config.render.attention, schema::AttentionMode::Auto);
    }

    #[test]
    fn merge_replaces_scalars_and_recurses_tables() {
        let mut base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\nz = 4\n").unwrap();
        merge_values(&mut base, overlay);

        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(3));
        assert_eq!(base["a"]["z"].as_integer(), Some(4));
    }

    #[test]
    fn show_effective_config_returns_toml() {
        let toml_str = show_effective_config().unwrap();
        let _: WordlensConfig = toml::from_str(&toml_str).unwrap();
    }
}
