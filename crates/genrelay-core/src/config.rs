//! Configuration resolution for genrelay.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/genrelay/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete genrelay configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Generation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub model: String,
    pub generate_path: String,
    /// TCP connect timeout (seconds).
    pub connect_timeout_secs: u64,
    /// Time allowed for the backend to start answering (seconds).
    pub response_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen:0.5b".to_string(),
            generate_path: "/api/generate".to_string(),
            connect_timeout_secs: 10,
            response_timeout_secs: 300,
        }
    }
}

impl UpstreamConfig {
    /// Full URL of the generate endpoint.
    pub fn generate_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.generate_path.trim_start_matches('/')
        )
    }
}

/// Relay session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    /// Emit a `start` event echoing the request before streaming.
    pub emit_start: bool,
    /// Emit an explicit `end` event on completion.
    pub emit_end: bool,
    /// Events buffered between a session and its HTTP response.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            emit_start: true,
            emit_end: true,
            channel_capacity: 32,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let global = global_config_path().filter(|p| p.exists());
    load_config_from(global.as_deref(), explicit, |key| std::env::var(key).ok())
}

/// Resolve configuration from the given layers.
///
/// Files are merged field by field, so a later file only overrides the keys
/// it actually sets.
pub fn load_config_from(
    global: Option<&Path>,
    explicit: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;

    for path in global.into_iter().chain(explicit) {
        merge_values(&mut merged, read_layer(path)?);
    }

    let mut config: Config = serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;
    apply_env_overrides(&mut config, lookup);

    validate(&config)?;
    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".genrelay").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir().map(|h| h.join("Library/Application Support/genrelay/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        dirs::config_dir().map(|p| p.join("genrelay").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Load a single config file on top of the built-in defaults.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;
    merge_values(&mut merged, read_layer(path)?);
    serde_json::from_value(merged).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Read one config file as a raw JSON object.
fn read_layer(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let layer: Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    if !layer.is_object() {
        return Err(Error::Config(format!(
            "Config file {} must contain a JSON object",
            path.display()
        )));
    }
    Ok(layer)
}

/// Deep-merge `overlay` into `base`. Objects merge key by key; any other
/// value replaces what was there.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_values(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply `GENRELAY_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("GENRELAY_UPSTREAM_URL") {
        config.upstream.base_url = val;
    }
    if let Some(val) = lookup("GENRELAY_MODEL") {
        config.upstream.model = val;
    }
    if let Some(val) = lookup("GENRELAY_ADDR") {
        config.server.addr = val;
    }
    if let Some(val) = lookup("GENRELAY_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Some(val) = lookup("GENRELAY_CONNECT_TIMEOUT_SECS") {
        if let Ok(n) = val.parse() {
            config.upstream.connect_timeout_secs = n;
        }
    }
}

/// Reject values the relay cannot run with.
pub fn validate(config: &Config) -> Result<()> {
    if config.upstream.base_url.trim().is_empty() {
        return Err(Error::Config("upstream.base_url is empty".into()));
    }
    if config.upstream.model.trim().is_empty() {
        return Err(Error::Config("upstream.model is empty".into()));
    }
    if config.upstream.connect_timeout_secs == 0 {
        return Err(Error::Config(
            "upstream.connect_timeout_secs must be positive".into(),
        ));
    }
    if config.upstream.response_timeout_secs == 0 {
        return Err(Error::Config(
            "upstream.response_timeout_secs must be positive".into(),
        ));
    }
    if config.relay.channel_capacity == 0 {
        return Err(Error::Config(
            "relay.channel_capacity must be positive".into(),
        ));
    }
    Ok(())
}
