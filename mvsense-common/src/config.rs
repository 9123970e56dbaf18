//! Bootstrap configuration loading and config file resolution
//!
//! The TOML file is read once at startup. Secrets may also come from the
//! environment; that tiering happens in the service crate, this module only
//! knows the file model and where to find the file.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "MVSENSE_CONFIG";

/// Config file searched in the working directory as a last resort
pub const LOCAL_CONFIG_FILE: &str = "credentials.toml";

/// Bootstrap configuration loaded from TOML file
///
/// Every section is optional so a partial file (or none at all) still parses.
/// Required values are validated later, after environment overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub meraki: MerakiSection,

    #[serde(default)]
    pub sense: SenseSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub aws: AwsSection,

    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Camera API credentials
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MerakiSection {
    /// Dashboard API key (sent as `X-Cisco-Meraki-API-Key`)
    pub api_key: Option<String>,

    /// Network owning the camera
    pub network_id: Option<String>,

    /// API base URL, defaults to the public v0 API
    pub base_url: Option<String>,
}

/// Camera whose motion stream triggers analysis runs
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SenseSection {
    pub serial: Option<String>,
}

/// MQTT broker connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSection {
    /// Broker host or IP
    pub ip: Option<String>,

    #[serde(default = "default_broker_port")]
    pub port: u16,

    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            ip: None,
            port: default_broker_port(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

/// Recognition service credentials
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AwsSection {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,

    /// Endpoint override (e.g. a local emulator); defaults to the regional endpoint
    pub endpoint: Option<String>,
}

/// Pipeline tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineSection {
    /// Maximum snapshot probes before giving up
    #[serde(default = "default_probe_max_attempts")]
    pub probe_max_attempts: u32,

    /// Delay between snapshot probes
    #[serde(default = "default_probe_delay_ms")]
    pub probe_delay_ms: u64,

    /// Per-call timeout for each recognition operation
    #[serde(default = "default_recognition_timeout_secs")]
    pub recognition_timeout_secs: u64,

    #[serde(default = "default_max_labels")]
    pub max_labels: u32,

    #[serde(default = "default_min_label_confidence")]
    pub min_label_confidence: f64,

    #[serde(default = "default_word_cloud_base_url")]
    pub word_cloud_base_url: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            probe_max_attempts: default_probe_max_attempts(),
            probe_delay_ms: default_probe_delay_ms(),
            recognition_timeout_secs: default_recognition_timeout_secs(),
            max_labels: default_max_labels(),
            min_label_confidence: default_min_label_confidence(),
            word_cloud_base_url: default_word_cloud_base_url(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoggingConfig {
    /// Log filter directive (e.g. "info", "mvsense_ai=debug")
    #[serde(default)]
    pub level: Option<String>,
}

fn default_broker_port() -> u16 {
    1883
}

fn default_keep_alive_secs() -> u64 {
    100
}

fn default_probe_max_attempts() -> u32 {
    30
}

fn default_probe_delay_ms() -> u64 {
    1000
}

fn default_recognition_timeout_secs() -> u64 {
    30
}

fn default_max_labels() -> u32 {
    10
}

fn default_min_label_confidence() -> f64 {
    90.0
}

fn default_word_cloud_base_url() -> String {
    "https://quickchart.io/wordcloud".to_string()
}

/// Config file resolution following priority order:
/// 1. Command-line argument (highest priority)
/// 2. `MVSENSE_CONFIG` environment variable
/// 3. User config dir (`~/.config/mvsense/config.toml`)
/// 4. System config (`/etc/mvsense/config.toml`)
/// 5. `./credentials.toml`
pub struct ConfigFileResolver {
    cli_arg: Option<PathBuf>,
}

impl ConfigFileResolver {
    pub fn new(cli_arg: Option<PathBuf>) -> Self {
        Self { cli_arg }
    }

    /// Returns the first existing candidate, or `None` when no file is present.
    ///
    /// Explicit paths (CLI or environment) are returned even if missing so
    /// that the load step can report the bad path instead of silently
    /// falling through to a different file.
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_arg {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        self.default_candidates().into_iter().find(|p| p.exists())
    }

    fn default_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("mvsense").join("config.toml"));
        }
        if cfg!(unix) {
            candidates.push(PathBuf::from("/etc/mvsense/config.toml"));
        }
        candidates.push(PathBuf::from(LOCAL_CONFIG_FILE));
        candidates
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve and load the config file; a missing file yields defaults
///
/// Returns the path that was loaded so the caller can report it once logging
/// is up. A file that exists but cannot be parsed is an error, since silently
/// ignoring it would hide credentials the operator believes are configured.
pub fn load_or_default(resolver: &ConfigFileResolver) -> Result<(TomlConfig, Option<PathBuf>)> {
    match resolver.resolve() {
        Some(path) => {
            let config = load_toml_config(&path)?;
            Ok((config, Some(path)))
        }
        None => Ok((TomlConfig::default(), None)),
    }
}
