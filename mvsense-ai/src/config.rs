//! Settings resolution for mvsense-ai
//!
//! Provides two-tier resolution per value with ENV → TOML priority. All
//! required values are checked up front so the operator sees every missing
//! key at once instead of one per restart.

use crate::error::{PipelineError, PipelineResult};
use crate::utils::sigv4::AwsCredentials;
use mvsense_common::config::TomlConfig;
use std::time::Duration;
use tracing::{info, warn};

pub const ENV_MERAKI_API_KEY: &str = "MVSENSE_MERAKI_API_KEY";
pub const ENV_NETWORK_ID: &str = "MVSENSE_NETWORK_ID";
pub const ENV_MV_SERIAL: &str = "MVSENSE_MV_SERIAL";
pub const ENV_BROKER_HOST: &str = "MVSENSE_BROKER_HOST";
pub const ENV_AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const ENV_AWS_REGION: &str = "AWS_REGION";

const DEFAULT_MERAKI_BASE_URL: &str = "https://api.meraki.com/api/v0";
const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Camera API settings
#[derive(Debug, Clone)]
pub struct MerakiSettings {
    pub api_key: String,
    pub network_id: String,
    pub base_url: String,
}

/// MQTT broker settings
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
}

/// Recognition service settings
#[derive(Debug, Clone)]
pub struct AwsSettings {
    pub region: String,
    pub credentials: AwsCredentials,
    pub endpoint: Option<String>,
}

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub probe_max_attempts: u32,
    pub probe_delay: Duration,
    pub recognition_timeout: Duration,
    pub max_labels: u32,
    pub min_label_confidence: f64,
    pub word_cloud_base_url: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let section = mvsense_common::config::PipelineSection::default();
        Self::from_section(&section)
    }
}

impl PipelineSettings {
    fn from_section(section: &mvsense_common::config::PipelineSection) -> Self {
        Self {
            probe_max_attempts: section.probe_max_attempts,
            probe_delay: Duration::from_millis(section.probe_delay_ms),
            recognition_timeout: Duration::from_secs(section.recognition_timeout_secs),
            max_labels: section.max_labels,
            min_label_confidence: section.min_label_confidence,
            word_cloud_base_url: section.word_cloud_base_url.clone(),
        }
    }
}

/// Fully validated runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub meraki: MerakiSettings,
    /// Serial of the camera that triggers runs and gets analysed
    pub serial: String,
    pub broker: BrokerSettings,
    pub aws: AwsSettings,
    pub pipeline: PipelineSettings,
}

/// Resolve all settings from environment and TOML
///
/// **Priority:** ENV → TOML → built-in default (optional values only)
pub fn resolve_settings(toml_config: &TomlConfig) -> PipelineResult<Settings> {
    let mut missing = Vec::new();

    let mut require = |name: &'static str, env_var: &'static str, toml_value: Option<&String>| {
        let value = resolve_value(name, env_var, toml_value);
        if value.is_none() {
            missing.push(format!("{} (env {})", name, env_var));
        }
        value.unwrap_or_default()
    };

    let api_key = require("meraki.api_key", ENV_MERAKI_API_KEY, toml_config.meraki.api_key.as_ref());
    let network_id = require(
        "meraki.network_id",
        ENV_NETWORK_ID,
        toml_config.meraki.network_id.as_ref(),
    );
    let serial = require("sense.serial", ENV_MV_SERIAL, toml_config.sense.serial.as_ref());
    let host = require("server.ip", ENV_BROKER_HOST, toml_config.server.ip.as_ref());
    let access_key_id = require(
        "aws.access_key_id",
        ENV_AWS_ACCESS_KEY_ID,
        toml_config.aws.access_key_id.as_ref(),
    );
    let secret_access_key = require(
        "aws.secret_access_key",
        ENV_AWS_SECRET_ACCESS_KEY,
        toml_config.aws.secret_access_key.as_ref(),
    );

    if !missing.is_empty() {
        return Err(PipelineError::ConfigurationMissing(format!(
            "missing {}. Configure using one of:\n\
             1. Environment variables listed above\n\
             2. TOML config: ~/.config/mvsense/config.toml, /etc/mvsense/config.toml \
             or ./credentials.toml (or pass --config)",
            missing.join(", ")
        )));
    }

    let session_token = resolve_value(
        "aws.session_token",
        ENV_AWS_SESSION_TOKEN,
        toml_config.aws.session_token.as_ref(),
    );
    let region = resolve_value("aws.region", ENV_AWS_REGION, toml_config.aws.region.as_ref())
        .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());

    let pipeline = PipelineSettings::from_section(&toml_config.pipeline);
    if pipeline.probe_max_attempts == 0 {
        return Err(PipelineError::ConfigurationMissing(
            "pipeline.probe_max_attempts must be at least 1".to_string(),
        ));
    }

    Ok(Settings {
        meraki: MerakiSettings {
            api_key,
            network_id,
            base_url: toml_config
                .meraki
                .base_url
                .clone()
                .filter(|url| is_valid_key(url))
                .unwrap_or_else(|| DEFAULT_MERAKI_BASE_URL.to_string()),
        },
        serial,
        broker: BrokerSettings {
            host,
            port: toml_config.server.port,
            keep_alive: Duration::from_secs(toml_config.server.keep_alive_secs),
        },
        aws: AwsSettings {
            region,
            credentials: AwsCredentials {
                access_key_id,
                secret_access_key,
                session_token,
            },
            endpoint: toml_config.aws.endpoint.clone().filter(|e| is_valid_key(e)),
        },
        pipeline,
    })
}

/// Pick the environment value if valid, else the TOML value if valid
fn resolve_value(name: &str, env_var: &str, toml_value: Option<&String>) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v)).cloned();

    match (env_value, toml_value) {
        (Some(env), Some(_)) => {
            warn!(
                "{} found in both environment ({}) and TOML. Using environment.",
                name, env_var
            );
            Some(env)
        }
        (Some(env), None) => {
            info!("{} loaded from environment variable", name);
            Some(env)
        }
        (None, Some(toml)) => {
            info!("{} loaded from TOML config", name);
            Some(toml)
        }
        (None, None) => None,
    }
}

/// Validate a configured value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
