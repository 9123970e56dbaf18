//! Settings resolution tests (ENV → TOML)
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.

use mvsense_ai::config::{
    resolve_settings, ENV_AWS_ACCESS_KEY_ID, ENV_AWS_REGION, ENV_AWS_SECRET_ACCESS_KEY,
    ENV_AWS_SESSION_TOKEN, ENV_BROKER_HOST, ENV_MERAKI_API_KEY, ENV_MV_SERIAL, ENV_NETWORK_ID,
};
use mvsense_ai::error::PipelineError;
use mvsense_common::config::TomlConfig;
use serial_test::serial;
use std::env;
use std::time::Duration;

const ALL_ENV: [&str; 8] = [
    ENV_MERAKI_API_KEY,
    ENV_NETWORK_ID,
    ENV_MV_SERIAL,
    ENV_BROKER_HOST,
    ENV_AWS_ACCESS_KEY_ID,
    ENV_AWS_SECRET_ACCESS_KEY,
    ENV_AWS_SESSION_TOKEN,
    ENV_AWS_REGION,
];

fn clear_env() {
    for var in ALL_ENV {
        env::remove_var(var);
    }
}

fn complete_toml() -> TomlConfig {
    toml::from_str(
        r#"
        [meraki]
        api_key = "toml-meraki-key"
        network_id = "N_42"

        [sense]
        serial = "Q2GV-AAAA-0001"

        [server]
        ip = "broker.local"

        [aws]
        access_key_id = "AKIDTOML"
        secret_access_key = "toml-secret"

        [pipeline]
        probe_delay_ms = 250
        "#,
    )
    .unwrap()
}

#[test]
#[serial]
fn test_complete_toml_resolves_with_defaults() {
    clear_env();

    let settings = resolve_settings(&complete_toml()).unwrap();

    assert_eq!(settings.meraki.api_key, "toml-meraki-key");
    assert_eq!(settings.meraki.network_id, "N_42");
    assert_eq!(settings.meraki.base_url, "https://api.meraki.com/api/v0");
    assert_eq!(settings.serial, "Q2GV-AAAA-0001");
    assert_eq!(settings.broker.host, "broker.local");
    assert_eq!(settings.broker.port, 1883);
    assert_eq!(settings.broker.keep_alive, Duration::from_secs(100));
    assert_eq!(settings.aws.region, "us-east-1");
    assert!(settings.aws.credentials.session_token.is_none());
    assert!(settings.aws.endpoint.is_none());
    assert_eq!(settings.pipeline.probe_delay, Duration::from_millis(250));
    assert_eq!(settings.pipeline.probe_max_attempts, 30);
}

#[test]
#[serial]
fn test_environment_overrides_toml() {
    clear_env();
    env::set_var(ENV_MERAKI_API_KEY, "env-meraki-key");
    env::set_var(ENV_AWS_REGION, "ap-southeast-2");
    env::set_var(ENV_AWS_SESSION_TOKEN, "session");

    let settings = resolve_settings(&complete_toml()).unwrap();

    assert_eq!(settings.meraki.api_key, "env-meraki-key");
    assert_eq!(settings.aws.region, "ap-southeast-2");
    assert_eq!(settings.aws.credentials.session_token.as_deref(), Some("session"));
    // Untouched keys still come from TOML
    assert_eq!(settings.meraki.network_id, "N_42");

    clear_env();
}

#[test]
#[serial]
fn test_environment_alone_is_sufficient() {
    clear_env();
    env::set_var(ENV_MERAKI_API_KEY, "k");
    env::set_var(ENV_NETWORK_ID, "N_1");
    env::set_var(ENV_MV_SERIAL, "Q2GV-ENV");
    env::set_var(ENV_BROKER_HOST, "10.0.0.5");
    env::set_var(ENV_AWS_ACCESS_KEY_ID, "AKID");
    env::set_var(ENV_AWS_SECRET_ACCESS_KEY, "secret");

    let settings = resolve_settings(&TomlConfig::default()).unwrap();

    assert_eq!(settings.serial, "Q2GV-ENV");
    assert_eq!(settings.broker.host, "10.0.0.5");

    clear_env();
}

#[test]
#[serial]
fn test_all_missing_keys_reported_together() {
    clear_env();

    let err = resolve_settings(&TomlConfig::default()).unwrap_err();

    match err {
        PipelineError::ConfigurationMissing(message) => {
            for key in [
                "meraki.api_key",
                "meraki.network_id",
                "sense.serial",
                "server.ip",
                "aws.access_key_id",
                "aws.secret_access_key",
            ] {
                assert!(message.contains(key), "{} not in {}", key, message);
            }
        }
        other => panic!("expected ConfigurationMissing, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_blank_values_count_as_missing() {
    clear_env();
    env::set_var(ENV_MERAKI_API_KEY, "   ");
    let mut config = complete_toml();
    config.meraki.api_key = Some(String::new());

    let err = resolve_settings(&config).unwrap_err();

    assert!(matches!(err, PipelineError::ConfigurationMissing(ref m) if m.contains("meraki.api_key")));
    clear_env();
}

#[test]
#[serial]
fn test_zero_probe_attempts_rejected() {
    clear_env();
    let mut config = complete_toml();
    config.pipeline.probe_max_attempts = 0;

    assert!(matches!(
        resolve_settings(&config),
        Err(PipelineError::ConfigurationMissing(_))
    ));
}
