// Unit tests for bridge configuration loading, saving and overrides

use crate::DEFAULT_IPC_PORT;
use crate::config::{BridgeConfig, ENV_AUTH_TOKEN, ENV_IPC_PORT};
use crate::error::config::ConfigError;
use crate::page::PageSettings;
use crate::rpc::RpcClientConfig;

use serial_test::serial;
use tempfile::TempDir;

use std::time::Duration;

#[test]
fn given_defaults_when_validated_then_ok_and_match_documented_values() {
    let config = BridgeConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.ipc.port, DEFAULT_IPC_PORT);
    assert_eq!(config.confirmation.timeout(), Duration::from_secs(120));
    assert_eq!(RpcClientConfig::from(&config.rpc), RpcClientConfig::default());
    assert_eq!(PageSettings::from(&config.page), PageSettings::default());
}

#[test]
fn given_missing_file_when_loading_then_defaults_returned() {
    let temp_dir = TempDir::new().expect("temp dir");

    let config = BridgeConfig::load(temp_dir.path()).expect("load");

    assert_eq!(config, BridgeConfig::default());
}

#[test]
fn given_saved_config_when_loaded_then_values_preserved() {
    // GIVEN: A customised config saved to disk
    let temp_dir = TempDir::new().expect("temp dir");
    let mut config = BridgeConfig::default();
    config.ipc.port = 0;
    config.ipc.auth_token = Some("secret-token".to_string());
    config.rpc.request_timeout_ms = Some(2_500);
    config.confirmation.timeout_secs = 30;
    config.save(temp_dir.path()).expect("save");

    // WHEN: It is loaded back
    let loaded = BridgeConfig::load(temp_dir.path()).expect("load");

    // THEN: Nothing was lost and no temp file was left behind
    assert_eq!(loaded, config);
    assert!(!temp_dir.path().join("config.json.tmp").exists());
    assert_eq!(
        RpcClientConfig::from(&loaded.rpc).request_timeout,
        Some(Duration::from_millis(2_500))
    );
}

#[test]
fn given_partial_file_when_loading_then_missing_sections_defaulted() {
    let temp_dir = TempDir::new().expect("temp dir");
    std::fs::write(
        temp_dir.path().join("config.json"),
        r#"{ "ipc": { "port": 20000 } }"#,
    )
    .expect("write");

    let config = BridgeConfig::load(temp_dir.path()).expect("load");

    assert_eq!(config.ipc.port, 20_000);
    assert_eq!(config.rpc.reconnect_delay_ms, 1_000);
    assert_eq!(config.page.fast_probe_attempts, 5);
}

#[test]
fn given_corrupt_file_when_loading_then_parse_error() {
    let temp_dir = TempDir::new().expect("temp dir");
    std::fs::write(temp_dir.path().join("config.json"), "{ not json").expect("write");

    let error = BridgeConfig::load(temp_dir.path()).unwrap_err();

    assert!(matches!(error, ConfigError::ParseError { .. }));
}

#[test]
fn given_future_version_when_validated_then_rejected() {
    let config = BridgeConfig {
        version: 99,
        ..BridgeConfig::default()
    };

    let error = config.validate().unwrap_err();

    assert!(matches!(error, ConfigError::ValidationError { .. }));
}

#[test]
fn given_max_delay_below_delay_when_validated_then_rejected() {
    let mut config = BridgeConfig::default();
    config.rpc.reconnect_delay_ms = 5_000;
    config.rpc.reconnect_max_delay_ms = 1_000;

    assert!(config.validate().is_err());
}

/// **VALUE**: Poll intervals of zero never reach the page poller.
///
/// **BUG THIS CATCHES**: A zero interval turning the availability or permission
/// poll into a busy loop against the wallet.
#[test]
fn given_zero_poll_interval_when_validated_then_rejected_naming_field() {
    let cases: [(&str, fn(&mut BridgeConfig)); 3] = [
        ("page.available_poll_secs", |config| config.page.available_poll_secs = 0),
        ("page.unavailable_poll_secs", |config| config.page.unavailable_poll_secs = 0),
        ("page.permission_poll_secs", |config| config.page.permission_poll_secs = 0),
    ];

    for (field, zero_out) in cases {
        let mut config = BridgeConfig::default();
        zero_out(&mut config);

        let error = config.validate().unwrap_err();

        match error {
            ConfigError::ValidationError { reason, .. } => assert!(reason.contains(field), "{reason}"),
            other => panic!("expected validation error for {field}, got {other:?}"),
        }
    }
}

#[test]
fn given_fast_probe_attempts_out_of_range_when_validated_then_rejected() {
    for attempts in [0, 101, u32::MAX] {
        let mut config = BridgeConfig::default();
        config.page.fast_probe_attempts = attempts;

        assert!(config.validate().is_err(), "{attempts} accepted");
    }

    let mut config = BridgeConfig::default();
    config.page.fast_probe_attempts = 100;
    assert!(config.validate().is_ok());
}

#[test]
fn given_port_and_token_overrides_when_applied_then_take_precedence() {
    let mut config = BridgeConfig::default();

    config
        .apply_overrides(Some(" 21000 ".to_string()), Some("from-env".to_string()))
        .expect("overrides");

    assert_eq!(config.ipc.port, 21_000);
    assert_eq!(config.ipc.auth_token.as_deref(), Some("from-env"));
}

#[test]
fn given_invalid_port_override_when_applied_then_environment_error_names_variable() {
    let mut config = BridgeConfig::default();

    let error = config
        .apply_overrides(Some("not-a-port".to_string()), None)
        .unwrap_err();

    match error {
        ConfigError::EnvironmentError { variable, .. } => assert_eq!(variable, ENV_IPC_PORT),
        other => panic!("expected EnvironmentError, got {other:?}"),
    }
    assert_eq!(config.ipc.port, DEFAULT_IPC_PORT);
}

#[test]
fn given_empty_token_override_when_applied_then_rejected() {
    let mut config = BridgeConfig::default();

    let error = config.apply_overrides(None, Some(String::new())).unwrap_err();

    assert!(matches!(error, ConfigError::EnvironmentError { .. }));
    assert!(config.ipc.auth_token.is_none());
}

#[test]
#[serial]
fn given_environment_variables_when_overrides_applied_then_read_from_process_env() {
    // GIVEN: Port and token set in the process environment
    // SAFETY: serialized with every other test touching these variables
    unsafe {
        std::env::set_var(ENV_IPC_PORT, "22000");
        std::env::set_var(ENV_AUTH_TOKEN, "env-token");
    }
    let mut config = BridgeConfig::default();

    // WHEN: Overrides are applied
    let result = config.apply_env_overrides();
    unsafe {
        std::env::remove_var(ENV_IPC_PORT);
        std::env::remove_var(ENV_AUTH_TOKEN);
    }

    // THEN: Both values came from the environment
    result.expect("overrides");
    assert_eq!(config.ipc.port, 22_000);
    assert_eq!(config.ipc.auth_token.as_deref(), Some("env-token"));
}

#[test]
#[serial]
fn given_no_environment_variables_when_overrides_applied_then_config_unchanged() {
    unsafe {
        std::env::remove_var(ENV_IPC_PORT);
        std::env::remove_var(ENV_AUTH_TOKEN);
    }
    let mut config = BridgeConfig::default();

    config.apply_env_overrides().expect("overrides");

    assert_eq!(config, BridgeConfig::default());
}
