//! Unit tests for configuration loading and graceful degradation
//!
//! Note: Uses serial_test to prevent ENV variable race conditions. Tests
//! that manipulate DISPATCH_CONFIG are marked with #[serial] so they run
//! sequentially, not in parallel.

use dispatch_common::config::{resolve_config_path, DispatchConfig, CONFIG_ENV_VAR};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

#[test]
fn defaults_are_usable_without_any_file() {
    let config = DispatchConfig::default();

    assert_eq!(config.broker.host, "localhost");
    assert_eq!(config.broker.port, 1883);
    assert_eq!(config.broker.client_id, "dispatch-hub");
    assert!(config.broker.username.is_none());
    assert_eq!(config.http.port, 5790);
    assert!(config.drivers.url.is_none());
    assert_eq!(config.geocode.country_codes, "vn");
    assert_eq!(config.geocode.limit, 5);
}

#[test]
fn partial_toml_falls_back_per_field() {
    let config = DispatchConfig::from_toml_str(
        r#"
        [broker]
        host = "broker.example.com"
        username = "operator"
        password = "secret"

        [drivers]
        url = "http://fleet.example.com/drivers"
        "#,
    )
    .unwrap();

    assert_eq!(config.broker.host, "broker.example.com");
    assert_eq!(config.broker.username.as_deref(), Some("operator"));
    // Unspecified fields keep their defaults
    assert_eq!(config.broker.port, 1883);
    assert_eq!(config.http.port, 5790);
    assert_eq!(
        config.drivers.url.as_deref(),
        Some("http://fleet.example.com/drivers")
    );
}

#[test]
fn invalid_toml_is_an_error_from_the_parser() {
    let result = DispatchConfig::from_toml_str("[broker\nhost = ");
    assert!(result.is_err());
}

#[test]
#[serial]
fn load_with_broken_file_degrades_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not valid toml [[[").unwrap();

    let config = DispatchConfig::load(Some(file.path()));
    assert_eq!(config.broker.host, "localhost");
    assert_eq!(config.http.port, 5790);
}

#[test]
#[serial]
fn cli_argument_takes_priority_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/nonexistent/from-env.toml");

    let cli = PathBuf::from("/nonexistent/from-cli.toml");
    let resolved = resolve_config_path(Some(&cli));
    assert_eq!(resolved, Some(cli));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn env_variable_is_used_when_no_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/nonexistent/from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/nonexistent/from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn valid_file_loads_through_the_full_path() {
    env::remove_var(CONFIG_ENV_VAR);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "[http]\nport = 8080\n\n[geocode]\ncountry_codes = \"de\"\n"
    )
    .unwrap();

    let config = DispatchConfig::load(Some(file.path()));
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.geocode.country_codes, "de");
    // Untouched sections keep defaults
    assert_eq!(config.broker.port, 1883);
}
