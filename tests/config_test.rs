//! Tests for configuration loading, validation, and CLI merging

use std::io::Write;
use std::time::Duration;

use chatrelay::config::{Config, ConfigManager};

#[test]
fn default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.server.bind_addr.port(), 5002);
    assert_eq!(config.upstream.addr.port(), 6000);
}

#[test]
fn config_loads_from_toml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[server]
bind_addr = "127.0.0.1:7002"
max_connections = 64
shutdown_timeout = "10s"

[upstream]
addr = "127.0.0.1:7600"
connect_timeout = "2s"
response_timeout = "3s"

[client]
server_addr = "127.0.0.1:7002"
response_timeout = "8s"

[monitoring]
log_level = "debug"
"#
    )
    .unwrap();

    let config = ConfigManager::load_from_file(file.path()).unwrap();
    assert_eq!(config.server.bind_addr, "127.0.0.1:7002".parse().unwrap());
    assert_eq!(config.server.max_connections, 64);
    assert_eq!(config.server.shutdown_timeout, Duration::from_secs(10));
    assert_eq!(config.upstream.addr, "127.0.0.1:7600".parse().unwrap());
    assert_eq!(config.upstream.connect_timeout, Duration::from_secs(2));
    assert_eq!(config.upstream.response_timeout, Duration::from_secs(3));
    assert_eq!(config.client.response_timeout, Duration::from_secs(8));
    assert_eq!(config.monitoring.log_level, "debug");
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let config = ConfigManager::load_from_file(&path).unwrap();
    assert_eq!(config.server.bind_addr, Config::default().server.bind_addr);
}

#[test]
fn invalid_toml_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not valid toml [[[").unwrap();

    assert!(ConfigManager::load_from_file(file.path()).is_err());
}

#[test]
fn zero_max_connections_is_rejected() {
    let mut config = Config::default();
    config.server.max_connections = 0;
    assert!(config.validate().is_err());
}

#[test]
fn upstream_equal_to_bind_addr_is_rejected() {
    let mut config = Config::default();
    config.upstream.addr = config.server.bind_addr;
    assert!(config.validate().is_err());
}

#[test]
fn zero_response_timeout_is_rejected() {
    let mut config = Config::default();
    config.upstream.response_timeout = Duration::from_secs(0);
    assert!(config.validate().is_err());
}

#[test]
fn unknown_log_level_is_rejected() {
    let mut config = Config::default();
    config.monitoring.log_level = "loud".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn cli_args_override_config_values() {
    let mut config = Config::default();
    config.merge_with_cli_args(
        Some("0.0.0.0:9100"),
        Some(9200),
        Some("127.0.0.1:9600"),
        Some(5),
        Some(7),
    );

    assert_eq!(config.server.bind_addr.ip().to_string(), "0.0.0.0");
    assert_eq!(config.server.bind_addr.port(), 9200);
    assert_eq!(config.upstream.addr, "127.0.0.1:9600".parse().unwrap());
    assert_eq!(config.server.max_connections, 5);
    assert_eq!(config.upstream.response_timeout, Duration::from_secs(7));
}

#[test]
fn invalid_cli_bind_addr_is_ignored() {
    let mut config = Config::default();
    let original = config.server.bind_addr;
    config.merge_with_cli_args(Some("not-an-address"), None, None, None, None);
    assert_eq!(config.server.bind_addr, original);
}

#[test]
fn env_vars_override_defaults() {
    std::env::set_var("CHATRELAY_BIND_ADDR", "127.0.0.1:8002");
    std::env::set_var("CHATRELAY_MAX_CONNECTIONS", "12");
    std::env::set_var("CHATRELAY_RESPONSE_TIMEOUT", "9s");

    let config = ConfigManager::load_from_env().unwrap();

    std::env::remove_var("CHATRELAY_BIND_ADDR");
    std::env::remove_var("CHATRELAY_MAX_CONNECTIONS");
    std::env::remove_var("CHATRELAY_RESPONSE_TIMEOUT");

    assert_eq!(config.server.bind_addr, "127.0.0.1:8002".parse().unwrap());
    assert_eq!(config.server.max_connections, 12);
    assert_eq!(config.upstream.response_timeout, Duration::from_secs(9));
}
