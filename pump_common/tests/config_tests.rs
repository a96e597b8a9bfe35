//! Config file loading tests.
//!
//! Tests for `ControllerConfig::load_validated()`: missing file, parse
//! errors, unknown fields rejection, partial sections, semantic validation.

use pump_common::config::{ConfigError, ControllerConfig, LogLevel};
use pump_common::hal::driver::LineId;
use std::fs;
use std::net::SocketAddr;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("pump.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_missing_file() {
    let result = ControllerConfig::load_validated(std::path::Path::new("/nonexistent/pump.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound)));
}

#[test]
fn test_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[coordinator\nport = 1");
    let result = ControllerConfig::load_validated(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_unknown_field_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[coordinator]
hostname = "10.0.0.1"
"#,
    );
    let result = ControllerConfig::load_validated(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_full_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[shared]
log_level = "debug"
service_name = "station-a"

[coordinator]
host = "10.1.2.3"
port = 9000
connect_timeout_ms = 2000
retry_backoff_ms = 3000

[lines]
driver = "sysfs"
chip = "gpiochip4"
pump_offset = 5
vent_offset = 6
active_low = false
sysfs_base = 512

[timing]
tick_ms = 500
heartbeat_ticks = 4
vent_open_ms = 1500
"#,
    );

    let config = ControllerConfig::load_validated(&path).unwrap();
    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert_eq!(config.shared.service_name, "station-a");
    assert_eq!(
        config.coordinator.socket_addr(),
        "10.1.2.3:9000".parse::<SocketAddr>().unwrap()
    );
    assert_eq!(config.coordinator.connect_timeout_ms, 2000);
    assert_eq!(config.lines.driver, "sysfs");
    assert_eq!(config.lines.chip_path(), "/dev/gpiochip4");
    assert_eq!(config.lines.offset(LineId::Vent), 6);
    assert!(!config.lines.active_low);
    assert_eq!(config.lines.sysfs_base, 512);
    assert_eq!(config.timing.tick_ms, 500);
    assert_eq!(config.timing.heartbeat_ticks, 4);
    assert_eq!(config.timing.vent_open_ms, 1500);
    // Untouched keys keep their defaults.
    assert_eq!(config.timing.pump_stop_settle_ms, 50);
    assert_eq!(config.lines.pump_consumer, "pump_kb_pump");
}

#[test]
fn test_validation_runs_after_parse() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[lines]
pump_offset = 7
vent_offset = 7
"#,
    );
    let result = ControllerConfig::load_validated(&path);
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_invalid_host_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[coordinator]
host = "coordinator.local"
"#,
    );
    let result = ControllerConfig::load_validated(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_shipped_example_matches_defaults() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/pump.toml");
    let config = ControllerConfig::load_validated(&path).unwrap();
    let defaults = ControllerConfig::default();

    assert_eq!(config.coordinator, defaults.coordinator);
    assert_eq!(config.timing, defaults.timing);
    assert_eq!(config.lines, defaults.lines);
    assert_eq!(config.shared.log_level, LogLevel::Info);
    assert_eq!(config.shared.service_name, defaults.shared.service_name);
}
