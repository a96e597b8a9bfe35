//! Configuration loading traits and types.
//!
//! The controller reads one TOML file. Every section and key is optional;
//! an empty file (or no file at all) yields the device defaults from
//! [`crate::consts`].
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! log_level = "debug"
//! service_name = "pump-station-1"
//!
//! [coordinator]
//! host = "192.168.0.37"
//! port = 8888
//!
//! [lines]
//! driver = "cdev"
//! pump_offset = 20
//! vent_offset = 21
//!
//! [timing]
//! tick_ms = 1000
//! heartbeat_ticks = 10
//! ```

use crate::consts::{
    CONNECT_TIMEOUT_MS, DEFAULT_COORDINATOR_HOST, DEFAULT_COORDINATOR_PORT, HEARTBEAT_TICKS,
    MAX_TICK_MS, PUMP_STOP_SETTLE_MS, RETRY_BACKOFF_MS, TICK_MS, VENT_CLOSE_SETTLE_MS,
    VENT_OPEN_MS,
};
use crate::hal::config::LinesConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Common fields shared by the workspace binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SharedConfig {
    /// Logging verbosity level.
    pub log_level: LogLevel,

    /// Instance identifier, included in the startup log.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "pump_control".to_string(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// `[coordinator]` section: the fixed remote endpoint and retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Coordinator IP address.
    pub host: IpAddr,
    /// Coordinator TCP port.
    pub port: u16,
    /// Bound on a single connect attempt.
    pub connect_timeout_ms: u64,
    /// Pause between failed attempts.
    pub retry_backoff_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(DEFAULT_COORDINATOR_HOST),
            port: DEFAULT_COORDINATOR_PORT,
            connect_timeout_ms: CONNECT_TIMEOUT_MS,
            retry_backoff_ms: RETRY_BACKOFF_MS,
        }
    }
}

impl CoordinatorConfig {
    /// Endpoint to connect to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Retry backoff as a `Duration`.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// `[timing]` section: loop tick, heartbeat period and vent sequence delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Readiness wait bound; one heartbeat tick.
    pub tick_ms: u64,
    /// Idle ticks between heartbeats.
    pub heartbeat_ticks: u32,
    /// Pump off → vent open.
    pub pump_stop_settle_ms: u64,
    /// Vent open duration.
    pub vent_open_ms: u64,
    /// Vent closed → sequence done.
    pub vent_close_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            heartbeat_ticks: HEARTBEAT_TICKS,
            pump_stop_settle_ms: PUMP_STOP_SETTLE_MS,
            vent_open_ms: VENT_OPEN_MS,
            vent_close_settle_ms: VENT_CLOSE_SETTLE_MS,
        }
    }
}

impl TimingConfig {
    /// Tick as a `Duration`.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Complete controller configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Common fields.
    pub shared: SharedConfig,
    /// Remote endpoint.
    pub coordinator: CoordinatorConfig,
    /// Valve wiring.
    pub lines: LinesConfig,
    /// Loop and sequence timing.
    pub timing: TimingConfig,
}

impl ControllerConfig {
    /// Load and validate a controller configuration file.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all sections.
    ///
    /// # Validation Rules
    /// 1. `shared.service_name` not empty
    /// 2. `coordinator.port` > 0, `connect_timeout_ms` > 0, `retry_backoff_ms` > 0
    /// 3. `timing.tick_ms` in 1..=65535, `heartbeat_ticks` > 0
    /// 4. `[lines]` rules (see [`LinesConfig::validate`])
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.coordinator.port == 0 {
            return Err(ConfigError::ValidationError(
                "coordinator.port must be greater than 0".to_string(),
            ));
        }
        if self.coordinator.connect_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "coordinator.connect_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.coordinator.retry_backoff_ms == 0 {
            return Err(ConfigError::ValidationError(
                "coordinator.retry_backoff_ms must be greater than 0".to_string(),
            ));
        }
        if self.timing.tick_ms == 0 || self.timing.tick_ms > MAX_TICK_MS {
            return Err(ConfigError::ValidationError(format!(
                "timing.tick_ms must be in 1..={} (got {})",
                MAX_TICK_MS, self.timing.tick_ms
            )));
        }
        if self.timing.heartbeat_ticks == 0 {
            return Err(ConfigError::ValidationError(
                "timing.heartbeat_ticks must be greater than 0".to_string(),
            ));
        }

        self.lines.validate()
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Any serde-deserializable struct can be loaded.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
