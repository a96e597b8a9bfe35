//! Prelude module for common re-exports.
//!
//! ```rust
//! use pump_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, ControllerConfig, CoordinatorConfig, LogLevel, SharedConfig,
    TimingConfig,
};

// ─── Hardware lines ─────────────────────────────────────────────────
pub use crate::hal::config::LinesConfig;
pub use crate::hal::driver::{DriverFactory, LineDriver, LineError, LineId};

// ─── Protocol ───────────────────────────────────────────────────────
pub use crate::protocol::{Command, Outbound};
