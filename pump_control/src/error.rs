//! Controller startup and runtime errors.
//!
//! Everything here is fatal: the binary logs it and exits with status 1.
//! Recoverable conditions (transport faults, actuator write failures) are
//! handled in place and never surface as a `ControllerError`.

use crate::connection::ConnectError;
use pump_common::config::ConfigError;
use pump_common::hal::driver::LineError;
use thiserror::Error;

/// Fatal controller errors.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Valve lines could not be acquired.
    #[error("Line error: {0}")]
    Line(#[from] LineError),

    /// The coordinator link could not be set up.
    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    /// The interrupt handler could not be installed.
    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),
}
