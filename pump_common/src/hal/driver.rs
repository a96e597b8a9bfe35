//! Line driver trait and error types.
//!
//! This module defines:
//! - `LineDriver` trait - Interface for pluggable GPIO bindings
//! - `LineError` enum - Error types for line operations
//! - `LineId` enum - The two valve outputs
//! - `DriverFactory` type alias - Factory function type

use crate::hal::config::LinesConfig;
use std::fmt;
use thiserror::Error;

/// One of the two valve outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineId {
    /// Main solenoid (delivery) valve.
    Pump,
    /// Vent/bleed valve.
    Vent,
}

impl LineId {
    /// Both lines, in request order.
    pub const ALL: [LineId; 2] = [LineId::Pump, LineId::Vent];

    /// Short lowercase name used in logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            LineId::Pump => "pump",
            LineId::Vent => "vent",
        }
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error types for line operations.
#[derive(Debug, Clone, Error)]
pub enum LineError {
    /// The GPIO chip could not be opened.
    #[error("Failed to open chip {chip}: {reason}")]
    ChipUnavailable {
        /// Chip name or path
        chip: String,
        /// OS error text
        reason: String,
    },

    /// Acquiring a line as output failed.
    #[error("Line request failed for {line}: {reason}")]
    RequestFailed {
        /// Line being requested
        line: LineId,
        /// OS error text
        reason: String,
    },

    /// The hardware rejected a value write.
    #[error("Write to {line} line failed: {reason}")]
    WriteFailed {
        /// Line being written
        line: LineId,
        /// OS error text
        reason: String,
    },

    /// Line used before `request()` or after `release()`.
    #[error("{0} line is not requested")]
    NotRequested(LineId),

    /// Releasing the lines failed.
    #[error("Release failed: {0}")]
    ReleaseFailed(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn LineDriver>;

/// Trait defining the interface for line drivers.
///
/// The controller only ever talks to hardware through this trait, so the
/// low-level binding (character device, sysfs, simulation) is pluggable.
///
/// # Lifecycle
///
/// 1. `request()` - Called once at startup; failure is fatal
/// 2. `set_value()` - Called for every actuation
/// 3. `release()` - Called on every exit path
///
/// Values are logical: `true` means the valve is asserted. Drivers apply
/// the configured polarity (`LinesConfig::active_low`) themselves.
pub trait LineDriver: Send {
    /// Returns the driver's unique identifier (e.g., "cdev", "simulation").
    fn name(&self) -> &'static str;

    /// Acquire both lines as outputs, initially deasserted.
    ///
    /// # Errors
    /// Return `LineError::ChipUnavailable` or `LineError::RequestFailed`
    /// if either line cannot be acquired. Lines acquired before the failure
    /// must be released again.
    fn request(&mut self, config: &LinesConfig) -> Result<(), LineError>;

    /// Drive one line to a logical value.
    ///
    /// # Errors
    /// Return `LineError::WriteFailed` if the hardware rejects the write,
    /// `LineError::NotRequested` if the line is not held.
    fn set_value(&mut self, line: LineId, asserted: bool) -> Result<(), LineError>;

    /// Release all held lines. Calling it twice is a no-op.
    fn release(&mut self) -> Result<(), LineError>;

    /// Whether the lines are currently held.
    fn is_requested(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_error_display() {
        let err = LineError::WriteFailed {
            line: LineId::Vent,
            reason: "EIO".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("vent"));
        assert!(text.contains("EIO"));

        let err = LineError::DriverNotFound("gpiod2".to_string());
        assert!(err.to_string().contains("gpiod2"));

        let err = LineError::NotRequested(LineId::Pump);
        assert_eq!(err.to_string(), "pump line is not requested");
    }

    #[test]
    fn test_line_names() {
        assert_eq!(LineId::Pump.to_string(), "pump");
        assert_eq!(LineId::Vent.to_string(), "vent");
        assert_eq!(LineId::ALL, [LineId::Pump, LineId::Vent]);
    }
}
