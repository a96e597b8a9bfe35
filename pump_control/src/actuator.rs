//! Actuator driver: the two valve outputs behind one capability.
//!
//! Callers speak in asserted/deasserted terms. The active-low wiring is
//! applied when the lines are requested (see `LinesConfig::active_low`),
//! so an asserted valve drives its pin low.
//!
//! Writes are not retried. A failed write is logged and returned to the
//! caller; the process keeps running.

use pump_common::hal::config::LinesConfig;
use pump_common::hal::driver::{LineDriver, LineError, LineId};
use tracing::{error, info};

/// Owned pair of requested valve lines.
pub struct Actuators {
    driver: Box<dyn LineDriver>,
}

impl Actuators {
    /// Request both lines through `driver`.
    ///
    /// # Errors
    /// Any request failure. This is fatal at startup.
    pub fn acquire(mut driver: Box<dyn LineDriver>, config: &LinesConfig) -> Result<Self, LineError> {
        info!(
            "Acquiring valve lines via '{}' driver (pump={}, vent={})",
            driver.name(),
            config.pump_offset,
            config.vent_offset
        );
        driver.request(config)?;
        Ok(Self { driver })
    }

    /// Drive one valve.
    pub fn set_line(&mut self, line: LineId, asserted: bool) -> Result<(), LineError> {
        self.driver.set_value(line, asserted).inspect_err(|e| {
            error!(
                "Actuator write failed ({} -> {}): {}",
                line,
                if asserted { "asserted" } else { "deasserted" },
                e
            );
        })
    }

    /// Return the lines to the system. Idempotent.
    pub fn release(&mut self) -> Result<(), LineError> {
        self.driver.release()
    }

    /// Whether the lines are still held.
    pub fn is_held(&self) -> bool {
        self.driver.is_requested()
    }

    /// Name of the underlying driver.
    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }
}
