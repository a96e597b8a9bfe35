//! Simulation driver.
//!
//! Keeps both lines in memory and logs every write. The physical level is
//! derived from the logical value and the configured polarity, which lets
//! the wiring convention be checked without a chip.

use pump_common::hal::config::LinesConfig;
use pump_common::hal::driver::{LineDriver, LineError, LineId};
use tracing::{debug, info};

/// In-memory line driver.
#[derive(Debug, Default)]
pub struct SimulationDriver {
    requested: bool,
    active_low: bool,
    /// Logical values indexed by `LineId as usize`
    values: [bool; 2],
    writes: u64,
}

impl SimulationDriver {
    /// Create an unrequested simulation driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical value of a line, `None` while not requested.
    pub fn value(&self, line: LineId) -> Option<bool> {
        self.requested.then(|| self.values[line as usize])
    }

    /// Electrical level of a line (`true` = high), `None` while not requested.
    pub fn physical_level(&self, line: LineId) -> Option<bool> {
        self.value(line).map(|v| v != self.active_low)
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> u64 {
        self.writes
    }
}

impl LineDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn request(&mut self, config: &LinesConfig) -> Result<(), LineError> {
        self.requested = true;
        self.active_low = config.active_low;
        self.values = [false; 2];
        info!(
            "Simulated lines requested: pump={} vent={} active_low={}",
            config.pump_offset, config.vent_offset, config.active_low
        );
        Ok(())
    }

    fn set_value(&mut self, line: LineId, asserted: bool) -> Result<(), LineError> {
        if !self.requested {
            return Err(LineError::NotRequested(line));
        }
        self.values[line as usize] = asserted;
        self.writes += 1;
        debug!(
            "[SIM] {} <- {} (pin {})",
            line,
            u8::from(asserted),
            if asserted != self.active_low { "high" } else { "low" }
        );
        Ok(())
    }

    fn release(&mut self) -> Result<(), LineError> {
        if self.requested {
            info!("Simulated lines released");
        }
        self.requested = false;
        Ok(())
    }

    fn is_requested(&self) -> bool {
        self.requested
    }
}

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn LineDriver> {
    Box::new(SimulationDriver::new())
}
