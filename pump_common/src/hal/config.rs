//! Line configuration.
//!
//! `LinesConfig` is the `[lines]` section of the controller configuration:
//! which binding to load, which chip and offsets the valves are wired to,
//! and the polarity of the wiring.

use crate::config::ConfigError;
use crate::consts::{
    DEFAULT_CHIP, PUMP_CONSUMER, PUMP_LINE_OFFSET, VENT_CONSUMER, VENT_LINE_OFFSET,
};
use crate::hal::driver::LineId;
use serde::{Deserialize, Serialize};

/// Default driver name.
pub const DEFAULT_DRIVER: &str = "cdev";

/// `[lines]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinesConfig {
    /// Registered driver to load ("cdev", "sysfs", "simulation").
    pub driver: String,

    /// GPIO chip name (resolved under `/dev`) or absolute path.
    pub chip: String,

    /// Chip offset of the main solenoid valve.
    pub pump_offset: u32,

    /// Chip offset of the vent valve.
    pub vent_offset: u32,

    /// Wiring polarity. Asserted drives the pin low when true.
    pub active_low: bool,

    /// Consumer label shown by the kernel for the pump line.
    pub pump_consumer: String,

    /// Consumer label shown by the kernel for the vent line.
    pub vent_consumer: String,

    /// Global GPIO number of chip offset 0 (sysfs binding only).
    pub sysfs_base: u32,
}

impl Default for LinesConfig {
    fn default() -> Self {
        Self {
            driver: DEFAULT_DRIVER.to_string(),
            chip: DEFAULT_CHIP.to_string(),
            pump_offset: PUMP_LINE_OFFSET,
            vent_offset: VENT_LINE_OFFSET,
            active_low: true,
            pump_consumer: PUMP_CONSUMER.to_string(),
            vent_consumer: VENT_CONSUMER.to_string(),
            sysfs_base: 0,
        }
    }
}

impl LinesConfig {
    /// Chip offset for a line.
    pub fn offset(&self, line: LineId) -> u32 {
        match line {
            LineId::Pump => self.pump_offset,
            LineId::Vent => self.vent_offset,
        }
    }

    /// Consumer label for a line.
    pub fn consumer(&self, line: LineId) -> &str {
        match line {
            LineId::Pump => &self.pump_consumer,
            LineId::Vent => &self.vent_consumer,
        }
    }

    /// Device path of the chip (`gpiochip0` → `/dev/gpiochip0`).
    pub fn chip_path(&self) -> String {
        if self.chip.starts_with('/') {
            self.chip.clone()
        } else {
            format!("/dev/{}", self.chip)
        }
    }

    /// Validate the line configuration.
    ///
    /// # Validation Rules
    /// 1. `driver` and `chip` are not empty
    /// 2. Pump and vent use different offsets
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.is_empty() {
            return Err(ConfigError::ValidationError(
                "lines.driver cannot be empty".to_string(),
            ));
        }
        if self.chip.is_empty() {
            return Err(ConfigError::ValidationError(
                "lines.chip cannot be empty".to_string(),
            ));
        }
        if self.pump_offset == self.vent_offset {
            return Err(ConfigError::ValidationError(format!(
                "pump and vent share offset {}",
                self.pump_offset
            )));
        }
        Ok(())
    }
}
