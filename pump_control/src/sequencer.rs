//! Valve sequencer.
//!
//! Composes actuator writes into the two legal high-level operations:
//!
//! - `energize()` - open the delivery valve
//! - `de_energize_and_vent()` - the timed stop sequence:
//!
//! ```text
//! pump ──┐
//!        └───────────────────────────────────────
//! vent         ┌────────────────────┐
//!        ──────┘                    └────────────
//!        |<-50ms->|<----1000ms----->|<-50ms->|
//! ```
//!
//! The pump must stop before the line is vented, and the vent must stay
//! open long enough to bleed the pressure. The sequence blocks the calling
//! thread; nothing else runs on the controller while it executes, and a
//! shutdown request does not cut it short.

use crate::actuator::Actuators;
use pump_common::config::TimingConfig;
use pump_common::hal::driver::{LineError, LineId};
use std::time::Duration;
use tracing::{info, warn};

/// Blocking pause between sequence steps.
pub trait Delay: Send {
    /// Suspend the caller for `duration`.
    fn delay(&mut self, duration: Duration);
}

/// `Delay` backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Logical valve state, mirrored onto the lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValveState {
    /// Delivery valve energized.
    pub pump_energized: bool,
    /// Vent valve open.
    pub vent_open: bool,
}

/// Delays of the stop-and-vent sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VentTiming {
    /// Pump off → vent open.
    pub pump_stop_settle: Duration,
    /// Vent open duration.
    pub vent_open: Duration,
    /// Vent closed → done.
    pub vent_close_settle: Duration,
}

impl From<&TimingConfig> for VentTiming {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            pump_stop_settle: Duration::from_millis(timing.pump_stop_settle_ms),
            vent_open: Duration::from_millis(timing.vent_open_ms),
            vent_close_settle: Duration::from_millis(timing.vent_close_settle_ms),
        }
    }
}

impl Default for VentTiming {
    fn default() -> Self {
        Self::from(&TimingConfig::default())
    }
}

/// Serial executor of valve operations.
///
/// Logical state is updated even when a write fails, so it reflects what
/// was commanded rather than what the hardware confirmed.
pub struct ValveSequencer {
    actuators: Actuators,
    timing: VentTiming,
    delay: Box<dyn Delay>,
    state: ValveState,
}

impl ValveSequencer {
    /// Create a sequencer over acquired lines.
    ///
    /// Call [`force_safe`](Self::force_safe) before any other operation.
    pub fn new(actuators: Actuators, timing: VentTiming, delay: Box<dyn Delay>) -> Self {
        Self {
            actuators,
            timing,
            delay,
            state: ValveState::default(),
        }
    }

    /// Current logical valve state.
    pub fn state(&self) -> ValveState {
        self.state
    }

    /// Whether the delivery valve is energized.
    pub fn is_energized(&self) -> bool {
        self.state.pump_energized
    }

    /// Drive both lines deasserted: pump off, vent closed.
    pub fn force_safe(&mut self) -> Result<(), LineError> {
        let pump = self.actuators.set_line(LineId::Pump, false);
        let vent = self.actuators.set_line(LineId::Vent, false);
        self.state = ValveState::default();
        info!("Valves in safe state: pump off, vent closed");
        pump.and(vent)
    }

    /// Energize the delivery valve.
    ///
    /// Not guarded: callers check [`is_energized`](Self::is_energized) first.
    pub fn energize(&mut self) -> Result<(), LineError> {
        let result = self.actuators.set_line(LineId::Pump, true);
        self.state.pump_energized = true;
        info!("[STATE] Pump ON");
        result
    }

    /// Stop the pump, then vent the line.
    ///
    /// Runs every step even if a write fails; the first failure is returned.
    pub fn de_energize_and_vent(&mut self) -> Result<(), LineError> {
        let mut result = self.actuators.set_line(LineId::Pump, false);
        self.state.pump_energized = false;
        self.delay.delay(self.timing.pump_stop_settle);

        result = result.and(self.actuators.set_line(LineId::Vent, true));
        self.state.vent_open = true;
        self.delay.delay(self.timing.vent_open);

        result = result.and(self.actuators.set_line(LineId::Vent, false));
        self.state.vent_open = false;
        self.delay.delay(self.timing.vent_close_settle);

        info!("[STATE] Pump OFF (vented)");
        result
    }

    /// Bring the valves to a safe state for exit.
    ///
    /// An energized pump gets the full vent sequence; otherwise both lines
    /// are forced deasserted.
    pub fn safe_stop(&mut self) -> Result<(), LineError> {
        if self.state.pump_energized {
            info!("Pump energized at shutdown, venting");
            self.de_energize_and_vent()
        } else {
            self.force_safe()
        }
    }

    /// Safe state, then release the lines. Idempotent.
    pub fn shutdown(&mut self) -> Result<(), LineError> {
        if !self.actuators.is_held() {
            return Ok(());
        }
        if let Err(e) = self.safe_stop() {
            warn!("Safe stop incomplete: {}", e);
        }
        self.actuators.release()
    }
}

impl Drop for ValveSequencer {
    fn drop(&mut self) {
        if self.actuators.is_held() {
            warn!("Valve sequencer dropped with lines held, forcing shutdown");
            if let Err(e) = self.shutdown() {
                warn!("Line release failed: {}", e);
            }
        }
    }
}
