//! Delivery state machine: WAITING ↔ DELIVERING.
//!
//! | State | Event | Action | Next |
//! |-------|-------|--------|------|
//! | WAITING | operator start | send `deliver a new sticker` | DELIVERING |
//! | DELIVERING | `pickup reached` | energize if not energized | DELIVERING |
//! | DELIVERING | `drop reached` | stop and vent if energized | DELIVERING |
//! | DELIVERING | `one sticker finished` | none | WAITING |
//! | WAITING | any command | ignored | WAITING |
//!
//! Delivery is always initiated locally; the coordinator cannot start one.

use crate::sequencer::ValveSequencer;
use pump_common::protocol::{Command, Outbound};
use std::fmt;
use tracing::{info, warn};

/// Delivery progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryState {
    /// Idle, waiting for the operator.
    #[default]
    Waiting,
    /// Delivery requested; coordinator drives the valves.
    Delivering,
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeliveryState::Waiting => "WAITING",
            DeliveryState::Delivering => "DELIVERING",
        })
    }
}

/// What a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Command arrived in WAITING and was dropped.
    Ignored,
    /// Pump energized.
    Energized,
    /// `pickup reached` with the pump already energized.
    AlreadyEnergized,
    /// Pump stopped and line vented.
    Vented,
    /// `drop reached` with the pump already off.
    AlreadyStopped,
    /// Delivery finished, back to WAITING.
    Finished,
}

/// Holder of the delivery state.
#[derive(Debug, Default)]
pub struct DeliveryStateMachine {
    state: DeliveryState,
}

impl DeliveryStateMachine {
    /// Start in WAITING.
    pub const fn new() -> Self {
        Self {
            state: DeliveryState::Waiting,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> DeliveryState {
        self.state
    }

    /// Back to WAITING. The coordinator forgets in-flight deliveries when the
    /// transport restarts.
    pub fn reset(&mut self) {
        if self.state != DeliveryState::Waiting {
            info!("Delivery state reset: {} -> WAITING", self.state);
        }
        self.state = DeliveryState::Waiting;
    }

    /// Local operator asked for a delivery.
    ///
    /// Returns the message to send when the request is accepted.
    pub fn operator_start(&mut self) -> Option<Outbound> {
        match self.state {
            DeliveryState::Waiting => {
                self.state = DeliveryState::Delivering;
                info!("Started delivering sticker");
                Some(Outbound::DeliverNewSticker)
            }
            DeliveryState::Delivering => None,
        }
    }

    /// Apply one inbound command, driving the valves as needed.
    pub fn handle_command(&mut self, command: Command, valves: &mut ValveSequencer) -> Reaction {
        if self.state == DeliveryState::Waiting {
            return Reaction::Ignored;
        }

        match command {
            Command::PickupReached if valves.is_energized() => Reaction::AlreadyEnergized,
            Command::PickupReached => {
                if let Err(e) = valves.energize() {
                    warn!("Pump energize not confirmed by hardware: {}", e);
                }
                Reaction::Energized
            }
            Command::DropReached if !valves.is_energized() => Reaction::AlreadyStopped,
            Command::DropReached => {
                if let Err(e) = valves.de_energize_and_vent() {
                    warn!("Vent sequence not confirmed by hardware: {}", e);
                }
                Reaction::Vented
            }
            Command::StickerFinished => {
                self.state = DeliveryState::Waiting;
                info!("Sticker finished, waiting for next");
                Reaction::Finished
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::Actuators;
    use crate::drivers::simulation::SimulationDriver;
    use crate::sequencer::{Delay, VentTiming};
    use pump_common::hal::config::LinesConfig;
    use std::time::Duration;

    struct NoDelay;

    impl Delay for NoDelay {
        fn delay(&mut self, _duration: Duration) {}
    }

    fn valves() -> ValveSequencer {
        let actuators =
            Actuators::acquire(Box::new(SimulationDriver::new()), &LinesConfig::default()).unwrap();
        ValveSequencer::new(actuators, VentTiming::default(), Box::new(NoDelay))
    }

    #[test]
    fn operator_start_only_from_waiting() {
        let mut machine = DeliveryStateMachine::new();
        assert_eq!(machine.operator_start(), Some(Outbound::DeliverNewSticker));
        assert_eq!(machine.state(), DeliveryState::Delivering);
        assert_eq!(machine.operator_start(), None);
    }

    #[test]
    fn commands_ignored_while_waiting() {
        let mut machine = DeliveryStateMachine::new();
        let mut valves = valves();
        for cmd in Command::ALL {
            assert_eq!(machine.handle_command(cmd, &mut valves), Reaction::Ignored);
        }
        assert_eq!(machine.state(), DeliveryState::Waiting);
        assert!(!valves.is_energized());
    }

    #[test]
    fn full_delivery_cycle() {
        let mut machine = DeliveryStateMachine::new();
        let mut valves = valves();
        machine.operator_start();

        assert_eq!(
            machine.handle_command(Command::PickupReached, &mut valves),
            Reaction::Energized
        );
        assert!(valves.is_energized());
        assert_eq!(
            machine.handle_command(Command::DropReached, &mut valves),
            Reaction::Vented
        );
        assert!(!valves.is_energized());
        assert_eq!(
            machine.handle_command(Command::StickerFinished, &mut valves),
            Reaction::Finished
        );
        assert_eq!(machine.state(), DeliveryState::Waiting);
    }

    #[test]
    fn energize_is_idempotent() {
        let mut machine = DeliveryStateMachine::new();
        let mut valves = valves();
        machine.operator_start();
        machine.handle_command(Command::PickupReached, &mut valves);
        assert_eq!(
            machine.handle_command(Command::PickupReached, &mut valves),
            Reaction::AlreadyEnergized
        );
    }

    #[test]
    fn drop_without_pickup_does_nothing() {
        let mut machine = DeliveryStateMachine::new();
        let mut valves = valves();
        machine.operator_start();
        assert_eq!(
            machine.handle_command(Command::DropReached, &mut valves),
            Reaction::AlreadyStopped
        );
        assert_eq!(machine.state(), DeliveryState::Delivering);
    }

    #[test]
    fn finish_leaves_valves_alone() {
        let mut machine = DeliveryStateMachine::new();
        let mut valves = valves();
        machine.operator_start();
        machine.handle_command(Command::PickupReached, &mut valves);
        machine.handle_command(Command::StickerFinished, &mut valves);
        // The coordinator owns the drop; finishing does not vent.
        assert!(valves.is_energized());
    }

    #[test]
    fn reset_returns_to_waiting() {
        let mut machine = DeliveryStateMachine::new();
        machine.operator_start();
        machine.reset();
        assert_eq!(machine.state(), DeliveryState::Waiting);
    }
}
