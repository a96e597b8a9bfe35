//! # Pump Control Library
//!
//! Valve controller for the sticker pump station. The controller keeps one
//! TCP link to the coordinator, turns its text commands into valve
//! actuations and announces delivery requests made by the local operator.
//!
//! # Module Structure
//!
//! - [`actuator`] - The two valve outputs behind one capability
//! - [`channel`] - Newline-terminated command framing
//! - [`connection`] - Coordinator link with retry and backoff
//! - [`delivery`] - WAITING / DELIVERING state machine
//! - [`driver_registry`] - Line driver factory registration
//! - [`drivers`] - Line driver implementations
//! - [`error`] - Fatal controller errors
//! - [`event_loop`] - Single-threaded readiness loop and context
//! - [`sequencer`] - Energize and stop-and-vent sequences
//! - [`shutdown`] - Cooperative shutdown flag
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                         pump_control                           │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────────┐  │
//! │  │ Connection   │◄──►│  Controller  │◄──►│  Delivery state  │  │
//! │  │ + Channel    │    │  (poll loop) │    │  machine         │  │
//! │  └──────────────┘    └──────┬───────┘    └────────┬─────────┘  │
//! │         ▲                   │ operator input      │            │
//! │         │ TCP               ▼                     ▼            │
//! │   coordinator        ┌────────────────┐   ┌────────────────┐   │
//! │                      │ ValveSequencer │──►│  Actuators     │   │
//! │                      └────────────────┘   │  (LineDriver)  │   │
//! │                                           └────────────────┘   │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod actuator;
pub mod channel;
pub mod connection;
pub mod delivery;
pub mod driver_registry;
pub mod drivers;
pub mod error;
pub mod event_loop;
pub mod sequencer;
pub mod shutdown;

// Re-export key types for convenience
pub use crate::actuator::Actuators;
pub use crate::connection::{ConnectError, ConnectionManager, ConnectionState};
pub use crate::delivery::{DeliveryState, DeliveryStateMachine};
pub use crate::driver_registry::DriverRegistry;
pub use crate::error::ControllerError;
pub use crate::event_loop::{Controller, RunOutcome, Step};
pub use crate::sequencer::{ThreadDelay, ValveSequencer, ValveState, VentTiming};
pub use crate::shutdown::ShutdownFlag;
