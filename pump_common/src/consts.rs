//! System-wide constants for the pump controller workspace.
//!
//! Single source of truth for timing defaults, wiring and endpoints.
//! Configuration defaults are derived from these values.

use std::net::Ipv4Addr;

/// Default coordinator address.
pub const DEFAULT_COORDINATOR_HOST: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 37);

/// Default coordinator TCP port.
pub const DEFAULT_COORDINATOR_PORT: u16 = 8888;

/// Upper bound for a single connect attempt in milliseconds.
pub const CONNECT_TIMEOUT_MS: u64 = 5000;

/// Pause between failed connect attempts in milliseconds.
pub const RETRY_BACKOFF_MS: u64 = 5000;

/// Readiness wait bound (periodic tick) in milliseconds.
pub const TICK_MS: u64 = 1000;

/// Idle ticks in WAITING between two heartbeat messages.
pub const HEARTBEAT_TICKS: u32 = 10;

/// Delay between stopping the pump and opening the vent.
pub const PUMP_STOP_SETTLE_MS: u64 = 50;

/// Time the vent stays open to bleed pressure.
pub const VENT_OPEN_MS: u64 = 1000;

/// Delay after closing the vent before the sequence is considered done.
pub const VENT_CLOSE_SETTLE_MS: u64 = 50;

/// Inbound read buffer size in bytes.
pub const READ_BUFFER_SIZE: usize = 256;

/// Default GPIO chip name.
pub const DEFAULT_CHIP: &str = "gpiochip0";

/// BCM offset of the main solenoid (delivery) valve.
pub const PUMP_LINE_OFFSET: u32 = 20;

/// BCM offset of the vent/bleed valve.
pub const VENT_LINE_OFFSET: u32 = 21;

/// Consumer label for the pump line request.
pub const PUMP_CONSUMER: &str = "pump_kb_pump";

/// Consumer label for the vent line request.
pub const VENT_CONSUMER: &str = "pump_kb_vent";

/// Longest tick accepted by the readiness wait (poll takes a u16 millisecond timeout).
pub const MAX_TICK_MS: u64 = u16::MAX as u64;
