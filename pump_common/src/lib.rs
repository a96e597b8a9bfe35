//! Pump Common Library
//!
//! Shared constants, configuration and hardware contracts for the sticker
//! pump controller workspace.
//!
//! # Module Structure
//!
//! - [`config`] - TOML configuration loading and validation
//! - [`consts`] - Device defaults (wiring, endpoint, timing)
//! - [`hal`] - Line driver trait, line identifiers and line configuration
//! - [`protocol`] - Coordinator message vocabulary
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use pump_common::prelude::*;
//!
//! let config = ControllerConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(Command::scan("pickup reached\n"), vec![Command::PickupReached]);
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
pub mod protocol;
