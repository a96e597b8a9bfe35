//! Hardware line capability.
//!
//! This module contains the driver contract and line configuration for
//! the two valve outputs.

pub mod config;
pub mod driver;
