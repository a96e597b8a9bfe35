//! Line driver implementations.
//!
//! - [`cdev`] - Linux GPIO character device (line handle ioctls)
//! - [`sysfs`] - Legacy `/sys/class/gpio` interface
//! - [`simulation`] - In-memory lines for bench use without hardware
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `LineDriver` trait from `pump_common::hal::driver`
//! 3. Register the driver in [`register_all_drivers`]

pub mod cdev;
pub mod simulation;
pub mod sysfs;

use crate::driver_registry::DriverRegistry;

/// Register every built-in driver.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register("cdev", cdev::create_driver);
    registry.register("sysfs", sysfs::create_driver);
    registry.register("simulation", simulation::create_driver);
}
