//! Driver registry for line drivers.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving line
//! driver factories. Constructed at startup and passed by value; no global
//! state.

use pump_common::hal::driver::{DriverFactory, LineDriver, LineError};
use std::collections::HashMap;

/// Registry of available line drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in driver.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create a driver instance by name.
    ///
    /// # Errors
    /// Returns `LineError::DriverNotFound` if no driver with the given name is registered.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn LineDriver>, LineError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| LineError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pump_common::hal::config::LinesConfig;
    use pump_common::hal::driver::LineId;

    struct TestDriver;

    impl LineDriver for TestDriver {
        fn name(&self) -> &'static str {
            "test"
        }

        fn request(&mut self, _config: &LinesConfig) -> Result<(), LineError> {
            Ok(())
        }

        fn set_value(&mut self, _line: LineId, _asserted: bool) -> Result<(), LineError> {
            Ok(())
        }

        fn release(&mut self) -> Result<(), LineError> {
            Ok(())
        }

        fn is_requested(&self) -> bool {
            false
        }
    }

    fn create_test_driver() -> Box<dyn LineDriver> {
        Box::new(TestDriver)
    }

    #[test]
    fn registry_register_and_create() {
        let mut reg = DriverRegistry::new();
        reg.register("test_driver", create_test_driver);

        let driver = reg.create_driver("test_driver").expect("should create");
        assert_eq!(driver.name(), "test");
    }

    #[test]
    fn registry_driver_not_found() {
        let reg = DriverRegistry::new();
        let result = reg.create_driver("nonexistent");
        assert!(matches!(result, Err(LineError::DriverNotFound(_))));
    }

    #[test]
    fn registry_builtin_drivers() {
        let reg = DriverRegistry::with_builtin();
        assert_eq!(reg.list_drivers(), vec!["cdev", "simulation", "sysfs"]);
        for name in reg.list_drivers() {
            let driver = reg.create_driver(name).expect("builtin driver");
            assert_eq!(driver.name(), name);
            assert!(!driver.is_requested());
        }
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = DriverRegistry::new();
        reg.register("dup", create_test_driver);
        reg.register("dup", create_test_driver);
    }
}
