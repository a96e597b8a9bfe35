//! Legacy sysfs GPIO driver.
//!
//! Drives `/sys/class/gpio`: export, set `active_low`, configure as output
//! at the deasserted level, then write logical values to `value`. Lines
//! are unexported on release. Intended for kernels or boards where the
//! character device is unavailable.

use pump_common::hal::config::LinesConfig;
use pump_common::hal::driver::{LineDriver, LineError, LineId};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default sysfs GPIO class directory.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// sysfs line driver.
pub struct SysfsDriver {
    root: PathBuf,
    /// Exported global numbers indexed by `LineId as usize`
    exported: [Option<u32>; 2],
}

impl SysfsDriver {
    /// Driver rooted at [`SYSFS_GPIO_ROOT`].
    pub fn new() -> Self {
        Self::with_root(SYSFS_GPIO_ROOT)
    }

    /// Driver rooted at an arbitrary directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exported: [None; 2],
        }
    }

    fn line_dir(&self, number: u32) -> PathBuf {
        self.root.join(format!("gpio{number}"))
    }

    fn export(&self, config: &LinesConfig, line: LineId, number: u32) -> io::Result<()> {
        if !self.line_dir(number).exists() {
            write_attr(&self.root.join("export"), &number.to_string())?;
        }
        let dir = self.line_dir(number);
        write_attr(&dir.join("active_low"), if config.active_low { "1" } else { "0" })?;
        // direction takes a raw level: deasserted is high when wired active-low.
        write_attr(&dir.join("direction"), if config.active_low { "high" } else { "low" })?;
        debug!("Exported {} line as gpio{}", line, number);
        Ok(())
    }

    fn unexport_all(&mut self) -> io::Result<()> {
        let mut first_error = None;
        for slot in self.exported.iter_mut() {
            if let Some(number) = slot.take() {
                if let Err(e) = write_attr(&self.root.join("unexport"), &number.to_string()) {
                    warn!("Failed to unexport gpio{}: {}", number, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Default for SysfsDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn write_attr(path: &Path, value: &str) -> io::Result<()> {
    fs::write(path, value)
}

impl LineDriver for SysfsDriver {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn request(&mut self, config: &LinesConfig) -> Result<(), LineError> {
        for line in LineId::ALL {
            let number = config.sysfs_base + config.offset(line);
            if let Err(e) = self.export(config, line, number) {
                // Lines acquired so far go back to the kernel. The request
                // error is the one worth reporting.
                let _ = self.unexport_all();
                return Err(LineError::RequestFailed {
                    line,
                    reason: format!("gpio{number}: {e}"),
                });
            }
            self.exported[line as usize] = Some(number);
        }
        info!(
            "Requested sysfs lines pump=gpio{} vent=gpio{} (active_low={})",
            config.sysfs_base + config.pump_offset,
            config.sysfs_base + config.vent_offset,
            config.active_low
        );
        Ok(())
    }

    fn set_value(&mut self, line: LineId, asserted: bool) -> Result<(), LineError> {
        let number = self.exported[line as usize].ok_or(LineError::NotRequested(line))?;
        write_attr(
            &self.line_dir(number).join("value"),
            if asserted { "1" } else { "0" },
        )
        .map_err(|e| LineError::WriteFailed {
            line,
            reason: e.to_string(),
        })?;
        debug!("{} <- {}", line, u8::from(asserted));
        Ok(())
    }

    fn release(&mut self) -> Result<(), LineError> {
        if !self.is_requested() {
            return Ok(());
        }
        self.unexport_all()
            .map_err(|e| LineError::ReleaseFailed(e.to_string()))?;
        info!("sysfs lines released");
        Ok(())
    }

    fn is_requested(&self) -> bool {
        self.exported.iter().any(Option::is_some)
    }
}

/// Factory function to create a sysfs driver instance.
pub fn create_driver() -> Box<dyn LineDriver> {
    Box::new(SysfsDriver::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Fake class directory with pre-created line directories.
    fn fake_root(numbers: &[u32]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for n in numbers {
            fs::create_dir(dir.path().join(format!("gpio{n}"))).unwrap();
        }
        dir
    }

    fn read(dir: &TempDir, rel: &str) -> String {
        fs::read_to_string(dir.path().join(rel)).unwrap()
    }

    #[test]
    fn request_configures_both_lines() {
        let root = fake_root(&[532, 533]);
        let config = LinesConfig {
            sysfs_base: 512,
            ..LinesConfig::default()
        };
        let mut driver = SysfsDriver::with_root(root.path());
        driver.request(&config).unwrap();

        assert!(driver.is_requested());
        assert_eq!(read(&root, "gpio532/active_low"), "1");
        assert_eq!(read(&root, "gpio532/direction"), "high");
        assert_eq!(read(&root, "gpio533/direction"), "high");
    }

    #[test]
    fn values_are_logical() {
        let root = fake_root(&[20, 21]);
        let mut driver = SysfsDriver::with_root(root.path());
        driver.request(&LinesConfig::default()).unwrap();

        driver.set_value(LineId::Pump, true).unwrap();
        driver.set_value(LineId::Vent, false).unwrap();
        assert_eq!(read(&root, "gpio20/value"), "1");
        assert_eq!(read(&root, "gpio21/value"), "0");
    }

    #[test]
    fn release_unexports() {
        let root = fake_root(&[20, 21]);
        let mut driver = SysfsDriver::with_root(root.path());
        driver.request(&LinesConfig::default()).unwrap();
        driver.release().unwrap();

        assert!(!driver.is_requested());
        // Both numbers were written to the same unexport file; the last one wins.
        assert_eq!(read(&root, "unexport"), "21");
        assert!(matches!(
            driver.set_value(LineId::Pump, false),
            Err(LineError::NotRequested(LineId::Pump))
        ));
        driver.release().unwrap();
    }

    #[test]
    fn missing_line_directory_fails_request() {
        // Exporting writes the export file, but no gpio21 directory appears.
        let root = fake_root(&[20]);
        let mut driver = SysfsDriver::with_root(root.path());
        let result = driver.request(&LinesConfig::default());
        assert!(matches!(
            result,
            Err(LineError::RequestFailed {
                line: LineId::Vent,
                ..
            })
        ));
        assert!(!driver.is_requested());
    }
}
