//! GPIO character device driver.
//!
//! Uses the Linux GPIO uAPI v1 line handle ioctls on `/dev/gpiochipN`.
//! Each valve gets its own handle so the kernel shows a distinct consumer
//! label per line. Polarity is delegated to the kernel through the
//! ACTIVE_LOW request flag; writes carry logical values.

use bitflags::bitflags;
use pump_common::hal::config::LinesConfig;
use pump_common::hal::driver::{LineDriver, LineError, LineId};
use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use tracing::{debug, info, warn};

/// Kernel ABI for line handles (`linux/gpio.h`).
mod uapi {
    use static_assertions::assert_eq_size;

    /// `GPIOHANDLES_MAX`
    pub const HANDLES_MAX: usize = 64;
    /// `GPIO_MAX_NAME_SIZE`
    pub const MAX_NAME_SIZE: usize = 32;

    /// `struct gpiohandle_request`
    #[repr(C)]
    pub struct HandleRequest {
        pub line_offsets: [u32; HANDLES_MAX],
        pub flags: u32,
        pub default_values: [u8; HANDLES_MAX],
        pub consumer_label: [u8; MAX_NAME_SIZE],
        pub lines: u32,
        pub fd: libc::c_int,
    }

    /// `struct gpiohandle_data`
    #[repr(C)]
    pub struct HandleData {
        pub values: [u8; HANDLES_MAX],
    }

    assert_eq_size!(HandleRequest, [u8; 364]);
    assert_eq_size!(HandleData, [u8; 64]);

    nix::ioctl_readwrite!(get_line_handle, 0xB4, 0x03, HandleRequest);
    nix::ioctl_readwrite!(set_line_values, 0xB4, 0x09, HandleData);
}

bitflags! {
    /// `GPIOHANDLE_REQUEST_*` flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct RequestFlags: u32 {
        const OUTPUT = 1 << 1;
        const ACTIVE_LOW = 1 << 2;
    }
}

/// A requested single-line handle.
struct LineHandle {
    line: LineId,
    fd: OwnedFd,
}

/// Character device line driver.
#[derive(Default)]
pub struct CdevDriver {
    handles: Vec<LineHandle>,
}

impl CdevDriver {
    /// Create an unrequested driver.
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, line: LineId) -> Result<&LineHandle, LineError> {
        self.handles
            .iter()
            .find(|h| h.line == line)
            .ok_or(LineError::NotRequested(line))
    }
}

/// Build the request for one output line, initially deasserted.
fn output_request(config: &LinesConfig, line: LineId) -> uapi::HandleRequest {
    let mut flags = RequestFlags::OUTPUT;
    if config.active_low {
        flags |= RequestFlags::ACTIVE_LOW;
    }

    let mut request = uapi::HandleRequest {
        line_offsets: [0; uapi::HANDLES_MAX],
        flags: flags.bits(),
        default_values: [0; uapi::HANDLES_MAX],
        consumer_label: [0; uapi::MAX_NAME_SIZE],
        lines: 1,
        fd: -1,
    };
    request.line_offsets[0] = config.offset(line);

    // Keep the trailing NUL.
    let label = config.consumer(line).as_bytes();
    let len = label.len().min(uapi::MAX_NAME_SIZE - 1);
    request.consumer_label[..len].copy_from_slice(&label[..len]);
    request
}

fn request_line(chip: &File, config: &LinesConfig, line: LineId) -> Result<LineHandle, LineError> {
    let mut request = output_request(config, line);
    // SAFETY: `request` is a properly laid out gpiohandle_request that lives
    // for the duration of the call.
    unsafe { uapi::get_line_handle(chip.as_raw_fd(), &mut request) }.map_err(|e| {
        LineError::RequestFailed {
            line,
            reason: e.to_string(),
        }
    })?;
    if request.fd < 0 {
        return Err(LineError::RequestFailed {
            line,
            reason: "kernel returned no handle".to_string(),
        });
    }
    // SAFETY: the kernel handed us a fresh descriptor that nothing else owns.
    let fd = unsafe { OwnedFd::from_raw_fd(request.fd) };
    Ok(LineHandle { line, fd })
}

impl LineDriver for CdevDriver {
    fn name(&self) -> &'static str {
        "cdev"
    }

    fn request(&mut self, config: &LinesConfig) -> Result<(), LineError> {
        let path = config.chip_path();
        let chip = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| LineError::ChipUnavailable {
                chip: path.clone(),
                reason: e.to_string(),
            })?;

        for line in LineId::ALL {
            match request_line(&chip, config, line) {
                Ok(handle) => {
                    info!(
                        "Requested {} line {}:{} as '{}' (active_low={})",
                        line,
                        path,
                        config.offset(line),
                        config.consumer(line),
                        config.active_low
                    );
                    self.handles.push(handle);
                }
                Err(e) => {
                    // Lines acquired so far go back to the kernel.
                    self.handles.clear();
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn set_value(&mut self, line: LineId, asserted: bool) -> Result<(), LineError> {
        let handle = self.handle(line)?;
        let mut data = uapi::HandleData {
            values: [0; uapi::HANDLES_MAX],
        };
        data.values[0] = u8::from(asserted);
        // SAFETY: `data` is a properly laid out gpiohandle_data and the
        // descriptor is a live line handle.
        unsafe { uapi::set_line_values(handle.fd.as_raw_fd(), &mut data) }.map_err(|e| {
            LineError::WriteFailed {
                line,
                reason: e.to_string(),
            }
        })?;
        debug!("{} <- {}", line, u8::from(asserted));
        Ok(())
    }

    fn release(&mut self) -> Result<(), LineError> {
        if self.handles.is_empty() {
            return Ok(());
        }
        for handle in self.handles.drain(..) {
            // Closing the handle returns the line to the kernel.
            debug!("Releasing {} line", handle.line);
            drop(handle.fd);
        }
        info!("GPIO lines released");
        Ok(())
    }

    fn is_requested(&self) -> bool {
        !self.handles.is_empty()
    }
}

impl Drop for CdevDriver {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            warn!("cdev driver dropped while holding lines");
        }
    }
}

/// Factory function to create a character device driver instance.
pub fn create_driver() -> Box<dyn LineDriver> {
    Box::new(CdevDriver::new())
}
