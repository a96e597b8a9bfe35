//! # Pump Dummy Library
//!
//! Stand-in coordinator for bench testing the pump controller without the
//! gantry. It answers every delivery request with a scripted cycle:
//!
//! ```text
//! controller                    dummy
//!     │ deliver a new sticker ──►│
//!     │◄── pickup reached        │
//!     │          (step delay)    │
//!     │◄── drop reached          │
//!     │          (step delay)    │
//!     │◄── one sticker finished  │
//! ```
//!
//! Heartbeats are logged. One controller is served at a time; after it
//! disconnects the dummy goes back to accepting.

#![warn(missing_docs)]

use pump_common::protocol::{Command, Outbound};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:8888";
/// Default pause between scripted replies.
pub const DEFAULT_STEP_DELAY_MS: u64 = 2000;
/// How often blocking calls wake up to check the stop flag.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Dummy coordinator errors.
#[derive(Debug, Error)]
pub enum DummyError {
    /// The listen socket could not be bound.
    #[error("Cannot listen on {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// OS error
        #[source]
        source: io::Error,
    },

    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Per-connection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Delivery cycles played.
    pub deliveries: u32,
    /// Heartbeats received.
    pub heartbeats: u32,
    /// Lines that matched no known message.
    pub unknown: u32,
}

/// Listening coordinator stand-in.
pub struct DummyCoordinator {
    listener: TcpListener,
    step_delay: Duration,
    stop: Arc<AtomicBool>,
}

impl DummyCoordinator {
    /// Bind the listen socket.
    pub fn bind(addr: SocketAddr, step_delay: Duration) -> Result<Self, DummyError> {
        let listener = TcpListener::bind(addr).map_err(|source| DummyError::Bind { addr, source })?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            step_delay,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, DummyError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle that stops [`serve`](Self::serve) when set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Accept and serve controllers one at a time until stopped.
    pub fn serve(&self) -> Result<(), DummyError> {
        info!("Listening on {}", self.local_addr()?);
        while let Some((stream, peer)) = self.accept()? {
            info!("Controller connected from {}", peer);
            match self.serve_connection(stream) {
                Ok(stats) => info!(
                    "Controller {} disconnected ({} deliveries, {} heartbeats, {} unknown)",
                    peer, stats.deliveries, stats.heartbeats, stats.unknown
                ),
                Err(e) => warn!("Session with {} ended: {}", peer, e),
            }
        }
        info!("Dummy coordinator stopped");
        Ok(())
    }

    /// Wait for the next controller. `None` once stopped.
    pub fn accept(&self) -> Result<Option<(TcpStream, SocketAddr)>, DummyError> {
        loop {
            if self.stop.load(Ordering::SeqCst) {
                return Ok(None);
            }
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false)?;
                    stream.set_read_timeout(Some(STOP_POLL_INTERVAL))?;
                    return Ok(Some((stream, peer)));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(STOP_POLL_INTERVAL);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Serve one controller until it disconnects or the dummy is stopped.
    pub fn serve_connection(&self, stream: TcpStream) -> Result<SessionStats, DummyError> {
        let mut writer = stream.try_clone()?;
        let mut reader = BufReader::new(stream);
        let mut stats = SessionStats::default();
        let mut line = String::new();

        loop {
            if self.stop.load(Ordering::SeqCst) {
                return Ok(stats);
            }
            match reader.read_line(&mut line) {
                Ok(0) => return Ok(stats),
                Ok(_) => {
                    self.handle_line(&line, &mut writer, &mut stats)?;
                    line.clear();
                }
                // Partial input stays in `line` until the terminator arrives.
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn handle_line<W: Write>(
        &self,
        line: &str,
        writer: &mut W,
        stats: &mut SessionStats,
    ) -> Result<(), DummyError> {
        let text = line.trim();
        if text.is_empty() {
            return Ok(());
        }
        debug!("Received: {}", text);

        match Outbound::parse(text) {
            Some(Outbound::DeliverNewSticker) => {
                info!("Delivery requested, playing pickup/drop cycle");
                self.play_delivery(writer)?;
                stats.deliveries += 1;
            }
            Some(Outbound::WaitUntilNextSticker) => {
                info!("Heartbeat: controller waiting for next sticker");
                stats.heartbeats += 1;
            }
            None => {
                warn!("Unknown message: {}", text);
                stats.unknown += 1;
            }
        }
        Ok(())
    }

    fn play_delivery<W: Write>(&self, writer: &mut W) -> Result<(), DummyError> {
        send(writer, Command::PickupReached)?;
        std::thread::sleep(self.step_delay);
        send(writer, Command::DropReached)?;
        std::thread::sleep(self.step_delay);
        send(writer, Command::StickerFinished)?;
        Ok(())
    }
}

fn send<W: Write>(writer: &mut W, command: Command) -> io::Result<()> {
    writer.write_all(command.verb().as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    info!("Sent: {}", command);
    Ok(())
}
