//! Command channel: newline-terminated text in both directions.
//!
//! Inbound payloads are matched by substring. Every verb in a read is
//! dispatched in wire order, so commands coalesced into one read are not
//! lost. An unterminated tail without a recognised verb is carried into the
//! next read, which lets a verb split across two reads still match.

use heapless::Vec as FixedVec;
use pump_common::consts::READ_BUFFER_SIZE;
use pump_common::protocol::{Command, Outbound};
use std::io::{self, Read, Write};
use tracing::{debug, warn};

/// Result of one read from the connection.
#[derive(Debug)]
pub enum Inbound {
    /// Payload received; recognised commands in wire order (possibly none).
    Commands(Vec<Command>),
    /// Orderly close by the peer (zero-byte read).
    Closed,
    /// Transport fault.
    Fault(io::Error),
}

/// Framing state for the coordinator stream.
#[derive(Debug, Default)]
pub struct CommandChannel {
    carry: FixedVec<u8, READ_BUFFER_SIZE>,
}

impl CommandChannel {
    /// Create a channel with no buffered input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop buffered input. Called whenever the transport restarts.
    pub fn reset(&mut self) {
        self.carry.clear();
    }

    /// Bytes currently carried over from previous reads.
    pub fn pending(&self) -> &[u8] {
        &self.carry
    }

    /// Perform one bounded read and decode it.
    pub fn receive<R: Read>(&mut self, reader: &mut R) -> Inbound {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        match reader.read(&mut buf) {
            Ok(0) => Inbound::Closed,
            Ok(n) => Inbound::Commands(self.decode(&buf[..n])),
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
                Inbound::Commands(Vec::new())
            }
            Err(e) => Inbound::Fault(e),
        }
    }

    /// Decode one chunk of inbound bytes.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<Command> {
        let mut data = Vec::with_capacity(self.carry.len() + bytes.len());
        data.extend_from_slice(&self.carry);
        data.extend_from_slice(bytes);
        self.carry.clear();

        let text = String::from_utf8_lossy(&data);
        debug!("Received: {}", text.trim_end());

        let split = text.rfind('\n').map_or(0, |i| i + 1);
        let (complete, tail) = text.split_at(split);

        let mut commands = Command::scan(complete);
        if Command::contains_any(tail) {
            commands.extend(Command::scan(tail));
        } else if !tail.is_empty() {
            if self.carry.extend_from_slice(tail.as_bytes()).is_err() {
                warn!(
                    "Dropping {} bytes of unterminated input without a command",
                    tail.len()
                );
                self.carry.clear();
            } else {
                debug!("Carrying {} bytes of unterminated input", tail.len());
            }
        }
        commands
    }

    /// Write one outbound message with a single non-blocking write.
    ///
    /// Best effort: a full send buffer (`WouldBlock`) or a short write is
    /// returned as an error for the caller to log. Nothing is retried.
    pub fn send<W: Write>(&self, writer: &mut W, msg: Outbound) -> io::Result<()> {
        let wire = msg.wire();
        match writer.write(wire)? {
            n if n == wire.len() => Ok(()),
            n => Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write, {} of {} bytes sent", n, wire.len()),
            )),
        }
    }
}
