//! Controller event loop.
//!
//! One thread multiplexes three sources: the coordinator socket, local
//! operator input and a periodic tick (the readiness wait timeout). Each
//! pass dispatches whatever is ready to the command channel and delivery
//! state machine. Transport failures of every kind funnel into
//! [`Controller::recover`], the single reconnect path.
//!
//! The `Controller` is also the context object: it owns the connection,
//! the valve sequencer, the heartbeat counter and a handle on the shutdown
//! flag raised by the interrupt handler.

use crate::channel::{CommandChannel, Inbound};
use crate::connection::ConnectionManager;
use crate::delivery::{DeliveryState, DeliveryStateMachine, Reaction};
use crate::sequencer::{ValveSequencer, ValveState};
use crate::shutdown::ShutdownFlag;
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use pump_common::config::TimingConfig;
use pump_common::hal::driver::LineError;
use pump_common::protocol::Outbound;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Bytes read from operator input per readiness event.
const OPERATOR_READ_SIZE: usize = 64;

/// Idle tick counter driving the WAITING heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatCounter {
    ticks: u32,
    period: u32,
}

impl HeartbeatCounter {
    /// Counter firing every `period` ticks.
    pub const fn new(period: u32) -> Self {
        Self { ticks: 0, period }
    }

    /// Count one tick. Returns true (and restarts) when the period is reached.
    pub fn tick(&mut self) -> bool {
        self.ticks += 1;
        if self.ticks >= self.period {
            self.ticks = 0;
            true
        } else {
            false
        }
    }

    /// Restart counting.
    pub fn reset(&mut self) {
        self.ticks = 0;
    }

    /// Ticks counted since the last reset.
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Shutdown observed at the top of an iteration.
    Stopped,
    /// Shutdown observed while reconnecting.
    Abandoned,
}

impl RunOutcome {
    /// Process exit status for this outcome.
    pub const fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Stopped => 0,
            RunOutcome::Abandoned => 1,
        }
    }
}

/// Result of a single loop pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep looping.
    Continue,
    /// Leave the loop.
    Exit(RunOutcome),
}

#[derive(Debug, Clone, Copy)]
struct Readiness {
    connection: bool,
    operator: bool,
}

fn is_ready(fd: &PollFd<'_>) -> bool {
    fd.revents().is_some_and(|r| {
        r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR | PollFlags::POLLNVAL)
    })
}

/// The controller context and its single-threaded dispatcher.
pub struct Controller<I = File> {
    connection: ConnectionManager,
    channel: CommandChannel,
    machine: DeliveryStateMachine,
    sequencer: ValveSequencer,
    heartbeat: HeartbeatCounter,
    operator: Option<I>,
    shutdown: ShutdownFlag,
    tick: Duration,
}

impl<I: Read + AsFd> Controller<I> {
    /// Assemble a controller around a connected link and safe valves.
    pub fn new(
        connection: ConnectionManager,
        sequencer: ValveSequencer,
        operator: Option<I>,
        timing: &TimingConfig,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            connection,
            channel: CommandChannel::new(),
            machine: DeliveryStateMachine::new(),
            sequencer,
            heartbeat: HeartbeatCounter::new(timing.heartbeat_ticks),
            operator,
            shutdown,
            tick: timing.tick(),
        }
    }

    /// Current delivery state.
    pub fn delivery_state(&self) -> DeliveryState {
        self.machine.state()
    }

    /// Current logical valve state.
    pub fn valve_state(&self) -> ValveState {
        self.sequencer.state()
    }

    /// Idle ticks counted toward the next heartbeat.
    pub fn heartbeat_ticks(&self) -> u32 {
        self.heartbeat.ticks()
    }

    /// The coordinator link.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Whether local operator input is still being watched.
    pub fn has_operator_input(&self) -> bool {
        self.operator.is_some()
    }

    /// Loop until shutdown.
    pub fn run(&mut self) -> RunOutcome {
        info!("Waiting for commands: 'pickup reached' to turn pump ON, 'drop reached' to turn pump OFF");
        if self.operator.is_some() {
            info!("Waiting for human input (press Enter to start delivering sticker)");
        }

        loop {
            if let Step::Exit(outcome) = self.poll_once() {
                info!("Event loop stopped ({:?})", outcome);
                return outcome;
            }
        }
    }

    /// One pass: wait for readiness (bounded by the tick), then dispatch.
    pub fn poll_once(&mut self) -> Step {
        if self.shutdown.is_requested() {
            return Step::Exit(RunOutcome::Stopped);
        }

        let readiness = match self.wait_ready() {
            Ok(Some(readiness)) => readiness,
            Ok(None) => {
                self.on_tick();
                return Step::Continue;
            }
            Err(Errno::EINTR) => return Step::Continue,
            Err(e) => {
                error!("Readiness wait failed ({}), reconnecting", e);
                return self.recover();
            }
        };

        if readiness.operator {
            self.on_operator_input();
        }
        if readiness.connection {
            return self.on_connection_readable();
        }
        Step::Continue
    }

    /// Safe valve state, release lines, close the link.
    pub fn shutdown(&mut self) -> Result<(), LineError> {
        info!("Shutting down controller");
        self.connection.close();
        self.sequencer.shutdown()
    }

    fn poll_timeout(&self) -> PollTimeout {
        let ms = u16::try_from(self.tick.as_millis()).unwrap_or(u16::MAX);
        PollTimeout::from(ms)
    }

    /// `Ok(None)` on tick timeout.
    fn wait_ready(&self) -> Result<Option<Readiness>, Errno> {
        let stream = self.connection.stream().ok_or(Errno::ENOTCONN)?;

        let mut fds = Vec::with_capacity(2);
        fds.push(PollFd::new(stream.as_fd(), PollFlags::POLLIN));
        if let Some(input) = self.operator.as_ref() {
            fds.push(PollFd::new(input.as_fd(), PollFlags::POLLIN));
        }

        if poll(&mut fds, self.poll_timeout())? == 0 {
            return Ok(None);
        }
        Ok(Some(Readiness {
            connection: is_ready(&fds[0]),
            operator: fds.get(1).is_some_and(is_ready),
        }))
    }

    fn on_tick(&mut self) {
        if self.machine.state() == DeliveryState::Waiting && self.heartbeat.tick() {
            self.send(Outbound::WaitUntilNextSticker);
        }
    }

    fn on_operator_input(&mut self) {
        let Some(input) = self.operator.as_mut() else {
            return;
        };

        let mut buf = [0u8; OPERATOR_READ_SIZE];
        match input.read(&mut buf) {
            Ok(0) => {
                warn!("Operator input closed, local start disabled");
                self.operator = None;
            }
            Ok(n) if buf[..n].contains(&b'\n') => self.operator_start(),
            Ok(_) => {}
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {}
            Err(e) => {
                warn!("Operator input failed ({}), local start disabled", e);
                self.operator = None;
            }
        }
    }

    fn operator_start(&mut self) {
        match self.machine.operator_start() {
            Some(msg) => {
                self.heartbeat.reset();
                self.send(msg);
            }
            None => debug!("Start ignored, delivery already in progress"),
        }
    }

    fn on_connection_readable(&mut self) -> Step {
        let Some(stream) = self.connection.stream_mut() else {
            return self.recover();
        };

        match self.channel.receive(stream) {
            Inbound::Commands(commands) => {
                for command in commands {
                    let reaction = self.machine.handle_command(command, &mut self.sequencer);
                    if reaction == Reaction::Ignored {
                        debug!("'{}' ignored in {}", command, self.machine.state());
                    }
                }
                Step::Continue
            }
            Inbound::Closed => {
                info!("Server closed connection, reconnecting...");
                self.recover()
            }
            Inbound::Fault(e) => {
                warn!("Read failed ({}), reconnecting...", e);
                self.recover()
            }
        }
    }

    fn send(&mut self, msg: Outbound) {
        let Some(stream) = self.connection.stream_mut() else {
            warn!("Not connected, '{}' not sent", msg);
            return;
        };
        match self.channel.send(stream, msg) {
            Ok(()) if msg == Outbound::WaitUntilNextSticker => debug!("Sent: {}", msg),
            Ok(()) => info!("Sent: {}", msg),
            Err(e) => warn!("Sending '{}' failed: {}", msg, e),
        }
    }

    /// Re-establish the link; on success the session starts over in WAITING.
    fn recover(&mut self) -> Step {
        self.channel.reset();
        match self.connection.reconnect(&self.shutdown) {
            Ok(()) => {
                self.machine.reset();
                self.heartbeat.reset();
                Step::Continue
            }
            Err(e) => {
                warn!("{}", e);
                Step::Exit(RunOutcome::Abandoned)
            }
        }
    }
}
