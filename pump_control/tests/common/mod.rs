//! Shared fixtures for controller integration tests.
//!
//! A loopback `TcpListener` plays the coordinator, a `UnixStream` pair
//! stands in for the operator's terminal, and every line write and delay is
//! recorded in one ordered log.

#![allow(dead_code)]

use pump_common::config::{CoordinatorConfig, TimingConfig};
use pump_common::hal::config::LinesConfig;
use pump_common::hal::driver::{LineDriver, LineError, LineId};
use pump_control::sequencer::Delay;
use pump_control::{
    Actuators, ConnectionManager, Controller, ShutdownFlag, Step, ValveSequencer, VentTiming,
};
use std::io::{BufRead, BufReader, Write};
use std::net::{Ipv4Addr, Shutdown, TcpListener, TcpStream};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded hardware-facing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Set(LineId, bool),
    Wait(Duration),
    Release,
}

pub type ActionLog = Arc<Mutex<Vec<Action>>>;

/// Line driver that records writes instead of touching hardware.
pub struct RecordingDriver {
    log: ActionLog,
    held: bool,
}

impl RecordingDriver {
    pub fn new(log: ActionLog) -> Self {
        Self { log, held: false }
    }
}

impl LineDriver for RecordingDriver {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn request(&mut self, _config: &LinesConfig) -> Result<(), LineError> {
        self.held = true;
        Ok(())
    }

    fn set_value(&mut self, line: LineId, asserted: bool) -> Result<(), LineError> {
        if !self.held {
            return Err(LineError::NotRequested(line));
        }
        self.log.lock().unwrap().push(Action::Set(line, asserted));
        Ok(())
    }

    fn release(&mut self) -> Result<(), LineError> {
        if self.held {
            self.log.lock().unwrap().push(Action::Release);
        }
        self.held = false;
        Ok(())
    }

    fn is_requested(&self) -> bool {
        self.held
    }
}

/// Delay that records the requested duration and returns immediately.
pub struct RecordingDelay(pub ActionLog);

impl Delay for RecordingDelay {
    fn delay(&mut self, duration: Duration) {
        self.0.lock().unwrap().push(Action::Wait(duration));
    }
}

/// Tick used by the harness; short so idle passes stay fast.
pub const TEST_TICK_MS: u64 = 20;
/// Heartbeat period used by the harness.
pub const TEST_HEARTBEAT_TICKS: u32 = 3;

/// A connected controller with both ends of every channel in reach.
pub struct Harness {
    pub controller: Controller<UnixStream>,
    pub listener: TcpListener,
    /// Coordinator end of the link; `None` after a reset.
    pub link: Option<BufReader<TcpStream>>,
    pub operator: UnixStream,
    pub log: ActionLog,
    pub shutdown: ShutdownFlag,
}

impl Harness {
    pub fn new() -> Self {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind coordinator");
        let addr = listener.local_addr().expect("local addr");
        let coordinator_config = CoordinatorConfig {
            host: addr.ip(),
            port: addr.port(),
            connect_timeout_ms: 500,
            retry_backoff_ms: 10,
        };
        let timing = TimingConfig {
            tick_ms: TEST_TICK_MS,
            heartbeat_ticks: TEST_HEARTBEAT_TICKS,
            ..TimingConfig::default()
        };

        let log = ActionLog::default();
        let actuators = Actuators::acquire(
            Box::new(RecordingDriver::new(log.clone())),
            &LinesConfig::default(),
        )
        .expect("acquire lines");
        let mut sequencer = ValveSequencer::new(
            actuators,
            VentTiming::from(&timing),
            Box::new(RecordingDelay(log.clone())),
        );
        sequencer.force_safe().expect("force safe");
        log.lock().unwrap().clear();

        let shutdown = ShutdownFlag::new();
        let mut connection = ConnectionManager::new(&coordinator_config);
        connection.connect(&shutdown).expect("connect");
        let (coordinator, _) = listener.accept().expect("accept");

        let (operator, operator_input) = UnixStream::pair().expect("operator pair");
        let controller = Controller::new(
            connection,
            sequencer,
            Some(operator_input),
            &timing,
            shutdown.clone(),
        );

        Self {
            controller,
            listener,
            link: Some(link_for(coordinator)),
            operator,
            log,
            shutdown,
        }
    }

    fn link(&mut self) -> &mut BufReader<TcpStream> {
        self.link.as_mut().expect("coordinator link is open")
    }

    /// Coordinator sends raw bytes to the controller.
    pub fn coordinator_says(&mut self, text: &str) {
        self.link()
            .get_mut()
            .write_all(text.as_bytes())
            .expect("coordinator write");
    }

    /// Next newline-terminated message the controller sent.
    pub fn next_message(&mut self) -> String {
        let mut line = String::new();
        self.link().read_line(&mut line).expect("coordinator read");
        line
    }

    /// Coordinator closes its end of the link (orderly FIN).
    pub fn hang_up(&mut self) {
        self.link()
            .get_ref()
            .shutdown(Shutdown::Both)
            .expect("coordinator shutdown");
    }

    /// Coordinator aborts the link, so the controller's next read fails
    /// with a connection reset instead of seeing end of stream.
    pub fn reset_link(&mut self) {
        let link = self.link.take().expect("coordinator link is open");
        let linger = libc::linger {
            l_onoff: 1,
            l_linger: 0,
        };
        // SAFETY: valid socket descriptor and a correctly sized option value.
        let rc = unsafe {
            libc::setsockopt(
                link.get_ref().as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_LINGER,
                (&linger as *const libc::linger).cast(),
                std::mem::size_of::<libc::linger>() as libc::socklen_t,
            )
        };
        assert_eq!(rc, 0, "SO_LINGER not set");
        // Closing with a zero linger sends RST.
        drop(link);
    }

    /// Operator presses Enter.
    pub fn press_enter(&mut self) {
        self.operator.write_all(b"\n").expect("operator write");
    }

    /// Run loop passes until `done` holds.
    pub fn pump_until(&mut self, mut done: impl FnMut(&Controller<UnixStream>) -> bool) {
        for _ in 0..200 {
            if done(&self.controller) {
                return;
            }
            assert_eq!(self.controller.poll_once(), Step::Continue);
        }
        panic!("condition not reached within 200 loop passes");
    }

    /// Run exactly `n` loop passes.
    pub fn passes(&mut self, n: usize) {
        for _ in 0..n {
            assert_eq!(self.controller.poll_once(), Step::Continue);
        }
    }

    /// Take the actions recorded so far.
    pub fn actions(&self) -> Vec<Action> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }

    /// Accept the controller's next connection as the new coordinator end.
    pub fn accept_reconnect(&mut self) {
        let (coordinator, _) = self.listener.accept().expect("accept reconnect");
        self.link = Some(link_for(coordinator));
    }
}

fn link_for(stream: TcpStream) -> BufReader<TcpStream> {
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("read timeout");
    BufReader::new(stream)
}
