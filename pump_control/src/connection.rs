//! Connection manager: the single outbound link to the coordinator.
//!
//! `connect()` and `reconnect()` share one retry loop: bounded connect
//! attempt, fixed backoff on failure, unlimited retries. The shutdown flag
//! is checked before every attempt and is the only way out before success.
//! The previous socket is always closed before a new one is opened.
//! Established sockets are non-blocking; only the readiness wait suspends
//! the controller.

use crate::shutdown::ShutdownFlag;
use pump_common::config::CoordinatorConfig;
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Lifecycle of the coordinator link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket.
    Disconnected,
    /// Attempt in progress.
    Connecting,
    /// Socket established.
    Connected,
}

/// Connection establishment errors.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Shutdown observed while retrying.
    #[error("Shutdown requested while connecting to {0}")]
    Abandoned(SocketAddr),

    /// The very first socket could not be created.
    #[error("Cannot create socket for {addr}: {source}")]
    SocketSetup {
        /// Target endpoint
        addr: SocketAddr,
        /// OS error
        #[source]
        source: io::Error,
    },
}

/// Owner of the coordinator socket.
#[derive(Debug)]
pub struct ConnectionManager {
    addr: SocketAddr,
    connect_timeout: Duration,
    retry_backoff: Duration,
    stream: Option<TcpStream>,
    state: ConnectionState,
    attempts: u64,
    sessions: u64,
}

impl ConnectionManager {
    /// Create a disconnected manager for the configured endpoint.
    pub fn new(config: &CoordinatorConfig) -> Self {
        Self {
            addr: config.socket_addr(),
            connect_timeout: config.connect_timeout(),
            retry_backoff: config.retry_backoff(),
            stream: None,
            state: ConnectionState::Disconnected,
            attempts: 0,
            sessions: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Established socket, if any.
    pub fn stream(&self) -> Option<&TcpStream> {
        self.stream.as_ref()
    }

    /// Established socket, if any.
    pub fn stream_mut(&mut self) -> Option<&mut TcpStream> {
        self.stream.as_mut()
    }

    /// Connect attempts made since creation.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Connections established since creation.
    pub fn sessions(&self) -> u64 {
        self.sessions
    }

    /// Initial connection at startup.
    ///
    /// # Errors
    /// `SocketSetup` if the first socket cannot be created at all,
    /// `Abandoned` if shutdown is requested before a connection succeeds.
    pub fn connect(&mut self, shutdown: &ShutdownFlag) -> Result<(), ConnectError> {
        info!("Attempting to connect to server at {}", self.addr);
        self.establish(shutdown, true)
    }

    /// Re-establish the link after a transport failure.
    ///
    /// # Errors
    /// `Abandoned` if shutdown is requested before a connection succeeds.
    pub fn reconnect(&mut self, shutdown: &ShutdownFlag) -> Result<(), ConnectError> {
        info!("Reconnecting to server at {}", self.addr);
        self.establish(shutdown, false)
    }

    /// Close the socket, if open.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("Closed connection to {}", self.addr);
        }
        self.state = ConnectionState::Disconnected;
    }

    fn establish(&mut self, shutdown: &ShutdownFlag, initial: bool) -> Result<(), ConnectError> {
        self.close();
        let mut first_attempt = initial;

        loop {
            if shutdown.is_requested() {
                self.state = ConnectionState::Disconnected;
                return Err(ConnectError::Abandoned(self.addr));
            }

            self.state = ConnectionState::Connecting;
            self.attempts += 1;
            match TcpStream::connect_timeout(&self.addr, self.connect_timeout)
                .and_then(|stream| stream.set_nonblocking(true).map(|()| stream))
            {
                Ok(stream) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("TCP_NODELAY not set: {}", e);
                    }
                    self.stream = Some(stream);
                    self.state = ConnectionState::Connected;
                    self.sessions += 1;
                    info!(
                        "{} to server at {}",
                        if initial { "Connected" } else { "Reconnected" },
                        self.addr
                    );
                    return Ok(());
                }
                Err(e) if first_attempt && is_socket_setup_error(&e) => {
                    self.state = ConnectionState::Disconnected;
                    return Err(ConnectError::SocketSetup {
                        addr: self.addr,
                        source: e,
                    });
                }
                Err(e) => {
                    self.state = ConnectionState::Disconnected;
                    warn!(
                        "{} failed ({}), retrying in {:?}",
                        if initial { "Connect" } else { "Reconnect" },
                        e,
                        self.retry_backoff
                    );
                }
            }

            first_attempt = false;
            std::thread::sleep(self.retry_backoff);
        }
    }
}

/// Errors that mean no socket could be created, as opposed to the peer
/// being unreachable.
fn is_socket_setup_error(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(
            libc::EMFILE
                | libc::ENFILE
                | libc::ENOBUFS
                | libc::ENOMEM
                | libc::EAFNOSUPPORT
                | libc::EPROTONOSUPPORT
        )
    )
}
