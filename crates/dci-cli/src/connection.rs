//! Device sessions over a stream socket.
//!
//! A [`DeviceConnection`] owns at most one open session to a single device.
//! Streams are produced by a [`Dialer`], so tests can substitute in-memory or
//! counting transports for the TCP one.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use dci_config::{Config, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_IO_TIMEOUT_MS, DeviceEndpoint};
use dci_protocol::{Frame, FrameError};
use thiserror::Error;
use tracing::{debug, warn};

/// Tracing target for session and frame events.
pub const CONNECTION_TARGET: &str = "dci_cli::connection";

/// Timeouts applied to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Bound for establishing the connection.
    pub connect: Duration,
    /// Bound for each read or write on the open socket.
    pub io: Duration,
}

impl Timeouts {
    /// Reads the configured timeouts.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            connect: config.connect_timeout(),
            io: config.io_timeout(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            io: Duration::from_millis(DEFAULT_IO_TIMEOUT_MS),
        }
    }
}

/// Opens byte streams to devices.
pub trait Dialer {
    /// Stream type produced by a successful dial.
    type Stream: Read + Write;

    /// Opens a stream to `endpoint`, honouring `timeouts`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error for resolution, refusal, or timeout.
    fn dial(&self, endpoint: &DeviceEndpoint, timeouts: Timeouts) -> io::Result<Self::Stream>;
}

/// Production dialer using blocking TCP sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    type Stream = TcpStream;

    fn dial(&self, endpoint: &DeviceEndpoint, timeouts: Timeouts) -> io::Result<TcpStream> {
        let address = resolve_tcp_address(endpoint.host(), endpoint.port())?;
        let stream = TcpStream::connect_timeout(&address, timeouts.connect)?;
        stream.set_read_timeout(Some(timeouts.io))?;
        stream.set_write_timeout(Some(timeouts.io))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

/// Identifies one opened session within a connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Numeric value, starting at 1 for the first session.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

struct Session<S> {
    id: SessionId,
    stream: S,
}

/// Failure to open a session.
#[derive(Debug, Error)]
#[error("failed to connect to {address}:{port}: {source}")]
pub struct ConnectionError {
    /// Host or address as given by the operator.
    pub address: String,
    /// Device port.
    pub port: u16,
    /// Underlying cause.
    #[source]
    pub source: io::Error,
}

/// Failure during an exchange on an open session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No session is open.
    #[error("no open session")]
    NotConnected,
    /// Writing the request failed or timed out.
    #[error("failed to send request: {0}")]
    Send(#[source] io::Error),
    /// Reading the response failed or timed out.
    #[error("failed to read response: {0}")]
    Receive(#[source] io::Error),
    /// The device closed the stream before a complete frame arrived.
    #[error("device closed the session mid-frame: {0}")]
    Truncated(#[source] FrameError),
    /// The response was not a valid frame.
    #[error("invalid response framing: {0}")]
    Framing(#[source] FrameError),
}

impl From<FrameError> for TransportError {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::Io(source) => Self::Receive(source),
            truncated @ FrameError::Truncated { .. } => Self::Truncated(truncated),
            other => Self::Framing(other),
        }
    }
}

/// Single-device session holder.
pub struct DeviceConnection<D: Dialer = TcpDialer> {
    dialer: D,
    endpoint: DeviceEndpoint,
    timeouts: Timeouts,
    debug: bool,
    session: Option<Session<D::Stream>>,
    sessions_opened: u64,
}

impl<D: Dialer> DeviceConnection<D> {
    /// Creates a disconnected handle for `endpoint`.
    pub fn new(dialer: D, endpoint: DeviceEndpoint, timeouts: Timeouts) -> Self {
        Self {
            dialer,
            endpoint,
            timeouts,
            debug: false,
            session: None,
            sessions_opened: 0,
        }
    }

    /// Enables annotated frame dumps on the `debug` level.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Target device.
    pub const fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    /// Whether a session is open.
    pub const fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Identifier of the open session, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|session| session.id)
    }

    /// Opens a session unless one is already open. Makes a single attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] naming the address, port, and cause.
    pub fn connect(&mut self) -> Result<SessionId, ConnectionError> {
        if let Some(session) = &self.session {
            return Ok(session.id);
        }
        let stream = self
            .dialer
            .dial(&self.endpoint, self.timeouts)
            .map_err(|source| ConnectionError {
                address: self.endpoint.host().to_owned(),
                port: self.endpoint.port(),
                source,
            })?;
        self.sessions_opened += 1;
        let id = SessionId(self.sessions_opened);
        debug!(
            target: CONNECTION_TARGET,
            endpoint = %self.endpoint,
            session = %id,
            "session opened"
        );
        self.session = Some(Session { id, stream });
        Ok(id)
    }

    /// Sends `request` and blocks until one complete response frame arrives.
    ///
    /// `label` names the command in debug dumps.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on socket failure, timeout, truncation, or
    /// broken framing. The session is left open; callers decide whether to
    /// close it.
    pub fn round_trip(&mut self, request: &Frame, label: &str) -> Result<Frame, TransportError> {
        let debug = self.debug;
        let session = self.session.as_mut().ok_or(TransportError::NotConnected)?;
        let bytes = request.encode().map_err(TransportError::Framing)?;
        if debug {
            debug!(
                target: CONNECTION_TARGET,
                session = %session.id,
                "sending {label} request\n{}",
                request.describe(Some(label))
            );
        }
        session
            .stream
            .write_all(&bytes)
            .and_then(|()| session.stream.flush())
            .map_err(TransportError::Send)?;

        let response = Frame::read_from(&mut session.stream)?;
        if debug {
            debug!(
                target: CONNECTION_TARGET,
                session = %session.id,
                "received {label} response\n{}",
                response.describe(Some(label))
            );
        }
        if response.request_id != request.request_id {
            warn!(
                target: CONNECTION_TARGET,
                session = %session.id,
                sent = request.request_id,
                received = response.request_id,
                "response carries a different request id"
            );
        }
        Ok(response)
    }

    /// Releases the session. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(
                target: CONNECTION_TARGET,
                endpoint = %self.endpoint,
                session = %session.id,
                "session closed"
            );
        }
    }
}

impl<D: Dialer> Drop for DeviceConnection<D> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<D: Dialer> fmt::Debug for DeviceConnection<D> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DeviceConnection")
            .field("endpoint", &self.endpoint)
            .field("timeouts", &self.timeouts)
            .field("debug", &self.debug)
            .field("session", &self.session_id())
            .finish_non_exhaustive()
    }
}
