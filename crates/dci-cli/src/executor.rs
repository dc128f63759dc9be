//! Validates, sends, and decodes device commands.

use dci_protocol::{CommandResult, DecodeError, EncodeError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::CommandCatalog;
use crate::connection::{ConnectionError, DeviceConnection, Dialer, SessionId, TransportError};

/// Tracing target for command execution.
pub const EXECUTOR_TARGET: &str = "dci_cli::executor";

/// Largest request id before the sequence wraps to 1.
pub const MAX_REQUEST_ID: u32 = 59_999;

/// Monotonic request id source, wrapping within `1..=MAX_REQUEST_ID`.
#[derive(Debug, Clone, Default)]
pub struct RequestIds {
    last: u32,
}

impl RequestIds {
    /// Returns the next id.
    pub const fn next_id(&mut self) -> u32 {
        self.last = if self.last >= MAX_REQUEST_ID {
            1
        } else {
            self.last + 1
        };
        self.last
    }
}

/// Classified command failures.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The name is not in the catalog. Nothing was sent.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    /// Arguments do not match the command. Nothing was sent.
    #[error("bad arguments: {0}")]
    BadArguments(#[source] EncodeError),
    /// The session could not be opened.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// The exchange failed. The session has been closed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The device answered with something the command cannot decode.
    #[error("protocol error: {0}")]
    Protocol(#[source] DecodeError),
}

/// Runs catalog commands over one [`DeviceConnection`].
#[derive(Debug)]
pub struct CommandExecutor<'a, D: Dialer> {
    catalog: &'a CommandCatalog,
    connection: DeviceConnection<D>,
    request_ids: RequestIds,
}

impl<'a, D: Dialer> CommandExecutor<'a, D> {
    /// Wraps `connection`, resolving names through `catalog`.
    pub fn new(catalog: &'a CommandCatalog, connection: DeviceConnection<D>) -> Self {
        Self {
            catalog,
            connection,
            request_ids: RequestIds::default(),
        }
    }

    /// Catalog used for lookups.
    pub const fn catalog(&self) -> &'a CommandCatalog {
        self.catalog
    }

    /// Underlying connection.
    pub const fn connection(&self) -> &DeviceConnection<D> {
        &self.connection
    }

    /// Opens the session if needed.
    ///
    /// # Errors
    ///
    /// Propagates [`ConnectionError`].
    pub fn connect(&mut self) -> Result<SessionId, ConnectionError> {
        self.connection.connect()
    }

    /// Closes the session if open.
    pub fn close(&mut self) {
        self.connection.close();
    }

    /// Executes `name` with positional `args`.
    ///
    /// Validation happens before any network activity. A successful call
    /// performs exactly one round trip.
    ///
    /// # Errors
    ///
    /// See [`CommandError`] for the classification.
    pub fn execute<S: AsRef<str>>(
        &mut self,
        name: &str,
        args: &[S],
    ) -> Result<CommandResult, CommandError> {
        let definition = self
            .catalog
            .lookup(name)
            .map_err(|_| CommandError::UnknownCommand(name.to_owned()))?;
        let request_id = self.request_ids.next_id();
        let request = definition
            .encode_request(request_id, args)
            .map_err(CommandError::BadArguments)?;

        let session = self.connection.connect()?;
        debug!(
            target: EXECUTOR_TARGET,
            command = definition.name,
            request_id,
            %session,
            "executing command"
        );

        let response = match self.connection.round_trip(&request, definition.name) {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    target: EXECUTOR_TARGET,
                    command = definition.name,
                    %session,
                    %error,
                    "exchange failed; closing session"
                );
                self.connection.close();
                return Err(CommandError::Transport(error));
            }
        };

        definition
            .decode_response(&response)
            .map_err(CommandError::Protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;
    use std::rc::Rc;

    use dci_config::DeviceEndpoint;
    use rstest::rstest;

    use crate::connection::Timeouts;

    /// Counts dials and refuses every one.
    #[derive(Default, Clone)]
    struct CountingDialer {
        dials: Rc<Cell<usize>>,
    }

    impl Dialer for CountingDialer {
        type Stream = io::Cursor<Vec<u8>>;

        fn dial(
            &self,
            _endpoint: &DeviceEndpoint,
            _timeouts: Timeouts,
        ) -> io::Result<io::Cursor<Vec<u8>>> {
            self.dials.set(self.dials.get() + 1);
            Err(io::Error::from(io::ErrorKind::ConnectionRefused))
        }
    }

    fn executor(catalog: &CommandCatalog, dialer: CountingDialer) -> CommandExecutor<'_, CountingDialer> {
        let connection = DeviceConnection::new(
            dialer,
            DeviceEndpoint::new("10.0.0.5", 11730),
            Timeouts::default(),
        );
        CommandExecutor::new(catalog, connection)
    }

    #[test]
    fn unknown_command_never_dials() {
        let catalog = CommandCatalog::builtin().expect("catalog");
        let dialer = CountingDialer::default();
        let dials = Rc::clone(&dialer.dials);
        let mut executor = executor(&catalog, dialer);

        let error = executor
            .execute::<&str>("NoSuchCommand", &[])
            .expect_err("must fail");

        assert!(matches!(error, CommandError::UnknownCommand(ref name) if name == "NoSuchCommand"));
        assert_eq!(dials.get(), 0);
    }

    #[rstest]
    #[case(&[])]
    #[case(&["not-a-uuid"])]
    #[case(&["0a0b0c0d-0e0f-1011-1213-141516171819", "extra"])]
    fn bad_arguments_never_dial(#[case] args: &[&str]) {
        let catalog = CommandCatalog::builtin().expect("catalog");
        let dialer = CountingDialer::default();
        let dials = Rc::clone(&dialer.dials);
        let mut executor = executor(&catalog, dialer);

        let error = executor.execute("GetCPLInfo", args).expect_err("must fail");

        assert!(matches!(error, CommandError::BadArguments(_)));
        assert_eq!(dials.get(), 0);
    }

    #[test]
    fn connection_errors_propagate_after_one_dial() {
        let catalog = CommandCatalog::builtin().expect("catalog");
        let dialer = CountingDialer::default();
        let dials = Rc::clone(&dialer.dials);
        let mut executor = executor(&catalog, dialer);

        let error = executor
            .execute::<&str>("GetCPLList", &[])
            .expect_err("must fail");

        assert!(matches!(error, CommandError::Connection(_)));
        assert_eq!(dials.get(), 1);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(41, 42)]
    #[case(MAX_REQUEST_ID - 1, MAX_REQUEST_ID)]
    #[case(MAX_REQUEST_ID, 1)]
    fn request_ids_wrap(#[case] last: u32, #[case] expected: u32) {
        assert_eq!(RequestIds { last }.next_id(), expected);
    }
}
