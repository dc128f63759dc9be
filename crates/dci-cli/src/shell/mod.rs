//! Interactive read-execute-print loop over one device session.
//!
//! The shell is an explicit state machine:
//!
//! ```text
//! Disconnected --connect--> Connected --command--> Executing --+--> Connected
//!       ^                                                      |
//!       +------------------- transport failure ----------------+
//! any state --EOF / interrupt / exit--> Closed
//! ```
//!
//! Each iteration performs exactly one blocking read from its
//! [`InputSource`].

mod input;
mod tokenizer;

use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::usage_line;
use crate::connection::{ConnectionError, Dialer, SessionId};
use crate::executor::CommandExecutor;
use crate::output::{OutputFormat, render};

pub use input::{ConsoleInput, InputEvent, InputSource, ScriptedInput};
pub use tokenizer::{TokenizeError, split_line};

/// Tracing target for shell lifecycle events.
pub const SHELL_TARGET: &str = "dci_cli::shell";

/// Prompt printed before each read.
pub const PROMPT: &str = "dcictl> ";

/// Closing line of the general help text.
pub const INTERRUPT_NOTE: &str = "Ctrl-C leaves the shell. While a command is in flight it takes \
effect once the device answers or the I/O timeout (io_timeout_ms) expires.";

const BUILTINS: &[(&str, &str)] = &[
    ("help [command]", "List commands, or show the parameters of one command"),
    ("exit", "Leave the shell (Ctrl-D also works)"),
    ("quit", "Leave the shell (Ctrl-D also works)"),
];

/// Lifecycle state of the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    /// No session is open.
    Disconnected,
    /// A session is open and the shell is waiting for input.
    Connected,
    /// A command is in flight.
    Executing,
    /// The shell has finished.
    Closed,
}

/// Fatal shell failures.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The initial connection failed.
    #[error(transparent)]
    Connect(#[from] ConnectionError),
    /// Writing to the terminal failed.
    #[error("failed to write shell output: {0}")]
    Output(#[source] io::Error),
}

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next event.
    Continue,
    /// Leave the loop.
    Exit,
}

/// The interactive shell.
pub struct InteractiveShell<'a, D, I, W, E>
where
    D: Dialer,
    I: InputSource,
    W: Write,
    E: Write,
{
    executor: CommandExecutor<'a, D>,
    input: I,
    stdout: &'a mut W,
    stderr: &'a mut E,
    format: OutputFormat,
    state: ShellState,
}

impl<'a, D, I, W, E> InteractiveShell<'a, D, I, W, E>
where
    D: Dialer,
    I: InputSource,
    W: Write,
    E: Write,
{
    /// Builds a disconnected shell.
    pub fn new(
        executor: CommandExecutor<'a, D>,
        input: I,
        stdout: &'a mut W,
        stderr: &'a mut E,
        format: OutputFormat,
    ) -> Self {
        Self {
            executor,
            input,
            stdout,
            stderr,
            format,
            state: ShellState::Disconnected,
        }
    }

    /// Current state.
    pub const fn state(&self) -> ShellState {
        self.state
    }

    /// Identifier of the open session, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.executor.connection().session_id()
    }

    /// Connects, loops until the operator leaves, and closes the session.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Connect`] when the first connection fails and
    /// [`ShellError::Output`] when the terminal cannot be written.
    pub fn run(&mut self) -> Result<(), ShellError> {
        let outcome = self.start().and_then(|()| {
            while self.step()? == Flow::Continue {}
            Ok(())
        });
        self.finish();
        match outcome {
            Ok(()) => {
                writeln!(self.stdout, "\nGoodbye!").map_err(ShellError::Output)?;
                self.stdout.flush().map_err(ShellError::Output)
            }
            Err(error) => Err(error),
        }
    }

    /// Opens the initial session.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Connect`] when the device is unreachable.
    pub fn start(&mut self) -> Result<(), ShellError> {
        let endpoint = self.executor.connection().endpoint().clone();
        writeln!(self.stdout, "Connecting to {endpoint}...").map_err(ShellError::Output)?;
        let session = self.executor.connect()?;
        self.state = ShellState::Connected;
        info!(target: SHELL_TARGET, %endpoint, %session, "shell connected");
        writeln!(
            self.stdout,
            "Connected to {endpoint}. Type 'help' for commands, 'exit' to leave."
        )
        .map_err(ShellError::Output)
    }

    /// Reads and handles one input event.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Output`] when the terminal cannot be written.
    pub fn step(&mut self) -> Result<Flow, ShellError> {
        write!(self.stdout, "{PROMPT}").map_err(ShellError::Output)?;
        self.stdout.flush().map_err(ShellError::Output)?;
        match self.input.next_event() {
            InputEvent::Line(line) => self.handle_line(&line),
            InputEvent::Eof => {
                debug!(target: SHELL_TARGET, "end of input");
                self.state = ShellState::Closed;
                Ok(Flow::Exit)
            }
            InputEvent::Interrupt => {
                debug!(target: SHELL_TARGET, "interrupted");
                self.state = ShellState::Closed;
                Ok(Flow::Exit)
            }
        }
    }

    fn handle_line(&mut self, line: &str) -> Result<Flow, ShellError> {
        let words = match split_line(line) {
            Ok(words) => words,
            Err(error) => {
                self.report(&format!("error: {error}; line ignored"))?;
                return Ok(Flow::Continue);
            }
        };
        let Some((command, args)) = words.split_first() else {
            return Ok(Flow::Continue);
        };
        match command.as_str() {
            "exit" | "quit" => {
                self.state = ShellState::Closed;
                Ok(Flow::Exit)
            }
            "help" => {
                self.help(args.first().map(String::as_str))?;
                Ok(Flow::Continue)
            }
            name => {
                self.execute(name, args)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn execute(&mut self, name: &str, args: &[String]) -> Result<(), ShellError> {
        if self.state == ShellState::Disconnected && self.executor.catalog().contains(name) {
            info!(target: SHELL_TARGET, command = name, "reconnecting");
        }
        self.state = ShellState::Executing;
        let outcome = self.executor.execute(name, args);
        self.state = if self.executor.connection().is_connected() {
            ShellState::Connected
        } else {
            ShellState::Disconnected
        };
        match outcome {
            Ok(result) => {
                let rendered = render(&result, self.format);
                self.stdout
                    .write_all(rendered.as_bytes())
                    .map_err(ShellError::Output)?;
                if !rendered.ends_with('\n') {
                    writeln!(self.stdout).map_err(ShellError::Output)?;
                }
                Ok(())
            }
            Err(error) => self.report(&format!("error: {error}")),
        }
    }

    fn help(&mut self, topic: Option<&str>) -> Result<(), ShellError> {
        let catalog = self.executor.catalog();
        let text = match topic {
            None => {
                let mut text = String::from("Device commands:\n");
                for definition in catalog.definitions() {
                    text.push_str(&format!("  {}\n", usage_line(definition)));
                }
                text.push_str("Shell commands:\n");
                for (usage, _) in BUILTINS {
                    text.push_str(&format!("  {usage}\n"));
                }
                text.push_str(INTERRUPT_NOTE);
                text.push('\n');
                text
            }
            Some(name) => match catalog.lookup(name) {
                Ok(definition) => {
                    let mut text = format!("{}\n", usage_line(definition));
                    if !definition.summary.is_empty() {
                        text.push_str(&format!("  {}\n", definition.summary));
                    }
                    if definition.parameters.is_empty() {
                        text.push_str("  Parameters: none\n");
                    } else {
                        text.push_str("  Parameters:\n");
                        for parameter in definition.parameters {
                            text.push_str(&format!("    {} ({})\n", parameter.name, parameter.kind));
                        }
                    }
                    text
                }
                Err(_) => BUILTINS
                    .iter()
                    .find(|(usage, _)| usage.split_whitespace().next() == Some(name))
                    .map_or_else(
                        || format!("No help for '{name}'.\n"),
                        |(usage, summary)| format!("{usage}\n  {summary}\n"),
                    ),
            },
        };
        self.stdout
            .write_all(text.as_bytes())
            .map_err(ShellError::Output)
    }

    fn report(&mut self, message: &str) -> Result<(), ShellError> {
        writeln!(self.stderr, "{message}").map_err(ShellError::Output)
    }

    fn finish(&mut self) {
        self.executor.close();
        self.state = ShellState::Closed;
    }
}
