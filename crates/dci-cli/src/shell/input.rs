//! Operator input events for the interactive shell.

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use signal_hook::consts::signal::SIGINT;
use signal_hook::iterator::{Handle, Signals};
use tracing::debug;

use super::SHELL_TARGET;

/// One unit of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A line of text without its terminator.
    Line(String),
    /// Input reached its end (Ctrl-D).
    Eof,
    /// The operator interrupted the shell (Ctrl-C).
    Interrupt,
}

/// Blocking source of [`InputEvent`]s.
pub trait InputSource {
    /// Blocks until the next event is available.
    fn next_event(&mut self) -> InputEvent;
}

/// Terminal input: stdin lines and SIGINT merged into one channel.
///
/// A reader thread forwards stdin lines and a signal thread forwards
/// interrupts. The shell loop performs one blocking receive per iteration.
pub struct ConsoleInput {
    events: Receiver<InputEvent>,
    signals: Handle,
}

impl ConsoleInput {
    /// Starts the reader and signal threads.
    ///
    /// # Errors
    ///
    /// Fails when the SIGINT handler cannot be installed.
    pub fn spawn() -> io::Result<Self> {
        let (sender, events) = mpsc::channel();
        let mut signals = Signals::new([SIGINT])?;
        let handle = signals.handle();

        let interrupt_sender = sender.clone();
        thread::spawn(move || forward_interrupts(signals.forever(), &interrupt_sender));
        thread::spawn(move || forward_stdin(&sender));

        Ok(Self {
            events,
            signals: handle,
        })
    }
}

/// Turns each delivered signal into [`InputEvent::Interrupt`].
///
/// Nothing else happens on this thread. The shell logs the interrupt once it
/// receives the event, so a writer blocked elsewhere cannot hold it back.
fn forward_interrupts(signals: impl IntoIterator<Item = i32>, sender: &Sender<InputEvent>) {
    for _signal in signals {
        if sender.send(InputEvent::Interrupt).is_err() {
            break;
        }
    }
}

fn forward_stdin(sender: &Sender<InputEvent>) {
    let stdin = io::stdin();
    let mut lock = stdin.lock();
    let mut line = String::new();
    loop {
        line.clear();
        let event = match lock.read_line(&mut line) {
            Ok(0) => InputEvent::Eof,
            Ok(_) => InputEvent::Line(line.trim_end_matches(['\r', '\n']).to_owned()),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => {
                debug!(target: SHELL_TARGET, %error, "stdin read failed");
                InputEvent::Eof
            }
        };
        let finished = event == InputEvent::Eof;
        if sender.send(event).is_err() || finished {
            break;
        }
    }
}

impl InputSource for ConsoleInput {
    fn next_event(&mut self) -> InputEvent {
        self.events.recv().unwrap_or(InputEvent::Eof)
    }
}

impl Drop for ConsoleInput {
    fn drop(&mut self) {
        self.signals.close();
    }
}

/// Replays a fixed list of events, then reports end of input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    events: VecDeque<InputEvent>,
}

impl ScriptedInput {
    /// Builds a script from `events`.
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Builds a script of text lines.
    pub fn lines<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self::new(lines.into_iter().map(|line| InputEvent::Line(line.into())))
    }
}

impl InputSource for ScriptedInput {
    fn next_event(&mut self) -> InputEvent {
        self.events.pop_front().unwrap_or(InputEvent::Eof)
    }
}
