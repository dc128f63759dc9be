//! Binary entrypoint for `dcictl`.
//!
//! All behaviour lives in [`dci_cli::run`], which loads configuration, parses
//! the subcommand, and talks to the device.

use std::io::{self, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    // Stderr stays unlocked: log lines from other threads share it.
    let mut stderr = io::stderr();
    dci_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
