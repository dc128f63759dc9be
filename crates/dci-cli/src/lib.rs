//! Command-line runtime for `dcictl`, a client for the Doremi DCP-2000
//! device-control protocol.
//!
//! The runtime owns argument parsing, configuration bootstrapping, and the
//! dispatch of one-shot commands, SNMP queries, and the interactive shell.
//! It is exercised both from the binary entrypoint and from tests where the
//! configuration loader, dialer, and IO streams can be substituted.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use dci_config::Config;
use tracing::warn;

pub mod catalog;
mod cli;
mod config;
pub mod connection;
mod errors;
pub mod executor;
pub mod management;
pub mod output;
pub mod shell;
pub mod telemetry;

pub use catalog::{CatalogError, CommandCatalog, usage_line};
use cli::{Cli, CliCommand, SessionOptions};
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub use connection::{DeviceConnection, Dialer, TcpDialer, Timeouts};
pub(crate) use errors::AppError;
pub use executor::{CommandError, CommandExecutor};
use management::{ALL_QUERIES, ManagementQueryClient, SnmpClient};
pub use output::{OutputFormat, render};
use shell::{ConsoleInput, InteractiveShell};

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `dci_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--device-port",
    "--connect-timeout-ms",
    "--io-timeout-ms",
    "--output-format",
    "--snmp-port",
    "--snmp-community",
    "--snmp-timeout-ms",
];

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

pub(crate) struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader, D: Dialer + Clone = TcpDialer> {
    io: IoStreams<'a, W, E>,
    loader: &'a L,
    dialer: D,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    pub(crate) const fn new(io: IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self {
            io,
            loader,
            dialer: TcpDialer,
        }
    }
}

impl<'a, W, E, L, D> CliRunner<'a, W, E, L, D>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
    D: Dialer + Clone,
{
    #[cfg(test)]
    pub(crate) fn with_dialer<N: Dialer + Clone>(self, dialer: N) -> CliRunner<'a, W, E, L, N> {
        CliRunner {
            io: self.io,
            loader: self.loader,
            dialer,
        }
    }

    pub(crate) fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let result = Cli::try_parse_from(cli_arguments)
            .map_err(AppError::CliUsage)
            .and_then(|cli| {
                self.loader
                    .load(&split.config_arguments)
                    .map(|config| (cli, config))
            })
            .and_then(|(cli, config)| self.dispatch(cli.command, &config));

        match result {
            Ok(exit_code) => exit_code,
            Err(AppError::CliUsage(error)) if !error.use_stderr() => {
                let _ = write!(self.io.stdout, "{error}");
                ExitCode::SUCCESS
            }
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }

    fn dispatch(&mut self, command: CliCommand, config: &Config) -> Result<ExitCode, AppError> {
        match command {
            CliCommand::Version => {
                writeln!(self.io.stdout, "dcictl {}", env!("CARGO_PKG_VERSION"))
                    .map_err(AppError::WriteOutput)?;
                Ok(ExitCode::SUCCESS)
            }
            CliCommand::List => self.list_commands(),
            CliCommand::Snmplist => self.list_queries(config),
            CliCommand::Snmp { address, key } => self.query(config, &address, &key),
            CliCommand::Execute {
                address,
                key,
                args,
                options,
            } => self.execute(config, &address, &key, &args, &options),
            CliCommand::Cli { address, options } => self.interactive(config, &address, &options),
        }
    }

    fn list_commands(&mut self) -> Result<ExitCode, AppError> {
        let catalog = CommandCatalog::builtin()?;
        for definition in catalog.definitions() {
            let usage = usage_line(definition);
            let line = if definition.summary.is_empty() {
                usage
            } else {
                format!("{usage:<30} {}", definition.summary)
            };
            writeln!(self.io.stdout, "{line}").map_err(AppError::WriteOutput)?;
        }
        Ok(ExitCode::SUCCESS)
    }

    fn list_queries(&mut self, config: &Config) -> Result<ExitCode, AppError> {
        let client = ManagementQueryClient::builtin(SnmpClient::from_config(config))?;
        for query in client.queries() {
            writeln!(self.io.stdout, "{:<12} {}", query.name, query.oid)
                .map_err(AppError::WriteOutput)?;
        }
        Ok(ExitCode::SUCCESS)
    }

    fn query(&mut self, config: &Config, address: &str, key: &str) -> Result<ExitCode, AppError> {
        telemetry::initialise(config, false)?;
        let client = ManagementQueryClient::builtin(SnmpClient::from_config(config))?;
        if key != ALL_QUERIES {
            let value = client.query(key, address)?;
            writeln!(self.io.stdout, "{key}: {value}").map_err(AppError::WriteOutput)?;
            return Ok(ExitCode::SUCCESS);
        }

        let mut answered = 0_usize;
        let outcomes = client.query_all(address);
        for (name, outcome) in &outcomes {
            match outcome {
                Ok(value) => {
                    answered += 1;
                    writeln!(self.io.stdout, "{name}: {value}").map_err(AppError::WriteOutput)?;
                }
                Err(error) => {
                    let _ = writeln!(self.io.stderr, "{name}: error: {error}");
                }
            }
        }
        if answered == 0 && !outcomes.is_empty() {
            return Ok(ExitCode::FAILURE);
        }
        Ok(ExitCode::SUCCESS)
    }

    fn select_format(&mut self, config: &Config, options: &SessionOptions) -> OutputFormat {
        let requested = options
            .format
            .as_deref()
            .unwrap_or_else(|| config.output_format());
        let selection = OutputFormat::select(requested);
        if let Some(notice) = selection.fallback_notice {
            warn!(target: executor::EXECUTOR_TARGET, requested, "{notice}");
            let _ = writeln!(self.io.stderr, "warning: {notice}");
        }
        selection.format
    }

    fn connection(
        &self,
        config: &Config,
        address: &str,
        options: &SessionOptions,
    ) -> DeviceConnection<D> {
        DeviceConnection::new(
            self.dialer.clone(),
            config.endpoint_for(address, options.port),
            Timeouts::from_config(config),
        )
        .with_debug(options.debug)
    }

    fn execute(
        &mut self,
        config: &Config,
        address: &str,
        key: &str,
        args: &[String],
        options: &SessionOptions,
    ) -> Result<ExitCode, AppError> {
        telemetry::initialise(config, options.debug)?;
        let format = self.select_format(config, options);
        let catalog = CommandCatalog::builtin()?;
        let mut executor = CommandExecutor::new(&catalog, self.connection(config, address, options));
        let outcome = executor.execute(key, args);
        executor.close();
        let result = outcome?;

        let rendered = render(&result, format);
        self.io
            .stdout
            .write_all(rendered.as_bytes())
            .map_err(AppError::WriteOutput)?;
        if !rendered.ends_with('\n') {
            writeln!(self.io.stdout).map_err(AppError::WriteOutput)?;
        }
        Ok(ExitCode::SUCCESS)
    }

    fn interactive(
        &mut self,
        config: &Config,
        address: &str,
        options: &SessionOptions,
    ) -> Result<ExitCode, AppError> {
        telemetry::initialise(config, options.debug)?;
        let format = self.select_format(config, options);
        let catalog = CommandCatalog::builtin()?;
        let executor = CommandExecutor::new(&catalog, self.connection(config, address, options));
        let input = ConsoleInput::spawn().map_err(AppError::ConsoleInput)?;
        let mut shell = InteractiveShell::new(
            executor,
            input,
            &mut *self.io.stdout,
            &mut *self.io.stderr,
            format,
        );
        shell.run()?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let io = IoStreams::new(stdout, stderr);
    run_with_loader(args, io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<I, W, E, L>(args: I, io: IoStreams<'_, W, E>, loader: &L) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut cli_arguments: Vec<OsString> = Vec::new();
    if let Some(first) = args.first() {
        cli_arguments.push(first.clone());
    }
    if let Some(rest) = args.get(split.command_start..) {
        cli_arguments.extend(rest.iter().cloned());
    }
    cli_arguments
}

#[cfg(test)]
mod tests;
