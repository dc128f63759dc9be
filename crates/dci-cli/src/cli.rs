//! Command-line argument definitions for `dcictl`.

use clap::{Args, Parser, Subcommand};

/// Command-line interface for the `dcictl` device-control client.
#[derive(Parser, Debug)]
#[command(
    name = "dcictl",
    about = "Operate Doremi DCP-2000 cinema servers over the device-control protocol",
    disable_help_subcommand = true,
    disable_version_flag = true
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Options shared by the commands that open a device session.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct SessionOptions {
    /// Device port; defaults to the configured `device_port`.
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Output format: text, json, xml or html.
    #[arg(long)]
    pub(crate) format: Option<String>,
    /// Logs annotated request and response frames.
    #[arg(long)]
    pub(crate) debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Runs one device command and prints its result.
    Execute {
        /// Device host name or IP address.
        address: String,
        /// Command name, as printed by `list`.
        key: String,
        /// Positional command arguments.
        #[arg(value_name = "ARG", num_args = 0..)]
        args: Vec<String>,
        #[command(flatten)]
        options: SessionOptions,
    },
    /// Lists the available device commands.
    List,
    /// Runs one SNMP query, or every query with `All`.
    Snmp {
        /// Device host name or IP address.
        address: String,
        /// Query name, as printed by `snmplist`, or `All`.
        key: String,
    },
    /// Lists the available SNMP queries.
    Snmplist,
    /// Opens an interactive shell on one device session.
    Cli {
        /// Device host name or IP address.
        address: String,
        #[command(flatten)]
        options: SessionOptions,
    },
    /// Prints the client version.
    Version,
}
