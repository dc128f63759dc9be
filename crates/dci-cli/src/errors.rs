//! Error types surfaced by the `dcictl` runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::executor::CommandError;
use crate::management::QueryError;
use crate::shell::ShellError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("invalid command catalogue: {0}")]
    Catalog(#[from] CatalogError),
    #[error("{0}")]
    Command(#[from] CommandError),
    #[error("{0}")]
    Shell(#[from] ShellError),
    #[error("{0}")]
    Query(#[from] QueryError),
    #[error("failed to attach to the terminal: {0}")]
    ConsoleInput(io::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
}
