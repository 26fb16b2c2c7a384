//! Error types for the client runtime.

use std::io;
use std::sync::Arc;

use hostwatch_protocol::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to resolve daemon address {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("failed to connect to daemon at {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[error("failed to prepare the daemon connection: {0}")]
    PrepareConnection(io::Error),
    #[error("failed to start the receiver thread: {0}")]
    SpawnReceiver(io::Error),
    #[error("failed to read input: {0}")]
    ReadInput(io::Error),
    #[error("failed to send command to daemon: {0}")]
    SendCommand(TransportError),
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
}
