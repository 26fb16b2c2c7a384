//! Interactive client runtime for the hostwatch daemon.
//!
//! The client loads configuration, connects to the daemon, and then runs two
//! loops: a receiver thread that renders every envelope the daemon sends, and
//! the caller's input loop that forwards one command per line. The runtime
//! takes its streams as parameters so tests can drive it without a terminal.

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hostwatch_config::Config;
use hostwatch_protocol::{MAX_COMMAND_BYTES, Transport, TransportError};

mod cli;
mod config;
mod errors;
mod render;
mod session;
mod transport;

use cli::Cli;
use config::{client_arguments, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use render::Output;
use session::{ClientSession, RECEIVER_JOIN_TIMEOUT};
use transport::ClientConnection;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `hostwatch_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--listen",
    "--connection-limit",
    "--default-interval-secs",
    "--default-mode",
    "--log-filter",
    "--log-format",
];

const EXIT_COMMAND: &str = "/exit";

/// Runs the client with the process arguments and standard streams.
#[must_use]
pub fn run<I, R, W, E>(args: I, input: R, stdout: W, stderr: E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write + Send + 'static,
    E: Write + Send + 'static,
{
    run_with_loader(args, input, Output::new(stdout, stderr), &OrthoConfigLoader)
}

/// Runs the client with a custom configuration loader.
pub(crate) fn run_with_loader<I, R, W, E, L>(
    args: I,
    input: R,
    output: Output<W, E>,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write + Send + 'static,
    E: Write + Send + 'static,
    L: ConfigLoader,
{
    match run_client(args, input, &output, loader) {
        Ok(()) => ExitCode::SUCCESS,
        // `--help` and `--version` arrive as clap errors that belong on stdout.
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            let _ = output.line(error.to_string().trim_end());
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = output.problem(&error.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run_client<I, R, W, E, L>(
    args: I,
    input: R,
    output: &Output<W, E>,
    loader: &L,
) -> Result<(), AppError>
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write + Send + 'static,
    E: Write + Send + 'static,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = Cli::try_parse_from(client_arguments(&args, &split)).map_err(AppError::CliUsage)?;
    let config: Config = loader.load(&split.config_arguments)?;

    let endpoint = cli.server.unwrap_or_else(|| config.listen().clone());
    let connection =
        ClientConnection::connect(&endpoint, Duration::from_secs(cli.connect_timeout))?;
    output
        .line(&format!("Connected to {}", connection.peer()))
        .map_err(AppError::WriteOutput)?;

    let transport: Arc<dyn Transport> = Arc::new(connection);
    let session = ClientSession::start(transport, output.clone())?;
    let result = forward_commands(&session, input, output);
    session.shutdown();
    result
}

/// Forwards stdin to the daemon until `/exit`, end of input, or disconnect.
fn forward_commands<R, W, E>(
    session: &ClientSession<W, E>,
    input: R,
    output: &Output<W, E>,
) -> Result<(), AppError>
where
    R: BufRead,
    W: Write + Send + 'static,
    E: Write + Send + 'static,
{
    for line in input.lines() {
        let line = line.map_err(AppError::ReadInput)?;
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if command.len() > MAX_COMMAND_BYTES {
            output
                .problem(&format!(
                    "error: Command exceeds the {MAX_COMMAND_BYTES} byte limit and was not sent."
                ))
                .map_err(AppError::WriteOutput)?;
            continue;
        }
        if !session.is_connected() {
            return Ok(());
        }
        if command.eq_ignore_ascii_case(EXIT_COMMAND) {
            return finish(session.exit(RECEIVER_JOIN_TIMEOUT));
        }
        finish(session.send(command))?;
    }

    // End of input behaves like `/exit`.
    if session.is_connected() {
        finish(session.exit(RECEIVER_JOIN_TIMEOUT))?;
    }
    Ok(())
}

/// A connection the daemon already closed is a normal way to finish.
fn finish(result: Result<(), TransportError>) -> Result<(), AppError> {
    match result {
        Ok(()) | Err(TransportError::Closed) => Ok(()),
        Err(TransportError::Io(error))
            if matches!(
                error.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ) =>
        {
            Ok(())
        }
        Err(error) => Err(AppError::SendCommand(error)),
    }
}
