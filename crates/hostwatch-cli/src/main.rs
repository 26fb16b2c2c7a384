//! Entrypoint for the `hostwatch` interactive client.
//!
//! The binary delegates to [`hostwatch_cli::run`], which connects to the
//! configured daemon and forwards commands typed on stdin.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    hostwatch_cli::run(
        std::env::args_os(),
        io::stdin().lock(),
        io::stdout(),
        io::stderr(),
    )
}
