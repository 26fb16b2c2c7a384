//! Command-line flags owned by the client itself.

use clap::Parser;
use hostwatch_config::ListenEndpoint;

/// Interactive client for the hostwatch daemon.
#[derive(Parser, Debug)]
#[command(name = "hostwatch", version)]
pub(crate) struct Cli {
    /// Daemon to connect to, as `host:port` or `tcp://host:port`.
    ///
    /// Defaults to the configured listen endpoint.
    #[arg(long, value_name = "ENDPOINT")]
    pub(crate) server: Option<ListenEndpoint>,
    /// Seconds to wait for the connection to be established.
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub(crate) connect_timeout: u64,
}
