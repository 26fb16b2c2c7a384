//! Configuration loaders for success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use hostwatch_config::{Config, ListenEndpoint};
use ortho_config::{OrthoConfig, OrthoError};

use crate::bootstrap::ConfigLoader;

/// Configuration listening on an ephemeral loopback port.
#[must_use]
pub fn loopback_config(connection_limit: Option<usize>) -> Config {
    Config {
        listen: ListenEndpoint::tcp("127.0.0.1", 0),
        connection_limit,
        ..Config::default()
    }
}

/// Loader that fails by passing an unparseable endpoint on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("hostwatchd"),
            OsString::from("--listen"),
            OsString::from("unix:///tmp/hostwatch.sock"),
        ];
        Config::load_from_iter(args)
    }
}
