//! Shared configuration for the hostwatch daemon and client.
//!
//! Values are layered by `ortho_config`: built-in defaults first, then a
//! `hostwatch.toml` file, then `HOSTWATCH_*` environment variables, and
//! finally command-line flags. Both binaries load the same [`Config`] so the
//! client dials the endpoint the daemon listens on.

mod defaults;
mod endpoint;
mod logging;

use std::num::NonZeroUsize;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_INTERVAL_SECS, DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT, DEFAULT_LOG_FILTER,
    default_listen_endpoint, default_log_filter, default_log_filter_string, default_log_format,
    default_monitor_mode,
};
pub use endpoint::{EndpointParseError, ListenEndpoint};
pub use hostwatch_protocol::MonitorMode;
pub use logging::{LogFormat, LogFormatParseError};

/// Longest polling interval a monitor may request.
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Resolved configuration shared by `hostwatchd` and `hostwatch`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "HOSTWATCH")]
pub struct Config {
    /// Endpoint the daemon binds and the client dials.
    #[ortho_config(default = defaults::default_listen_endpoint())]
    pub listen: ListenEndpoint,
    /// Maximum number of concurrent sessions. The daemon refuses to start
    /// without one.
    pub connection_limit: Option<usize>,
    /// Interval, in seconds, used when a monitor command omits `-t=`.
    #[ortho_config(default = defaults::DEFAULT_INTERVAL_SECS)]
    pub default_interval_secs: u64,
    /// Output mode used when a monitor command omits `-m=`.
    #[ortho_config(default = defaults::default_monitor_mode())]
    pub default_mode: MonitorMode,
    /// `tracing` filter directive for the daemon.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Daemon log output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            connection_limit: None,
            default_interval_secs: DEFAULT_INTERVAL_SECS,
            default_mode: default_monitor_mode(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint the daemon binds and the client dials.
    #[must_use]
    pub fn listen(&self) -> &ListenEndpoint {
        &self.listen
    }

    /// Configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Configured log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Output mode used when a monitor command omits `-m=`.
    #[must_use]
    pub fn default_mode(&self) -> MonitorMode {
        self.default_mode
    }

    /// Validated session cap for the admission controller.
    ///
    /// # Errors
    ///
    /// Fails when the limit is unset or zero.
    pub fn admission_limit(&self) -> Result<NonZeroUsize, ConfigError> {
        let limit = self
            .connection_limit
            .ok_or(ConfigError::MissingConnectionLimit)?;
        NonZeroUsize::new(limit).ok_or(ConfigError::ZeroConnectionLimit)
    }

    /// Validated default polling interval.
    ///
    /// # Errors
    ///
    /// Fails when the interval is zero or longer than [`MAX_INTERVAL_SECS`].
    pub fn default_interval(&self) -> Result<Duration, ConfigError> {
        match self.default_interval_secs {
            0 => Err(ConfigError::ZeroInterval),
            secs if secs > MAX_INTERVAL_SECS => Err(ConfigError::IntervalTooLong {
                secs,
                max: MAX_INTERVAL_SECS,
            }),
            secs => Ok(Duration::from_secs(secs)),
        }
    }

    /// Checks every value the daemon relies on.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate_for_daemon(&self) -> Result<(), ConfigError> {
        self.admission_limit()?;
        self.default_interval()?;
        Ok(())
    }
}

/// Settings that loaded successfully but cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `connection_limit` was never set.
    #[error(
        "connection_limit must be set (use --connection-limit or HOSTWATCH_CONNECTION_LIMIT)"
    )]
    MissingConnectionLimit,
    /// `connection_limit` was zero.
    #[error("connection_limit must be at least 1")]
    ZeroConnectionLimit,
    /// `default_interval_secs` was zero.
    #[error("default_interval_secs must be at least 1")]
    ZeroInterval,
    /// `default_interval_secs` exceeded the supported maximum.
    #[error("default_interval_secs of {secs} exceeds the {max} second maximum")]
    IntervalTooLong {
        /// Configured value.
        secs: u64,
        /// Supported maximum.
        max: u64,
    },
}
