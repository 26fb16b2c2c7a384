use hostwatch_protocol::MonitorMode;

use crate::endpoint::ListenEndpoint;

/// Host the daemon binds when nothing else is configured.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";

/// TCP port the daemon binds when nothing else is configured.
pub const DEFAULT_LISTEN_PORT: u16 = 8000;

/// Polling interval applied when a monitor command omits `-t=`.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default listen endpoint, `tcp://0.0.0.0:8000`.
pub fn default_listen_endpoint() -> ListenEndpoint {
    ListenEndpoint::tcp(DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT)
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Auto
}

/// Output mode applied when a monitor command omits `-m=`.
pub fn default_monitor_mode() -> MonitorMode {
    MonitorMode::Basic
}
