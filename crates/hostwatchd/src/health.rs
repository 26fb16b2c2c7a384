//! Structured health reporting for daemon lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use hostwatch_config::Config;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the listener is accepting connections.
    fn listener_started(&self, address: SocketAddr, limit: usize);

    /// Invoked when an admitted connection starts its session.
    fn session_opened(&self, connection_id: &str, active: usize);

    /// Invoked when a session has torn down.
    fn session_closed(&self, connection_id: &str, cancelled_tasks: usize);

    /// Invoked when a connection is turned away at the limit.
    fn connection_rejected(&self, peer: SocketAddr, limit: usize);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_started(&self, address: SocketAddr, limit: usize) {
        (**self).listener_started(address, limit);
    }

    fn session_opened(&self, connection_id: &str, active: usize) {
        (**self).session_opened(connection_id, active);
    }

    fn session_closed(&self, connection_id: &str, cancelled_tasks: usize) {
        (**self).session_closed(connection_id, cancelled_tasks);
    }

    fn connection_rejected(&self, peer: SocketAddr, limit: usize) {
        (**self).connection_rejected(peer, limit);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            listen = %config.listen(),
            connection_limit = ?config.connection_limit,
            default_interval_secs = config.default_interval_secs,
            default_mode = %config.default_mode(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn listener_started(&self, address: SocketAddr, limit: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_started",
            %address,
            limit,
            "accepting connections"
        );
    }

    fn session_opened(&self, connection_id: &str, active: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_opened",
            connection = connection_id,
            active,
            "accepted connection"
        );
    }

    fn session_closed(&self, connection_id: &str, cancelled_tasks: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_closed",
            connection = connection_id,
            cancelled_tasks,
            "connection closed"
        );
    }

    fn connection_rejected(&self, peer: SocketAddr, limit: usize) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "connection_rejected",
            %peer,
            limit,
            "connection limit reached"
        );
    }
}
