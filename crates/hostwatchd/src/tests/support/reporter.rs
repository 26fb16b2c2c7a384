//! Test double for [`HealthReporter`] that records lifecycle events.

use std::net::SocketAddr;
use std::sync::Mutex;

use hostwatch_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    ListenerStarted { limit: usize },
    SessionOpened { active: usize },
    SessionClosed { cancelled_tasks: usize },
    ConnectionRejected { limit: usize },
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Number of connections turned away at the limit.
    #[must_use]
    pub fn rejections(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, HealthEvent::ConnectionRejected { .. }))
            .count()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_started(&self, _address: SocketAddr, limit: usize) {
        self.record(HealthEvent::ListenerStarted { limit });
    }

    fn session_opened(&self, _connection_id: &str, active: usize) {
        self.record(HealthEvent::SessionOpened { active });
    }

    fn session_closed(&self, _connection_id: &str, cancelled_tasks: usize) {
        self.record(HealthEvent::SessionClosed { cancelled_tasks });
    }

    fn connection_rejected(&self, _peer: SocketAddr, limit: usize) {
        self.record(HealthEvent::ConnectionRejected { limit });
    }
}
