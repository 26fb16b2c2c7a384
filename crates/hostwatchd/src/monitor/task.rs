use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hostwatch_protocol::{Envelope, MonitorKind, MonitorMode, Transport};
use tracing::{debug, warn};

use super::format::{render_cpu, render_memory};
use super::{CancelToken, MONITOR_TARGET};
use crate::metrics::MetricsProvider;

/// What a monitor samples and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MonitorSpec {
    pub(crate) kind: MonitorKind,
    pub(crate) mode: MonitorMode,
    pub(crate) interval: Duration,
}

/// A polling job bound to one connection.
pub(crate) struct MonitorTask {
    spec: MonitorSpec,
    connection_id: Arc<str>,
    task_id: u64,
    token: CancelToken,
    provider: Arc<dyn MetricsProvider>,
    transport: Arc<dyn Transport>,
}

impl MonitorTask {
    pub(crate) fn new(
        spec: MonitorSpec,
        connection_id: Arc<str>,
        task_id: u64,
        token: CancelToken,
        provider: Arc<dyn MetricsProvider>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            spec,
            connection_id,
            task_id,
            token,
            provider,
            transport,
        }
    }

    /// Starts the polling loop on a dedicated thread.
    ///
    /// The thread is detached; it exits on its own once the token is
    /// cancelled or a send fails.
    pub(crate) fn spawn(self) -> io::Result<()> {
        let name = format!("monitor-{}-{}", self.connection_id, self.task_id);
        thread::Builder::new().name(name).spawn(move || self.run())?;
        Ok(())
    }

    pub(crate) fn run(self) {
        debug!(
            target: MONITOR_TARGET,
            connection = %self.connection_id,
            task_id = self.task_id,
            kind = %self.spec.kind,
            mode = %self.spec.mode,
            interval_secs = self.spec.interval.as_secs(),
            "monitor started"
        );
        while !self.token.is_cancelled() {
            let envelope = self.sample();
            if self.token.is_cancelled() {
                break;
            }
            if let Err(error) = self.transport.send_envelope(&envelope) {
                debug!(
                    target: MONITOR_TARGET,
                    connection = %self.connection_id,
                    task_id = self.task_id,
                    error = %error,
                    "monitor send failed"
                );
                break;
            }
            if self.token.wait_timeout(self.spec.interval) {
                break;
            }
        }
        debug!(
            target: MONITOR_TARGET,
            connection = %self.connection_id,
            task_id = self.task_id,
            "monitor stopped"
        );
    }

    fn sample(&self) -> Envelope {
        let body = match self.spec.kind {
            MonitorKind::Cpu => self.provider.cpu(self.spec.mode).map(|s| render_cpu(&s)),
            MonitorKind::Memory => self
                .provider
                .memory(self.spec.mode)
                .map(|s| render_memory(&s)),
        };
        match body {
            Ok(body) => Envelope::info(body),
            Err(error) => {
                warn!(
                    target: MONITOR_TARGET,
                    connection = %self.connection_id,
                    task_id = self.task_id,
                    error = %error,
                    "metrics sample failed"
                );
                Envelope::warning(format!(
                    "{} monitor {} could not sample metrics: {error}",
                    self.spec.kind, self.task_id
                ))
            }
        }
    }
}
