//! Supervises daemon launch sequencing and runtime orchestration.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::HealthReporter;
use crate::metrics::{MetricsProvider, SystemMetricsProvider};
use crate::session::{SessionContext, SessionHandler};
use crate::transport::{AdmissionGate, ListenerHandle, SocketListener};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) shutdown: S,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) provider: Arc<dyn MetricsProvider>,
}

/// A daemon that is accepting connections.
pub struct RunningDaemon {
    address: Option<SocketAddr>,
    listener: ListenerHandle,
    sessions: Arc<SessionHandler>,
}

impl RunningDaemon {
    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.address
    }

    /// Stops accepting, waits for the accept thread to exit and then closes
    /// every live session.
    ///
    /// Sessions admitted during the final accept pass are closed as soon as
    /// they start. Monitor threads are signalled but not joined.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Listener`] when the accept thread panicked.
    pub fn stop(self) -> Result<(), LaunchError> {
        self.listener.shutdown();
        let joined = self.listener.join();
        let closed = self.sessions.close_all();
        info!(
            target: PROCESS_TARGET,
            closed_sessions = closed,
            "closed live sessions"
        );
        joined?;
        info!(
            target: PROCESS_TARGET,
            "shutdown sequence completed"
        );
        Ok(())
    }
}

/// Runs the daemon using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when configuration is unusable, the listener
/// cannot bind, or signal handlers cannot be installed.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        loader: SystemConfigLoader,
        shutdown: SystemShutdownSignal::new(),
        reporter: Arc::new(StructuredHealthReporter::new()),
        provider: Arc::new(SystemMetricsProvider::new()),
    })
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        shutdown,
        reporter,
        provider,
    } = plan;
    let daemon = start_daemon(&loader, reporter, provider)?;
    let waited = shutdown.wait();
    // Tear down even when waiting failed so sockets are released.
    let stopped = daemon.stop();
    waited?;
    stopped
}

/// Bootstraps the daemon and starts accepting connections.
///
/// # Errors
///
/// Returns [`LaunchError::Bootstrap`] for configuration and telemetry
/// failures and [`LaunchError::Listener`] when the endpoint cannot be bound.
pub fn start_daemon(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    provider: Arc<dyn MetricsProvider>,
) -> Result<RunningDaemon, LaunchError> {
    let daemon = bootstrap_with(loader, &*reporter)?;
    info!(
        target: PROCESS_TARGET,
        listen = %daemon.config().listen(),
        "starting daemon runtime"
    );
    let listener = SocketListener::bind(daemon.config().listen())?;
    let address = listener.local_addr();

    let context = SessionContext::new(
        provider,
        Arc::clone(&reporter),
        daemon.default_interval(),
        daemon.config().default_mode(),
    );
    let sessions = Arc::new(SessionHandler::new(context));
    let gate = AdmissionGate::new(daemon.admission_limit());
    let handler = Arc::clone(&sessions);
    let listener = listener.start(gate, handler, reporter)?;

    Ok(RunningDaemon {
        address,
        listener,
        sessions,
    })
}
