//! The hostwatch daemon.
//!
//! `hostwatchd` accepts TCP connections from `hostwatch` clients, up to a
//! configured limit, and runs one command session per connection. A session
//! starts CPU and memory monitors on request; each monitor runs on its own
//! thread and streams samples back as JSON envelopes until the client stops
//! it or disconnects.
//!
//! Startup follows a fixed sequence: load configuration through
//! [`hostwatch_config`], install structured telemetry, validate the
//! connection limit, bind the listener and start accepting. Health hooks
//! report each stage so operators can see where a failed start stopped.

mod bootstrap;
mod health;
pub mod metrics;
mod monitor;
mod process;
mod session;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use metrics::{MetricsError, MetricsProvider, SystemMetricsProvider};
pub use process::{
    LaunchError, RunningDaemon, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon,
    start_daemon,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
