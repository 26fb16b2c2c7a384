//! Process lifecycle: start the daemon, wait for a signal, shut down.

mod errors;
mod launch;
mod shutdown;

pub use errors::LaunchError;
pub use launch::{RunningDaemon, run_daemon, start_daemon};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

#[cfg(test)]
pub(crate) use launch::{LaunchPlan, run_daemon_with};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
