//! Cancellable background jobs that stream metric samples to a client.

mod cancel;
mod format;
mod task;

pub(crate) use self::cancel::CancelToken;
pub(crate) use self::task::{MonitorSpec, MonitorTask};

const MONITOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::monitor");
