//! TCP transport for the daemon.
//!
//! The listener binds the configured endpoint and accepts connections on a
//! background thread. Each connection must win a slot from the
//! [`AdmissionGate`] before a handler sees it.

mod admission;
mod connection;
mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub(crate) use self::admission::{AdmissionGate, AdmissionPermit, Admitted};
pub(crate) use self::connection::ServerConnection;
pub use self::errors::ListenerError;
pub(crate) use self::handler::ConnectionHandler;
pub(crate) use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::HoldingHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
