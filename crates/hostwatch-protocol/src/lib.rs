//! Wire types shared by the hostwatch daemon and its interactive client.
//!
//! Clients send newline-terminated text commands such as `/cpu -t=5`. The
//! daemon answers with newline-terminated JSON envelopes:
//!
//! ```json
//! {"status":"success","message":"CPU monitoring started with ID: 0"}
//! ```
//!
//! Both roles talk through the [`Transport`] capability so the command loop
//! and the client receiver never depend on a concrete socket type.

mod envelope;
mod framing;
mod monitor;
mod transport;

pub use envelope::{Envelope, Status};
pub use framing::{read_frame, write_frame};
pub use monitor::{MonitorKind, MonitorMode, MonitorModeParseError};
pub use transport::{Transport, TransportError};

/// Largest command line, in bytes, a client may send.
pub const MAX_COMMAND_BYTES: usize = 1024;

/// Read buffer size the client uses while waiting for envelopes.
pub const ENVELOPE_READ_CHUNK: usize = 4096;

/// Largest single envelope frame, in bytes, the client accepts.
pub const MAX_ENVELOPE_BYTES: usize = 64 * 1024;
