//! Connection capability used by both the daemon and the client.

use std::io;

use thiserror::Error;

use crate::Envelope;

/// Failures raised while moving frames across a connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection was closed locally before the operation started.
    #[error("connection is closed")]
    Closed,
    /// The peer sent a frame larger than the configured limit.
    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
    /// An envelope could not be serialised.
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
    /// Reading or writing the socket failed.
    #[error("connection IO failed: {0}")]
    Io(#[from] io::Error),
}

/// Bidirectional, frame-oriented connection.
///
/// Implementations must allow `send` and `close` from any thread while
/// another thread is blocked in `receive`. `close` must be idempotent.
pub trait Transport: Send + Sync {
    /// Writes one frame atomically with respect to other senders.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] after [`Transport::close`], or the
    /// underlying IO error.
    fn send(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Blocks until the next frame arrives.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream or the
    /// connection was closed locally.
    ///
    /// # Errors
    ///
    /// Returns IO failures and oversized frames.
    fn receive(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Shuts the connection down so blocked readers wake up.
    fn close(&self);

    /// Reports whether [`Transport::close`] has been called.
    fn is_closed(&self) -> bool;

    /// Encodes and sends an envelope as one frame.
    ///
    /// # Errors
    ///
    /// Returns encoding failures and any error from [`Transport::send`].
    fn send_envelope(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let payload = envelope.encode()?;
        self.send(&payload)
    }
}
