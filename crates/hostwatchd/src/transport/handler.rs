//! Connection handling abstraction for the daemon listener.

use super::Admitted;

/// Serves connections that were granted an admission slot.
///
/// Each call runs on its own thread and may block until the connection ends.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single admitted connection. Implementations should avoid
    /// panicking.
    fn handle(&self, connection: Admitted);
}
