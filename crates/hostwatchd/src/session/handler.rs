//! Connection handler that runs a [`Session`] per admitted connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::transport::{Admitted, ConnectionHandler};

use super::{Session, SessionContext, lock};

/// Runs sessions and remembers the live ones so shutdown can close them.
pub(crate) struct SessionHandler {
    context: SessionContext,
    directory: SessionDirectory,
}

impl SessionHandler {
    pub(crate) fn new(context: SessionContext) -> Self {
        Self {
            context,
            directory: SessionDirectory::default(),
        }
    }

    /// Closes every live session and returns how many were closed.
    ///
    /// Sessions that start afterwards are closed before they read a command.
    pub(crate) fn close_all(&self) -> usize {
        self.directory.close_all()
    }

    #[cfg(test)]
    pub(crate) fn live_sessions(&self) -> usize {
        self.directory.live().len()
    }
}

impl ConnectionHandler for SessionHandler {
    fn handle(&self, connection: Admitted) {
        let session = Arc::new(Session::new(connection, self.context.clone()));
        let Some(key) = self.directory.insert(&session) else {
            session.close();
            return;
        };
        self.context
            .reporter
            .session_opened(session.connection_id(), session.active_sessions());
        session.run();
        self.directory.remove(key);
    }
}

#[derive(Default)]
struct Entries {
    sessions: HashMap<u64, Weak<Session>>,
    closed: bool,
}

/// Weak index of running sessions.
#[derive(Default)]
struct SessionDirectory {
    next_key: AtomicU64,
    entries: Mutex<Entries>,
}

impl SessionDirectory {
    /// Returns `None` once the directory has been closed.
    fn insert(&self, session: &Arc<Session>) -> Option<u64> {
        let mut entries = lock(&self.entries);
        if entries.closed {
            return None;
        }
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        entries.sessions.insert(key, Arc::downgrade(session));
        Some(key)
    }

    fn remove(&self, key: u64) {
        lock(&self.entries).sessions.remove(&key);
    }

    #[cfg(test)]
    fn live(&self) -> Vec<Arc<Session>> {
        lock(&self.entries)
            .sessions
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }

    fn close_all(&self) -> usize {
        // The directory lock is released before any session closes.
        let live = {
            let mut entries = lock(&self.entries);
            entries.closed = true;
            entries
                .sessions
                .values()
                .filter_map(Weak::upgrade)
                .collect::<Vec<_>>()
        };
        for session in &live {
            session.close();
        }
        live.len()
    }
}
