//! Test helpers for the transport module.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use super::{Admitted, ConnectionHandler};

/// Counts connections and keeps them, with their permits, alive until
/// [`HoldingHandler::release`] is called.
pub(crate) struct HoldingHandler {
    count: Arc<AtomicUsize>,
    held: Mutex<Vec<Admitted>>,
}

impl HoldingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
            held: Mutex::new(Vec::new()),
        });
        (count, handler)
    }

    /// Closes and drops every held connection.
    pub(crate) fn release(&self) {
        let held = std::mem::take(&mut *self.held.lock().expect("held connections lock"));
        for admitted in held {
            admitted.transport.close();
        }
    }
}

impl ConnectionHandler for HoldingHandler {
    fn handle(&self, connection: Admitted) {
        self.held
            .lock()
            .expect("held connections lock")
            .push(connection);
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
