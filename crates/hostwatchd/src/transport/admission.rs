//! Counting gate that bounds concurrent sessions.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hostwatch_protocol::Transport;

/// Non-blocking counting semaphore shared by the accept loop and sessions.
#[derive(Debug)]
pub(crate) struct AdmissionGate {
    limit: NonZeroUsize,
    active: AtomicUsize,
}

impl AdmissionGate {
    pub(crate) fn new(limit: NonZeroUsize) -> Arc<Self> {
        Arc::new(Self {
            limit,
            active: AtomicUsize::new(0),
        })
    }

    /// Takes a slot if one is free. Never blocks.
    pub(crate) fn try_acquire(self: &Arc<Self>) -> Option<AdmissionPermit> {
        let limit = self.limit.get();
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| {
                (active < limit).then_some(active + 1)
            })
            .ok()
            .map(|_| AdmissionPermit {
                gate: Arc::clone(self),
            })
    }

    pub(crate) fn limit(&self) -> usize {
        self.limit.get()
    }

    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

/// One held slot. Dropping it frees the slot exactly once.
#[derive(Debug)]
pub(crate) struct AdmissionPermit {
    gate: Arc<AdmissionGate>,
}

impl AdmissionPermit {
    /// Slots currently held, including this one.
    pub(crate) fn active(&self) -> usize {
        self.gate.active()
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A connection that has been granted a slot.
pub(crate) struct Admitted {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) peer: SocketAddr,
    pub(crate) permit: AdmissionPermit,
}
