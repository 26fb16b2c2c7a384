//! In-memory [`Transport`] that lets tests drive a session without sockets.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use hostwatch_protocol::{Envelope, Transport, TransportError};

#[derive(Default)]
struct Queues {
    inbound: VecDeque<Vec<u8>>,
    outbound: VecDeque<Vec<u8>>,
    closed: bool,
}

/// Commands are queued with [`ChannelTransport::push_command`]; everything
/// the daemon sends is kept for [`ChannelTransport::next_envelope`], even
/// after the transport is closed.
#[derive(Default)]
pub struct ChannelTransport {
    queues: Mutex<Queues>,
    changed: Condvar,
}

impl ChannelTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn queues(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().expect("channel transport mutex poisoned")
    }

    /// Queues one command line for the next `receive`.
    pub fn push_command(&self, line: &str) {
        self.push_frame(line.as_bytes().to_vec());
    }

    /// Queues raw bytes for the next `receive`.
    pub fn push_frame(&self, frame: Vec<u8>) {
        self.queues().inbound.push_back(frame);
        self.changed.notify_all();
    }

    /// Waits up to `timeout` for the next envelope the daemon sent.
    pub fn next_envelope(&self, timeout: Duration) -> Option<Envelope> {
        let guard = self.queues();
        let (mut queues, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |queues| queues.outbound.is_empty())
            .expect("channel transport mutex poisoned");
        let frame = queues.outbound.pop_front()?;
        Some(Envelope::decode(&frame).expect("daemon sent a malformed envelope"))
    }

    /// Collects envelopes until none arrives for `quiet`.
    pub fn drain_until_quiet(&self, quiet: Duration) -> Vec<Envelope> {
        std::iter::from_fn(|| self.next_envelope(quiet)).collect()
    }
}

impl Transport for ChannelTransport {
    fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut queues = self.queues();
        if queues.closed {
            return Err(TransportError::Closed);
        }
        queues.outbound.push_back(frame.to_vec());
        drop(queues);
        self.changed.notify_all();
        Ok(())
    }

    fn receive(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let guard = self.queues();
        let mut queues = self
            .changed
            .wait_while(guard, |queues| queues.inbound.is_empty() && !queues.closed)
            .expect("channel transport mutex poisoned");
        if queues.closed {
            return Ok(None);
        }
        Ok(queues.inbound.pop_front())
    }

    fn close(&self) {
        self.queues().closed = true;
        self.changed.notify_all();
    }

    fn is_closed(&self) -> bool {
        self.queues().closed
    }
}
