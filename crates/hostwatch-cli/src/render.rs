//! Terminal rendering of daemon envelopes.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hostwatch_protocol::{Envelope, Status};

/// Stdout and stderr shared by the input loop and the receiver thread.
///
/// Each call writes and flushes under one lock, so lines from the two threads
/// never interleave.
pub(crate) struct Output<W, E> {
    streams: Arc<Mutex<Streams<W, E>>>,
}

struct Streams<W, E> {
    stdout: W,
    stderr: E,
}

impl<W, E> Clone for Output<W, E> {
    fn clone(&self) -> Self {
        Self {
            streams: Arc::clone(&self.streams),
        }
    }
}

impl<W: Write, E: Write> Output<W, E> {
    pub(crate) fn new(stdout: W, stderr: E) -> Self {
        Self {
            streams: Arc::new(Mutex::new(Streams { stdout, stderr })),
        }
    }

    fn streams(&self) -> MutexGuard<'_, Streams<W, E>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes `<status>: <message>`; errors and warnings go to stderr.
    pub(crate) fn envelope(&self, envelope: &Envelope) -> io::Result<()> {
        let line = format!("{}: {}", envelope.status, envelope.message);
        match envelope.status {
            Status::Error | Status::Warning => self.problem(&line),
            Status::Info | Status::Success => self.line(&line),
        }
    }

    pub(crate) fn line(&self, text: &str) -> io::Result<()> {
        let mut streams = self.streams();
        writeln!(streams.stdout, "{text}")?;
        streams.stdout.flush()
    }

    pub(crate) fn problem(&self, text: &str) -> io::Result<()> {
        let mut streams = self.streams();
        writeln!(streams.stderr, "{text}")?;
        streams.stderr.flush()
    }
}
