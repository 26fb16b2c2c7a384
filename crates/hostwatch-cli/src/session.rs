//! Client-side session: a receiver thread rendering envelopes while the
//! caller forwards commands.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hostwatch_protocol::{Envelope, Transport, TransportError};

use crate::AppError;
use crate::render::Output;

/// Longest wait for the receiver thread during shutdown.
pub(crate) const RECEIVER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Flags shared with the receiver thread.
#[derive(Default)]
struct Signals {
    /// Set by the local side; the receiver exits quietly.
    stop: AtomicBool,
    /// Set once `/exit` is sent, so the peer's close is expected.
    exiting: AtomicBool,
}

struct ReceiverThread {
    handle: JoinHandle<()>,
    /// Disconnects when the thread finishes.
    finished: Receiver<()>,
}

impl ReceiverThread {
    fn wait(&self, timeout: Duration) -> bool {
        !matches!(
            self.finished.recv_timeout(timeout),
            Err(RecvTimeoutError::Timeout)
        )
    }
}

pub(crate) struct ClientSession<W, E> {
    transport: Arc<dyn Transport>,
    output: Output<W, E>,
    signals: Arc<Signals>,
    running: Mutex<bool>,
    receiver: Mutex<Option<ReceiverThread>>,
}

impl<W, E> ClientSession<W, E>
where
    W: Write + Send + 'static,
    E: Write + Send + 'static,
{
    /// Starts the receiver thread for `transport`.
    pub(crate) fn start(
        transport: Arc<dyn Transport>,
        output: Output<W, E>,
    ) -> Result<Self, AppError> {
        let signals = Arc::new(Signals::default());
        let (done, finished) = mpsc::channel::<()>();
        let receiver = Receiving {
            transport: Arc::clone(&transport),
            output: output.clone(),
            signals: Arc::clone(&signals),
        };
        let handle = thread::Builder::new()
            .name("hostwatch-receiver".to_owned())
            .spawn(move || {
                let _done = done;
                receiver.run();
            })
            .map_err(AppError::SpawnReceiver)?;
        Ok(Self {
            transport,
            output,
            signals,
            running: Mutex::new(true),
            receiver: Mutex::new(Some(ReceiverThread { handle, finished })),
        })
    }

    /// Whether the connection is still usable from this side.
    pub(crate) fn is_connected(&self) -> bool {
        !self.transport.is_closed() && *self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn send(&self, command: &str) -> Result<(), TransportError> {
        self.transport.send(command.as_bytes())
    }

    /// Sends `/exit` and gives the daemon `timeout` to acknowledge and hang
    /// up before the session is torn down.
    pub(crate) fn exit(&self, timeout: Duration) -> Result<(), TransportError> {
        self.signals.exiting.store(true, Ordering::Release);
        let sent = self.send("/exit");
        if sent.is_ok() {
            self.await_receiver(timeout);
        }
        self.shutdown();
        sent
    }

    fn await_receiver(&self, timeout: Duration) -> bool {
        let receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        receiver.as_ref().is_none_or(|thread| thread.wait(timeout))
    }

    /// Stops the session. Safe to call more than once.
    pub(crate) fn shutdown(&self) {
        {
            let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
            if !*running {
                return;
            }
            self.signals.stop.store(true, Ordering::Release);
            *running = false;
        }

        self.transport.close();

        let Some(receiver) = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };
        if receiver.wait(RECEIVER_JOIN_TIMEOUT) {
            if receiver.handle.join().is_err() {
                let _ = self.output.problem("error: receiver thread panicked");
            }
        } else {
            let _ = self
                .output
                .problem("warning: receiver thread did not stop in time");
        }
    }
}

impl<W, E> Drop for ClientSession<W, E> {
    fn drop(&mut self) {
        self.signals.stop.store(true, Ordering::Release);
        self.transport.close();
    }
}

/// State moved onto the receiver thread.
struct Receiving<W, E> {
    transport: Arc<dyn Transport>,
    output: Output<W, E>,
    signals: Arc<Signals>,
}

impl<W: Write, E: Write> Receiving<W, E> {
    fn stopping(&self) -> bool {
        self.signals.stop.load(Ordering::Acquire)
    }

    fn run(self) {
        while !self.stopping() && !self.transport.is_closed() {
            match self.transport.receive() {
                Ok(Some(frame)) => {
                    if self.render(&frame).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    if !self.stopping() && !self.signals.exiting.load(Ordering::Acquire) {
                        let _ = self.output.problem("Connection closed by the daemon.");
                    }
                    break;
                }
                Err(error) => {
                    if !self.stopping() {
                        let _ = self.output.problem(&format!("error: connection lost: {error}"));
                    }
                    break;
                }
            }
        }
        // Wake the input loop's next send.
        self.transport.close();
    }

    fn render(&self, frame: &[u8]) -> io::Result<()> {
        match Envelope::decode(frame) {
            Ok(envelope) => self.output.envelope(&envelope),
            Err(error) => self
                .output
                .problem(&format!("warning: ignoring malformed daemon message: {error}")),
        }
    }
}
