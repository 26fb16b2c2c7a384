//! Test doubles for the client runtime.

use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use hostwatch_protocol::{Envelope, Transport, TransportError};

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Cloneable in-memory writer whose contents tests can inspect.
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock().expect("buffer mutex poisoned")).into_owned()
    }

    /// Polls until the buffer contains `text`.
    pub(crate) fn wait_for(&self, text: &str) -> bool {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            if self.contents().contains(text) {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .expect("buffer mutex poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Script {
    inbound: VecDeque<Vec<u8>>,
    replies: HashMap<String, String>,
    sent: Vec<String>,
    hung_up: bool,
    closed: bool,
}

/// In-memory daemon connection. Sending `/exit` hangs up after any scripted
/// reply, as the daemon does.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<Script>,
    changed: Condvar,
}

impl ScriptedTransport {
    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().expect("script mutex poisoned")
    }

    /// Makes `frame` available to the next `receive`.
    pub(crate) fn deliver(&self, frame: &[u8]) {
        self.script().inbound.push_back(frame.to_vec());
        self.changed.notify_all();
    }

    /// Queues `reply` whenever `command` is sent.
    pub(crate) fn reply_to(&self, command: &str, reply: &str) {
        self.script()
            .replies
            .insert(command.to_owned(), reply.to_owned());
    }

    /// Ends the stream from the daemon's side.
    pub(crate) fn hang_up(&self) {
        self.script().hung_up = true;
        self.changed.notify_all();
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.script().sent.clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut script = self.script();
        if script.closed {
            return Err(TransportError::Closed);
        }
        let command = String::from_utf8_lossy(frame).into_owned();
        if let Some(reply) = script.replies.get(&command).cloned() {
            script.inbound.push_back(reply.into_bytes());
        }
        if command == "/exit" {
            script.hung_up = true;
        }
        script.sent.push(command);
        drop(script);
        self.changed.notify_all();
        Ok(())
    }

    fn receive(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let guard = self.script();
        let mut script = self
            .changed
            .wait_while(guard, |script| {
                script.inbound.is_empty() && !script.hung_up && !script.closed
            })
            .expect("script mutex poisoned");
        if script.closed {
            return Ok(None);
        }
        Ok(script.inbound.pop_front())
    }

    fn close(&self) {
        self.script().closed = true;
        self.changed.notify_all();
    }

    fn is_closed(&self) -> bool {
        self.script().closed
    }
}

/// Single-connection TCP server that answers commands from a script and
/// records what it received.
pub(crate) struct FakeDaemon {
    port: u16,
    received: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeDaemon {
    /// Answers each scripted command with its envelope, anything else with an
    /// unknown-command error, and `/exit` by acknowledging and hanging up.
    pub(crate) fn spawn(script: Vec<(String, Envelope)>) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind fake daemon");
        let port = listener.local_addr().expect("local addr").port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&received);
        let script: HashMap<String, Envelope> = script.into_iter().collect();
        let handle = thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut writer = stream;
            for line in reader.lines() {
                let Ok(command) = line else { break };
                record.lock().expect("lock received").push(command.clone());
                let reply = match command.as_str() {
                    "/exit" => Envelope::success("Connection ended"),
                    other => script.get(other).cloned().unwrap_or_else(|| {
                        Envelope::error("Unknown command. Use /help to see available commands.")
                    }),
                };
                let mut frame = reply.encode().expect("encode reply");
                frame.push(b'\n');
                if writer.write_all(&frame).is_err() || command == "/exit" {
                    break;
                }
            }
        });
        Self {
            port,
            received,
            handle: Some(handle),
        }
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the connection to finish and returns every command received.
    pub(crate) fn take_received(&mut self) -> Vec<String> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("fake daemon thread panicked");
        }
        self.received.lock().expect("lock received").clone()
    }
}
