//! Minimal line-oriented TCP client for talking to a running daemon.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use hostwatch_protocol::{Envelope, Status};

const READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Outcome of waiting for the next line from the daemon.
enum Line {
    Envelope(Envelope),
    Closed,
    TimedOut,
}

pub struct TestClient {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl TestClient {
    /// Connects to `address`.
    ///
    /// # Panics
    ///
    /// Panics when the connection cannot be established.
    #[must_use]
    pub fn connect(address: SocketAddr) -> Self {
        let writer = TcpStream::connect(address).expect("connect to daemon");
        let reader = writer.try_clone().expect("clone client stream");
        Self {
            writer,
            reader: BufReader::new(reader),
        }
    }

    /// Sends one command line.
    pub fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .expect("write command");
        self.writer.flush().expect("flush command");
    }

    fn read_line(&mut self, timeout: Duration) -> Line {
        self.reader
            .get_ref()
            .set_read_timeout(Some(timeout))
            .expect("set read timeout");
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Line::Closed,
            Ok(_) => Line::Envelope(
                Envelope::decode(line.trim_end().as_bytes()).expect("daemon sent valid JSON"),
            ),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                Line::TimedOut
            }
            Err(_) => Line::Closed,
        }
    }

    /// Next envelope of any kind, or `None` when the stream ended or went
    /// quiet.
    pub fn next_envelope(&mut self) -> Option<Envelope> {
        match self.read_line(READ_TIMEOUT) {
            Line::Envelope(envelope) => Some(envelope),
            Line::Closed | Line::TimedOut => None,
        }
    }

    /// Next envelope that is not a periodic metrics sample.
    pub fn next_reply(&mut self) -> Option<Envelope> {
        let deadline = Instant::now() + READ_TIMEOUT;
        while Instant::now() < deadline {
            let envelope = self.next_envelope()?;
            if !is_sample(&envelope) {
                return Some(envelope);
            }
        }
        None
    }

    /// Waits for a sample whose body contains `text`.
    pub fn next_sample_containing(&mut self, text: &str) -> Option<Envelope> {
        let deadline = Instant::now() + READ_TIMEOUT;
        while Instant::now() < deadline {
            let envelope = self.next_envelope()?;
            if is_sample(&envelope) && envelope.message.contains(text) {
                return Some(envelope);
            }
        }
        None
    }

    /// Reports whether the daemon closed the stream, skipping any samples
    /// still in flight.
    pub fn is_closed_by_peer(&mut self) -> bool {
        let deadline = Instant::now() + READ_TIMEOUT;
        while Instant::now() < deadline {
            match self.read_line(READ_TIMEOUT) {
                Line::Closed => return true,
                Line::TimedOut => return false,
                Line::Envelope(_) => {}
            }
        }
        false
    }
}

fn is_sample(envelope: &Envelope) -> bool {
    envelope.status == Status::Info
        && (envelope.message.starts_with("CPU Usage:")
            || envelope.message.starts_with("Memory Usage:"))
}
