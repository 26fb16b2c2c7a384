//! Server side of an accepted TCP connection.

use std::io::{self, BufReader};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use hostwatch_protocol::{MAX_COMMAND_BYTES, Transport, TransportError, read_frame, write_frame};

/// Accepted TCP stream split into independently locked halves.
///
/// The read half is only touched by the session thread. The write half is
/// shared by the session and its monitors; each frame is written under one
/// lock acquisition.
#[derive(Debug)]
pub(crate) struct ServerConnection {
    peer: SocketAddr,
    reader: Mutex<BufReader<TcpStream>>,
    writer: Mutex<TcpStream>,
    control: TcpStream,
    closed: AtomicBool,
}

impl ServerConnection {
    pub(crate) fn new(stream: TcpStream) -> io::Result<Self> {
        let peer = stream.peer_addr()?;
        let reader = BufReader::new(stream.try_clone()?);
        let control = stream.try_clone()?;
        Ok(Self {
            peer,
            reader: Mutex::new(reader),
            writer: Mutex::new(stream),
            control,
            closed: AtomicBool::new(false),
        })
    }

    pub(crate) fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for ServerConnection {
    fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        write_frame(&mut *writer, frame)?;
        Ok(())
    }

    fn receive(&self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.is_closed() {
            return Ok(None);
        }
        let mut reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        match read_frame(&mut *reader, MAX_COMMAND_BYTES) {
            // A local close interrupts a blocked read; that is not a failure.
            Err(TransportError::Io(_)) if self.is_closed() => Ok(None),
            other => other,
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // The peer may already be gone.
        let _ = self.control.shutdown(Shutdown::Both);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
