//! Client side of the daemon connection.

use std::io::{self, BufReader};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use hostwatch_config::ListenEndpoint;
use hostwatch_protocol::{
    ENVELOPE_READ_CHUNK, MAX_ENVELOPE_BYTES, Transport, TransportError, read_frame, write_frame,
};

use crate::AppError;

/// TCP stream to the daemon, readable by the receiver thread while the input
/// loop writes commands.
#[derive(Debug)]
pub(crate) struct ClientConnection {
    peer: SocketAddr,
    reader: Mutex<BufReader<TcpStream>>,
    writer: Mutex<TcpStream>,
    control: TcpStream,
    closed: AtomicBool,
}

impl ClientConnection {
    /// Dials the daemon behind `endpoint`.
    pub(crate) fn connect(endpoint: &ListenEndpoint, timeout: Duration) -> Result<Self, AppError> {
        let display = endpoint.to_string();
        let address =
            resolve(endpoint.connect_host(), endpoint.port()).map_err(|source| {
                AppError::Resolve {
                    endpoint: display.clone(),
                    source,
                }
            })?;
        let stream = TcpStream::connect_timeout(&address, timeout).map_err(|source| {
            AppError::Connect {
                endpoint: display,
                source,
            }
        })?;
        Self::from_stream(stream, address).map_err(AppError::PrepareConnection)
    }

    fn from_stream(stream: TcpStream, peer: SocketAddr) -> io::Result<Self> {
        let reader = BufReader::with_capacity(ENVELOPE_READ_CHUNK, stream.try_clone()?);
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

fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

impl Transport for ClientConnection {
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
        match read_frame(&mut *reader, MAX_ENVELOPE_BYTES) {
            Err(TransportError::Io(_)) if self.is_closed() => Ok(None),
            other => other,
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.control.shutdown(Shutdown::Both);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
