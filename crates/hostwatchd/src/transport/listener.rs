//! Accept loop and admission control for the daemon's TCP endpoint.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use hostwatch_config::ListenEndpoint;
use hostwatch_protocol::{Envelope, Transport};
use tracing::{debug, info, warn};

use super::{
    AdmissionGate, Admitted, ConnectionHandler, LISTENER_TARGET, ListenerError, ServerConnection,
};
use crate::health::HealthReporter;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Message sent to connections turned away at the limit.
pub(crate) const CAPACITY_MESSAGE: &str = "too many connections";

/// Listener bound to the configured endpoint.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: ListenEndpoint,
    listener: TcpListener,
}

impl SocketListener {
    pub(crate) fn bind(endpoint: &ListenEndpoint) -> Result<Self, ListenerError> {
        let listener = bind_tcp(endpoint.host(), endpoint.port())?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    /// Starts accepting on a background thread.
    ///
    /// Connections that obtain a slot from `gate` are passed to `handler` on
    /// their own thread; the rest receive a single capacity error and are
    /// closed.
    pub(crate) fn start(
        self,
        gate: Arc<AdmissionGate>,
        handler: Arc<dyn ConnectionHandler>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        if let Some(address) = self.local_addr() {
            reporter.listener_started(address, gate.limit());
        }
        let shutdown = Arc::new(AtomicBool::new(false));
        let accept_loop = AcceptLoop {
            listener: self,
            shutdown: Arc::clone(&shutdown),
            gate,
            handler,
            reporter,
        };
        let handle = thread::Builder::new()
            .name("hostwatchd-accept".to_owned())
            .spawn(move || accept_loop.run())
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background accept thread.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Asks the accept loop to stop. Sessions already running are unaffected.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => Ok(()),
                Err(_) => Err(ListenerError::ThreadPanic),
            }
        } else {
            Ok(())
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

struct AcceptLoop {
    listener: SocketListener,
    shutdown: Arc<AtomicBool>,
    gate: Arc<AdmissionGate>,
    handler: Arc<dyn ConnectionHandler>,
    reporter: Arc<dyn HealthReporter>,
}

impl AcceptLoop {
    fn run(self) {
        info!(
            target: LISTENER_TARGET,
            endpoint = %self.listener.endpoint,
            "socket listener active"
        );
        let mut last_error = None::<io::ErrorKind>;
        while !self.shutdown.load(Ordering::SeqCst) {
            match accept_connection(&self.listener.listener) {
                Ok(Some(stream)) => {
                    last_error = None;
                    self.dispatch(stream);
                }
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(
                            target: LISTENER_TARGET,
                            error = %error,
                            "socket accept error"
                        );
                    }
                    last_error = Some(kind);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        info!(target: LISTENER_TARGET, "socket listener stopped");
    }

    fn dispatch(&self, stream: TcpStream) {
        let connection = match ServerConnection::new(stream) {
            Ok(connection) => Arc::new(connection),
            Err(error) => {
                warn!(
                    target: LISTENER_TARGET,
                    error = %error,
                    "failed to prepare accepted connection"
                );
                return;
            }
        };
        let peer = connection.peer();

        let Some(permit) = self.gate.try_acquire() else {
            self.reporter.connection_rejected(peer, self.gate.limit());
            reject(&*connection);
            return;
        };

        let admitted = Admitted {
            transport: connection,
            peer,
            permit,
        };
        let handler = Arc::clone(&self.handler);
        // On spawn failure the closure is dropped, which closes the socket
        // and frees the slot.
        if let Err(error) = thread::Builder::new()
            .name(format!("session-{peer}"))
            .spawn(move || handler.handle(admitted))
        {
            warn!(
                target: LISTENER_TARGET,
                %peer,
                error = %error,
                "failed to spawn session thread"
            );
        }
    }
}

fn reject(connection: &dyn Transport) {
    if let Err(error) = connection.send_envelope(&Envelope::error(CAPACITY_MESSAGE)) {
        debug!(
            target: LISTENER_TARGET,
            error = %error,
            "failed to notify rejected connection"
        );
    }
    connection.close();
}

fn accept_connection(listener: &TcpListener) -> Result<Option<TcpStream>, io::Error> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| ListenerError::ResolveEmpty {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}
