//! Per-connection command loop.
//!
//! A [`Session`] owns one admitted connection: it reads commands, replies in
//! command order, starts and stops monitors, and on teardown cancels every
//! monitor it started before releasing its admission slot.

mod command;
mod handler;
mod registry;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hostwatch_protocol::{Envelope, MonitorKind, MonitorMode, Transport, TransportError};
use tracing::{debug, info, warn};

use crate::health::HealthReporter;
use crate::metrics::MetricsProvider;
use crate::monitor::{CancelToken, MonitorSpec, MonitorTask};
use crate::transport::{AdmissionPermit, Admitted};

use self::command::{Command, CommandDefaults, QuitTarget};
use self::registry::{Registration, TaskEntry, TaskId, TaskRegistry};

pub(crate) use self::handler::SessionHandler;

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

pub(crate) const HELP_TEXT: &str = "Available commands:
/help - Show this help message
/exit - Close the connection
/cpu [-t=<seconds>] [-m=<mode>] - Start CPU monitoring
/mem [-t=<seconds>] [-m=<mode>] - Start memory monitoring
/quit <id> - Stop a monitor by ID
/monitors - List active monitors
Modes: basic, advanced";

pub(crate) const UNKNOWN_COMMAND: &str = "Unknown command. Use /help to see available commands.";
pub(crate) const NO_MONITORS: &str = "No active monitors.";
pub(crate) const CONNECTION_ENDED: &str = "Connection ended";

/// Collaborators shared by every session the daemon runs.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub(crate) provider: Arc<dyn MetricsProvider>,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) defaults: CommandDefaults,
}

impl SessionContext {
    pub(crate) fn new(
        provider: Arc<dyn MetricsProvider>,
        reporter: Arc<dyn HealthReporter>,
        default_interval: std::time::Duration,
        default_mode: MonitorMode,
    ) -> Self {
        Self {
            provider,
            reporter,
            defaults: CommandDefaults {
                interval: default_interval,
                mode: default_mode,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Active,
    Closing,
    Closed,
}

/// Whether the command loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Close,
}

/// One client's command loop and the monitors it owns.
pub(crate) struct Session {
    connection_id: Arc<str>,
    transport: Arc<dyn Transport>,
    context: SessionContext,
    state: Mutex<SessionState>,
    tasks: Mutex<TaskRegistry>,
    permit: Mutex<Option<AdmissionPermit>>,
}

impl Session {
    pub(crate) fn new(admitted: Admitted, context: SessionContext) -> Self {
        let Admitted {
            transport,
            peer,
            permit,
        } = admitted;
        Self {
            connection_id: Arc::from(peer.to_string()),
            transport,
            context,
            state: Mutex::new(SessionState::Active),
            tasks: Mutex::new(TaskRegistry::new()),
            permit: Mutex::new(Some(permit)),
        }
    }

    /// Peer address as `host:port`.
    pub(crate) fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Slots held across the daemon, or zero once this session has closed.
    pub(crate) fn active_sessions(&self) -> usize {
        lock(&self.permit)
            .as_ref()
            .map_or(0, AdmissionPermit::active)
    }

    /// Reads and dispatches commands until the session closes.
    pub(crate) fn run(&self) {
        while self.is_active() {
            let flow = match self.transport.receive() {
                Ok(Some(frame)) => match std::str::from_utf8(&frame) {
                    Ok(line) => self.handle_request(line),
                    Err(_) => {
                        self.reply(Envelope::error("Commands must be valid UTF-8."));
                        Flow::Close
                    }
                },
                Ok(None) => {
                    debug!(
                        target: SESSION_TARGET,
                        connection = %self.connection_id,
                        "peer closed the connection"
                    );
                    Flow::Close
                }
                Err(TransportError::FrameTooLarge { limit, .. }) => {
                    self.reply(Envelope::error(format!(
                        "Command exceeds the {limit} byte limit."
                    )));
                    Flow::Close
                }
                Err(error) => {
                    warn!(
                        target: SESSION_TARGET,
                        connection = %self.connection_id,
                        error = %error,
                        "connection read failed"
                    );
                    Flow::Close
                }
            };
            if flow == Flow::Close {
                break;
            }
        }
        self.close();
    }

    /// Dispatches one command line and writes its reply.
    pub(crate) fn handle_request(&self, line: &str) -> Flow {
        let command = match Command::parse(line, self.context.defaults) {
            Ok(command) => command,
            Err(error) => return self.reply(Envelope::error(error.to_string())),
        };
        match command {
            Command::Exit => {
                self.reply(Envelope::success(CONNECTION_ENDED));
                Flow::Close
            }
            Command::Help => self.reply(Envelope::info(HELP_TEXT)),
            Command::Monitors => {
                let listing = lock(&self.tasks).describe();
                match listing {
                    Some(listing) => self.reply(Envelope::info(listing)),
                    None => self.reply(Envelope::error(NO_MONITORS)),
                }
            }
            Command::Start {
                kind,
                mode,
                interval,
            } => self.start_monitor(MonitorSpec {
                kind,
                mode,
                interval,
            }),
            Command::Quit(target) => self.stop_monitor(target),
            Command::Unknown => self.reply(Envelope::error(UNKNOWN_COMMAND)),
        }
    }

    fn start_monitor(&self, spec: MonitorSpec) -> Flow {
        let token = CancelToken::new();
        let registration = lock(&self.tasks).register(TaskEntry {
            kind: spec.kind,
            mode: spec.mode,
            interval: spec.interval,
            token: token.clone(),
        });
        let Registration::Added(id) = registration else {
            return Flow::Close;
        };
        info!(
            target: SESSION_TARGET,
            connection = %self.connection_id,
            task_id = %id,
            kind = %spec.kind,
            mode = %spec.mode,
            interval_secs = spec.interval.as_secs(),
            "starting monitor"
        );

        // Reply first so the confirmation precedes the first sample.
        let flow = self.reply(Envelope::success(started_message(spec.kind, id)));
        if flow == Flow::Close {
            return flow;
        }

        let task = MonitorTask::new(
            spec,
            Arc::clone(&self.connection_id),
            id.get(),
            token,
            Arc::clone(&self.context.provider),
            Arc::clone(&self.transport),
        );
        if let Err(error) = task.spawn() {
            lock(&self.tasks).discard(id);
            warn!(
                target: SESSION_TARGET,
                connection = %self.connection_id,
                task_id = %id,
                error = %error,
                "failed to spawn monitor thread"
            );
            return self.reply(Envelope::warning(format!(
                "Monitor {id} could not be started: {error}"
            )));
        }
        Flow::Continue
    }

    fn stop_monitor(&self, target: QuitTarget) -> Flow {
        let id = match target {
            QuitTarget::Id(id) => id,
            QuitTarget::Invalid(text) => return self.reply(not_found(&text)),
        };
        let removed = lock(&self.tasks).remove(id);
        if !removed {
            return self.reply(not_found(&id));
        }
        info!(
            target: SESSION_TARGET,
            connection = %self.connection_id,
            task_id = %id,
            "stopped monitor"
        );
        self.reply(Envelope::success(format!("Monitor {id} stopped.")))
    }

    fn reply(&self, envelope: Envelope) -> Flow {
        match self.transport.send_envelope(&envelope) {
            Ok(()) => Flow::Continue,
            Err(error) => {
                debug!(
                    target: SESSION_TARGET,
                    connection = %self.connection_id,
                    error = %error,
                    "failed to send reply"
                );
                Flow::Close
            }
        }
    }

    fn is_active(&self) -> bool {
        *lock(&self.state) == SessionState::Active
    }

    /// Tears the session down. Safe to call from any thread, any number of
    /// times; only the first call has an effect.
    pub(crate) fn close(&self) {
        {
            let mut state = lock(&self.state);
            if *state != SessionState::Active {
                return;
            }
            *state = SessionState::Closing;
        }

        let cancelled = lock(&self.tasks).cancel_all();
        for id in &cancelled {
            info!(
                target: SESSION_TARGET,
                connection = %self.connection_id,
                task_id = %id,
                "stop signal sent to monitor"
            );
        }

        *lock(&self.state) = SessionState::Closed;
        drop(lock(&self.permit).take());
        self.transport.close();
        self.context
            .reporter
            .session_closed(&self.connection_id, cancelled.len());
    }

    #[cfg(test)]
    pub(crate) fn task_count(&self) -> usize {
        lock(&self.tasks).len()
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        *lock(&self.state) == SessionState::Closed
    }
}

fn started_message(kind: MonitorKind, id: TaskId) -> String {
    format!("{kind} monitoring started with ID: {id}")
}

fn not_found(id: &dyn std::fmt::Display) -> Envelope {
    Envelope::error(format!("Monitor ID '{id}' not found."))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests;
