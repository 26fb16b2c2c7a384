//! Per-connection bookkeeping for running monitors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use hostwatch_protocol::{MonitorKind, MonitorMode};

use crate::monitor::CancelToken;

/// Identifier of a monitor within one session.
///
/// Rendered and parsed as canonical decimal: `7`, never `07` or `+7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct TaskId(u64);

impl TaskId {
    #[cfg(test)]
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }

    pub(crate) const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

/// Returned when text is not a canonical task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TaskIdParseError;

impl FromStr for TaskId {
    type Err = TaskIdParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let canonical = !input.is_empty()
            && input.bytes().all(|byte| byte.is_ascii_digit())
            && (input == "0" || !input.starts_with('0'));
        if !canonical {
            return Err(TaskIdParseError);
        }
        input.parse::<u64>().map(Self).map_err(|_| TaskIdParseError)
    }
}

/// A running monitor as tracked by its session.
#[derive(Debug)]
pub(crate) struct TaskEntry {
    pub(crate) kind: MonitorKind,
    pub(crate) mode: MonitorMode,
    pub(crate) interval: Duration,
    pub(crate) token: CancelToken,
}

/// Outcome of [`TaskRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registration {
    Added(TaskId),
    /// The session is shutting down; the caller must not start the task.
    Closed,
}

/// Running monitors keyed by id.
///
/// Ids count every task ever registered, so they are never reused.
#[derive(Debug, Default)]
pub(crate) struct TaskRegistry {
    entries: BTreeMap<TaskId, TaskEntry>,
    issued: u64,
    closed: bool,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, entry: TaskEntry) -> Registration {
        if self.closed {
            return Registration::Closed;
        }
        let id = TaskId(self.issued);
        self.issued += 1;
        self.entries.insert(id, entry);
        Registration::Added(id)
    }

    /// Cancels and forgets a task. Returns `false` when the id is unknown.
    pub(crate) fn remove(&mut self, id: TaskId) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drops an entry whose task never started.
    pub(crate) fn discard(&mut self, id: TaskId) {
        self.entries.remove(&id);
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Renders the `/monitors` listing, or `None` when nothing is running.
    pub(crate) fn describe(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let mut lines = vec!["Active monitors:".to_owned()];
        lines.extend(self.entries.iter().map(|(id, entry)| {
            format!(
                " - {id}: {} in '{}' mode every {}s",
                entry.kind,
                entry.mode,
                entry.interval.as_secs()
            )
        }));
        Some(lines.join("\n"))
    }

    /// Cancels every task, refuses further registrations and returns the ids
    /// that were signalled.
    pub(crate) fn cancel_all(&mut self) -> Vec<TaskId> {
        self.closed = true;
        let entries = std::mem::take(&mut self.entries);
        entries
            .into_iter()
            .map(|(id, entry)| {
                entry.token.cancel();
                id
            })
            .collect()
    }
}
