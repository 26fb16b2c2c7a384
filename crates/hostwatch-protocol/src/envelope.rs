//! The `{status, message}` response envelope.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Severity tag carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    /// Informational output such as help text or a metrics sample.
    Info,
    /// Non-fatal problem the client should notice.
    Warning,
    /// The command failed or the connection was refused.
    Error,
    /// The command completed.
    Success,
}

/// Response unit written by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Severity tag.
    pub status: Status,
    /// Human-readable body; may span several lines.
    pub message: String,
}

impl Envelope {
    /// Builds an envelope with the given status.
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Builds an `info` envelope.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Status::Info, message)
    }

    /// Builds a `warning` envelope.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Status::Warning, message)
    }

    /// Builds an `error` envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    /// Builds a `success` envelope.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Status::Success, message)
    }

    /// Serialises the envelope as a single JSON object without framing.
    ///
    /// # Errors
    ///
    /// Returns the serialiser error; this only happens if serde itself fails.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parses an envelope from one frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame is not a valid envelope object.
    pub fn decode(frame: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(frame)
    }
}
