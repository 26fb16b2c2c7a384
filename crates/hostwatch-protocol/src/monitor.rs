//! Monitor kinds and output modes named on the wire.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which metric family a monitor samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    /// Processor usage.
    #[strum(serialize = "CPU")]
    Cpu,
    /// Physical memory and swap.
    #[strum(serialize = "Memory")]
    Memory,
}

/// Level of detail included in each sample.
///
/// Mode names are matched exactly: `basic` parses, `Basic` does not.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MonitorMode {
    /// Headline figures only.
    #[default]
    Basic,
    /// Adds swap, per-core and load-average detail.
    Advanced,
}

impl MonitorMode {
    /// Every mode accepted by `-m=`, in help-text order.
    pub const ALL: [Self; 2] = [Self::Basic, Self::Advanced];
}

/// Error returned when a mode name is not recognised.
pub type MonitorModeParseError = strum::ParseError;
