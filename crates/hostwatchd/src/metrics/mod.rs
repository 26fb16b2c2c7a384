//! Host metric sampling.
//!
//! Monitor tasks depend only on [`MetricsProvider`]. The production
//! implementation is [`SystemMetricsProvider`]; tests substitute fixed
//! readings.

mod procfs;
mod system;

use std::io;
use std::sync::Arc;

use hostwatch_protocol::MonitorMode;
use thiserror::Error;

pub use self::system::SystemMetricsProvider;

/// Errors surfaced while sampling host metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A kernel statistics file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed to load.
        path: &'static str,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A kernel statistics file did not have the expected shape.
    #[error("unexpected contents in {path}: {detail}")]
    Parse {
        /// File that failed to parse.
        path: &'static str,
        /// What was wrong with it.
        detail: String,
    },
    /// The sampler could not be used.
    #[error("metrics sampler unavailable: {0}")]
    Unavailable(String),
}

/// Cumulative time a single core has spent in each state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoreTimes {
    /// Seconds in user mode, including niced processes.
    pub user_secs: f64,
    /// Seconds in kernel mode.
    pub system_secs: f64,
    /// Seconds idle.
    pub idle_secs: f64,
}

/// System load averages.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadAverage {
    /// One-minute average.
    pub one: f64,
    /// Five-minute average.
    pub five: f64,
    /// Fifteen-minute average.
    pub fifteen: f64,
}

/// Extra CPU figures included in advanced mode.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CpuDetail {
    /// Per-core times, in core order.
    pub cores: Vec<CoreTimes>,
    /// Load averages.
    pub load_average: LoadAverage,
}

/// One CPU reading.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CpuSnapshot {
    /// Overall utilisation, 0 to 100.
    pub usage_percent: f64,
    /// Present only for [`MonitorMode::Advanced`].
    pub detail: Option<CpuDetail>,
}

/// Extra memory figures included in advanced mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MemoryDetail {
    /// Swap utilisation, 0 to 100.
    pub swap_usage_percent: f64,
    /// Total swap in bytes.
    pub swap_total_bytes: u64,
    /// Used swap in bytes.
    pub swap_used_bytes: u64,
    /// Free swap in bytes.
    pub swap_free_bytes: u64,
    /// Kernel buffers in bytes.
    pub buffers_bytes: u64,
    /// Page cache in bytes.
    pub cached_bytes: u64,
    /// Shared memory in bytes.
    pub shared_bytes: u64,
}

/// One memory reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MemorySnapshot {
    /// Physical memory utilisation, 0 to 100.
    pub usage_percent: f64,
    /// Memory available to new processes, in bytes.
    pub available_bytes: u64,
    /// Memory in use, in bytes.
    pub used_bytes: u64,
    /// Unused memory, in bytes.
    pub free_bytes: u64,
    /// Present only for [`MonitorMode::Advanced`].
    pub detail: Option<MemoryDetail>,
}

/// Source of CPU and memory readings.
///
/// Calls block for as long as sampling takes; CPU usage in particular may
/// need a short measurement window.
pub trait MetricsProvider: Send + Sync {
    /// Samples CPU usage at the requested level of detail.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] when the host statistics cannot be read.
    fn cpu(&self, mode: MonitorMode) -> Result<CpuSnapshot, MetricsError>;

    /// Samples memory usage at the requested level of detail.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] when the host statistics cannot be read.
    fn memory(&self, mode: MonitorMode) -> Result<MemorySnapshot, MetricsError>;
}

impl<T> MetricsProvider for Arc<T>
where
    T: MetricsProvider + ?Sized,
{
    fn cpu(&self, mode: MonitorMode) -> Result<CpuSnapshot, MetricsError> {
        (**self).cpu(mode)
    }

    fn memory(&self, mode: MonitorMode) -> Result<MemorySnapshot, MetricsError> {
        (**self).memory(mode)
    }
}

/// Percentage of `part` in `total`, or zero when `total` is zero.
pub(crate) fn percent_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
