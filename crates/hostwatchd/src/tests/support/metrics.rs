//! Fixed metric readings for deterministic monitor output.

use hostwatch_protocol::MonitorMode;

use crate::metrics::{
    CoreTimes, CpuDetail, CpuSnapshot, LoadAverage, MemoryDetail, MemorySnapshot, MetricsError,
    MetricsProvider,
};

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: u64 = 1024 * 1024;

/// Returns the same snapshot on every call, or fails every call.
#[derive(Debug, Clone)]
pub struct StaticMetricsProvider {
    readings: Option<(CpuSnapshot, MemorySnapshot)>,
}

impl StaticMetricsProvider {
    /// A provider whose every sample fails.
    #[must_use]
    pub fn failing() -> Self {
        Self { readings: None }
    }
}

impl Default for StaticMetricsProvider {
    fn default() -> Self {
        let cpu = CpuSnapshot {
            usage_percent: 12.5,
            detail: Some(CpuDetail {
                cores: vec![
                    CoreTimes {
                        user_secs: 10.0,
                        system_secs: 2.5,
                        idle_secs: 100.0,
                    },
                    CoreTimes {
                        user_secs: 8.0,
                        system_secs: 1.5,
                        idle_secs: 110.0,
                    },
                ],
                load_average: LoadAverage {
                    one: 0.5,
                    five: 0.25,
                    fifteen: 0.75,
                },
            }),
        };
        let memory = MemorySnapshot {
            usage_percent: 50.0,
            available_bytes: 4 * GIB,
            used_bytes: 4 * GIB,
            free_bytes: 2 * GIB,
            detail: Some(MemoryDetail {
                swap_usage_percent: 25.0,
                swap_total_bytes: 2 * GIB,
                swap_used_bytes: GIB / 2,
                swap_free_bytes: GIB + GIB / 2,
                buffers_bytes: 64 * MIB,
                cached_bytes: 512 * MIB,
                shared_bytes: 32 * MIB,
            }),
        };
        Self {
            readings: Some((cpu, memory)),
        }
    }
}

fn unavailable() -> MetricsError {
    MetricsError::Unavailable("sampling disabled for this test".to_owned())
}

impl MetricsProvider for StaticMetricsProvider {
    fn cpu(&self, mode: MonitorMode) -> Result<CpuSnapshot, MetricsError> {
        let (cpu, _) = self.readings.as_ref().ok_or_else(unavailable)?;
        let mut snapshot = cpu.clone();
        if mode == MonitorMode::Basic {
            snapshot.detail = None;
        }
        Ok(snapshot)
    }

    fn memory(&self, mode: MonitorMode) -> Result<MemorySnapshot, MetricsError> {
        let (_, memory) = self.readings.as_ref().ok_or_else(unavailable)?;
        let mut snapshot = *memory;
        if mode == MonitorMode::Basic {
            snapshot.detail = None;
        }
        Ok(snapshot)
    }
}
