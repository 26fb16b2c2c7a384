//! Production metrics provider backed by `sysinfo`.

use std::sync::{Mutex, PoisonError};
use std::thread;

use hostwatch_protocol::MonitorMode;
use sysinfo::System;

use super::procfs;
use super::{
    CpuDetail, CpuSnapshot, LoadAverage, MemoryDetail, MemorySnapshot, MetricsError,
    MetricsProvider, percent_of,
};

/// Samples the local host through `sysinfo`, with Linux procfs filling in the
/// per-core and kernel memory figures sysinfo does not report.
#[derive(Debug)]
pub struct SystemMetricsProvider {
    /// Memory snapshot; CPU sampling uses a fresh `System` per call.
    system: Mutex<System>,
}

impl SystemMetricsProvider {
    /// Builds a provider with an empty sysinfo snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn load_average() -> LoadAverage {
        let load = System::load_average();
        LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        }
    }
}

impl Default for SystemMetricsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for SystemMetricsProvider {
    fn cpu(&self, mode: MonitorMode) -> Result<CpuSnapshot, MetricsError> {
        // Usage is a delta between two refreshes. Each call measures on its
        // own snapshot so concurrent monitors never wait on one another.
        let usage = {
            let mut sampler = System::new();
            sampler.refresh_cpu_usage();
            thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            sampler.refresh_cpu_usage();
            f64::from(sampler.global_cpu_usage())
        };

        let detail = match mode {
            MonitorMode::Basic => None,
            MonitorMode::Advanced => Some(CpuDetail {
                cores: procfs::read_core_times()?,
                load_average: Self::load_average(),
            }),
        };

        Ok(CpuSnapshot {
            usage_percent: usage,
            detail,
        })
    }

    fn memory(&self, mode: MonitorMode) -> Result<MemorySnapshot, MetricsError> {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(MetricsError::Unavailable(
                "host reported no physical memory".to_owned(),
            ));
        }
        let available = system.available_memory();
        let used = system.used_memory();

        let detail = match mode {
            MonitorMode::Basic => None,
            MonitorMode::Advanced => {
                let kernel = procfs::read_kernel_memory()?;
                let swap_total = system.total_swap();
                let swap_used = system.used_swap();
                Some(MemoryDetail {
                    swap_usage_percent: percent_of(swap_used, swap_total),
                    swap_total_bytes: swap_total,
                    swap_used_bytes: swap_used,
                    swap_free_bytes: system.free_swap(),
                    buffers_bytes: kernel.buffers_bytes,
                    cached_bytes: kernel.cached_bytes,
                    shared_bytes: kernel.shared_bytes,
                })
            }
        };

        Ok(MemorySnapshot {
            usage_percent: percent_of(total.saturating_sub(available), total),
            available_bytes: available,
            used_bytes: used,
            free_bytes: system.free_memory(),
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;

    #[test]
    fn memory_sample_reports_consistent_figures() {
        let provider = SystemMetricsProvider::new();
        let snapshot = provider
            .memory(MonitorMode::Advanced)
            .expect("memory sample");
        assert!((0.0..=100.0).contains(&snapshot.usage_percent));
        let detail = snapshot.detail.expect("advanced detail");
        assert!((0.0..=100.0).contains(&detail.swap_usage_percent));
        assert!(detail.swap_used_bytes <= detail.swap_total_bytes);
    }

    #[test]
    fn concurrent_cpu_samples_overlap() {
        const SAMPLERS: u32 = 6;
        let provider = Arc::new(SystemMetricsProvider::new());
        let started = Instant::now();
        let handles: Vec<_> = (0..SAMPLERS)
            .map(|_| {
                let provider = Arc::clone(&provider);
                thread::spawn(move || provider.cpu(MonitorMode::Basic))
            })
            .collect();
        for handle in handles {
            handle
                .join()
                .expect("sampler thread")
                .expect("cpu sample");
        }
        let elapsed = started.elapsed();
        assert!(
            elapsed < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL * (SAMPLERS - 2),
            "{SAMPLERS} samples took {elapsed:?}"
        );
    }

    #[test]
    fn memory_is_not_blocked_by_a_cpu_sample() {
        let provider = Arc::new(SystemMetricsProvider::new());
        let sampler = {
            let provider = Arc::clone(&provider);
            thread::spawn(move || provider.cpu(MonitorMode::Basic))
        };
        thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL / 4);
        let started = Instant::now();
        provider.memory(MonitorMode::Basic).expect("memory sample");
        assert!(started.elapsed() < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL / 2);
        sampler.join().expect("sampler thread").expect("cpu sample");
    }

    #[test]
    fn basic_cpu_sample_omits_detail() {
        let provider = SystemMetricsProvider::new();
        let snapshot = provider.cpu(MonitorMode::Basic).expect("cpu sample");
        assert!(snapshot.detail.is_none());
        assert!(snapshot.usage_percent >= 0.0);
    }
}
