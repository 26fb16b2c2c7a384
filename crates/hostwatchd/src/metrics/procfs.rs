//! Linux kernel statistics that sysinfo does not expose.
//!
//! Parsers take the file contents so they can be exercised on any platform.

use super::{CoreTimes, MetricsError};

pub(super) const PROC_STAT: &str = "/proc/stat";
pub(super) const PROC_MEMINFO: &str = "/proc/meminfo";

/// Scheduler clock ticks per second (`USER_HZ`) on every mainstream Linux
/// build.
const CLOCK_TICKS_PER_SEC: f64 = 100.0;

/// Kernel memory counters reported in advanced mode, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) struct KernelMemory {
    pub(super) buffers_bytes: u64,
    pub(super) cached_bytes: u64,
    pub(super) shared_bytes: u64,
}

/// Reads per-core CPU times from `/proc/stat`.
#[cfg(target_os = "linux")]
pub(super) fn read_core_times() -> Result<Vec<CoreTimes>, MetricsError> {
    let content = std::fs::read_to_string(PROC_STAT).map_err(|source| MetricsError::Read {
        path: PROC_STAT,
        source,
    })?;
    parse_core_times(&content)
}

#[cfg(not(target_os = "linux"))]
pub(super) fn read_core_times() -> Result<Vec<CoreTimes>, MetricsError> {
    Ok(Vec::new())
}

/// Reads buffer, cache and shared memory sizes from `/proc/meminfo`.
#[cfg(target_os = "linux")]
pub(super) fn read_kernel_memory() -> Result<KernelMemory, MetricsError> {
    let content = std::fs::read_to_string(PROC_MEMINFO).map_err(|source| MetricsError::Read {
        path: PROC_MEMINFO,
        source,
    })?;
    Ok(parse_kernel_memory(&content))
}

#[cfg(not(target_os = "linux"))]
pub(super) fn read_kernel_memory() -> Result<KernelMemory, MetricsError> {
    Ok(KernelMemory::default())
}

/// Parses the `cpuN` lines of `/proc/stat`, skipping the aggregate `cpu`
/// line.
pub(super) fn parse_core_times(content: &str) -> Result<Vec<CoreTimes>, MetricsError> {
    content
        .lines()
        .filter(|line| line.starts_with("cpu") && !line.starts_with("cpu "))
        .map(parse_core_line)
        .collect()
}

fn parse_core_line(line: &str) -> Result<CoreTimes, MetricsError> {
    let mut fields = line.split_whitespace().skip(1).map(str::parse::<u64>);
    let mut next = |name: &str| -> Result<u64, MetricsError> {
        match fields.next() {
            Some(Ok(value)) => Ok(value),
            Some(Err(error)) => Err(MetricsError::Parse {
                path: PROC_STAT,
                detail: format!("invalid {name} field in '{line}': {error}"),
            }),
            None => Err(MetricsError::Parse {
                path: PROC_STAT,
                detail: format!("missing {name} field in '{line}'"),
            }),
        }
    };
    let user = next("user")?;
    let nice = next("nice")?;
    let system = next("system")?;
    let idle = next("idle")?;
    Ok(CoreTimes {
        user_secs: ticks_to_secs(user.saturating_add(nice)),
        system_secs: ticks_to_secs(system),
        idle_secs: ticks_to_secs(idle),
    })
}

fn ticks_to_secs(ticks: u64) -> f64 {
    ticks as f64 / CLOCK_TICKS_PER_SEC
}

/// Extracts `Buffers`, `Cached` and `Shmem` from `/proc/meminfo`.
///
/// Missing or malformed lines count as zero; older kernels omit `Shmem`.
pub(super) fn parse_kernel_memory(content: &str) -> KernelMemory {
    let mut memory = KernelMemory::default();
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let bytes = value.parse::<u64>().unwrap_or(0).saturating_mul(1024);
        match key {
            "Buffers:" => memory.buffers_bytes = bytes,
            "Cached:" => memory.cached_bytes = bytes,
            "Shmem:" => memory.shared_bytes = bytes,
            _ => {}
        }
    }
    memory
}
