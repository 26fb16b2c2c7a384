//! Renders metric snapshots as the multi-line bodies sent to clients.

use std::fmt::Write as _;

use crate::metrics::{CpuSnapshot, MemorySnapshot};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

fn gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / MIB
}

pub(crate) fn render_cpu(snapshot: &CpuSnapshot) -> String {
    let mut body = format!("CPU Usage: {:.1}%", snapshot.usage_percent);
    if let Some(detail) = &snapshot.detail {
        body.push_str("\nCPU Times per Core:");
        for (index, core) in detail.cores.iter().enumerate() {
            // Writing into a String cannot fail.
            let _ = write!(
                body,
                "\n   Core {}: user={:.2}s, system={:.2}s, idle={:.2}s",
                index + 1,
                core.user_secs,
                core.system_secs,
                core.idle_secs
            );
        }
        let load = detail.load_average;
        let _ = write!(
            body,
            "\nLoad Average (1m, 5m, 15m): {:.2}, {:.2}, {:.2}",
            load.one, load.five, load.fifteen
        );
    }
    body
}

pub(crate) fn render_memory(snapshot: &MemorySnapshot) -> String {
    let mut lines = vec![
        format!("Memory Usage: {:.1}%", snapshot.usage_percent),
        format!("Available: {:.2} GB", gib(snapshot.available_bytes)),
        format!("Used: {:.2} GB", gib(snapshot.used_bytes)),
        format!("Free: {:.2} GB", gib(snapshot.free_bytes)),
    ];
    if let Some(detail) = &snapshot.detail {
        lines.extend([
            format!("Swap Usage: {:.1}%", detail.swap_usage_percent),
            format!("Swap Total: {:.2} GB", gib(detail.swap_total_bytes)),
            format!("Swap Used: {:.2} GB", gib(detail.swap_used_bytes)),
            format!("Swap Free: {:.2} GB", gib(detail.swap_free_bytes)),
            format!("Buffers: {:.2} MB", mib(detail.buffers_bytes)),
            format!("Cached: {:.2} MB", mib(detail.cached_bytes)),
            format!("Shared: {:.2} MB", mib(detail.shared_bytes)),
        ]);
    }
    lines.join("\n")
}
