//! RAM and swap usage.

use serde::{Deserialize, Serialize};
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

use crate::error::CollectError;

/// RAM and swap sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub ram: RamUsage,
    pub swap: SwapUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RamUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub percent: f32,
}

pub async fn collect() -> Result<MemoryMetrics, CollectError> {
    let refresh = RefreshKind::new().with_memory(MemoryRefreshKind::everything());
    let system = System::new_with_specifics(refresh);

    let total = system.total_memory();
    let used = system.used_memory();
    if total == 0 {
        return Err(CollectError::unavailable("no memory information available"));
    }

    let swap_total = system.total_swap();
    let swap_used = system.used_swap();

    Ok(MemoryMetrics {
        ram: RamUsage {
            total_bytes: total,
            used_bytes: used,
            available_bytes: system.available_memory(),
            percent: percent_of(used, total),
        },
        swap: SwapUsage {
            total_bytes: swap_total,
            used_bytes: swap_used,
            free_bytes: system.free_swap(),
            percent: percent_of(swap_used, swap_total),
        },
    })
}

fn percent_of(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let raw = used as f64 / total as f64 * 100.0;
    ((raw * 10.0).round() / 10.0) as f32
}
