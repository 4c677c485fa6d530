//! Process table sampling: top-N processes by CPU usage.

use serde::{Deserialize, Serialize};
use sysinfo::{System, Users, MINIMUM_CPU_UPDATE_INTERVAL};

use crate::error::CollectError;

/// How many processes to report when the caller does not say otherwise.
pub const DEFAULT_LIMIT: usize = 15;

/// One row of the process table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub status: String,
    pub username: Option<String>,
}

/// Sample the process table, sorted by CPU usage descending, truncated to
/// `limit` entries.
///
/// Per-process CPU needs two refreshes separated by sysinfo's minimum
/// update interval to produce a delta.
pub async fn collect(limit: usize) -> Result<Vec<ProcessEntry>, CollectError> {
    let mut system = System::new_all();
    tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
    system.refresh_all();

    let total_memory = system.total_memory();
    let users = Users::new_with_refreshed_list();

    let mut entries: Vec<ProcessEntry> = system
        .processes()
        .values()
        .map(|proc| {
            let memory_percent = if total_memory > 0 {
                (proc.memory() as f64 / total_memory as f64 * 1000.0).round() as f32 / 10.0
            } else {
                0.0
            };
            let username = proc
                .user_id()
                .and_then(|uid| users.get_user_by_id(uid))
                .map(|user| user.name().to_string());
            ProcessEntry {
                pid: proc.pid().as_u32(),
                name: proc.name().to_string_lossy().to_string(),
                cpu_percent: (proc.cpu_usage() * 10.0).round() / 10.0,
                memory_percent,
                status: proc.status().to_string(),
                username,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.cpu_percent
            .partial_cmp(&a.cpu_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries.truncate(limit);

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_honors_limit_and_ordering() {
        let entries = collect(5).await.unwrap();
        assert!(entries.len() <= 5);
        for pair in entries.windows(2) {
            assert!(pair[0].cpu_percent >= pair[1].cpu_percent);
        }
    }

    #[tokio::test]
    async fn collect_finds_at_least_this_process() {
        let entries = collect(DEFAULT_LIMIT).await.unwrap();
        assert!(!entries.is_empty());
    }
}
