//! Source adapters and the fault-isolated aggregator.
//!
//! Each submodule samples one category of system fact and exposes an async
//! `collect()` returning `Result<T, CollectError>`. Adapters carry no state
//! between calls and never let a lower-level fault escape as anything other
//! than a [`CollectError`].
//!
//! [`MetricsSnapshot::gather`] is the aggregator: it invokes every adapter
//! through [`attempt`], so one broken sensor degrades exactly one field of
//! the snapshot and can never block the response.

pub mod cpu;
pub mod disk;
pub mod docker;
pub mod memory;
pub mod network;
pub mod process;
pub mod system;
pub mod temperature;
pub mod wifi;

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::warn;

use crate::error::CollectError;

/// Timeout for most external tool invocations
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for container listing, which can be slow on a loaded host
pub const DOCKER_TIMEOUT: Duration = Duration::from_secs(15);

/// Run an adapter to completion, absorbing any failure.
///
/// This is the fault-containment policy of the whole agent: the failure is
/// logged with the adapter's identity and the metric resolves to `None`.
/// Applied uniformly instead of per-adapter error plumbing.
pub async fn attempt<T, F>(label: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, CollectError>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("collector {} failed: {}", label, err);
            None
        }
    }
}

/// Run an external tool with a hard timeout and return its trimmed stdout.
///
/// Nonzero exit, a missing binary, and a timeout all map to [`CollectError`].
/// The child is killed if the timeout fires.
pub(crate) async fn run_tool(
    tool: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, CollectError> {
    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, output)
        .await
        .map_err(|_| CollectError::timeout(tool))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(CollectError::command(
            tool,
            if stderr.is_empty() {
                format!("exit status {}", output.status)
            } else {
                stderr
            },
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Current UTC timestamp in ISO 8601 format (second precision).
pub fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// One composite sample of every metric domain.
///
/// Constructed fresh per request and discarded after serialization. Each
/// field is independently present-or-absent; an absent field serializes as
/// JSON `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// When this snapshot was taken (ISO 8601 UTC)
    pub timestamp: String,
    pub cpu: Option<cpu::CpuMetrics>,
    pub memory: Option<memory::MemoryMetrics>,
    pub disk: Option<Vec<disk::DiskPartition>>,
    pub temperature: Option<temperature::TemperatureMetrics>,
    pub network: Option<network::NetworkMetrics>,
    pub processes: Option<Vec<process::ProcessEntry>>,
    pub docker: Option<docker::DockerMetrics>,
}

impl MetricsSnapshot {
    /// Sample every adapter and assemble one snapshot.
    ///
    /// Never fails; in the worst case every field is `None`.
    pub async fn gather() -> Self {
        Self {
            timestamp: now_iso(),
            cpu: attempt("cpu", cpu::collect()).await,
            memory: attempt("memory", memory::collect()).await,
            disk: attempt("disk", disk::collect()).await,
            temperature: attempt("temperature", temperature::collect()).await,
            network: attempt("network", network::collect()).await,
            processes: attempt("process", process::collect(process::DEFAULT_LIMIT)).await,
            docker: attempt("docker", docker::collect()).await,
        }
    }
}
