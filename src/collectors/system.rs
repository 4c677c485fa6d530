//! General system identity: hostname, model, OS, kernel, uptime.

use std::fs;

use serde::{Deserialize, Serialize};
use sysinfo::System;

use crate::error::CollectError;

/// Static facts about the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemFacts {
    pub hostname: String,
    /// Board model from the device tree (e.g., "Raspberry Pi 5 Model B"),
    /// absent on non-Pi hardware
    pub model: Option<String>,
    pub os_name: String,
    pub os_version: String,
    pub kernel: String,
    pub architecture: String,
    pub uptime_seconds: u64,
    pub agent_version: String,
}

pub async fn collect() -> Result<SystemFacts, CollectError> {
    Ok(SystemFacts {
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        model: read_board_model(),
        os_name: System::name().unwrap_or_else(|| "unknown".to_string()),
        os_version: System::os_version().unwrap_or_else(|| "unknown".to_string()),
        kernel: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
        architecture: System::cpu_arch().unwrap_or_else(|| std::env::consts::ARCH.to_string()),
        uptime_seconds: System::uptime(),
        agent_version: crate::AGENT_VERSION.to_string(),
    })
}

/// The device-tree model string is NUL-terminated on the Pi.
fn read_board_model() -> Option<String> {
    let raw = fs::read_to_string("/proc/device-tree/model").ok()?;
    let model = raw.trim().trim_end_matches('\0').to_string();
    if model.is_empty() {
        None
    } else {
        Some(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_reports_identity() {
        let facts = collect().await.unwrap();
        assert!(!facts.hostname.is_empty());
        assert!(!facts.architecture.is_empty());
        assert_eq!(facts.agent_version, crate::AGENT_VERSION);
    }
}
