//! Disk partition usage.

use serde::{Deserialize, Serialize};
use sysinfo::Disks;

use crate::error::CollectError;

/// One mounted partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskPartition {
    /// Device name (e.g., "/dev/mmcblk0p2")
    pub device: String,
    /// Mount point (e.g., "/", "/boot")
    pub mountpoint: String,
    /// Filesystem type (e.g., "ext4", "vfat")
    pub fstype: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub percent: f32,
}

pub async fn collect() -> Result<Vec<DiskPartition>, CollectError> {
    let disks = Disks::new_with_refreshed_list();

    let partitions = disks
        .iter()
        .map(|disk| {
            let total = disk.total_space();
            let free = disk.available_space();
            let used = total.saturating_sub(free);
            DiskPartition {
                device: disk.name().to_string_lossy().to_string(),
                mountpoint: disk.mount_point().to_string_lossy().to_string(),
                fstype: disk.file_system().to_string_lossy().to_string(),
                total_bytes: total,
                used_bytes: used,
                free_bytes: free,
                percent: if total > 0 {
                    (used as f64 / total as f64 * 1000.0).round() as f32 / 10.0
                } else {
                    0.0
                },
            }
        })
        .collect();

    Ok(partitions)
}
