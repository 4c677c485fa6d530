//! CPU usage, frequency, and load average.

use std::fs;

use serde::{Deserialize, Serialize};
use sysinfo::{CpuRefreshKind, RefreshKind, System, MINIMUM_CPU_UPDATE_INTERVAL};

use crate::error::CollectError;

/// CPU usage and frequency sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuMetrics {
    /// Overall usage percentage (0.0 to 100.0)
    pub usage_percent: f32,
    /// Per-core usage percentages
    pub per_core_percent: Vec<f32>,
    /// Number of logical cores
    pub core_count: usize,
    /// Frequency information, if the kernel exposes it
    pub frequency: Option<CpuFrequency>,
    /// Load averages (1, 5, 15 minutes)
    pub load_avg: LoadAvg,
}

/// Current and rated CPU frequency in MHz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuFrequency {
    pub current_mhz: u64,
    pub min_mhz: Option<u64>,
    pub max_mhz: Option<u64>,
}

/// System load averages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadAvg {
    #[serde(rename = "1min")]
    pub one_minute: f64,
    #[serde(rename = "5min")]
    pub five_minutes: f64,
    #[serde(rename = "15min")]
    pub fifteen_minutes: f64,
}

/// Sample CPU usage, frequency, and load.
///
/// Usage needs two refreshes separated by sysinfo's minimum update interval
/// to produce a meaningful delta.
pub async fn collect() -> Result<CpuMetrics, CollectError> {
    let refresh = RefreshKind::new().with_cpu(CpuRefreshKind::everything());
    let mut system = System::new_with_specifics(refresh);
    tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
    system.refresh_cpu_all();

    let cpus = system.cpus();
    if cpus.is_empty() {
        return Err(CollectError::unavailable("no CPU information available"));
    }

    let per_core_percent: Vec<f32> = cpus.iter().map(|cpu| round1(cpu.cpu_usage())).collect();
    let usage_percent = round1(system.global_cpu_usage());

    let load = System::load_average();
    let load_avg = LoadAvg {
        one_minute: round2(load.one),
        five_minutes: round2(load.five),
        fifteen_minutes: round2(load.fifteen),
    };

    Ok(CpuMetrics {
        usage_percent,
        per_core_percent,
        core_count: cpus.len(),
        frequency: read_frequency(cpus[0].frequency()),
        load_avg,
    })
}

/// Frequency from sysfs cpufreq, with sysinfo's current reading as the
/// fallback when `scaling_cur_freq` is not readable.
fn read_frequency(sysinfo_current_mhz: u64) -> Option<CpuFrequency> {
    let current_mhz = read_khz("/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq")
        .map(|khz| khz / 1000)
        .unwrap_or(sysinfo_current_mhz);

    if current_mhz == 0 {
        return None;
    }

    Some(CpuFrequency {
        current_mhz,
        min_mhz: read_khz("/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_min_freq")
            .map(|khz| khz / 1000),
        max_mhz: read_khz("/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq")
            .map(|khz| khz / 1000),
    })
}

fn read_khz(path: &str) -> Option<u64> {
    fs::read_to_string(path).ok()?.trim().parse::<u64>().ok()
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_reports_cores_and_bounded_usage() {
        let metrics = collect().await.unwrap();
        assert!(metrics.core_count > 0);
        assert_eq!(metrics.per_core_percent.len(), metrics.core_count);
        assert!(metrics.usage_percent >= 0.0);
        assert!(metrics.usage_percent <= 100.0 * metrics.core_count as f32);
    }

    #[test]
    fn load_avg_uses_wire_field_names() {
        let value = serde_json::to_value(LoadAvg::default()).unwrap();
        assert!(value.get("1min").is_some());
        assert!(value.get("5min").is_some());
        assert!(value.get("15min").is_some());
    }
}
