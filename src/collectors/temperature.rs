//! CPU and GPU temperature, each behind a fallback chain.
//!
//! CPU: kernel thermal zone first, then the sensor component table.
//! GPU: the Raspberry Pi firmware tool. A host with neither is a normal
//! operating condition, not a fault; missing sub-sensors resolve to `None`.

use std::fs;

use serde::{Deserialize, Serialize};
use sysinfo::Components;

use crate::collectors::{run_tool, DEFAULT_TOOL_TIMEOUT};
use crate::error::CollectError;

/// Sensor names checked, in order, before settling for the first component
/// the host exposes.
const CPU_SENSOR_NAMES: [&str; 4] = ["cpu_thermal", "cpu-thermal", "coretemp", "soc_thermal"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemperatureMetrics {
    pub cpu_celsius: Option<f32>,
    pub gpu_celsius: Option<f32>,
}

pub async fn collect() -> Result<TemperatureMetrics, CollectError> {
    let cpu_celsius = read_thermal_zone().or_else(read_component_table);
    let gpu_celsius = read_vcgencmd().await;

    Ok(TemperatureMetrics {
        cpu_celsius,
        gpu_celsius,
    })
}

/// First attempt: the SoC thermal zone pseudo-file (millidegrees).
fn read_thermal_zone() -> Option<f32> {
    let raw = fs::read_to_string("/sys/class/thermal/thermal_zone0/temp").ok()?;
    let millicelsius = raw.trim().parse::<i32>().ok()?;
    Some(round1(millicelsius as f32 / 1000.0))
}

/// Second attempt: the sensor component table, preferring canonical CPU
/// sensor names and falling back to whatever is listed first.
fn read_component_table() -> Option<f32> {
    let components = Components::new_with_refreshed_list();
    if components.is_empty() {
        return None;
    }

    for name in CPU_SENSOR_NAMES {
        if let Some(component) = components.iter().find(|c| c.label() == name) {
            return Some(round1(component.temperature()));
        }
    }

    components.iter().next().map(|c| round1(c.temperature()))
}

/// GPU temperature via the Pi firmware tool. Output looks like `temp=42.0'C`.
async fn read_vcgencmd() -> Option<f32> {
    let output = run_tool("vcgencmd", &["measure_temp"], DEFAULT_TOOL_TIMEOUT)
        .await
        .ok()?;
    parse_vcgencmd(&output)
}

fn parse_vcgencmd(output: &str) -> Option<f32> {
    let value = output.trim().strip_prefix("temp=")?;
    let degrees = value.split('\'').next()?;
    degrees.parse::<f32>().ok()
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}
