//! Wi-Fi link status and credential changes.
//!
//! Every reading sits behind a fallback chain of link-layer tools; a host
//! without a Wi-Fi radio simply reports all fields as null. The credential
//! change rewrites the wpa_supplicant configuration and asks the daemon to
//! reconfigure.

use std::fs;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collectors::{run_tool, DEFAULT_TOOL_TIMEOUT};
use crate::error::MutationError;

/// Timeout for credential operations (passphrase generation, reconfigure)
const WIFI_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

const WPA_SUPPLICANT_CONF: &str = "/etc/wpa_supplicant/wpa_supplicant.conf";

/// Header written when no existing wpa_supplicant config is present.
const DEFAULT_WPA_HEADER: &str = "ctrl_interface=DIR=/var/run/wpa_supplicant GROUP=netdev\n\
update_config=1\n\
country=US\n\n";

/// Current link status. Every field is independently nullable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WifiStatus {
    pub ssid: Option<String>,
    pub signal_dbm: Option<i32>,
    pub frequency: Option<String>,
}

/// Sample the current Wi-Fi link. Infallible: an absent radio is a normal
/// operating condition, not a fault.
pub async fn collect() -> WifiStatus {
    WifiStatus {
        ssid: ssid().await,
        signal_dbm: signal_strength().await,
        frequency: frequency().await,
    }
}

/// SSID chain: `iwgetid -r`, then nmcli's active-connection table.
async fn ssid() -> Option<String> {
    if let Ok(output) = run_tool("iwgetid", &["-r"], DEFAULT_TOOL_TIMEOUT).await {
        if !output.is_empty() {
            return Some(output);
        }
    }

    let output = run_tool(
        "nmcli",
        &["-t", "-f", "active,ssid", "dev", "wifi"],
        DEFAULT_TOOL_TIMEOUT,
    )
    .await
    .ok()?;
    output
        .lines()
        .find_map(|line| line.strip_prefix("yes:"))
        .map(|ssid| ssid.to_string())
}

/// Signal chain: the `level=` token from iwconfig, then the fourth column
/// of the third line of /proc/net/wireless (a platform-specific layout,
/// kept as a documented constant rather than a general parser).
async fn signal_strength() -> Option<i32> {
    if let Ok(output) = run_tool("iwconfig", &["wlan0"], DEFAULT_TOOL_TIMEOUT).await {
        if let Some(level) = parse_signal_level(&output) {
            return Some(level);
        }
    }

    let raw = fs::read_to_string("/proc/net/wireless").ok()?;
    parse_proc_wireless(&raw)
}

fn parse_signal_level(iwconfig_output: &str) -> Option<i32> {
    for line in iwconfig_output.lines() {
        if !line.contains("Signal level") {
            continue;
        }
        for token in line.split_whitespace() {
            if let Some(value) = token.strip_prefix("level=") {
                if let Ok(level) = value.parse::<i32>() {
                    return Some(level);
                }
            }
        }
    }
    None
}

fn parse_proc_wireless(raw: &str) -> Option<i32> {
    let line = raw.lines().nth(2)?;
    let field = line.split_whitespace().nth(3)?;
    field.parse::<f64>().ok().map(|level| level as i32)
}

/// Frequency from iwconfig's `Frequency:` token (e.g., "2.462" for GHz).
async fn frequency() -> Option<String> {
    let output = run_tool("iwconfig", &["wlan0"], DEFAULT_TOOL_TIMEOUT)
        .await
        .ok()?;
    parse_frequency(&output)
}

fn parse_frequency(iwconfig_output: &str) -> Option<String> {
    for line in iwconfig_output.lines() {
        if !line.contains("Frequency") {
            continue;
        }
        for token in line.split_whitespace() {
            if let Some(value) = token.strip_prefix("Frequency:") {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Switch to a new network by rewriting the wpa_supplicant config.
///
/// The pre-`network=` header of the existing config is preserved; the new
/// network block comes from `wpa_passphrase`. The daemon reconfigure is
/// best-effort.
pub async fn change_network(ssid: &str, password: &str) -> Result<(), MutationError> {
    let network_block = run_tool("wpa_passphrase", &[ssid, password], WIFI_TOOL_TIMEOUT)
        .await
        .map_err(|_| MutationError::Failed("Failed to generate wpa_passphrase".to_string()))?;
    if network_block.is_empty() {
        return Err(MutationError::Failed(
            "Failed to generate wpa_passphrase".to_string(),
        ));
    }

    let header = read_config_header().await;
    let config = format!("{}{}\n", header, network_block);

    tokio::fs::write(WPA_SUPPLICANT_CONF, config)
        .await
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::PermissionDenied {
                MutationError::Failed("Permission denied writing wpa_supplicant.conf".to_string())
            } else {
                MutationError::Failed(err.to_string())
            }
        })?;

    // Reconfigure failure is not fatal; the config is already in place.
    let _ = run_tool(
        "wpa_cli",
        &["-i", "wlan0", "reconfigure"],
        WIFI_TOOL_TIMEOUT,
    )
    .await;

    Ok(())
}

/// Everything before the first `network=` block of the existing config, or
/// a minimal default header when the file does not exist.
async fn read_config_header() -> String {
    match tokio::fs::read_to_string(WPA_SUPPLICANT_CONF).await {
        Ok(existing) => {
            let mut header = String::new();
            for line in existing.lines() {
                if line.trim_start().starts_with("network=") {
                    break;
                }
                header.push_str(line);
                header.push('\n');
            }
            header
        }
        Err(_) => DEFAULT_WPA_HEADER.to_string(),
    }
}
