//! Network interface counters and outbound identity.

use std::collections::BTreeMap;
use std::net::{IpAddr, UdpSocket};

use serde::{Deserialize, Serialize};
use sysinfo::Networks;

use crate::error::CollectError;

/// Per-interface counters plus the default outbound IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub default_ip: String,
    pub interfaces: BTreeMap<String, InterfaceStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceStats {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    /// First IPv4 address bound to the interface, if any
    pub ip_address: Option<String>,
}

pub async fn collect() -> Result<NetworkMetrics, CollectError> {
    let networks = Networks::new_with_refreshed_list();

    let interfaces = networks
        .iter()
        .map(|(name, data)| {
            let ip_address = data.ip_networks().iter().find_map(|net| match net.addr {
                IpAddr::V4(addr) => Some(addr.to_string()),
                IpAddr::V6(_) => None,
            });
            (
                name.clone(),
                InterfaceStats {
                    bytes_sent: data.total_transmitted(),
                    bytes_recv: data.total_received(),
                    packets_sent: data.total_packets_transmitted(),
                    packets_recv: data.total_packets_received(),
                    ip_address,
                },
            )
        })
        .collect();

    Ok(NetworkMetrics {
        default_ip: default_ip(),
        interfaces,
    })
}

/// The address this host would use to reach the internet.
///
/// A connected UDP socket never sends a packet; the kernel just picks the
/// outbound interface. Falls back to loopback on hosts with no route.
pub fn default_ip() -> String {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ip_is_always_something() {
        let ip = default_ip();
        assert!(ip.parse::<std::net::Ipv4Addr>().is_ok());
    }

    #[tokio::test]
    async fn collect_lists_interfaces() {
        let metrics = collect().await.unwrap();
        // Even an isolated host has loopback counters.
        assert!(!metrics.default_ip.is_empty());
        for stats in metrics.interfaces.values() {
            assert!(stats.bytes_sent <= u64::MAX);
        }
    }
}
