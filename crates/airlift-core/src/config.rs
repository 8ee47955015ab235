// ── Controller configuration ──

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::{MacAddress, Ssid};

/// Station admission policy, evaluated on every probe from an unknown
/// client. Deny wins over allow; an absent allow list admits everyone
/// not explicitly denied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPolicy {
    pub allowed: Option<IndexSet<MacAddress>>,
    pub denied: IndexSet<MacAddress>,
}

impl AccessPolicy {
    pub fn admits(&self, addr: MacAddress) -> bool {
        !self.denied.contains(&addr)
            && self.allowed.as_ref().is_none_or(|list| list.contains(&addr))
    }
}

/// Static configuration for a [`Controller`](crate::Controller).
///
/// Loaded once at startup; none of this changes at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// OUI prefix for generated BSSIDs. The low three octets are taken
    /// from the client address, keeping BSSIDs network-unique as long
    /// as client addresses are.
    pub bssid_base: MacAddress,

    /// Name of the controller bridge interface on each access point.
    /// Only bridge ports with this interface name become virtual
    /// ports.
    pub bridge_iface: String,

    /// SSIDs broadcast for every freshly created LVAP.
    pub ssids: Vec<Ssid>,

    /// Default telemetry polling period in milliseconds.
    pub default_period_ms: u64,

    /// Default telemetry result-count limit (-1 = unbounded).
    pub default_limit: i16,

    /// Station admission policy.
    pub policy: AccessPolicy,
}

impl ControllerConfig {
    pub fn default_period(&self) -> Duration {
        Duration::from_millis(self.default_period_ms)
    }

    /// Derive a client's BSSID: configured OUI plus the client's low
    /// three octets.
    pub fn generate_bssid(&self, client: MacAddress) -> MacAddress {
        let base = self.bssid_base.octets();
        let tail = client.octets();
        MacAddress::new([base[0], base[1], base[2], tail[3], tail[4], tail[5]])
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            bssid_base: MacAddress::new([0x52, 0x1f, 0x9e, 0x00, 0x00, 0x00]),
            bridge_iface: "airlift0".to_owned(),
            ssids: Vec::new(),
            default_period_ms: 2000,
            default_limit: -1,
            policy: AccessPolicy::default(),
        }
    }
}
