// ── Identity value types ──
//
// MacAddress and Ssid form the foundation of every domain type. The
// address is byte-backed because it goes on the wire verbatim; the
// textual form is only a rendering.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ── MacAddress ──────────────────────────────────────────────────────

/// A 48-bit hardware address.
///
/// Used for clients, radio interfaces, BSSIDs, and access points alike.
/// Renders lowercase colon-separated (`aa:bb:cc:dd:ee:ff`); parsing
/// accepts colon- or dash-separated hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// The all-zero address, used as the "no encapsulation" sentinel.
    pub const ZERO: Self = Self([0u8; 6]);

    /// The broadcast address, used as the match-everything filter.
    pub const BROADCAST: Self = Self([0xff; 6]);

    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub const fn octets(self) -> [u8; 6] {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(|c| c == ':' || c == '-');

        for octet in &mut octets {
            let part = parts
                .next()
                .ok_or_else(|| CoreError::InvalidMacAddress(s.to_owned()))?;
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| CoreError::InvalidMacAddress(s.to_owned()))?;
        }
        if parts.next().is_some() {
            return Err(CoreError::InvalidMacAddress(s.to_owned()));
        }

        Ok(Self(octets))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ── Ssid ────────────────────────────────────────────────────────────

/// A network name, 1..=32 bytes of UTF-8 per 802.11 limits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Ssid(String);

impl Ssid {
    pub fn new(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        if raw.is_empty() || raw.len() > 32 {
            return Err(CoreError::InvalidSsid(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ssid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for Ssid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn mac_parses_colon_separated() {
        let mac: MacAddress = "00:15:6D:01:02:03".parse().unwrap();
        assert_eq!(mac.octets(), [0x00, 0x15, 0x6d, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn mac_parses_dash_separated() {
        let mac: MacAddress = "aa-bb-cc-dd-ee-ff".parse().unwrap();
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn mac_rejects_garbage() {
        assert!("not-a-mac".parse::<MacAddress>().is_err());
        assert!("aa:bb:cc:dd:ee".parse::<MacAddress>().is_err());
        assert!("aa:bb:cc:dd:ee:ff:00".parse::<MacAddress>().is_err());
    }

    #[test]
    fn mac_display_is_lowercase() {
        let mac = MacAddress::new([0xAA, 0xBB, 0xCC, 0x00, 0x11, 0x22]);
        assert_eq!(mac.to_string(), "aa:bb:cc:00:11:22");
    }

    #[test]
    fn zero_sentinel() {
        assert!(MacAddress::ZERO.is_zero());
        assert!(!MacAddress::new([1, 0, 0, 0, 0, 0]).is_zero());
    }

    #[test]
    fn mac_serde_round_trip() {
        let mac = MacAddress::new([0x04, 0xf0, 0x21, 0xaa, 0xbb, 0xcc]);
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"04:f0:21:aa:bb:cc\"");
        let back: MacAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mac);
    }

    #[test]
    fn ssid_limits() {
        assert!(Ssid::new("guests").is_ok());
        assert!(Ssid::new("").is_err());
        assert!(Ssid::new("x".repeat(33)).is_err());
        assert!(Ssid::new("x".repeat(32)).is_ok());
    }
}
