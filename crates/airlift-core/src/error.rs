use thiserror::Error;
use uuid::Uuid;

use crate::model::MacAddress;

/// Top-level error type for the `airlift-core` crate.
///
/// Contract violations (second downlink bind, bad descriptors, invalid
/// parameters) surface here synchronously. Stale tenant/WTP references
/// and closed connections are deliberately *not* errors — those degrade
/// to unload/no-op paths inside the components themselves.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Binding contract violations ─────────────────────────────────
    /// The downlink table holds exactly one entry; unbind first.
    #[error("client {0} already has a downlink binding; unbind it first")]
    DownlinkOccupied(MacAddress),

    /// Operation requires a bound client, but the LVAP has no downlink.
    #[error("LVAP {0} is not bound to any resource")]
    NotBound(MacAddress),

    // ── Descriptor resolution ───────────────────────────────────────
    /// Descriptor matched no block in the WTP's supported pool.
    #[error("no resource block matching descriptor on WTP {wtp}")]
    NoMatchingBlock { wtp: MacAddress },

    /// Descriptor matched more than one block.
    #[error("ambiguous descriptor: {matches} blocks match on WTP {wtp}")]
    AmbiguousBlock { wtp: MacAddress, matches: usize },

    /// Band code outside the known set.
    #[error("unknown band code 0x{0:02x}")]
    UnknownBand(u8),

    // ── Stale references (module lifecycle) ─────────────────────────
    #[error("tenant {0} not found")]
    TenantNotFound(Uuid),

    #[error("WTP {0} not found")]
    WtpNotFound(MacAddress),

    // ── Parameter validation ────────────────────────────────────────
    #[error("invalid MAC address: {0:?}")]
    InvalidMacAddress(String),

    /// SSIDs are 1..=32 bytes of UTF-8.
    #[error("invalid SSID: {0:?}")]
    InvalidSsid(String),

    /// Polling periods below 1000 ms are rejected.
    #[error("invalid polling period {0} ms (minimum 1000)")]
    InvalidPeriod(u64),

    /// Result-count limits are -1 (unbounded) or non-negative.
    #[error("invalid result limit {0}")]
    InvalidLimit(i16),

    // ── Admission ───────────────────────────────────────────────────
    /// Client denied by the access policy; no LVAP is created.
    #[error("client {0} denied by access policy")]
    AccessDenied(MacAddress),

    /// Operation addressed a client with no LVAP.
    #[error("no LVAP for client {0}")]
    ClientNotFound(MacAddress),

    // ── Wire ────────────────────────────────────────────────────────
    #[error(transparent)]
    Codec(#[from] airlift_proto::CodecError),
}
