// ── Summary telemetry module ──
//
// Per-frame link telemetry from one resource block: the agent samples
// frames matching an address filter and periodically reports tsft,
// sequence number, rssi, rate, and frame classification for each.

use std::time::Duration;

use bytes::Bytes;
use serde::{Serialize, Serializer};
use tracing::debug;

use airlift_proto::{AddSummary, DelSummary, SummaryEntry, SummaryReport};

use crate::error::CoreError;
use crate::model::{Band, MacAddress, ResourceBlock};

use super::{ModuleCore, ModuleState, PollerModule};

/// Polling below this cadence would flood the backhaul with reports.
const MIN_PERIOD: Duration = Duration::from_millis(1000);

// ── Frame classification ────────────────────────────────────────────

/// 802.11 frame type, decoded from the raw type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameType {
    #[serde(rename = "MNGT")]
    Management,
    #[serde(rename = "CTRL")]
    Control,
    #[serde(rename = "DATA")]
    Data,
    #[serde(rename = "UNKN")]
    Unknown,
}

impl FrameType {
    fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::Management,
            0x04 => Self::Control,
            0x08 => Self::Data,
            _ => Self::Unknown,
        }
    }
}

/// Management subtype. The aliases only apply to management frames;
/// every other subtype passes through as its raw code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSubtype {
    AssocRequest,
    AssocResponse,
    AuthRequest,
    AuthResponse,
    Beacon,
    Other(u8),
}

impl FrameSubtype {
    fn from_codes(frame_type: FrameType, code: u8) -> Self {
        if frame_type != FrameType::Management {
            return Self::Other(code);
        }
        match code {
            0x00 => Self::AssocRequest,
            0x10 => Self::AssocResponse,
            0x20 => Self::AuthRequest,
            0x30 => Self::AuthResponse,
            0x80 => Self::Beacon,
            other => Self::Other(other),
        }
    }
}

impl Serialize for FrameSubtype {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::AssocRequest => serializer.serialize_str("ASSOC_REQ"),
            Self::AssocResponse => serializer.serialize_str("ASSOC_RESP"),
            Self::AuthRequest => serializer.serialize_str("AUTH_REQ"),
            Self::AuthResponse => serializer.serialize_str("AUTH_RESP"),
            Self::Beacon => serializer.serialize_str("BEACON"),
            Self::Other(code) => serializer.serialize_u8(*code),
        }
    }
}

/// One sampled frame, decoded into reporting units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSample {
    /// Transmitter address.
    pub addr: MacAddress,
    /// Agent TSF timer at reception, microseconds.
    pub tsft: u64,
    /// 802.11 sequence number.
    pub seq: u16,
    pub rssi: i8,
    /// Rate in Mb/s. Legacy 2.4 GHz rates arrive in 500 kb/s units and
    /// are halved here; HT rates are MCS indexes and pass through.
    pub rate: f64,
    pub frame_type: FrameType,
    pub subtype: FrameSubtype,
    pub length: u32,
}

impl FrameSample {
    fn from_entry(entry: &SummaryEntry, band: Band) -> Self {
        let frame_type = FrameType::from_code(entry.frame_type);
        let rate = if band == Band::L20 {
            f64::from(entry.rate) / 2.0
        } else {
            f64::from(entry.rate)
        };
        Self {
            addr: MacAddress::new(entry.addr),
            tsft: entry.tsft,
            seq: entry.seq,
            rssi: entry.rssi,
            rate,
            frame_type,
            subtype: FrameSubtype::from_codes(frame_type, entry.subtype),
            length: entry.length,
        }
    }
}

// ── Summary ─────────────────────────────────────────────────────────

/// A frame-summary subscription on one resource block.
///
/// Each report replaces the previous batch; consumers that want
/// history subscribe via the worker's result callback.
#[derive(Debug)]
pub struct Summary {
    core: ModuleCore,
    /// Transmitter filter; broadcast matches every station.
    addr: MacAddress,
    /// Max entries per report, -1 for unbounded.
    limit: i16,
    frames: Vec<FrameSample>,
}

impl Summary {
    pub fn new(core: ModuleCore) -> Self {
        Self {
            core,
            addr: MacAddress::BROADCAST,
            limit: -1,
            frames: Vec::new(),
        }
    }

    pub fn addr(&self) -> MacAddress {
        self.addr
    }

    pub fn set_addr(&mut self, addr: MacAddress) {
        self.addr = addr;
    }

    pub fn limit(&self) -> i16 {
        self.limit
    }

    pub fn set_limit(&mut self, limit: i16) -> Result<(), CoreError> {
        if limit < -1 {
            return Err(CoreError::InvalidLimit(limit));
        }
        self.limit = limit;
        Ok(())
    }

    /// Periods are clamped to what the wire format can carry and
    /// bounded below to keep report volume sane.
    pub fn set_period(&mut self, period: Duration) -> Result<(), CoreError> {
        let millis = period.as_millis();
        if period < MIN_PERIOD || millis > u128::from(u16::MAX) {
            return Err(CoreError::InvalidPeriod(u64::try_from(millis).unwrap_or(u64::MAX)));
        }
        self.core.period = period;
        Ok(())
    }

    /// The last reported batch.
    pub fn frames(&self) -> &[FrameSample] {
        &self.frames
    }

    pub fn to_snapshot(&self) -> SummarySnapshot {
        SummarySnapshot {
            module_id: self.core.module_id,
            tenant_id: self.core.tenant_id,
            block: self.core.block.clone(),
            addr: self.addr,
            period_ms: u64::try_from(self.core.period.as_millis()).unwrap_or(u64::MAX),
            limit: self.limit,
            state: self.core.state,
            frames: self.frames.clone(),
        }
    }
}

impl PollerModule for Summary {
    const NAME: &'static str = "summary";

    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn encode_request(&self, seq: u32) -> Bytes {
        #[allow(clippy::cast_possible_truncation)]
        let period = self.core.period.as_millis() as u16;
        AddSummary {
            module_id: self.core.module_id,
            addr: self.addr.octets(),
            hwaddr: self.core.block.hwaddr.octets(),
            channel: self.core.block.channel,
            band: self.core.block.band.code(),
            limit: self.limit,
            period,
        }
        .encode(seq)
    }

    fn encode_teardown(&self, seq: u32) -> Bytes {
        DelSummary {
            module_id: self.core.module_id,
        }
        .encode(seq)
    }

    fn handle_report(&mut self, frame: &[u8]) -> Result<(), CoreError> {
        let report = SummaryReport::decode(frame)?;
        let band = self.core.block.band;
        self.frames = report
            .entries
            .iter()
            .map(|entry| FrameSample::from_entry(entry, band))
            .collect();
        debug!(
            module = self.core.module_id,
            frames = self.frames.len(),
            "summary report"
        );
        Ok(())
    }
}

/// JSON-serializable view for the management surface.
#[derive(Debug, Clone, Serialize)]
pub struct SummarySnapshot {
    pub module_id: u32,
    pub tenant_id: uuid::Uuid,
    pub block: ResourceBlock,
    pub addr: MacAddress,
    pub period_ms: u64,
    pub limit: i16,
    pub state: ModuleState,
    pub frames: Vec<FrameSample>,
}
