// ── Frame-summary telemetry family ──
//
// One periodic poller instance per module id. The request arms capture
// on the agent, reports flow back until the teardown is sent. Entry
// fields are carried raw; interpretation (rate scaling, frame type
// names) is the module's job since it knows the bound band.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::CodecError;
use crate::header::{
    get_hwaddr, need, put_hwaddr, Header, HEADER_LEN, PT_ADD_SUMMARY, PT_DEL_SUMMARY, PT_SUMMARY,
};

/// Fixed size of one report entry on the wire.
const ENTRY_LEN: usize = 6 + 8 + 2 + 1 + 1 + 1 + 1 + 4;

// ── AddSummary ──────────────────────────────────────────────────────

/// Arm a frame-summary capture on the agent (controller → agent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddSummary {
    pub module_id: u32,
    /// Station whose frames are captured.
    pub addr: [u8; 6],
    /// Radio resource the capture runs on.
    pub hwaddr: [u8; 6],
    pub channel: u8,
    pub band: u8,
    /// Max entries per report, -1 for unbounded.
    pub limit: i16,
    /// Reporting period in milliseconds.
    pub period: u16,
}

impl AddSummary {
    pub fn encode(&self, seq: u32) -> Bytes {
        let length = HEADER_LEN + 6 + 6 + 1 + 1 + 2 + 2;
        let mut buf = BytesMut::with_capacity(length);

        #[allow(clippy::cast_possible_truncation)]
        Header::new(PT_ADD_SUMMARY, length as u16, seq, self.module_id).encode(&mut buf);
        put_hwaddr(&mut buf, self.addr);
        put_hwaddr(&mut buf, self.hwaddr);
        buf.put_u8(self.channel);
        buf.put_u8(self.band);
        buf.put_i16(self.limit);
        buf.put_u16(self.period);

        buf.freeze()
    }

    pub fn decode(frame: &[u8]) -> Result<Self, CodecError> {
        let mut buf = frame;
        let header = Header::decode(&mut buf)?;
        header.check_type(PT_ADD_SUMMARY)?;
        header.check_length(frame.len())?;

        let addr = get_hwaddr(&mut buf)?;
        let hwaddr = get_hwaddr(&mut buf)?;
        need(&buf, 6)?;

        Ok(Self {
            module_id: header.module_id,
            addr,
            hwaddr,
            channel: buf.get_u8(),
            band: buf.get_u8(),
            limit: buf.get_i16(),
            period: buf.get_u16(),
        })
    }
}

// ── SummaryReport ───────────────────────────────────────────────────

/// One captured frame, fields exactly as the agent saw them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryEntry {
    /// Transmitter address.
    pub addr: [u8; 6],
    /// Radio timestamp (TSFT) in microseconds.
    pub tsft: u64,
    /// 802.11 sequence number.
    pub seq: u16,
    /// Signal strength in dBm.
    pub rssi: i8,
    /// Raw rate code; meaning depends on the capture band.
    pub rate: u8,
    pub frame_type: u8,
    pub subtype: u8,
    /// Frame length in bytes.
    pub length: u32,
}

/// Periodic telemetry report (agent → controller), a count-prefixed
/// array of fixed-layout entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryReport {
    pub module_id: u32,
    /// Address of the reporting access point.
    pub wtp: [u8; 6],
    pub entries: Vec<SummaryEntry>,
}

impl SummaryReport {
    pub fn encode(&self, seq: u32) -> Bytes {
        let length = HEADER_LEN + 6 + 2 + self.entries.len() * ENTRY_LEN;
        let mut buf = BytesMut::with_capacity(length);

        #[allow(clippy::cast_possible_truncation)]
        Header::new(PT_SUMMARY, length as u16, seq, self.module_id).encode(&mut buf);
        put_hwaddr(&mut buf, self.wtp);
        #[allow(clippy::cast_possible_truncation)]
        buf.put_u16(self.entries.len() as u16);
        for entry in &self.entries {
            put_hwaddr(&mut buf, entry.addr);
            buf.put_u64(entry.tsft);
            buf.put_u16(entry.seq);
            buf.put_i8(entry.rssi);
            buf.put_u8(entry.rate);
            buf.put_u8(entry.frame_type);
            buf.put_u8(entry.subtype);
            buf.put_u32(entry.length);
        }

        buf.freeze()
    }

    pub fn decode(frame: &[u8]) -> Result<Self, CodecError> {
        let mut buf = frame;
        let header = Header::decode(&mut buf)?;
        header.check_type(PT_SUMMARY)?;
        header.check_length(frame.len())?;

        let wtp = get_hwaddr(&mut buf)?;
        need(&buf, 2)?;
        let count = buf.get_u16();

        let mut entries = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            need(&buf, ENTRY_LEN)?;
            let addr = get_hwaddr(&mut buf)?;
            entries.push(SummaryEntry {
                addr,
                tsft: buf.get_u64(),
                seq: buf.get_u16(),
                rssi: buf.get_i8(),
                rate: buf.get_u8(),
                frame_type: buf.get_u8(),
                subtype: buf.get_u8(),
                length: buf.get_u32(),
            });
        }

        Ok(Self {
            module_id: header.module_id,
            wtp,
            entries,
        })
    }
}

// ── DelSummary ──────────────────────────────────────────────────────

/// Tear down a frame-summary capture (controller → agent). Header only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelSummary {
    pub module_id: u32,
}

impl DelSummary {
    pub fn encode(&self, seq: u32) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN);
        #[allow(clippy::cast_possible_truncation)]
        Header::new(PT_DEL_SUMMARY, HEADER_LEN as u16, seq, self.module_id).encode(&mut buf);
        buf.freeze()
    }

    pub fn decode(frame: &[u8]) -> Result<Self, CodecError> {
        let mut buf = frame;
        let header = Header::decode(&mut buf)?;
        header.check_type(PT_DEL_SUMMARY)?;
        header.check_length(frame.len())?;

        Ok(Self {
            module_id: header.module_id,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STA: [u8; 6] = [0x00, 0x15, 0x6d, 0x01, 0x02, 0x03];
    const RADIO: [u8; 6] = [0x04, 0xf0, 0x21, 0xaa, 0xbb, 0xcc];
    const WTP: [u8; 6] = [0x00, 0x0d, 0xb9, 0x11, 0x22, 0x33];

    #[test]
    fn add_summary_round_trip() {
        let msg = AddSummary {
            module_id: 5,
            addr: STA,
            hwaddr: RADIO,
            channel: 36,
            band: 1,
            limit: -1,
            period: 2000,
        };

        let frame = msg.encode(12);
        // Request layout is fixed at 30 bytes total.
        assert_eq!(frame.len(), 30);
        assert_eq!(AddSummary::decode(&frame).unwrap(), msg);
    }

    #[test]
    fn report_round_trip_preserves_every_field() {
        let msg = SummaryReport {
            module_id: 8,
            wtp: WTP,
            entries: vec![
                SummaryEntry {
                    addr: STA,
                    tsft: 1_234_567_890,
                    seq: 311,
                    rssi: -67,
                    rate: 4,
                    frame_type: 0x08,
                    subtype: 0x00,
                    length: 1500,
                },
                SummaryEntry {
                    addr: STA,
                    tsft: 1_234_567_999,
                    seq: 312,
                    rssi: -70,
                    rate: 12,
                    frame_type: 0x00,
                    subtype: 0x80,
                    length: 240,
                },
            ],
        };

        let decoded = SummaryReport::decode(&msg.encode(1)).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.entries.len(), 2);
    }

    #[test]
    fn report_with_no_entries() {
        let msg = SummaryReport {
            module_id: 1,
            wtp: WTP,
            entries: vec![],
        };
        assert_eq!(SummaryReport::decode(&msg.encode(0)).unwrap(), msg);
    }

    #[test]
    fn report_rejects_count_beyond_payload() {
        let msg = SummaryReport {
            module_id: 1,
            wtp: WTP,
            entries: vec![SummaryEntry {
                addr: STA,
                tsft: 0,
                seq: 0,
                rssi: 0,
                rate: 0,
                frame_type: 0,
                subtype: 0,
                length: 0,
            }],
        };

        let mut frame = msg.encode(0).to_vec();
        // Claim two entries while carrying one.
        frame[HEADER_LEN + 6] = 0;
        frame[HEADER_LEN + 7] = 2;
        assert!(matches!(
            SummaryReport::decode(&frame),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn del_summary_is_header_only() {
        let msg = DelSummary { module_id: 77 };
        let frame = msg.encode(4);
        assert_eq!(frame.len(), HEADER_LEN);
        assert_eq!(DelSummary::decode(&frame).unwrap(), msg);
    }
}
