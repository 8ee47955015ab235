// ── Client-binding message family ──
//
// Add/delete a client binding on an agent and update the transmission
// policy of an existing binding. These messages carry no module id.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::CodecError;
use crate::header::{
    get_hwaddr, need, put_hwaddr, Header, HEADER_LEN, PT_ADD_LVAP, PT_DEL_LVAP, PT_SET_PORT,
};

/// Add-client flag bit: replace the agent's binding for this client
/// outright. Cleared for uplink-only (merge) adds.
pub const F_REPLACE: u16 = 1 << 0;

/// Port-update flag bit: frames to this client are sent without
/// waiting for acknowledgments.
pub const F_NO_ACK: u16 = 1 << 0;

// ── AddLvap ─────────────────────────────────────────────────────────

/// Bind a client to a radio resource, carrying the client attributes
/// the agent needs to impersonate the network (bssid, ssids, assoc id,
/// encapsulation address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLvap {
    pub flags: u16,
    pub assoc_id: u16,
    /// Radio interface hosting the binding.
    pub hwaddr: [u8; 6],
    pub channel: u8,
    pub band: u8,
    /// The client's own address.
    pub addr: [u8; 6],
    pub bssid: [u8; 6],
    pub encap: [u8; 6],
    /// Currently associated SSID, if any.
    pub ssid: Option<String>,
    /// SSIDs to broadcast for this client.
    pub ssids: Vec<String>,
}

impl AddLvap {
    fn body_len(&self) -> usize {
        let ssid_len = 1 + self.ssid.as_ref().map_or(0, String::len);
        let ssids_len: usize = 1 + self.ssids.iter().map(|s| 1 + s.len()).sum::<usize>();
        2 + 2 + 6 + 1 + 1 + 6 + 6 + 6 + ssid_len + ssids_len
    }

    pub fn encode(&self, seq: u32) -> Bytes {
        let length = HEADER_LEN + self.body_len();
        let mut buf = BytesMut::with_capacity(length);

        #[allow(clippy::cast_possible_truncation)]
        Header::new(PT_ADD_LVAP, length as u16, seq, 0).encode(&mut buf);
        buf.put_u16(self.flags);
        buf.put_u16(self.assoc_id);
        put_hwaddr(&mut buf, self.hwaddr);
        buf.put_u8(self.channel);
        buf.put_u8(self.band);
        put_hwaddr(&mut buf, self.addr);
        put_hwaddr(&mut buf, self.bssid);
        put_hwaddr(&mut buf, self.encap);
        put_ssid(&mut buf, self.ssid.as_deref().unwrap_or(""));
        #[allow(clippy::cast_possible_truncation)]
        buf.put_u8(self.ssids.len() as u8);
        for ssid in &self.ssids {
            put_ssid(&mut buf, ssid);
        }

        buf.freeze()
    }

    pub fn decode(frame: &[u8]) -> Result<Self, CodecError> {
        let mut buf = frame;
        let header = Header::decode(&mut buf)?;
        header.check_type(PT_ADD_LVAP)?;
        header.check_length(frame.len())?;

        need(&buf, 2 + 2)?;
        let flags = buf.get_u16();
        let assoc_id = buf.get_u16();
        let hwaddr = get_hwaddr(&mut buf)?;
        need(&buf, 2)?;
        let channel = buf.get_u8();
        let band = buf.get_u8();
        let addr = get_hwaddr(&mut buf)?;
        let bssid = get_hwaddr(&mut buf)?;
        let encap = get_hwaddr(&mut buf)?;
        let ssid = get_ssid(&mut buf)?;
        let ssid = if ssid.is_empty() { None } else { Some(ssid) };

        need(&buf, 1)?;
        let count = buf.get_u8();
        let mut ssids = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            ssids.push(get_ssid(&mut buf)?);
        }

        Ok(Self {
            flags,
            assoc_id,
            hwaddr,
            channel,
            band,
            addr,
            bssid,
            encap,
            ssid,
            ssids,
        })
    }
}

// ── DelLvap ─────────────────────────────────────────────────────────

/// Remove a client binding from an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelLvap {
    pub addr: [u8; 6],
}

impl DelLvap {
    pub fn encode(&self, seq: u32) -> Bytes {
        let length = HEADER_LEN + 6;
        let mut buf = BytesMut::with_capacity(length);

        #[allow(clippy::cast_possible_truncation)]
        Header::new(PT_DEL_LVAP, length as u16, seq, 0).encode(&mut buf);
        put_hwaddr(&mut buf, self.addr);

        buf.freeze()
    }

    pub fn decode(frame: &[u8]) -> Result<Self, CodecError> {
        let mut buf = frame;
        let header = Header::decode(&mut buf)?;
        header.check_type(PT_DEL_LVAP)?;
        header.check_length(frame.len())?;

        Ok(Self {
            addr: get_hwaddr(&mut buf)?,
        })
    }
}

// ── SetPort ─────────────────────────────────────────────────────────

/// Update the transmission policy of an existing (client, resource)
/// binding. No structural change on the agent side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetPort {
    pub flags: u16,
    pub addr: [u8; 6],
    pub hwaddr: [u8; 6],
    pub channel: u8,
    pub band: u8,
    /// RTS/CTS threshold in bytes.
    pub rts_cts: u16,
    /// Transmit power in dBm, zero meaning agent default.
    pub tx_power: u8,
}

impl SetPort {
    pub fn encode(&self, seq: u32) -> Bytes {
        let length = HEADER_LEN + 2 + 6 + 6 + 1 + 1 + 2 + 1;
        let mut buf = BytesMut::with_capacity(length);

        #[allow(clippy::cast_possible_truncation)]
        Header::new(PT_SET_PORT, length as u16, seq, 0).encode(&mut buf);
        buf.put_u16(self.flags);
        put_hwaddr(&mut buf, self.addr);
        put_hwaddr(&mut buf, self.hwaddr);
        buf.put_u8(self.channel);
        buf.put_u8(self.band);
        buf.put_u16(self.rts_cts);
        buf.put_u8(self.tx_power);

        buf.freeze()
    }

    pub fn decode(frame: &[u8]) -> Result<Self, CodecError> {
        let mut buf = frame;
        let header = Header::decode(&mut buf)?;
        header.check_type(PT_SET_PORT)?;
        header.check_length(frame.len())?;

        need(&buf, 2)?;
        let flags = buf.get_u16();
        let addr = get_hwaddr(&mut buf)?;
        let hwaddr = get_hwaddr(&mut buf)?;
        need(&buf, 5)?;
        let channel = buf.get_u8();
        let band = buf.get_u8();
        let rts_cts = buf.get_u16();
        let tx_power = buf.get_u8();

        Ok(Self {
            flags,
            addr,
            hwaddr,
            channel,
            band,
            rts_cts,
            tx_power,
        })
    }
}

// ── SSID field helpers ──────────────────────────────────────────────

fn put_ssid(buf: &mut impl BufMut, ssid: &str) {
    #[allow(clippy::cast_possible_truncation)]
    buf.put_u8(ssid.len() as u8);
    buf.put_slice(ssid.as_bytes());
}

fn get_ssid(buf: &mut impl Buf) -> Result<String, CodecError> {
    need(buf, 1)?;
    let len = usize::from(buf.get_u8());
    need(buf, len)?;
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    String::from_utf8(raw).map_err(|_| CodecError::InvalidSsid)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STA: [u8; 6] = [0x00, 0x15, 0x6d, 0x01, 0x02, 0x03];
    const RADIO: [u8; 6] = [0x04, 0xf0, 0x21, 0xaa, 0xbb, 0xcc];

    #[test]
    fn add_lvap_round_trip() {
        let msg = AddLvap {
            flags: F_REPLACE,
            assoc_id: 1234,
            hwaddr: RADIO,
            channel: 36,
            band: 1,
            addr: STA,
            bssid: [0x52, 0x00, 0x00, 0x01, 0x02, 0x03],
            encap: [0u8; 6],
            ssid: Some("guests".into()),
            ssids: vec!["guests".into(), "corp".into()],
        };

        let frame = msg.encode(9);
        let decoded = AddLvap::decode(&frame).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn add_lvap_empty_ssid_decodes_to_none() {
        let msg = AddLvap {
            flags: 0,
            assoc_id: 0,
            hwaddr: RADIO,
            channel: 6,
            band: 0,
            addr: STA,
            bssid: [0x52u8; 6],
            encap: [0u8; 6],
            ssid: None,
            ssids: vec![],
        };

        let decoded = AddLvap::decode(&msg.encode(0)).unwrap();
        assert_eq!(decoded.ssid, None);
        assert!(decoded.ssids.is_empty());
    }

    #[test]
    fn add_lvap_rejects_truncated_ssid_list() {
        let msg = AddLvap {
            flags: F_REPLACE,
            assoc_id: 1,
            hwaddr: RADIO,
            channel: 1,
            band: 0,
            addr: STA,
            bssid: [0x52u8; 6],
            encap: [0u8; 6],
            ssid: None,
            ssids: vec!["net".into()],
        };

        let frame = msg.encode(0);
        // Chop the SSID payload off the end; the declared header length
        // no longer matches.
        let short = &frame[..frame.len() - 2];
        assert!(matches!(
            AddLvap::decode(short),
            Err(CodecError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn del_lvap_round_trip() {
        let msg = DelLvap { addr: STA };
        let decoded = DelLvap::decode(&msg.encode(3)).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn set_port_round_trip() {
        let msg = SetPort {
            flags: F_NO_ACK,
            addr: STA,
            hwaddr: RADIO,
            channel: 11,
            band: 0,
            rts_cts: 2346,
            tx_power: 20,
        };

        let decoded = SetPort::decode(&msg.encode(5)).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn decoders_reject_foreign_type_codes() {
        let del = DelLvap { addr: STA }.encode(0);
        assert!(matches!(
            AddLvap::decode(&del),
            Err(CodecError::TypeMismatch { .. })
        ));
    }
}
