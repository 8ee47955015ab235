// ── Wire header ──
//
// Every message on an agent connection starts with the same 12-byte
// big-endian header. The `module_id` field is only meaningful for the
// polling-module families; the client-binding family sends zero.

use bytes::{Buf, BufMut};

use crate::error::CodecError;

/// Protocol version spoken by this controller.
pub const PT_VERSION: u8 = 0x00;

// ── Message type codes ──────────────────────────────────────────────

/// Agent hello: opens a connection and refreshes its keepalive.
pub const PT_HELLO: u8 = 0x01;
/// Agent is shutting down its connection.
pub const PT_BYE: u8 = 0x02;
/// Bind a client to a radio resource (controller → agent).
pub const PT_ADD_LVAP: u8 = 0x11;
/// Remove a client binding (controller → agent).
pub const PT_DEL_LVAP: u8 = 0x12;
/// Update the transmission policy of an existing binding.
pub const PT_SET_PORT: u8 = 0x13;
/// Start a frame-summary telemetry poller (controller → agent).
pub const PT_ADD_SUMMARY: u8 = 0x22;
/// Frame-summary telemetry report (agent → controller).
pub const PT_SUMMARY: u8 = 0x23;
/// Stop a frame-summary telemetry poller (controller → agent).
pub const PT_DEL_SUMMARY: u8 = 0x24;

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 12;

/// The fixed header shared by every protocol message.
///
/// Layout (big-endian): `version:u8, type:u8, length:u16, seq:u32,
/// module_id:u32`. `length` is the total message length including the
/// header itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub msg_type: u8,
    pub length: u16,
    pub seq: u32,
    pub module_id: u32,
}

impl Header {
    /// Build a current-version header.
    pub fn new(msg_type: u8, length: u16, seq: u32, module_id: u32) -> Self {
        Self {
            version: PT_VERSION,
            msg_type,
            length,
            seq,
            module_id,
        }
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.version);
        buf.put_u8(self.msg_type);
        buf.put_u16(self.length);
        buf.put_u32(self.seq);
        buf.put_u32(self.module_id);
    }

    /// Decode and validate the version byte. Does not validate `length`
    /// against the buffer — callers holding the full frame use
    /// [`Header::check_length`] for that.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
        if buf.remaining() < HEADER_LEN {
            return Err(CodecError::Truncated {
                needed: HEADER_LEN - buf.remaining(),
            });
        }

        let version = buf.get_u8();
        if version != PT_VERSION {
            return Err(CodecError::VersionMismatch {
                expected: PT_VERSION,
                got: version,
            });
        }

        Ok(Self {
            version,
            msg_type: buf.get_u8(),
            length: buf.get_u16(),
            seq: buf.get_u32(),
            module_id: buf.get_u32(),
        })
    }

    /// Verify the declared length against the actual frame size.
    pub fn check_length(&self, frame_len: usize) -> Result<(), CodecError> {
        if usize::from(self.length) != frame_len {
            return Err(CodecError::LengthMismatch {
                declared: self.length,
                actual: frame_len,
            });
        }
        Ok(())
    }

    /// Verify the type code matches what the caller expects to decode.
    pub fn check_type(&self, expected: u8) -> Result<(), CodecError> {
        if self.msg_type != expected {
            return Err(CodecError::TypeMismatch {
                expected,
                got: self.msg_type,
            });
        }
        Ok(())
    }

    /// Peek the type code of a raw frame without consuming it.
    /// Used by connection handlers to dispatch to the right decoder.
    pub fn peek_type(frame: &[u8]) -> Option<u8> {
        frame.get(1).copied()
    }

    /// Peek the module id of a raw frame without consuming it.
    pub fn peek_module_id(frame: &[u8]) -> Option<u32> {
        let raw: [u8; 4] = frame.get(8..12)?.try_into().ok()?;
        Some(u32::from_be_bytes(raw))
    }
}

// ── Field helpers ───────────────────────────────────────────────────

pub(crate) fn put_hwaddr(buf: &mut impl BufMut, addr: [u8; 6]) {
    buf.put_slice(&addr);
}

pub(crate) fn get_hwaddr(buf: &mut impl Buf) -> Result<[u8; 6], CodecError> {
    if buf.remaining() < 6 {
        return Err(CodecError::Truncated {
            needed: 6 - buf.remaining(),
        });
    }
    let mut addr = [0u8; 6];
    buf.copy_to_slice(&mut addr);
    Ok(addr)
}

pub(crate) fn need(buf: &impl Buf, len: usize) -> Result<(), CodecError> {
    if buf.remaining() < len {
        return Err(CodecError::Truncated {
            needed: len - buf.remaining(),
        });
    }
    Ok(())
}
