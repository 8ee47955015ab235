use thiserror::Error;

/// Decode-side failures for the agent wire protocol.
///
/// Encoding is infallible — message structs can only hold representable
/// values. Decoding deals with whatever the socket hands us.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Buffer ended before the fixed layout was satisfied.
    #[error("truncated message: needed {needed} more bytes")]
    Truncated { needed: usize },

    /// Header `length` field disagrees with the bytes actually present.
    #[error("length mismatch: header says {declared}, buffer holds {actual}")]
    LengthMismatch { declared: u16, actual: usize },

    /// Protocol version byte is not ours.
    #[error("unsupported protocol version {got} (expected {expected})")]
    VersionMismatch { expected: u8, got: u8 },

    /// Message type code this decoder does not handle.
    #[error("unexpected message type 0x{got:02x} (expected 0x{expected:02x})")]
    TypeMismatch { expected: u8, got: u8 },

    /// SSID bytes were not valid UTF-8.
    #[error("SSID is not valid UTF-8")]
    InvalidSsid,
}
