// ── Agent connection collaborator ──
//
// The transport layer owning the persistent socket per access point
// lives outside this crate. The core only needs three things from it:
// write a frame, tell whether the transport died, and hand out the
// monotonically increasing sequence number stamped into every header.

use bytes::Bytes;
use std::fmt;

/// One persistent bidirectional connection to an access point agent.
///
/// All side-effecting operations write synchronously through this
/// trait before returning, so message order on a connection matches
/// the order of controller-side state mutations.
pub trait Connection: fmt::Debug + Send + Sync {
    /// Queue a fully encoded frame for transmission.
    ///
    /// Callers check [`Connection::is_closed`] first; a write after the
    /// transport died may be dropped silently.
    fn write(&self, frame: Bytes);

    /// Whether the underlying transport is gone. A closed connection
    /// degrades sends to no-ops; state cleanup still proceeds.
    fn is_closed(&self) -> bool;

    /// Take the next header sequence number for this connection.
    fn next_seq(&self) -> u32;
}
