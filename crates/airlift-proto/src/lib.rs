//! Binary wire protocol between the airlift controller and its agents.
//!
//! Every message shares a fixed 12-byte big-endian [`Header`]; typed
//! bodies follow immediately. Two families live here:
//!
//! - **Client binding** ([`AddLvap`], [`DelLvap`], [`SetPort`]) — driven
//!   by the controller whenever a client's resource binding or
//!   transmission policy changes.
//! - **Frame-summary telemetry** ([`AddSummary`], [`SummaryReport`],
//!   [`DelSummary`]) — the periodic request/report/teardown trio used by
//!   the polling-module framework in `airlift-core`.
//!
//! This crate is deliberately dumb: addresses are `[u8; 6]`, bands and
//! frame types are raw codes. Domain interpretation belongs upstream.

pub mod error;
pub mod header;
pub mod lvap;
pub mod summary;

pub use error::CodecError;
pub use header::{
    Header, HEADER_LEN, PT_ADD_LVAP, PT_ADD_SUMMARY, PT_BYE, PT_DEL_LVAP, PT_DEL_SUMMARY,
    PT_HELLO, PT_SET_PORT, PT_SUMMARY, PT_VERSION,
};
pub use lvap::{AddLvap, DelLvap, SetPort, F_NO_ACK, F_REPLACE};
pub use summary::{AddSummary, DelSummary, SummaryEntry, SummaryReport};
