// ── Flow-table collaborator ──
//
// The OpenFlow-style programming subsystem is external; the binding
// engine drives it through this narrow interface on downlink
// bind/unbind.

use std::fmt;
use tracing::debug;

use crate::model::MacAddress;

/// Per-client flow programming on the wired side of an access point.
pub trait FlowTable: fmt::Debug + Send + Sync {
    /// Install the client's station flows towards the given switch port.
    fn install(&self, client: MacAddress, wtp: MacAddress, switch_port_id: u32);

    /// Tear the client's station flows down.
    fn remove(&self, client: MacAddress, wtp: MacAddress);
}

/// Flow table that only logs. Useful until a real programming backend
/// is wired in, and as the default for tools that never touch flows.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingFlowTable;

impl FlowTable for LoggingFlowTable {
    fn install(&self, client: MacAddress, wtp: MacAddress, switch_port_id: u32) {
        debug!(%client, %wtp, switch_port_id, "install station flows");
    }

    fn remove(&self, client: MacAddress, wtp: MacAddress) {
        debug!(%client, %wtp, "remove station flows");
    }
}
