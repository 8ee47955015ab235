// ── Shared test fixtures ──
#![allow(clippy::unwrap_used)]
//
// In-memory stand-ins for the two external collaborators (agent
// connection, flow programming) plus small builders used across the
// unit tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::connection::Connection;
use crate::flow::FlowTable;
use crate::lvap::port::WireState;
use crate::model::{MacAddress, PhysicalPort, ResourceBlock, Wtp};
use crate::registry::Registry;

/// Bridge interface name the fixtures attach ports to.
pub(crate) const BRIDGE_IFACE: &str = "airlift0";

pub(crate) type ConnHandle = Arc<RecordingConnection>;

/// Short MAC: all zeros except the last octet.
pub(crate) fn mac(n: u8) -> MacAddress {
    MacAddress::new([0, 0, 0, 0, 0, n])
}

/// A minimal wire snapshot for a client with no attributes set.
pub(crate) fn wire_state(addr: MacAddress) -> WireState {
    WireState {
        addr,
        bssid: mac(0xbb),
        encap: MacAddress::ZERO,
        assoc_id: 0,
        ssid: None,
        ssids: Vec::new(),
    }
}

// ── RecordingConnection ─────────────────────────────────────────────

/// Connection fake that records every written frame.
#[derive(Debug, Default)]
pub(crate) struct RecordingConnection {
    frames: Mutex<Vec<Bytes>>,
    closed: AtomicBool,
    seq: AtomicU32,
}

impl RecordingConnection {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().unwrap().clone()
    }

    /// The type byte of every recorded frame, in write order.
    pub(crate) fn frame_types(&self) -> Vec<u8> {
        self.frames().iter().filter_map(|f| f.get(1).copied()).collect()
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Connection for RecordingConnection {
    fn write(&self, frame: Bytes) {
        self.frames.lock().unwrap().push(frame);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }
}

// ── RecordingFlowTable ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FlowOp {
    Install {
        client: MacAddress,
        wtp: MacAddress,
        switch_port_id: u32,
    },
    Remove {
        client: MacAddress,
        wtp: MacAddress,
    },
}

/// Flow-table fake that records every programming call.
#[derive(Debug, Default)]
pub(crate) struct RecordingFlowTable {
    ops: Mutex<Vec<FlowOp>>,
}

impl RecordingFlowTable {
    pub(crate) fn ops(&self) -> Vec<FlowOp> {
        self.ops.lock().unwrap().clone()
    }
}

impl FlowTable for RecordingFlowTable {
    fn install(&self, client: MacAddress, wtp: MacAddress, switch_port_id: u32) {
        self.ops.lock().unwrap().push(FlowOp::Install {
            client,
            wtp,
            switch_port_id,
        });
    }

    fn remove(&self, client: MacAddress, wtp: MacAddress) {
        self.ops.lock().unwrap().push(FlowOp::Remove { client, wtp });
    }
}

// ── Builders ────────────────────────────────────────────────────────

/// A WTP with a live recording connection, the given supported blocks,
/// and one bridge port so virtual-port rebuilds succeed.
pub(crate) fn connected_wtp(
    addr: MacAddress,
    blocks: Vec<ResourceBlock>,
) -> (Wtp, Arc<RecordingConnection>) {
    let mut wtp = Wtp::new(addr);
    for block in blocks {
        wtp.supports.insert(block);
    }
    wtp.ports.insert(
        4,
        PhysicalPort {
            port_id: 4,
            hwaddr: mac(0x40),
            iface: BRIDGE_IFACE.to_owned(),
        },
    );
    let conn = RecordingConnection::new();
    wtp.set_connection(conn.clone());
    (wtp, conn)
}

pub(crate) fn registry_with(wtps: Vec<Wtp>) -> Registry {
    let mut registry = Registry::new();
    for wtp in wtps {
        registry.add_wtp(wtp);
    }
    registry
}

/// Register one disconnected WTP supporting `blocks`; its address is
/// taken from the first block.
pub(crate) fn wtp_with_blocks(blocks: Vec<ResourceBlock>) -> (Registry, MacAddress) {
    let addr = blocks.first().map_or(MacAddress::ZERO, |b| b.wtp);
    let mut wtp = Wtp::new(addr);
    for block in blocks {
        wtp.supports.insert(block);
    }
    (registry_with(vec![wtp]), addr)
}
