// ── Light Virtual Access Point ──
//
// One LVAP exists for every client admitted to the network. It is
// hosted on exactly one resource block in the downlink direction (the
// ack-generating one, which doubles as the default uplink) and on any
// number of additional uplink-only blocks. An LVAP with no downlink is
// only admissible transiently, mid-handover.

pub mod port;
pub mod virtual_port;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::flow::FlowTable;
use crate::model::{MacAddress, ResourceBlock, ResourcePool, Ssid, Wtp};
use crate::registry::Registry;

use port::{DownlinkTable, RadioPort, UplinkTable, WireState};
use virtual_port::VirtualPortTable;

// ── ControlContext ──────────────────────────────────────────────────

/// Lookup and programming handles every binding mutation needs.
/// Passed explicitly so the side-effect paths stay testable with
/// in-memory fakes.
pub struct ControlContext<'a> {
    pub registry: &'a Registry,
    pub flow: &'a dyn FlowTable,
    /// Bridge interface name virtual ports are built from.
    pub bridge_iface: &'a str,
}

// ── BindTarget ──────────────────────────────────────────────────────

/// What a downlink assignment accepts: one block, or a pool from which
/// a default block is extracted and the rest become uplink-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindTarget {
    Block(ResourceBlock),
    Pool(ResourcePool),
}

impl From<ResourceBlock> for BindTarget {
    fn from(block: ResourceBlock) -> Self {
        Self::Block(block)
    }
}

impl From<ResourcePool> for BindTarget {
    fn from(pool: ResourcePool) -> Self {
        Self::Pool(pool)
    }
}

// ── Lvap ────────────────────────────────────────────────────────────

/// The controller-side representation of one wireless client.
///
/// Identity is the client address, fixed for the object's lifetime.
/// The bssid is generated once at admission and never changes either.
/// Authentication/association flags are only written by inbound agent
/// status reports; everything else is controller-owned and propagated
/// to the hosting agents on change.
#[derive(Debug)]
pub struct Lvap {
    addr: MacAddress,
    bssid: MacAddress,

    /// Blocks this client's radio conditions allow.
    pub supports: ResourcePool,

    authentication_state: bool,
    association_state: bool,

    ssids: Vec<Ssid>,
    ssid: Option<Ssid>,
    assoc_id: u16,
    encap: MacAddress,

    downlink: DownlinkTable,
    uplink: UplinkTable,
    virtual_ports: VirtualPortTable,

    /// (bytes, packets) sample pairs, cleared on handover.
    pub tx_samples: Vec<(u64, u64)>,
    pub rx_samples: Vec<(u64, u64)>,
    /// Per-rate delivery statistics, cleared on handover.
    pub rates: HashMap<u8, f64>,
}

impl Lvap {
    pub fn new(addr: MacAddress, bssid: MacAddress) -> Self {
        Self {
            addr,
            bssid,
            supports: ResourcePool::new(),
            authentication_state: false,
            association_state: false,
            ssids: Vec::new(),
            ssid: None,
            assoc_id: 0,
            encap: MacAddress::ZERO,
            downlink: DownlinkTable::default(),
            uplink: UplinkTable::default(),
            virtual_ports: VirtualPortTable::new(),
            tx_samples: Vec::new(),
            rx_samples: Vec::new(),
            rates: HashMap::new(),
        }
    }

    // ── Read accessors ──────────────────────────────────────────────

    pub fn addr(&self) -> MacAddress {
        self.addr
    }

    pub fn bssid(&self) -> MacAddress {
        self.bssid
    }

    pub fn ssid(&self) -> Option<&Ssid> {
        self.ssid.as_ref()
    }

    pub fn ssids(&self) -> &[Ssid] {
        &self.ssids
    }

    pub fn assoc_id(&self) -> u16 {
        self.assoc_id
    }

    pub fn encap(&self) -> MacAddress {
        self.encap
    }

    pub fn authentication_state(&self) -> bool {
        self.authentication_state
    }

    pub fn association_state(&self) -> bool {
        self.association_state
    }

    pub fn downlink(&self) -> &DownlinkTable {
        &self.downlink
    }

    pub fn uplink(&self) -> &UplinkTable {
        &self.uplink
    }

    pub fn virtual_ports(&self) -> &VirtualPortTable {
        &self.virtual_ports
    }

    /// The block generating acknowledgments for this client.
    pub fn default_block(&self) -> Option<&ResourceBlock> {
        self.downlink.block()
    }

    /// The access point hosting the downlink, if bound.
    pub fn wtp_addr(&self) -> Option<MacAddress> {
        self.downlink.block().map(|block| block.wtp)
    }

    // ── Client-global attributes ────────────────────────────────────
    //
    // Each setter is a no-op when the value does not change; otherwise
    // every bound downlink and uplink resource gets a fresh add-client
    // carrying the new state.

    pub fn set_encap(&mut self, ctx: &ControlContext<'_>, encap: Option<MacAddress>) {
        let encap = encap.unwrap_or(MacAddress::ZERO);
        if self.encap == encap {
            return;
        }
        self.encap = encap;
        self.propagate(ctx);
    }

    pub fn set_assoc_id(&mut self, ctx: &ControlContext<'_>, assoc_id: u16) {
        if self.assoc_id == assoc_id {
            return;
        }
        self.assoc_id = assoc_id;
        self.propagate(ctx);
    }

    pub fn set_ssid(&mut self, ctx: &ControlContext<'_>, ssid: Option<Ssid>) {
        if self.ssid == ssid {
            return;
        }
        self.ssid = ssid;
        self.propagate(ctx);
    }

    pub fn set_ssids(&mut self, ctx: &ControlContext<'_>, ssids: Vec<Ssid>) {
        if self.ssids == ssids {
            return;
        }
        self.ssids = ssids;
        self.propagate(ctx);
    }

    /// Controller-side successful association: record the SSID and
    /// association id in one go.
    pub fn associate(&mut self, ctx: &ControlContext<'_>, ssid: Ssid, assoc_id: u16) {
        self.set_ssid(ctx, Some(ssid));
        self.set_assoc_id(ctx, assoc_id);
    }

    // ── Agent-originated state ──────────────────────────────────────

    /// Apply an inbound status report. These flags are never written
    /// from the controller side.
    pub fn handle_status_report(&mut self, authenticated: bool, associated: bool) {
        self.authentication_state = authenticated;
        self.association_state = associated;
    }

    /// Apply a remote disassociation report: auth/assoc state and the
    /// association itself are gone. No wire traffic — the agent told us.
    pub fn handle_disassociation(&mut self) {
        self.authentication_state = false;
        self.association_state = false;
        self.assoc_id = 0;
        self.ssid = None;
    }

    // ── Downlink assignment / handover ──────────────────────────────

    /// Assign the client's resource binding.
    ///
    /// `None` (and an empty pool) mean "no change requested" and
    /// return immediately. A pool set-equal to the current combined
    /// downlink+uplink binding is a refresh: virtual-port and
    /// flow-table programming are re-issued idempotently with zero
    /// wire traffic. Anything else is a rebind: every current entry is
    /// torn down, one block popped from the pool becomes the downlink,
    /// and the remainder become uplink-only entries.
    pub fn set_downlink(
        &mut self,
        ctx: &ControlContext<'_>,
        target: Option<BindTarget>,
    ) -> Result<(), CoreError> {
        let Some(target) = target else {
            return Ok(());
        };

        let mut pool = match target {
            BindTarget::Block(block) => ResourcePool::singleton(block),
            BindTarget::Pool(pool) => pool,
        };
        if pool.is_empty() {
            return Ok(());
        }

        let current: ResourcePool = self
            .downlink
            .block()
            .cloned()
            .into_iter()
            .chain(self.uplink.blocks().cloned())
            .collect();

        if current == pool {
            debug!(client = %self.addr, "binding unchanged; reprogramming only");
            self.reprogram(ctx);
            return Ok(());
        }

        let state = self.wire_state();

        // Tear down the old world: flows first, then every table entry
        // (each unbind fires its wire delete).
        self.clear_programming(ctx);
        if self.downlink.block().is_some() {
            let wtp = self.wtp_of(ctx, self.downlink.block().map(|b| b.wtp));
            self.downlink.unbind(state.addr, wtp);
        }
        for block in self.uplink.blocks().cloned().collect::<Vec<_>>() {
            let wtp = ctx.registry.wtp(block.wtp).ok();
            self.uplink.unbind(state.addr, wtp, &block);
        }

        // Stats do not survive a rebind.
        self.clear_stats();

        let Some(default_block) = pool.pop() else {
            return Ok(());
        };
        debug!(client = %self.addr, block = %default_block, "downlink rebind");

        let wtp = ctx.registry.wtp(default_block.wtp).ok();
        self.downlink
            .bind(&state, wtp, default_block, RadioPort::default())?;
        self.reprogram(ctx);

        for block in pool {
            let wtp = ctx.registry.wtp(block.wtp).ok();
            self.uplink.bind(&state, wtp, block, RadioPort::default());
        }

        Ok(())
    }

    /// Hand the client over to another access point.
    ///
    /// The target must host a block on the client's current
    /// channel/band; if it does not, nothing changes and no error is
    /// raised. On a match the full rebind of [`Lvap::set_downlink`]
    /// runs against the matching block.
    pub fn handover_to(
        &mut self,
        ctx: &ControlContext<'_>,
        target: &Wtp,
    ) -> Result<(), CoreError> {
        let current = self
            .downlink
            .block()
            .cloned()
            .ok_or(CoreError::NotBound(self.addr))?;

        match target.supports.equivalent_of(&current) {
            Some(block) => {
                let block = block.clone();
                self.set_downlink(ctx, Some(BindTarget::Block(block)))
            }
            None => {
                debug!(
                    client = %self.addr,
                    target = %target.addr,
                    "handover skipped: target does not host channel {} {}",
                    current.channel,
                    current.band
                );
                Ok(())
            }
        }
    }

    // ── Port configuration ──────────────────────────────────────────

    /// The port configuration of the downlink entry.
    pub fn default_port(&self) -> Option<&RadioPort> {
        self.downlink.port()
    }

    /// Replace the downlink port configuration (port-update on the
    /// wire, nothing else).
    pub fn set_port(&mut self, ctx: &ControlContext<'_>, port: RadioPort) -> Result<(), CoreError> {
        let wtp = self.wtp_of(ctx, self.downlink.block().map(|b| b.wtp));
        self.downlink.update(self.addr, wtp, port)
    }

    /// Manually add or update an uplink-only entry.
    pub fn bind_uplink(&mut self, ctx: &ControlContext<'_>, block: ResourceBlock, port: RadioPort) {
        let state = self.wire_state();
        let wtp = ctx.registry.wtp(block.wtp).ok();
        self.uplink.bind(&state, wtp, block, port);
    }

    /// Manually drop an uplink-only entry.
    pub fn unbind_uplink(&mut self, ctx: &ControlContext<'_>, block: &ResourceBlock) {
        let wtp = ctx.registry.wtp(block.wtp).ok();
        self.uplink.unbind(self.addr, wtp, block);
    }

    /// Full teardown: wire deletes for every entry, flow removal,
    /// virtual ports cleared. Used when the client leaves for good.
    pub fn unbind(&mut self, ctx: &ControlContext<'_>) {
        self.clear_programming(ctx);
        let addr = self.addr;
        let wtp = self.wtp_of(ctx, self.downlink.block().map(|b| b.wtp));
        self.downlink.unbind(addr, wtp);
        for block in self.uplink.blocks().cloned().collect::<Vec<_>>() {
            let wtp = ctx.registry.wtp(block.wtp).ok();
            self.uplink.unbind(addr, wtp, &block);
        }
    }

    // ── Snapshot ────────────────────────────────────────────────────

    /// Structured snapshot for external reporting.
    pub fn to_snapshot(&self) -> LvapSnapshot {
        LvapSnapshot {
            addr: self.addr,
            bssid: self.bssid,
            ssid: self.ssid.clone(),
            ssids: self.ssids.clone(),
            assoc_id: self.assoc_id,
            encap: self.encap,
            authentication_state: self.authentication_state,
            association_state: self.association_state,
            wtp: self.wtp_addr(),
            downlink: self.downlink.block().cloned().into_iter().collect(),
            uplink: self.uplink.blocks().cloned().collect(),
            supports: self.supports.clone(),
            port: self.downlink.port().copied(),
            virtual_ports: self.virtual_ports.clone(),
            tx_samples: self.tx_samples.clone(),
            rx_samples: self.rx_samples.clone(),
            rates: self.rates.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    fn wire_state(&self) -> WireState {
        WireState {
            addr: self.addr,
            bssid: self.bssid,
            encap: self.encap,
            assoc_id: self.assoc_id,
            ssid: self.ssid.clone(),
            ssids: self.ssids.clone(),
        }
    }

    fn wtp_of<'a>(
        &self,
        ctx: &ControlContext<'a>,
        addr: Option<MacAddress>,
    ) -> Option<&'a Wtp> {
        addr.and_then(|a| ctx.registry.wtp(a).ok())
    }

    fn propagate(&self, ctx: &ControlContext<'_>) {
        let state = self.wire_state();
        let wtp = self.wtp_of(ctx, self.downlink.block().map(|b| b.wtp));
        self.downlink.resend(&state, wtp);
        self.uplink
            .resend_all(&state, |addr| ctx.registry.wtp(addr).ok());
    }

    /// Rebuild virtual ports from the hosting WTP and (re)program the
    /// client's station flows. Idempotent; no wire traffic.
    fn reprogram(&mut self, ctx: &ControlContext<'_>) {
        let Some(block) = self.downlink.block() else {
            self.virtual_ports.clear();
            return;
        };
        let wtp_addr = block.wtp;

        let Ok(wtp) = ctx.registry.wtp(wtp_addr) else {
            warn!(client = %self.addr, wtp = %wtp_addr, "hosting WTP unknown; skipping programming");
            self.virtual_ports.clear();
            return;
        };

        self.virtual_ports.rebuild(wtp, ctx.bridge_iface);
        ctx.flow.remove(self.addr, wtp_addr);
        if let Some(vport) = self.virtual_ports.default_port() {
            ctx.flow.install(self.addr, wtp_addr, vport.switch_port_id);
        } else {
            warn!(client = %self.addr, wtp = %wtp_addr, "no bridge port on WTP; flows not installed");
        }
    }

    fn clear_programming(&mut self, ctx: &ControlContext<'_>) {
        if let Some(block) = self.downlink.block() {
            ctx.flow.remove(self.addr, block.wtp);
        }
        self.virtual_ports.clear();
    }

    fn clear_stats(&mut self) {
        self.tx_samples.clear();
        self.rx_samples.clear();
        self.rates.clear();
    }
}

impl PartialEq for Lvap {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl Eq for Lvap {}

impl std::hash::Hash for Lvap {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
    }
}

impl fmt::Display for Lvap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "addr {} bssid {}", self.addr, self.bssid)?;
        if let Some(ssid) = &self.ssid {
            write!(f, " ssid {ssid}")?;
        }
        if !self.ssids.is_empty() {
            let names: Vec<&str> = self.ssids.iter().map(Ssid::as_str).collect();
            write!(f, " ssids [ {} ]", names.join(", "))?;
        }
        write!(f, " assoc_id {}", self.assoc_id)?;
        if self.association_state {
            write!(f, " ASSOC")?;
        }
        if self.authentication_state {
            write!(f, " AUTH")?;
        }
        Ok(())
    }
}

// ── LvapSnapshot ────────────────────────────────────────────────────

/// JSON-serializable view of an LVAP for the management surface.
#[derive(Debug, Clone, Serialize)]
pub struct LvapSnapshot {
    pub addr: MacAddress,
    pub bssid: MacAddress,
    pub ssid: Option<Ssid>,
    pub ssids: Vec<Ssid>,
    pub assoc_id: u16,
    pub encap: MacAddress,
    pub authentication_state: bool,
    pub association_state: bool,
    pub wtp: Option<MacAddress>,
    pub downlink: Vec<ResourceBlock>,
    pub uplink: Vec<ResourceBlock>,
    pub supports: ResourcePool,
    pub port: Option<RadioPort>,
    pub virtual_ports: VirtualPortTable,
    pub tx_samples: Vec<(u64, u64)>,
    pub rx_samples: Vec<(u64, u64)>,
    pub rates: std::collections::BTreeMap<u8, f64>,
}
