// ── Port tables: the binding side-effect engine ──
//
// A Port is the per-(client, resource) link configuration; the tables
// own the client's binding and drive the wire exchange on every
// mutation. Two flavors with one invariant each: the downlink table
// caps at a single entry (the ack-generating resource), the uplink
// table is unbounded metadata the agent uses opportunistically.

use serde::Serialize;
use tracing::debug;

use airlift_proto::{AddLvap, DelLvap, SetPort, F_NO_ACK, F_REPLACE};
use indexmap::IndexMap;

use crate::error::CoreError;
use crate::model::{MacAddress, ResourceBlock, Ssid, Wtp};

/// Default RTS/CTS threshold: effectively disabled.
const DEFAULT_RTS_CTS: u16 = 2346;

// ── RadioPort ───────────────────────────────────────────────────────

/// Link parameters for one (client, resource) pair. Policies that
/// cannot run at the controller for timing reasons (rate control) are
/// configured here and enforced by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RadioPort {
    /// Transmit power in dBm; zero lets the agent decide.
    pub tx_power: u8,
    /// Send frames without waiting for acknowledgments.
    pub no_ack: bool,
    /// RTS/CTS threshold in bytes.
    pub rts_cts: u16,
}

impl Default for RadioPort {
    fn default() -> Self {
        Self {
            tx_power: 0,
            no_ack: false,
            rts_cts: DEFAULT_RTS_CTS,
        }
    }
}

// ── Wire-visible client state ───────────────────────────────────────

/// Snapshot of the client attributes an add-client message carries.
/// Taken by the LVAP right before a table mutation so the tables never
/// need to borrow back into the entity.
#[derive(Debug, Clone)]
pub(crate) struct WireState {
    pub addr: MacAddress,
    pub bssid: MacAddress,
    pub encap: MacAddress,
    pub assoc_id: u16,
    pub ssid: Option<Ssid>,
    pub ssids: Vec<Ssid>,
}

// ── Send helpers ────────────────────────────────────────────────────
//
// Every helper degrades to a no-op when the WTP is unknown or its
// connection is gone; binding state is authoritative on the
// controller and resynchronized when the agent returns.

pub(crate) fn send_add_lvap(
    wtp: Option<&Wtp>,
    state: &WireState,
    block: &ResourceBlock,
    replace: bool,
) {
    let Some(conn) = wtp.and_then(Wtp::connection) else {
        debug!(client = %state.addr, %block, "add-client skipped: no connection");
        return;
    };
    if conn.is_closed() {
        debug!(client = %state.addr, %block, "add-client skipped: connection closed");
        return;
    }

    let msg = AddLvap {
        flags: if replace { F_REPLACE } else { 0 },
        assoc_id: state.assoc_id,
        hwaddr: block.hwaddr.octets(),
        channel: block.channel,
        band: block.band.code(),
        addr: state.addr.octets(),
        bssid: state.bssid.octets(),
        encap: state.encap.octets(),
        ssid: state.ssid.as_ref().map(|s| s.as_str().to_owned()),
        ssids: state.ssids.iter().map(|s| s.as_str().to_owned()).collect(),
    };
    conn.write(msg.encode(conn.next_seq()));
}

pub(crate) fn send_set_port(
    wtp: Option<&Wtp>,
    addr: MacAddress,
    block: &ResourceBlock,
    port: RadioPort,
) {
    let Some(conn) = wtp.and_then(Wtp::connection) else {
        debug!(client = %addr, %block, "port-update skipped: no connection");
        return;
    };
    if conn.is_closed() {
        debug!(client = %addr, %block, "port-update skipped: connection closed");
        return;
    }

    let msg = SetPort {
        flags: if port.no_ack { F_NO_ACK } else { 0 },
        addr: addr.octets(),
        hwaddr: block.hwaddr.octets(),
        channel: block.channel,
        band: block.band.code(),
        rts_cts: port.rts_cts,
        tx_power: port.tx_power,
    };
    conn.write(msg.encode(conn.next_seq()));
}

pub(crate) fn send_del_lvap(wtp: Option<&Wtp>, addr: MacAddress) {
    let Some(conn) = wtp.and_then(Wtp::connection) else {
        debug!(client = %addr, "delete-client skipped: no connection");
        return;
    };
    if conn.is_closed() {
        debug!(client = %addr, "delete-client skipped: connection closed");
        return;
    }

    conn.write(DelLvap { addr: addr.octets() }.encode(conn.next_seq()));
}

// ── DownlinkTable ───────────────────────────────────────────────────

/// The client's single ack-generating binding. Capacity is exactly one
/// entry; a second bind is a contract violation the caller must
/// resolve by unbinding first.
#[derive(Debug, Clone, Default)]
pub struct DownlinkTable {
    entry: Option<(ResourceBlock, RadioPort)>,
}

impl DownlinkTable {
    pub fn block(&self) -> Option<&ResourceBlock> {
        self.entry.as_ref().map(|(block, _)| block)
    }

    pub fn port(&self) -> Option<&RadioPort> {
        self.entry.as_ref().map(|(_, port)| port)
    }

    pub fn len(&self) -> usize {
        usize::from(self.entry.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    /// Bind the client to `block` and announce it with replace
    /// semantics. Flow-table and virtual-port programming happen at
    /// the LVAP level right after a successful bind.
    pub(crate) fn bind(
        &mut self,
        state: &WireState,
        wtp: Option<&Wtp>,
        block: ResourceBlock,
        port: RadioPort,
    ) -> Result<(), CoreError> {
        if self.entry.is_some() {
            return Err(CoreError::DownlinkOccupied(state.addr));
        }

        debug!(client = %state.addr, %block, "downlink bind");
        send_add_lvap(wtp, state, &block, true);
        self.entry = Some((block, port));
        Ok(())
    }

    /// Replace the port configuration of the existing entry. Wire-only:
    /// no flow-table or virtual-port change.
    pub(crate) fn update(
        &mut self,
        addr: MacAddress,
        wtp: Option<&Wtp>,
        port: RadioPort,
    ) -> Result<(), CoreError> {
        let Some((block, slot)) = self.entry.as_mut() else {
            return Err(CoreError::NotBound(addr));
        };

        *slot = port;
        send_set_port(wtp, addr, block, port);
        Ok(())
    }

    /// Remove the entry, telling the agent first (skipped if the
    /// connection is already gone).
    pub(crate) fn unbind(
        &mut self,
        addr: MacAddress,
        wtp: Option<&Wtp>,
    ) -> Option<(ResourceBlock, RadioPort)> {
        let entry = self.entry.take()?;
        debug!(client = %addr, block = %entry.0, "downlink unbind");
        send_del_lvap(wtp, addr);
        Some(entry)
    }

    /// Re-announce the current entry (attribute propagation).
    pub(crate) fn resend(&self, state: &WireState, wtp: Option<&Wtp>) {
        if let Some((block, _)) = &self.entry {
            send_add_lvap(wtp, state, block, true);
        }
    }
}

// ── UplinkTable ─────────────────────────────────────────────────────

/// Zero-or-more opportunistic receive/forward bindings. Metadata only:
/// never touches flow tables or virtual ports, and announces with
/// merge semantics so the agent folds entries in.
#[derive(Debug, Clone, Default)]
pub struct UplinkTable {
    entries: IndexMap<ResourceBlock, RadioPort>,
}

impl UplinkTable {
    pub fn blocks(&self) -> impl Iterator<Item = &ResourceBlock> {
        self.entries.keys()
    }

    pub fn port(&self, block: &ResourceBlock) -> Option<&RadioPort> {
        self.entries.get(block)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an uplink binding. Re-binding an existing block is a port
    /// update, not a structural change.
    pub(crate) fn bind(
        &mut self,
        state: &WireState,
        wtp: Option<&Wtp>,
        block: ResourceBlock,
        port: RadioPort,
    ) {
        if let Some(slot) = self.entries.get_mut(&block) {
            *slot = port;
            send_set_port(wtp, state.addr, &block, port);
            return;
        }

        debug!(client = %state.addr, %block, "uplink bind");
        send_add_lvap(wtp, state, &block, false);
        self.entries.insert(block, port);
    }

    pub(crate) fn unbind(
        &mut self,
        addr: MacAddress,
        wtp: Option<&Wtp>,
        block: &ResourceBlock,
    ) -> Option<RadioPort> {
        let port = self.entries.shift_remove(block)?;
        debug!(client = %addr, %block, "uplink unbind");
        send_del_lvap(wtp, addr);
        Some(port)
    }

    /// Re-announce every entry (attribute propagation).
    pub(crate) fn resend_all<'a>(
        &self,
        state: &WireState,
        mut wtp_of: impl FnMut(MacAddress) -> Option<&'a Wtp>,
    ) {
        for block in self.entries.keys() {
            send_add_lvap(wtp_of(block.wtp), state, block, false);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Band;
    use crate::testutil::{connected_wtp, mac, wire_state};
    use airlift_proto::{Header, PT_ADD_LVAP, PT_DEL_LVAP, PT_SET_PORT};
    use pretty_assertions::assert_eq;

    fn block(wtp: MacAddress, channel: u8) -> ResourceBlock {
        ResourceBlock::new(wtp, mac(0x10), channel, Band::L20)
    }

    #[test]
    fn downlink_capacity_is_one() {
        let (wtp, conn) = connected_wtp(mac(1), vec![]);
        let state = wire_state(mac(0xa1));
        let mut table = DownlinkTable::default();

        table
            .bind(&state, Some(&wtp), block(mac(1), 1), RadioPort::default())
            .unwrap();
        assert_eq!(table.len(), 1);

        let err = table.bind(&state, Some(&wtp), block(mac(1), 6), RadioPort::default());
        assert!(matches!(err, Err(CoreError::DownlinkOccupied(_))));
        assert_eq!(table.len(), 1);
        // Only the first bind reached the wire.
        assert_eq!(conn.frame_types(), vec![PT_ADD_LVAP]);
    }

    #[test]
    fn downlink_bind_uses_replace_semantics() {
        let (wtp, conn) = connected_wtp(mac(1), vec![]);
        let state = wire_state(mac(0xa1));
        let mut table = DownlinkTable::default();

        table
            .bind(&state, Some(&wtp), block(mac(1), 1), RadioPort::default())
            .unwrap();

        let frames = conn.frames();
        let msg = AddLvap::decode(&frames[0]).unwrap();
        assert_eq!(msg.flags & F_REPLACE, F_REPLACE);
    }

    #[test]
    fn uplink_bind_uses_merge_semantics_and_has_no_cap() {
        let (wtp, conn) = connected_wtp(mac(1), vec![]);
        let state = wire_state(mac(0xa1));
        let mut table = UplinkTable::default();

        table.bind(&state, Some(&wtp), block(mac(1), 1), RadioPort::default());
        table.bind(&state, Some(&wtp), block(mac(1), 6), RadioPort::default());
        assert_eq!(table.len(), 2);

        for frame in conn.frames() {
            let msg = AddLvap::decode(&frame).unwrap();
            assert_eq!(msg.flags & F_REPLACE, 0);
        }
    }

    #[test]
    fn update_sends_port_update_only() {
        let (wtp, conn) = connected_wtp(mac(1), vec![]);
        let state = wire_state(mac(0xa1));
        let mut table = DownlinkTable::default();
        table
            .bind(&state, Some(&wtp), block(mac(1), 1), RadioPort::default())
            .unwrap();

        let port = RadioPort {
            tx_power: 20,
            no_ack: true,
            rts_cts: 500,
        };
        table.update(state.addr, Some(&wtp), port).unwrap();

        assert_eq!(conn.frame_types(), vec![PT_ADD_LVAP, PT_SET_PORT]);
        let msg = SetPort::decode(&conn.frames()[1]).unwrap();
        assert_eq!(msg.flags & F_NO_ACK, F_NO_ACK);
        assert_eq!(msg.rts_cts, 500);
        assert_eq!(msg.tx_power, 20);
        assert_eq!(*table.port().unwrap(), port);
    }

    #[test]
    fn update_without_binding_is_rejected() {
        let (wtp, _conn) = connected_wtp(mac(1), vec![]);
        let mut table = DownlinkTable::default();
        assert!(matches!(
            table.update(mac(0xa1), Some(&wtp), RadioPort::default()),
            Err(CoreError::NotBound(_))
        ));
    }

    #[test]
    fn unbind_sends_delete_and_clears() {
        let (wtp, conn) = connected_wtp(mac(1), vec![]);
        let state = wire_state(mac(0xa1));
        let mut table = DownlinkTable::default();
        table
            .bind(&state, Some(&wtp), block(mac(1), 1), RadioPort::default())
            .unwrap();

        let removed = table.unbind(state.addr, Some(&wtp));
        assert!(removed.is_some());
        assert!(table.is_empty());

        assert_eq!(conn.frame_types(), vec![PT_ADD_LVAP, PT_DEL_LVAP]);
        let msg = DelLvap::decode(&conn.frames()[1]).unwrap();
        assert_eq!(msg.addr, state.addr.octets());
    }

    #[test]
    fn unbind_on_closed_connection_skips_send_but_clears() {
        let (wtp, conn) = connected_wtp(mac(1), vec![]);
        let state = wire_state(mac(0xa1));
        let mut table = DownlinkTable::default();
        table
            .bind(&state, Some(&wtp), block(mac(1), 1), RadioPort::default())
            .unwrap();

        conn.close();
        assert!(table.unbind(state.addr, Some(&wtp)).is_some());
        assert!(table.is_empty());
        // Just the original add; the delete was skipped.
        assert_eq!(conn.frame_types(), vec![PT_ADD_LVAP]);
    }

    #[test]
    fn sequence_numbers_increase_per_send() {
        let (wtp, conn) = connected_wtp(mac(1), vec![]);
        let state = wire_state(mac(0xa1));
        let mut table = UplinkTable::default();
        table.bind(&state, Some(&wtp), block(mac(1), 1), RadioPort::default());
        table.bind(&state, Some(&wtp), block(mac(1), 6), RadioPort::default());

        let seqs: Vec<u32> = conn
            .frames()
            .iter()
            .map(|f| Header::decode(&mut f.as_ref()).unwrap().seq)
            .collect();
        assert!(seqs.windows(2).all(|w| w[1] > w[0]));
    }
}
