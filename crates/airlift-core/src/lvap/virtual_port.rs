// ── Virtual port table ──
//
// The local software-switch attachment points created for a client's
// downlink binding. Rebuilt wholesale whenever the downlink moves.

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{MacAddress, Wtp};

/// One virtual port: the binding between a client, a radio, and a
/// physical bridge port on the hosting access point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualPort {
    /// Datapath id: the hosting access point's address.
    pub dpid: MacAddress,
    /// Physical bridge port the virtual port attaches to.
    pub switch_port_id: u32,
    /// Synthetic index within the client's table.
    pub virtual_port_id: u32,
    pub hwaddr: MacAddress,
    pub iface: String,
}

/// Per-client mapping from virtual port index to descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VirtualPortTable {
    ports: IndexMap<u32, VirtualPort>,
}

impl VirtualPortTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything and rebuild from the hosting WTP's bridge
    /// ports. Only ports on the controller bridge interface qualify;
    /// the first match becomes virtual port 0.
    pub fn rebuild(&mut self, wtp: &Wtp, bridge_iface: &str) {
        self.ports.clear();

        let Some(port) = wtp.ports.values().find(|p| p.iface == bridge_iface) else {
            return;
        };

        self.ports.insert(
            0,
            VirtualPort {
                dpid: wtp.addr,
                switch_port_id: port.port_id,
                virtual_port_id: 0,
                hwaddr: port.hwaddr,
                iface: port.iface.clone(),
            },
        );
    }

    pub fn clear(&mut self) {
        self.ports.clear();
    }

    /// The default (index 0) virtual port, if built.
    pub fn default_port(&self) -> Option<&VirtualPort> {
        self.ports.get(&0)
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &VirtualPort)> {
        self.ports.iter()
    }
}
