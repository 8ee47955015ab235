// ── Access point (WTP) model ──

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::connection::Connection;
use crate::model::mac::MacAddress;
use crate::model::resource::ResourcePool;

/// A physical switch port on an access point's embedded bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalPort {
    pub port_id: u32,
    pub hwaddr: MacAddress,
    pub iface: String,
}

/// A remote access point: the agent hosting radio resources, reachable
/// over one persistent wire-protocol connection.
///
/// The connection is absent until the agent's hello and cleared again
/// on bye/disconnect; sends against an absent or closed connection are
/// skipped by the callers, never retried.
pub struct Wtp {
    pub addr: MacAddress,
    /// Resource blocks this access point hosts.
    pub supports: ResourcePool,
    /// Bridge ports, keyed by port id.
    pub ports: IndexMap<u32, PhysicalPort>,
    connection: Option<Arc<dyn Connection>>,
}

impl Wtp {
    pub fn new(addr: MacAddress) -> Self {
        Self {
            addr,
            supports: ResourcePool::new(),
            ports: IndexMap::new(),
            connection: None,
        }
    }

    pub fn connection(&self) -> Option<&Arc<dyn Connection>> {
        self.connection.as_ref()
    }

    pub fn set_connection(&mut self, connection: Arc<dyn Connection>) {
        self.connection = Some(connection);
    }

    pub fn clear_connection(&mut self) {
        self.connection = None;
    }

    /// Connected and the transport is still open.
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| !c.is_closed())
    }
}

impl fmt::Debug for Wtp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wtp")
            .field("addr", &self.addr)
            .field("supports", &self.supports)
            .field("ports", &self.ports)
            .field("connected", &self.is_connected())
            .finish()
    }
}
