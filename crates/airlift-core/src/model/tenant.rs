// ── Tenant model ──

use indexmap::IndexSet;
use serde::Serialize;
use uuid::Uuid;

use crate::model::mac::MacAddress;

/// A tenant: the slice of the network a set of access points serves.
///
/// The module framework revalidates tenant existence and WTP
/// membership on every tick and inbound report; a WTP leaving its
/// tenant unloads every module bound through it.
#[derive(Debug, Clone, Serialize)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub name: String,
    /// Access points assigned to this tenant.
    pub wtps: IndexSet<MacAddress>,
}

impl Tenant {
    pub fn new(tenant_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            tenant_id,
            name: name.into(),
            wtps: IndexSet::new(),
        }
    }

    pub fn has_wtp(&self, addr: MacAddress) -> bool {
        self.wtps.contains(&addr)
    }
}
