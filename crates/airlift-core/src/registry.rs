// ── Runtime registry ──
//
// Resolves tenants and access points by identifier. Passed explicitly
// into every component that needs lookups, so the stale-reference
// paths (tenant gone, WTP gone) stay unit-testable with plain values.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{MacAddress, Tenant, Wtp};

/// In-memory registry of tenants and access points.
///
/// Lookups return typed not-found errors; callers handle those by
/// unloading or no-oping, never by crashing.
#[derive(Debug, Default)]
pub struct Registry {
    tenants: IndexMap<Uuid, Tenant>,
    wtps: IndexMap<MacAddress, Wtp>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Tenants ─────────────────────────────────────────────────────

    pub fn add_tenant(&mut self, tenant: Tenant) {
        self.tenants.insert(tenant.tenant_id, tenant);
    }

    pub fn remove_tenant(&mut self, tenant_id: Uuid) -> Option<Tenant> {
        self.tenants.shift_remove(&tenant_id)
    }

    pub fn tenant(&self, tenant_id: Uuid) -> Result<&Tenant, CoreError> {
        self.tenants
            .get(&tenant_id)
            .ok_or(CoreError::TenantNotFound(tenant_id))
    }

    pub fn tenant_mut(&mut self, tenant_id: Uuid) -> Result<&mut Tenant, CoreError> {
        self.tenants
            .get_mut(&tenant_id)
            .ok_or(CoreError::TenantNotFound(tenant_id))
    }

    // ── WTPs ────────────────────────────────────────────────────────

    pub fn add_wtp(&mut self, wtp: Wtp) {
        self.wtps.insert(wtp.addr, wtp);
    }

    pub fn remove_wtp(&mut self, addr: MacAddress) -> Option<Wtp> {
        self.wtps.shift_remove(&addr)
    }

    pub fn wtp(&self, addr: MacAddress) -> Result<&Wtp, CoreError> {
        self.wtps.get(&addr).ok_or(CoreError::WtpNotFound(addr))
    }

    pub fn wtp_mut(&mut self, addr: MacAddress) -> Result<&mut Wtp, CoreError> {
        self.wtps.get_mut(&addr).ok_or(CoreError::WtpNotFound(addr))
    }

    pub fn wtps(&self) -> impl Iterator<Item = &Wtp> {
        self.wtps.values()
    }

    /// Whether `wtp` currently belongs to `tenant_id`. Both must exist.
    pub fn wtp_in_tenant(&self, tenant_id: Uuid, wtp: MacAddress) -> Result<(), CoreError> {
        let tenant = self.tenant(tenant_id)?;
        if !tenant.has_wtp(wtp) {
            return Err(CoreError::WtpNotFound(wtp));
        }
        Ok(())
    }
}
