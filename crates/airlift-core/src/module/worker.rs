// ── Module worker ──
//
// Owns every live module of one kind and runs the shared lifecycle:
// id assignment, tick-driven requests, report routing by module id,
// revalidation, and unload. All mutation happens on the caller's
// (single) event-loop task; tickers only post wake-ups.

use std::time::Duration;

use indexmap::IndexMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use airlift_proto::Header;

use crate::error::CoreError;
use crate::model::Wtp;
use crate::registry::Registry;

use super::{ModuleState, PollerModule};

/// Spawn the periodic wake-up task for one module. The first tick
/// fires immediately, so a fresh module sends its first request right
/// away. Missed ticks are skipped, not replayed.
pub fn spawn_ticker(
    period: Duration,
    cancel: CancellationToken,
    mut on_tick: impl FnMut() + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => on_tick(),
            }
        }
    })
}

/// The registry of live modules of one kind.
pub struct ModuleWorker<M: PollerModule> {
    modules: IndexMap<u32, M>,
    /// Monotonic; ids are never reused within a worker.
    next_module_id: u32,
    on_result: Option<Box<dyn Fn(&M) + Send>>,
}

impl<M: PollerModule> Default for ModuleWorker<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: PollerModule> ModuleWorker<M> {
    pub fn new() -> Self {
        Self {
            modules: IndexMap::new(),
            next_module_id: 1,
            on_result: None,
        }
    }

    /// Called after every successfully decoded report.
    pub fn set_result_callback(&mut self, callback: impl Fn(&M) + Send + 'static) {
        self.on_result = Some(Box::new(callback));
    }

    pub fn module(&self, module_id: u32) -> Option<&M> {
        self.modules.get(&module_id)
    }

    pub fn modules(&self) -> impl Iterator<Item = &M> {
        self.modules.values()
    }

    pub fn contains(&self, module_id: u32) -> bool {
        self.modules.contains_key(&module_id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Register a module: assign its id and mark it running. The
    /// caller is responsible for arming a ticker for it.
    pub fn add_module(&mut self, mut module: M) -> u32 {
        let module_id = self.next_module_id;
        self.next_module_id += 1;

        module.core_mut().module_id = module_id;
        module.core_mut().state = ModuleState::Running;
        info!(module = module_id, "loaded {}", M::NAME);
        self.modules.insert(module_id, module);
        module_id
    }

    /// One polling cycle for one module: revalidate, then fire the
    /// request at the hosting agent. Fire-and-forget; a missing or
    /// closed connection just skips the send.
    pub fn handle_tick(&mut self, registry: &Registry, module_id: u32) {
        let Some(module) = self.modules.get(&module_id) else {
            return;
        };

        if let Err(err) = Self::validate(registry, module) {
            info!(module = module_id, error = %err, "revalidation failed on tick; unloading");
            self.unload(registry, module_id);
            return;
        }

        let wtp_addr = module.block().wtp;
        match registry.wtp(wtp_addr) {
            Ok(wtp) => Self::send_request(wtp, module),
            Err(err) => {
                info!(module = module_id, error = %err, "hosting WTP gone; unloading");
                self.unload(registry, module_id);
            }
        }
    }

    /// Route an inbound report to its module by the header's module
    /// id. Reports for unknown ids are dropped (late arrivals after an
    /// unload are expected).
    pub fn handle_report(&mut self, registry: &Registry, frame: &[u8]) {
        let Some(module_id) = Header::peek_module_id(frame) else {
            warn!("report too short for a header; dropped");
            return;
        };

        let valid = match self.modules.get(&module_id) {
            None => {
                debug!(module = module_id, "report for unknown module; dropped");
                return;
            }
            Some(module) => Self::validate(registry, module),
        };
        if let Err(err) = valid {
            info!(module = module_id, error = %err, "revalidation failed on report; unloading");
            self.unload(registry, module_id);
            return;
        }

        let Some(module) = self.modules.get_mut(&module_id) else {
            return;
        };
        match module.handle_report(frame) {
            Ok(()) => {
                if let Some(callback) = &self.on_result {
                    callback(&self.modules[&module_id]);
                }
            }
            Err(err) => warn!(module = module_id, error = %err, "malformed report dropped"),
        }
    }

    /// Remove a module, telling the agent to stop if its connection is
    /// still up. Idempotent: unknown ids return `None`.
    pub fn unload(&mut self, registry: &Registry, module_id: u32) -> Option<M> {
        let mut module = self.modules.shift_remove(&module_id)?;
        info!(module = module_id, "unloading {}", M::NAME);
        module.core_mut().state = ModuleState::Unloaded;

        if let Ok(wtp) = registry.wtp(module.block().wtp) {
            if let Some(conn) = wtp.connection() {
                if !conn.is_closed() {
                    conn.write(module.encode_teardown(conn.next_seq()));
                }
            }
        }
        Some(module)
    }

    /// An agent said goodbye: unload every module whose block that
    /// agent hosts. Returns the unloaded ids so the caller can cancel
    /// their tickers.
    pub fn handle_bye(&mut self, registry: &Registry, wtp: &Wtp) -> Vec<u32> {
        let ids: Vec<u32> = self
            .modules
            .iter()
            .filter(|(_, module)| wtp.supports.contains(module.block()))
            .map(|(id, _)| *id)
            .collect();
        for &id in &ids {
            self.unload(registry, id);
        }
        ids
    }

    fn validate(registry: &Registry, module: &M) -> Result<(), CoreError> {
        registry.wtp_in_tenant(module.tenant_id(), module.block().wtp)?;
        Ok(())
    }

    fn send_request(wtp: &Wtp, module: &M) {
        let Some(conn) = wtp.connection() else {
            debug!(module = module.module_id(), wtp = %wtp.addr, "request skipped: no connection");
            return;
        };
        if conn.is_closed() {
            debug!(module = module.module_id(), wtp = %wtp.addr, "request skipped: connection closed");
            return;
        }
        debug!(module = module.module_id(), wtp = %wtp.addr, "sending {} request", M::NAME);
        conn.write(module.encode_request(conn.next_seq()));
    }
}

impl<M: PollerModule> std::fmt::Debug for ModuleWorker<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleWorker")
            .field("kind", &M::NAME)
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .field("next_module_id", &self.next_module_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Band, ResourceBlock, Tenant};
    use crate::module::summary::Summary;
    use crate::module::ModuleCore;
    use crate::testutil::{connected_wtp, mac, registry_with};
    use airlift_proto::{SummaryEntry, SummaryReport, PT_ADD_SUMMARY, PT_DEL_SUMMARY};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    fn fixture() -> (Registry, crate::testutil::ConnHandle, Uuid, ResourceBlock) {
        let block = ResourceBlock::new(mac(1), mac(0x10), 6, Band::L20);
        let (wtp, conn) = connected_wtp(mac(1), vec![block.clone()]);
        let mut registry = registry_with(vec![wtp]);

        let tenant_id = Uuid::from_u128(0x1111);
        let mut tenant = Tenant::new(tenant_id, "lab");
        tenant.wtps.insert(mac(1));
        registry.add_tenant(tenant);

        (registry, conn, tenant_id, block)
    }

    fn summary(tenant_id: Uuid, block: ResourceBlock) -> Summary {
        Summary::new(ModuleCore::new(
            tenant_id,
            block,
            Duration::from_secs(2),
        ))
    }

    #[test]
    fn add_module_assigns_monotonic_ids() {
        let (registry, _conn, tenant_id, block) = fixture();
        let mut worker: ModuleWorker<Summary> = ModuleWorker::new();

        let a = worker.add_module(summary(tenant_id, block.clone()));
        let b = worker.add_module(summary(tenant_id, block.clone()));
        assert_eq!((a, b), (1, 2));
        assert_eq!(worker.module(a).unwrap().state(), ModuleState::Running);

        worker.unload(&registry, a);
        let c = worker.add_module(summary(tenant_id, block));
        // Ids are never reused.
        assert_eq!(c, 3);
    }

    #[test]
    fn tick_sends_a_request_frame() {
        let (registry, conn, tenant_id, block) = fixture();
        let mut worker: ModuleWorker<Summary> = ModuleWorker::new();
        let id = worker.add_module(summary(tenant_id, block));

        worker.handle_tick(&registry, id);
        worker.handle_tick(&registry, id);

        assert_eq!(conn.frame_types(), vec![PT_ADD_SUMMARY, PT_ADD_SUMMARY]);
    }

    #[test]
    fn tick_with_stale_tenant_unloads() {
        let (mut registry, conn, tenant_id, block) = fixture();
        let mut worker: ModuleWorker<Summary> = ModuleWorker::new();
        let id = worker.add_module(summary(tenant_id, block));

        registry.remove_tenant(tenant_id);
        worker.handle_tick(&registry, id);

        assert!(!worker.contains(id));
        // No request went out; the teardown still did (connection is up).
        assert_eq!(conn.frame_types(), vec![PT_DEL_SUMMARY]);
    }

    #[test]
    fn report_updates_module_and_fires_callback() {
        let (registry, _conn, tenant_id, block) = fixture();
        let mut worker: ModuleWorker<Summary> = ModuleWorker::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_seen = Arc::clone(&hits);
        worker.set_result_callback(move |_| {
            hits_seen.fetch_add(1, Ordering::SeqCst);
        });
        let id = worker.add_module(summary(tenant_id, block));

        let report = SummaryReport {
            module_id: id,
            wtp: mac(1).octets(),
            entries: vec![SummaryEntry {
                addr: mac(0xa1).octets(),
                tsft: 42,
                seq: 7,
                rssi: -61,
                rate: 12,
                frame_type: 0x08,
                subtype: 0x00,
                length: 1400,
            }],
        };
        worker.handle_report(&registry, &report.encode(1));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(worker.module(id).unwrap().frames().len(), 1);
    }

    #[test]
    fn report_for_unknown_module_is_dropped() {
        let (registry, _conn, _tenant_id, _block) = fixture();
        let mut worker: ModuleWorker<Summary> = ModuleWorker::new();

        let report = SummaryReport {
            module_id: 99,
            wtp: mac(1).octets(),
            entries: vec![],
        };
        // Must not panic or create anything.
        worker.handle_report(&registry, &report.encode(1));
        assert!(worker.is_empty());
    }

    #[test]
    fn report_with_stale_tenant_unloads_instead_of_updating() {
        let (mut registry, _conn, tenant_id, block) = fixture();
        let mut worker: ModuleWorker<Summary> = ModuleWorker::new();
        let id = worker.add_module(summary(tenant_id, block));

        registry.remove_tenant(tenant_id);
        let report = SummaryReport {
            module_id: id,
            wtp: mac(1).octets(),
            entries: vec![],
        };
        worker.handle_report(&registry, &report.encode(1));

        assert!(!worker.contains(id));
    }

    #[test]
    fn unload_is_idempotent_and_sends_one_teardown() {
        let (registry, conn, tenant_id, block) = fixture();
        let mut worker: ModuleWorker<Summary> = ModuleWorker::new();
        let id = worker.add_module(summary(tenant_id, block));

        let removed = worker.unload(&registry, id);
        assert_eq!(removed.unwrap().state(), ModuleState::Unloaded);
        assert!(worker.unload(&registry, id).is_none());

        assert_eq!(conn.frame_types(), vec![PT_DEL_SUMMARY]);
    }

    #[test]
    fn unload_after_close_skips_the_teardown() {
        let (registry, conn, tenant_id, block) = fixture();
        let mut worker: ModuleWorker<Summary> = ModuleWorker::new();
        let id = worker.add_module(summary(tenant_id, block));

        conn.close();
        assert!(worker.unload(&registry, id).is_some());
        assert!(conn.frames().is_empty());
    }

    #[test]
    fn bye_unloads_only_modules_on_that_wtp() {
        let (mut registry, _conn, tenant_id, block) = fixture();
        let other_block = ResourceBlock::new(mac(2), mac(0x20), 36, Band::Ht20);
        let (other_wtp, _other_conn) = connected_wtp(mac(2), vec![other_block.clone()]);
        registry.add_wtp(other_wtp);
        let tenant = registry.tenant_mut(tenant_id).unwrap();
        tenant.wtps.insert(mac(2));

        let mut worker: ModuleWorker<Summary> = ModuleWorker::new();
        let on_gone = worker.add_module(summary(tenant_id, block));
        let on_kept = worker.add_module(summary(tenant_id, other_block));

        let gone_wtp = registry.wtp(mac(1)).unwrap();
        let removed = worker.handle_bye(&registry, gone_wtp);

        assert_eq!(removed, vec![on_gone]);
        assert!(!worker.contains(on_gone));
        assert!(worker.contains(on_kept));
    }

    #[tokio::test]
    async fn ticker_fires_until_cancelled() {
        let cancel = CancellationToken::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_seen = Arc::clone(&hits);

        tokio::time::pause();
        let handle = spawn_ticker(Duration::from_millis(100), cancel.clone(), move || {
            hits_seen.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(350)).await;
        cancel.cancel();
        handle.await.unwrap();

        // Immediate first tick plus three periods.
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }
}
