// ── Controller ──
//
// The single-writer core of the control plane. Every piece of mutable
// state (LVAPs, registry, modules) is owned here and only touched from
// the event loop, so no handler ever races another. Tickers and
// transports post events; they never mutate directly.

use std::time::Duration;

use bytes::Bytes;
use indexmap::IndexMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::flow::FlowTable;
use crate::lvap::port::RadioPort;
use crate::lvap::{BindTarget, ControlContext, Lvap};
use crate::model::{BlockSpec, MacAddress};
use crate::module::worker::{spawn_ticker, ModuleWorker};
use crate::module::{ModuleCore, Summary};
use crate::registry::Registry;

// ── Events ──────────────────────────────────────────────────────────

/// Everything that can wake the controller's event loop.
#[derive(Debug)]
pub enum ControlEvent {
    /// Probe request from a (possibly unknown) station.
    Probe { addr: MacAddress },
    /// Agent-side LVAP status update.
    StatusReport {
        addr: MacAddress,
        authenticated: bool,
        associated: bool,
    },
    /// The station left the network.
    Disassociation { addr: MacAddress },
    /// A summary module's polling timer fired.
    SummaryTick(u32),
    /// Raw summary report frame from an agent.
    SummaryReport(Bytes),
    /// An agent said goodbye.
    Bye { wtp: MacAddress },
}

// ── Controller ──────────────────────────────────────────────────────

/// The control-plane facade: admission, binding, handover, telemetry.
///
/// All handlers are synchronous and take `&mut self`; [`Controller::run`]
/// drives them from the event channel. Calling them directly (as the
/// tests do) is equivalent to posting the corresponding event.
pub struct Controller {
    config: ControllerConfig,
    registry: Registry,
    flow: Box<dyn FlowTable>,
    lvaps: IndexMap<MacAddress, Lvap>,
    summaries: ModuleWorker<Summary>,
    /// One cancellation token per armed summary ticker.
    tickers: IndexMap<u32, CancellationToken>,
    events_tx: mpsc::UnboundedSender<ControlEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<ControlEvent>>,
    cancel: CancellationToken,
}

impl Controller {
    pub fn new(config: ControllerConfig, flow: Box<dyn FlowTable>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            registry: Registry::new(),
            flow,
            lvaps: IndexMap::new(),
            summaries: ModuleWorker::new(),
            tickers: IndexMap::new(),
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Handle for posting events from transports and tickers.
    pub fn events(&self) -> mpsc::UnboundedSender<ControlEvent> {
        self.events_tx.clone()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn lvap(&self, addr: MacAddress) -> Option<&Lvap> {
        self.lvaps.get(&addr)
    }

    pub fn lvaps(&self) -> impl Iterator<Item = &Lvap> {
        self.lvaps.values()
    }

    pub fn summary(&self, module_id: u32) -> Option<&Summary> {
        self.summaries.module(module_id)
    }

    /// Called after every successfully decoded summary report.
    pub fn set_summary_callback(&mut self, callback: impl Fn(&Summary) + Send + 'static) {
        self.summaries.set_result_callback(callback);
    }

    // ── Admission ───────────────────────────────────────────────────

    /// A station probed: admit it (idempotently) and return the BSSID
    /// it should be answered with. The fresh LVAP is unbound; binding
    /// is a separate policy decision.
    pub fn handle_probe(&mut self, addr: MacAddress) -> Result<MacAddress, CoreError> {
        if let Some(lvap) = self.lvaps.get(&addr) {
            return Ok(lvap.bssid());
        }
        if !self.config.policy.admits(addr) {
            warn!(client = %addr, "probe denied by access policy");
            return Err(CoreError::AccessDenied(addr));
        }

        let bssid = self.config.generate_bssid(addr);
        let mut lvap = Lvap::new(addr, bssid);
        let ctx = ControlContext {
            registry: &self.registry,
            flow: self.flow.as_ref(),
            bridge_iface: &self.config.bridge_iface,
        };
        lvap.set_ssids(&ctx, self.config.ssids.clone());
        info!(client = %addr, %bssid, "admitted station");
        self.lvaps.insert(addr, lvap);
        Ok(bssid)
    }

    // ── Binding and handover ────────────────────────────────────────

    /// Assign a client's resource binding (see [`Lvap::set_downlink`]).
    pub fn set_downlink(
        &mut self,
        addr: MacAddress,
        target: Option<BindTarget>,
    ) -> Result<(), CoreError> {
        let ctx = ControlContext {
            registry: &self.registry,
            flow: self.flow.as_ref(),
            bridge_iface: &self.config.bridge_iface,
        };
        let lvap = self
            .lvaps
            .get_mut(&addr)
            .ok_or(CoreError::ClientNotFound(addr))?;
        lvap.set_downlink(&ctx, target)
    }

    /// Hand a client over to another access point by address. A target
    /// without a block on the client's current channel/band leaves the
    /// binding untouched.
    pub fn handover_to_wtp(
        &mut self,
        addr: MacAddress,
        wtp: MacAddress,
    ) -> Result<(), CoreError> {
        let ctx = ControlContext {
            registry: &self.registry,
            flow: self.flow.as_ref(),
            bridge_iface: &self.config.bridge_iface,
        };
        let target = self.registry.wtp(wtp)?;
        let lvap = self
            .lvaps
            .get_mut(&addr)
            .ok_or(CoreError::ClientNotFound(addr))?;
        lvap.handover_to(&ctx, target)
    }

    /// Replace a client's downlink link parameters.
    pub fn set_port(&mut self, addr: MacAddress, port: RadioPort) -> Result<(), CoreError> {
        let ctx = ControlContext {
            registry: &self.registry,
            flow: self.flow.as_ref(),
            bridge_iface: &self.config.bridge_iface,
        };
        let lvap = self
            .lvaps
            .get_mut(&addr)
            .ok_or(CoreError::ClientNotFound(addr))?;
        lvap.set_port(&ctx, port)
    }

    // ── Agent-originated client events ──────────────────────────────

    pub fn handle_status_report(
        &mut self,
        addr: MacAddress,
        authenticated: bool,
        associated: bool,
    ) {
        if let Some(lvap) = self.lvaps.get_mut(&addr) {
            lvap.handle_status_report(authenticated, associated);
        }
    }

    /// The station disassociated: clear its agent-owned state and
    /// destroy the LVAP, deleting it everywhere it was bound.
    pub fn handle_disassociation(&mut self, addr: MacAddress) {
        if let Some(lvap) = self.lvaps.get_mut(&addr) {
            lvap.handle_disassociation();
        }
        let _ = self.remove_lvap(addr);
    }

    /// Controller-initiated eviction: tear the LVAP down everywhere it
    /// was bound and forget it.
    pub fn remove_lvap(&mut self, addr: MacAddress) -> Result<(), CoreError> {
        let Some(mut lvap) = self.lvaps.shift_remove(&addr) else {
            return Err(CoreError::ClientNotFound(addr));
        };
        let ctx = ControlContext {
            registry: &self.registry,
            flow: self.flow.as_ref(),
            bridge_iface: &self.config.bridge_iface,
        };
        lvap.unbind(&ctx);
        info!(client = %addr, "LVAP destroyed");
        Ok(())
    }

    // ── Telemetry ───────────────────────────────────────────────────

    /// Start a summary subscription on a resolved resource block and
    /// arm its ticker. Must run inside the runtime driving
    /// [`Controller::run`].
    pub fn add_summary(
        &mut self,
        tenant_id: Uuid,
        spec: &BlockSpec,
        addr: MacAddress,
        period: Option<Duration>,
        limit: Option<i16>,
    ) -> Result<u32, CoreError> {
        let block = spec.resolve(&self.registry)?;
        self.registry.wtp_in_tenant(tenant_id, block.wtp)?;

        let period = period.unwrap_or_else(|| self.config.default_period());
        let mut summary = Summary::new(ModuleCore::new(tenant_id, block, period));
        summary.set_period(period)?;
        summary.set_limit(limit.unwrap_or(self.config.default_limit))?;
        summary.set_addr(addr);

        let module_id = self.summaries.add_module(summary);

        let token = self.cancel.child_token();
        let events = self.events_tx.clone();
        spawn_ticker(period, token.clone(), move || {
            let _ = events.send(ControlEvent::SummaryTick(module_id));
        });
        self.tickers.insert(module_id, token);
        Ok(module_id)
    }

    /// Stop a summary subscription and its ticker. Unknown ids are a
    /// no-op.
    pub fn unload_summary(&mut self, module_id: u32) {
        self.summaries.unload(&self.registry, module_id);
        if let Some(token) = self.tickers.shift_remove(&module_id) {
            token.cancel();
        }
    }

    pub fn handle_summary_tick(&mut self, module_id: u32) {
        self.summaries.handle_tick(&self.registry, module_id);
        self.reap_tickers();
    }

    pub fn handle_summary_report(&mut self, frame: &[u8]) {
        self.summaries.handle_report(&self.registry, frame);
        self.reap_tickers();
    }

    /// Cancel tickers whose modules were unloaded inside the worker
    /// (revalidation failures).
    fn reap_tickers(&mut self) {
        self.tickers.retain(|module_id, token| {
            if self.summaries.contains(*module_id) {
                true
            } else {
                token.cancel();
                false
            }
        });
    }

    // ── Agent lifecycle ─────────────────────────────────────────────

    /// An agent said goodbye: drop its connection and unload every
    /// module bound through it. LVAP bindings stay; their sends
    /// degrade to no-ops until the agent returns.
    pub fn handle_bye(&mut self, wtp: MacAddress) {
        if let Ok(record) = self.registry.wtp_mut(wtp) {
            record.clear_connection();
        }
        let Ok(record) = self.registry.wtp(wtp) else {
            return;
        };
        info!(%wtp, "agent said goodbye");
        let removed = self.summaries.handle_bye(&self.registry, record);
        for module_id in removed {
            if let Some(token) = self.tickers.shift_remove(&module_id) {
                token.cancel();
            }
        }
    }

    // ── Event loop ──────────────────────────────────────────────────

    /// Drive the controller until [`Controller::shutdown`] or until
    /// every event sender is gone. Safe to call once; later calls
    /// return immediately.
    pub async fn run(&mut self) {
        let Some(mut events) = self.events_rx.take() else {
            return;
        };
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => break,
                },
            }
        }
    }

    /// Stop the event loop and every armed ticker.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn dispatch(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Probe { addr } => {
                if let Err(err) = self.handle_probe(addr) {
                    warn!(client = %addr, error = %err, "probe rejected");
                }
            }
            ControlEvent::StatusReport {
                addr,
                authenticated,
                associated,
            } => self.handle_status_report(addr, authenticated, associated),
            ControlEvent::Disassociation { addr } => self.handle_disassociation(addr),
            ControlEvent::SummaryTick(module_id) => self.handle_summary_tick(module_id),
            ControlEvent::SummaryReport(frame) => self.handle_summary_report(&frame),
            ControlEvent::Bye { wtp } => self.handle_bye(wtp),
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("lvaps", &self.lvaps.keys().collect::<Vec<_>>())
            .field("summaries", &self.summaries)
            .field("tickers", &self.tickers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
