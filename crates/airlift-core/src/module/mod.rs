// ── Polling module framework ──
//
// A module is one outstanding telemetry subscription against a single
// resource block: the controller periodically fires a request at the
// hosting agent and folds whatever reports come back into the module's
// state. Requests are fire-and-forget; validity is re-checked on every
// tick and every report instead of being tracked per request.

pub mod summary;
pub mod worker;

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::ResourceBlock;

pub use summary::{FrameSample, FrameSubtype, FrameType, Summary};
pub use worker::{spawn_ticker, ModuleWorker};

// ── ModuleState ─────────────────────────────────────────────────────

/// Lifecycle of a module. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ModuleState {
    /// Built but not yet registered with a worker.
    Created,
    /// Registered; its ticker may fire.
    Running,
    /// Removed; the id will never be reused.
    Unloaded,
}

// ── ModuleCore ──────────────────────────────────────────────────────

/// State every polling module shares: identity, scope, and cadence.
#[derive(Debug, Clone)]
pub struct ModuleCore {
    /// Worker-assigned id; zero until registration.
    pub module_id: u32,
    /// Tenant the subscription runs under; membership is re-validated
    /// on every tick and report.
    pub tenant_id: Uuid,
    /// The resource block being observed.
    pub block: ResourceBlock,
    pub period: Duration,
    pub state: ModuleState,
}

impl ModuleCore {
    pub fn new(tenant_id: Uuid, block: ResourceBlock, period: Duration) -> Self {
        Self {
            module_id: 0,
            tenant_id,
            block,
            period,
            state: ModuleState::Created,
        }
    }
}

// ── PollerModule ────────────────────────────────────────────────────

/// The behavior a polling module contributes on top of [`ModuleCore`]:
/// how to encode its request and teardown frames, and how to fold a
/// report back in.
pub trait PollerModule: Send + 'static {
    /// Human-readable kind, used in logs.
    const NAME: &'static str;

    fn core(&self) -> &ModuleCore;
    fn core_mut(&mut self) -> &mut ModuleCore;

    /// The periodic request frame.
    fn encode_request(&self, seq: u32) -> Bytes;

    /// The frame telling the agent to stop producing reports.
    fn encode_teardown(&self, seq: u32) -> Bytes;

    /// Fold an inbound report into the module's state. The frame is
    /// already routed (its module id matched).
    fn handle_report(&mut self, frame: &[u8]) -> Result<(), CoreError>;

    fn module_id(&self) -> u32 {
        self.core().module_id
    }

    fn tenant_id(&self) -> Uuid {
        self.core().tenant_id
    }

    fn block(&self) -> &ResourceBlock {
        &self.core().block
    }

    fn period(&self) -> Duration {
        self.core().period
    }

    fn state(&self) -> ModuleState {
        self.core().state
    }
}
