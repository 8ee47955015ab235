//! Control plane for a split-MAC wireless access network.
//!
//! Access points run a thin agent exposing their radios as resource
//! blocks; all MAC-layer intelligence lives here. The two moving parts
//! are the LVAP (one per admitted client, relocatable between access
//! points without the client noticing) and the polling-module
//! framework (periodic telemetry subscriptions against single blocks).
//!
//! The crate owns domain state and control logic only. Framing lives
//! in `airlift-proto`; transports and flow programming are injected
//! behind the [`Connection`] and [`FlowTable`] traits.

pub mod config;
pub mod connection;
pub mod controller;
pub mod error;
pub mod flow;
pub mod lvap;
pub mod model;
pub mod module;
pub mod registry;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{AccessPolicy, ControllerConfig};
pub use connection::Connection;
pub use controller::{ControlEvent, Controller};
pub use error::CoreError;
pub use flow::{FlowTable, LoggingFlowTable};
pub use lvap::port::{DownlinkTable, RadioPort, UplinkTable};
pub use lvap::virtual_port::{VirtualPort, VirtualPortTable};
pub use lvap::{BindTarget, ControlContext, Lvap, LvapSnapshot};
pub use model::{
    Band, BlockSpec, MacAddress, PhysicalPort, ResourceBlock, ResourceDescriptor, ResourcePool,
    Ssid, Tenant, Wtp,
};
pub use module::{
    FrameSample, FrameSubtype, FrameType, ModuleCore, ModuleState, ModuleWorker, PollerModule,
    Summary,
};
pub use registry::Registry;
