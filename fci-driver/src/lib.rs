//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Narrow interfaces onto the accelerator's control surface. The dispatch
// core and the attached databases call through these traits only; nothing
// in this crate talks to real hardware. `stub` provides an in-memory fake
// used by every other crate's own unit tests.

pub mod stub;

use fci_types::{DmemAddr, MacAddr, PhyIfId};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FlushScope {
    All,
    Learned,
    Static,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DriverError {
    /// The accelerator rejected the operation (resource exhaustion,
    /// inconsistent state, etc). Always maps to `ReturnCode::InternalFailure`
    /// at the command boundary.
    Failed,
}

/// Classifier (flexible-parser / DMEM table binding) operations.
pub trait Classifier: Send + Sync {
    fn bind_table(&self, rules: &[u8]) -> Result<DmemAddr, DriverError>;
    fn unbind_table(&self, addr: DmemAddr) -> Result<(), DriverError>;
    fn put_data(&self, payload: &[u8]) -> Result<(), DriverError>;
}

/// L2 bridge operations.
pub trait L2Bridge: Send + Sync {
    fn add_domain(&self, vlan: u16, ports: u32) -> Result<(), DriverError>;
    fn remove_domain(&self, vlan: u16) -> Result<(), DriverError>;
    fn flush(&self, scope: FlushScope) -> Result<(), DriverError>;
}

/// Routing-table-cache operations.
pub trait RoutingTable: Send + Sync {
    fn add_route(&self, id: u32, iface: PhyIfId) -> Result<(), DriverError>;
    fn remove_route(&self, id: u32) -> Result<(), DriverError>;
}

/// Traffic management unit (QoS) operations.
pub trait Tmu: Send + Sync {
    fn apply_queue(&self, iface: PhyIfId, id: u8) -> Result<(), DriverError>;
    fn apply_scheduler(&self, iface: PhyIfId, id: u8) -> Result<(), DriverError>;
    fn apply_shaper(&self, iface: PhyIfId, id: u8) -> Result<(), DriverError>;
}

/// Physical/logical interface catalog as seen from the driver side.
pub trait InterfaceCatalog: Send + Sync {
    fn set_admin_status(&self, iface: PhyIfId, enabled: bool) -> Result<(), DriverError>;
    fn set_mac(&self, iface: PhyIfId, mac: MacAddr) -> Result<(), DriverError>;
}

/// Runtime firmware feature toggles.
pub trait FeatureManager: Send + Sync {
    fn set_feature(&self, name: &str, value: u8) -> Result<(), DriverError>;
}

/// Health-monitor event replay, used on the zero-to-one client transition
/// during `CLIENT_REGISTER` handling.
pub trait HealthMonitor: Send + Sync {
    fn pending_events(&self) -> Vec<Vec<u8>>;
}

/// The full driver surface bundle handed to the endpoint at bring-up.
pub struct DriverSurface {
    pub classifier: Box<dyn Classifier>,
    pub l2_bridge: Box<dyn L2Bridge>,
    pub routing_table: Box<dyn RoutingTable>,
    pub tmu: Box<dyn Tmu>,
    pub interfaces: Box<dyn InterfaceCatalog>,
    pub features: Box<dyn FeatureManager>,
    pub health_monitor: Box<dyn HealthMonitor>,
}
