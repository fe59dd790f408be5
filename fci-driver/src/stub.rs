//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// An in-memory fake implementing every `DriverSurface` trait, used by
// `fci-core` and `fci-db`'s own unit tests and by `fci-daemon` when no
// accelerator is present. Not a production transport.

use std::sync::Mutex;

use fci_types::{DmemAddr, MacAddr, PhyIfId};

use crate::{Classifier, DriverError, FeatureManager, FlushScope, HealthMonitor, InterfaceCatalog, L2Bridge, RoutingTable, Tmu};

#[derive(Default)]
pub struct StubDriver {
    pub calls: Mutex<Vec<String>>,
    next_dmem_addr: Mutex<u32>,
}

impl StubDriver {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_dmem_addr: Mutex::new(1),
        }
    }

    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl Classifier for StubDriver {
    fn bind_table(&self, rules: &[u8]) -> Result<DmemAddr, DriverError> {
        let mut next = self.next_dmem_addr.lock().unwrap();
        let addr = DmemAddr(*next);
        *next += 1;
        self.log(format!("classifier.bind_table(len={})", rules.len()));
        Ok(addr)
    }

    fn unbind_table(&self, addr: DmemAddr) -> Result<(), DriverError> {
        self.log(format!("classifier.unbind_table({addr})"));
        Ok(())
    }

    fn put_data(&self, payload: &[u8]) -> Result<(), DriverError> {
        self.log(format!("classifier.put_data(len={})", payload.len()));
        Ok(())
    }
}

impl L2Bridge for StubDriver {
    fn add_domain(&self, vlan: u16, ports: u32) -> Result<(), DriverError> {
        self.log(format!("l2_bridge.add_domain(vlan={vlan}, ports={ports:#x})"));
        Ok(())
    }

    fn remove_domain(&self, vlan: u16) -> Result<(), DriverError> {
        self.log(format!("l2_bridge.remove_domain(vlan={vlan})"));
        Ok(())
    }

    fn flush(&self, scope: FlushScope) -> Result<(), DriverError> {
        self.log(format!("l2_bridge.flush({scope:?})"));
        Ok(())
    }
}

impl RoutingTable for StubDriver {
    fn add_route(&self, id: u32, iface: PhyIfId) -> Result<(), DriverError> {
        self.log(format!("routing_table.add_route(id={id}, iface={iface})"));
        Ok(())
    }

    fn remove_route(&self, id: u32) -> Result<(), DriverError> {
        self.log(format!("routing_table.remove_route(id={id})"));
        Ok(())
    }
}

impl Tmu for StubDriver {
    fn apply_queue(&self, iface: PhyIfId, id: u8) -> Result<(), DriverError> {
        self.log(format!("tmu.apply_queue(iface={iface}, id={id})"));
        Ok(())
    }

    fn apply_scheduler(&self, iface: PhyIfId, id: u8) -> Result<(), DriverError> {
        self.log(format!("tmu.apply_scheduler(iface={iface}, id={id})"));
        Ok(())
    }

    fn apply_shaper(&self, iface: PhyIfId, id: u8) -> Result<(), DriverError> {
        self.log(format!("tmu.apply_shaper(iface={iface}, id={id})"));
        Ok(())
    }
}

impl InterfaceCatalog for StubDriver {
    fn set_admin_status(&self, iface: PhyIfId, enabled: bool) -> Result<(), DriverError> {
        self.log(format!("interfaces.set_admin_status(iface={iface}, enabled={enabled})"));
        Ok(())
    }

    fn set_mac(&self, iface: PhyIfId, mac: MacAddr) -> Result<(), DriverError> {
        self.log(format!("interfaces.set_mac(iface={iface}, mac={mac})"));
        Ok(())
    }
}

impl FeatureManager for StubDriver {
    fn set_feature(&self, name: &str, value: u8) -> Result<(), DriverError> {
        self.log(format!("features.set_feature({name}, {value})"));
        Ok(())
    }
}

impl HealthMonitor for StubDriver {
    fn pending_events(&self) -> Vec<Vec<u8>> {
        Vec::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bind_table_allocates_increasing_addresses() {
        let driver = StubDriver::new();
        let a = driver.bind_table(&[1, 2, 3]).unwrap();
        let b = driver.bind_table(&[4]).unwrap();
        assert_ne!(a, b);
        assert_eq!(driver.call_log().len(), 2);
    }
}
