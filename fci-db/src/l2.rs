//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// L2 bridge domain / static entry store. Grounded on `fci_l2br.c`
// (original_source) for the VLAN-domain and
// static-FDB-entry contract, and on `holo-routing::rib::Rib` for the
// BTreeMap-keyed table shape reused throughout this crate. Flushing is
// delegated to `fci-driver::L2Bridge`; this module only tracks the
// software-side membership and entry state.

use std::collections::BTreeMap;

use fci_types::{MacAddr, PhyIfId, ReturnCode};

use crate::error::Error;

pub type Vlan = u16;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum L2Action {
    Forward,
    Flood,
    Punt,
    Discard,
}

/// The four lookup outcomes a bridge domain dispatches on independently.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DomainActions {
    pub ucast_hit: L2Action,
    pub ucast_miss: L2Action,
    pub mcast_hit: L2Action,
    pub mcast_miss: L2Action,
}

impl Default for DomainActions {
    fn default() -> Self {
        Self {
            ucast_hit: L2Action::Forward,
            ucast_miss: L2Action::Flood,
            mcast_hit: L2Action::Forward,
            mcast_miss: L2Action::Flood,
        }
    }
}

#[derive(Clone, Debug)]
pub struct L2Domain {
    pub vlan: Vlan,
    pub ports: Vec<PhyIfId>,
    pub untagged_ports: Vec<PhyIfId>,
    pub actions: DomainActions,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StaticEntryAction {
    Forward(PhyIfId),
    Discard,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct StaticEntryKey {
    pub vlan: Vlan,
    pub mac: MacAddr,
}

#[derive(Default)]
pub struct L2Store {
    domains: BTreeMap<Vlan, L2Domain>,
    static_entries: BTreeMap<StaticEntryKey, StaticEntryAction>,
}

impl L2Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// VLAN ids 0 and 1 are reserved by the accelerator (untagged default
    /// and management) and can never be registered as domains.
    fn check_vlan(vlan: Vlan) -> Result<(), Error> {
        if vlan == 0 || vlan == 1 {
            return Err(Error::Invalid(ReturnCode::L2BdVlanReserved));
        }
        Ok(())
    }

    pub fn add_domain(&mut self, vlan: Vlan) -> Result<(), Error> {
        Self::check_vlan(vlan)?;
        if self.domains.contains_key(&vlan) {
            return Err(Error::AlreadyExists(ReturnCode::L2BdAlreadyRegistered));
        }
        self.domains.insert(
            vlan,
            L2Domain {
                vlan,
                ports: Vec::new(),
                untagged_ports: Vec::new(),
                actions: DomainActions::default(),
            },
        );
        Ok(())
    }

    pub fn domain(&self, vlan: Vlan) -> Option<&L2Domain> {
        self.domains.get(&vlan)
    }

    pub fn update_domain(
        &mut self,
        vlan: Vlan,
        ports: Vec<PhyIfId>,
        untagged_ports: Vec<PhyIfId>,
        actions: DomainActions,
    ) -> Result<(), Error> {
        let domain = self
            .domains
            .get_mut(&vlan)
            .ok_or(Error::NotFound(ReturnCode::L2BdNotFound))?;
        domain.ports = ports;
        domain.untagged_ports = untagged_ports;
        domain.actions = actions;
        Ok(())
    }

    pub fn remove_domain(&mut self, vlan: Vlan) -> Result<(), Error> {
        Self::check_vlan(vlan)?;
        self.domains
            .remove(&vlan)
            .map(|_| ())
            .ok_or(Error::NotFound(ReturnCode::L2BdNotFound))
    }

    pub fn iter_domains(&self) -> impl Iterator<Item = &L2Domain> {
        self.domains.values()
    }

    pub fn add_static_entry(
        &mut self,
        vlan: Vlan,
        mac: MacAddr,
        action: StaticEntryAction,
    ) -> Result<(), Error> {
        let key = StaticEntryKey { vlan, mac };
        if self.static_entries.contains_key(&key) {
            return Err(Error::AlreadyExists(ReturnCode::L2StaticEntAlreadyRegistered));
        }
        self.static_entries.insert(key, action);
        Ok(())
    }

    pub fn static_entry(&self, vlan: Vlan, mac: &MacAddr) -> Option<&StaticEntryAction> {
        self.static_entries.get(&StaticEntryKey { vlan, mac: *mac })
    }

    pub fn remove_static_entry(&mut self, vlan: Vlan, mac: &MacAddr) -> Result<(), Error> {
        self.static_entries
            .remove(&StaticEntryKey { vlan, mac: *mac })
            .map(|_| ())
            .ok_or(Error::NotFound(ReturnCode::L2StaticEnNotFound))
    }

    pub fn iter_static_entries(&self) -> impl Iterator<Item = (&StaticEntryKey, &StaticEntryAction)> {
        self.static_entries.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reserved_vlans_cannot_become_domains() {
        let mut store = L2Store::new();
        assert!(store.add_domain(0).is_err());
        assert!(store.add_domain(1).is_err());
        store.add_domain(100).unwrap();
    }

    #[test]
    fn update_domain_sets_ports_and_actions_independently() {
        let mut store = L2Store::new();
        store.add_domain(100).unwrap();
        let actions = DomainActions {
            ucast_hit: L2Action::Forward,
            ucast_miss: L2Action::Punt,
            mcast_hit: L2Action::Flood,
            mcast_miss: L2Action::Discard,
        };
        store
            .update_domain(100, vec![PhyIfId(0), PhyIfId(1)], vec![PhyIfId(0)], actions)
            .unwrap();
        let domain = store.domain(100).unwrap();
        assert_eq!(domain.ports, vec![PhyIfId(0), PhyIfId(1)]);
        assert_eq!(domain.actions.ucast_miss, L2Action::Punt);
        assert_eq!(domain.actions.mcast_miss, L2Action::Discard);
    }

    #[test]
    fn static_entry_is_keyed_by_vlan_and_mac() {
        let mut store = L2Store::new();
        store.add_domain(100).unwrap();
        store
            .add_static_entry(100, MacAddr::BROADCAST, StaticEntryAction::Discard)
            .unwrap();
        assert!(store
            .add_static_entry(100, MacAddr::BROADCAST, StaticEntryAction::Discard)
            .is_err());
        assert!(store.static_entry(100, &MacAddr::ZERO).is_none());
        store.remove_static_entry(100, &MacAddr::BROADCAST).unwrap();
    }
}
