//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Interface view: a read-mostly catalog of physical and logical
// interfaces, generalizing `holo-interface::interface::Interfaces`'s
// arena + name-tree + id-tree triple to carry both interface kinds plus
// the per-interface MAC list and mirror bindings.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bitflags::bitflags;
use fci_types::{MacAddr, PhyIfId, ReturnCode};
use generational_arena::{Arena, Index};

use crate::error::Error;

/// Number of ingress/egress mirror slots per physical interface
/// (`FPP_MIRRORS_CNT` in the accelerator's public header).
pub const MIRRORS_CNT: usize = 2;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct InterfaceFlags: u16 {
        const ENABLED       = 0x0001;
        const PROMISC       = 0x0002;
        const VLAN_CONFORM  = 0x0004;
        const PTP_CONFORM   = 0x0008;
        const PTP_PROMISC   = 0x0010;
        const ALLOW_QINQ    = 0x0020;
        const DISCARD_TTL   = 0x0040;
        const LOOPBACK      = 0x0080;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct MatchRuleBits: u32 {
        const VLAN      = 0x0001;
        const PROTOCOL  = 0x0002;
        const SPORT     = 0x0004;
        const DPORT     = 0x0008;
        const SIP       = 0x0010;
        const DIP       = 0x0020;
        const ETHERTYPE = 0x0040;
    }
}

/// A bitset over physical interface ids, generalizing the fixed
/// `bitflags!` capability sets used elsewhere in this crate to a
/// dynamically sized port set.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PortSet(u32);

impl PortSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, id: PhyIfId) {
        self.0 |= 1 << id.0;
    }

    pub fn remove(&mut self, id: PhyIfId) {
        self.0 &= !(1 << id.0);
    }

    pub fn contains(&self, id: PhyIfId) -> bool {
        self.0 & (1 << id.0) != 0
    }

    pub fn is_subset_of(&self, other: &PortSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn iter(&self) -> impl Iterator<Item = PhyIfId> + '_ {
        (0..32).filter(move |i| self.0 & (1 << i) != 0).map(PhyIfId)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperatingMode {
    Default,
    Bridge,
    Router,
    VlanBridge,
    Flexible,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlockState {
    Normal,
    BlockAll,
    BlockIngress,
    BlockEgress,
}

#[derive(Clone, Debug, Default)]
pub struct Statistics {
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

#[derive(Clone, Debug)]
pub struct PhysicalInterface {
    pub id: PhyIfId,
    pub name: String,
    pub flags: InterfaceFlags,
    pub mode: OperatingMode,
    pub block_state: BlockState,
    pub ingress_mirrors: [Option<String>; MIRRORS_CNT],
    pub egress_mirrors: [Option<String>; MIRRORS_CNT],
    pub flexifilter: Option<String>,
    pub mac_list: BTreeSet<MacAddr>,
    pub stats: Statistics,
}

impl PhysicalInterface {
    fn new(id: PhyIfId, name: String) -> Self {
        Self {
            id,
            name,
            flags: InterfaceFlags::empty(),
            mode: OperatingMode::Default,
            block_state: BlockState::Normal,
            ingress_mirrors: Default::default(),
            egress_mirrors: Default::default(),
            flexifilter: None,
            mac_list: BTreeSet::new(),
            stats: Statistics::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogicalInterface {
    pub id: u32,
    pub name: String,
    pub parent: PhyIfId,
    pub egress: PortSet,
    pub match_rules: MatchRuleBits,
    pub flags: InterfaceFlags,
    pub stats: Statistics,
}

#[derive(Default)]
pub struct InterfaceView {
    phys_arena: Arena<PhysicalInterface>,
    phys_by_name: BTreeMap<String, Index>,
    phys_by_id: HashMap<u32, Index>,

    log_arena: Arena<LogicalInterface>,
    log_by_name: BTreeMap<String, Index>,

    /// Exclusive session lock over the whole catalog. `Some(sender)` means
    /// the named sender class currently holds the session.
    session_holder: Option<u32>,
}

impl InterfaceView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_physical(&mut self, id: PhyIfId, name: String) -> Result<(), Error> {
        if self.phys_by_id.contains_key(&id.0) {
            return Err(Error::AlreadyExists(ReturnCode::IfEntryAlreadyRegistered));
        }
        let iface = PhysicalInterface::new(id, name.clone());
        let idx = self.phys_arena.insert(iface);
        self.phys_by_name.insert(name, idx);
        self.phys_by_id.insert(id.0, idx);
        Ok(())
    }

    pub fn physical_by_name(&self, name: &str) -> Option<&PhysicalInterface> {
        self.phys_by_name.get(name).map(|idx| &self.phys_arena[*idx])
    }

    pub fn physical_by_name_mut(&mut self, name: &str) -> Option<&mut PhysicalInterface> {
        let idx = *self.phys_by_name.get(name)?;
        Some(&mut self.phys_arena[idx])
    }

    pub fn physical_by_id(&self, id: PhyIfId) -> Option<&PhysicalInterface> {
        self.phys_by_id.get(&id.0).map(|idx| &self.phys_arena[*idx])
    }

    pub fn iter_physical(&self) -> impl Iterator<Item = &PhysicalInterface> {
        self.phys_by_name.values().map(|idx| &self.phys_arena[*idx])
    }

    pub fn register_logical(
        &mut self,
        name: String,
        parent_name: &str,
    ) -> Result<u32, Error> {
        if self.log_by_name.contains_key(&name) {
            return Err(Error::AlreadyExists(ReturnCode::IfEntryAlreadyRegistered));
        }
        let parent = self
            .physical_by_name(parent_name)
            .ok_or(Error::NotFound(ReturnCode::IfEntryNotFound))?
            .id;
        let id = self.log_arena.len() as u32;
        let iface = LogicalInterface {
            id,
            name: name.clone(),
            parent,
            egress: PortSet::empty(),
            match_rules: MatchRuleBits::empty(),
            flags: InterfaceFlags::empty(),
            stats: Statistics::default(),
        };
        let idx = self.log_arena.insert(iface);
        self.log_by_name.insert(name, idx);
        Ok(id)
    }

    pub fn logical_by_name(&self, name: &str) -> Option<&LogicalInterface> {
        self.log_by_name.get(name).map(|idx| &self.log_arena[*idx])
    }

    /// Updates a logical interface's egress bitset, validating that every
    /// bit in it refers to a physical interface that still exists.
    pub fn update_logical_egress(&mut self, name: &str, egress: PortSet) -> Result<(), Error> {
        for id in egress.iter() {
            if !self.phys_by_id.contains_key(&id.0) {
                return Err(Error::Invalid(ReturnCode::WrongCommandParam));
            }
        }
        let idx = *self
            .log_by_name
            .get(name)
            .ok_or(Error::NotFound(ReturnCode::IfEntryNotFound))?;
        self.log_arena[idx].egress = egress;
        Ok(())
    }

    pub fn deregister_logical(&mut self, name: &str) -> Result<(), Error> {
        let idx = self
            .log_by_name
            .remove(name)
            .ok_or(Error::NotFound(ReturnCode::IfEntryNotFound))?;
        self.log_arena.remove(idx);
        Ok(())
    }

    pub fn iter_logical(&self) -> impl Iterator<Item = &LogicalInterface> {
        self.log_by_name.values().map(|idx| &self.log_arena[*idx])
    }

    pub fn mac_register(&mut self, iface_name: &str, mac: MacAddr) -> Result<(), Error> {
        let iface = self
            .physical_by_name_mut(iface_name)
            .ok_or(Error::NotFound(ReturnCode::IfEntryNotFound))?;
        if !iface.mac_list.insert(mac) {
            return Err(Error::AlreadyExists(ReturnCode::IfMacAlreadyRegistered));
        }
        Ok(())
    }

    pub fn mac_deregister(&mut self, iface_name: &str, mac: &MacAddr) -> Result<(), Error> {
        let iface = self
            .physical_by_name_mut(iface_name)
            .ok_or(Error::NotFound(ReturnCode::IfEntryNotFound))?;
        if !iface.mac_list.remove(mac) {
            return Err(Error::NotFound(ReturnCode::IfMacNotFound));
        }
        Ok(())
    }

    pub fn lock_session(&mut self, sender: u32) -> Result<(), Error> {
        match self.session_holder {
            Some(holder) if holder == sender => Ok(()),
            Some(_) => Err(Error::Capacity(ReturnCode::IfResourceAlreadyLocked)),
            None => {
                self.session_holder = Some(sender);
                Ok(())
            }
        }
    }

    pub fn unlock_session(&mut self, sender: u32) -> Result<(), Error> {
        match self.session_holder {
            Some(holder) if holder == sender => {
                self.session_holder = None;
                Ok(())
            }
            Some(_) => Err(Error::Invalid(ReturnCode::IfWrongSessionId)),
            None => Err(Error::Invalid(ReturnCode::IfWrongSessionId)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn view_with_one_phy() -> InterfaceView {
        let mut v = InterfaceView::new();
        v.add_physical(PhyIfId(0), "emac0".to_owned()).unwrap();
        v
    }

    #[test]
    fn logical_interface_egress_must_reference_known_physical_ids() {
        let mut v = view_with_one_phy();
        v.register_logical("log0".to_owned(), "emac0").unwrap();
        let mut bad = PortSet::empty();
        bad.insert(PhyIfId(5));
        assert!(v.update_logical_egress("log0", bad).is_err());

        let mut good = PortSet::empty();
        good.insert(PhyIfId(0));
        v.update_logical_egress("log0", good).unwrap();
    }

    #[test]
    fn session_lock_is_exclusive() {
        let mut v = view_with_one_phy();
        v.lock_session(1).unwrap();
        assert!(v.lock_session(2).is_err());
        assert!(v.unlock_session(2).is_err());
        v.unlock_session(1).unwrap();
        v.lock_session(2).unwrap();
    }

    #[test]
    fn mac_register_rejects_duplicate() {
        let mut v = view_with_one_phy();
        v.mac_register("emac0", MacAddr::ZERO).unwrap();
        assert!(v.mac_register("emac0", MacAddr::ZERO).is_err());
    }
}
