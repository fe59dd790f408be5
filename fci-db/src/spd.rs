//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Security policy database: a per-interface ordered list of match/action
// entries evaluated top-down. Grounded on `fci_spd.c` (original_source)
// for the per-interface ordered-list
// contract, and shares its dense insert/remove-with-shift semantics with
// the flex-parser and QoS policer flow tables via `position`.

use std::collections::BTreeMap;
use std::net::IpAddr;

use fci_types::{PhyIfId, ReturnCode};

use crate::error::Error;
use crate::position::{shift_insert, shift_remove};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SpdAction {
    Bypass,
    Discard,
    Process(u32),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SpdSelector {
    pub src: Option<IpAddr>,
    pub dst: Option<IpAddr>,
    pub protocol: Option<u8>,
}

#[derive(Clone, Debug)]
pub struct SpdEntry {
    pub selector: SpdSelector,
    pub action: SpdAction,
}

#[derive(Default)]
pub struct SpdTables {
    per_if: BTreeMap<PhyIfId, Vec<SpdEntry>>,
}

impl SpdTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entry` at dense position `pos` on `iface`, shifting every
    /// entry at or after `pos` one slot down (the same dense-shift
    /// semantics shared with flex-parser rule placement and policer flow
    /// slots).
    pub fn insert(&mut self, iface: PhyIfId, pos: usize, entry: SpdEntry) -> usize {
        let entries = self.per_if.entry(iface).or_default();
        shift_insert(entries, pos, entry)
    }

    pub fn remove(&mut self, iface: PhyIfId, pos: usize) -> Result<SpdEntry, Error> {
        let entries = self
            .per_if
            .get_mut(&iface)
            .ok_or(Error::NotFound(ReturnCode::SpdNotFound))?;
        shift_remove(entries, pos).ok_or(Error::NotFound(ReturnCode::SpdNotFound))
    }

    pub fn entries(&self, iface: PhyIfId) -> &[SpdEntry] {
        self.per_if.get(&iface).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// First entry (in dense order) whose selector matches `src`/`dst`/
    /// `protocol`, mirroring the accelerator's top-down policy evaluation.
    pub fn evaluate(
        &self,
        iface: PhyIfId,
        src: IpAddr,
        dst: IpAddr,
        protocol: u8,
    ) -> Option<&SpdEntry> {
        self.entries(iface).iter().find(|entry| {
            entry.selector.src.is_none_or(|s| s == src)
                && entry.selector.dst.is_none_or(|d| d == dst)
                && entry.selector.protocol.is_none_or(|p| p == protocol)
        })
    }

    pub fn flush(&mut self, iface: PhyIfId) {
        self.per_if.remove(&iface);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(action: SpdAction) -> SpdEntry {
        SpdEntry {
            selector: SpdSelector::default(),
            action,
        }
    }

    #[test]
    fn evaluation_is_top_down() {
        let mut spd = SpdTables::new();
        let iface = PhyIfId(0);
        spd.insert(iface, 0, entry(SpdAction::Bypass));
        spd.insert(iface, 1, entry(SpdAction::Discard));
        let matched = spd
            .evaluate(iface, IpAddr::from([1, 1, 1, 1]), IpAddr::from([2, 2, 2, 2]), 6)
            .unwrap();
        assert_eq!(matched.action, SpdAction::Bypass);
    }

    #[test]
    fn insert_shifts_and_remove_compacts() {
        let mut spd = SpdTables::new();
        let iface = PhyIfId(0);
        spd.insert(iface, 0, entry(SpdAction::Bypass));
        spd.insert(iface, 0, entry(SpdAction::Discard));
        assert_eq!(spd.entries(iface)[0].action, SpdAction::Discard);
        spd.remove(iface, 0).unwrap();
        assert_eq!(spd.entries(iface)[0].action, SpdAction::Bypass);
    }
}
