//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// The route DB: a linear ordered container of route entries keyed by a
// 32-bit id, with an embedded iteration cursor. Grounded on
// `holo-routing::rib::Rib`'s BTreeMap-keyed table generalized to carry a
// stateful predicate cursor, and on `fci_rt_db.c`/`.h` (original_source)
// for the add/remove/get_first/get_next contract.
//
// `fci_rt_db_add`'s header declares a seventh `src_mac` argument that the
// implementation never accepted; this module follows the implementation
// (`add` takes no `src_mac`) and keeps `RouteEntry::src_mac` zeroed.

use std::collections::BTreeMap;
use std::net::IpAddr;

use fci_types::{MacAddr, PhyIfId, ReturnCode};

use crate::error::Error;

#[derive(Clone, Debug)]
pub struct RouteEntry {
    pub id: u32,
    pub dst_ip: IpAddr,
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub iface: PhyIfId,
    pub mtu: u16,
    pub refptr: u32,
}

/// `BY_IF_NAME` is resolved by the caller (the dispatch-core handler,
/// which owns the interface-name lookup) into a `ByIf(PhyIfId)` before it
/// ever reaches the route DB — the DB itself only knows interface ids.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Criterion {
    All,
    ByIf(PhyIfId),
    ByIp(IpAddr),
    ByMac(MacAddr),
    ById(u32),
}

impl Criterion {
    fn matches(&self, entry: &RouteEntry) -> bool {
        match self {
            Criterion::All => true,
            Criterion::ByIf(iface) => entry.iface == *iface,
            Criterion::ByIp(ip) => entry.dst_ip == *ip,
            Criterion::ByMac(mac) => entry.dst_mac == *mac || entry.src_mac == *mac,
            Criterion::ById(id) => entry.id == *id,
        }
    }
}

#[derive(Default)]
struct Cursor {
    criterion: Option<Criterion>,
    // The id strictly after which the next match is sought; `None` means
    // "start from the beginning".
    after: Option<u32>,
}

#[derive(Default)]
pub struct RouteDb {
    entries: BTreeMap<u32, RouteEntry>,
    cursor: Cursor,
}

impl RouteDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route. Fails with `PERM` (`Error::AlreadyExists`) when `id`
    /// already exists and `overwrite` is false.
    pub fn add(
        &mut self,
        dst_ip: IpAddr,
        dst_mac: MacAddr,
        iface: PhyIfId,
        id: u32,
        refptr: u32,
        overwrite: bool,
    ) -> Result<(), Error> {
        if self.entries.contains_key(&id) && !overwrite {
            return Err(Error::AlreadyExists(ReturnCode::WrongCommandParam));
        }
        self.entries.insert(
            id,
            RouteEntry {
                id,
                dst_ip,
                src_mac: MacAddr::ZERO,
                dst_mac,
                iface,
                mtu: 0,
                refptr,
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, id: u32) -> Result<(), Error> {
        // `cursor.after` only marks "already visited up to and including
        // this id"; `advance` always resumes its search at `after + 1`,
        // so it stays a valid resume point whether or not the entry at
        // that id still exists. Removing the cursor's current entry must
        // not move this marker, or the next live entry gets skipped.
        self.entries
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::NotFound(ReturnCode::RouteNotFound))
    }

    pub fn drop_all(&mut self) {
        self.entries.clear();
        self.cursor = Cursor::default();
    }

    pub fn drop_family(&mut self, v4: bool) {
        self.entries
            .retain(|_, e| e.dst_ip.is_ipv4() != v4);
        self.cursor = Cursor::default();
    }

    pub fn get(&self, id: u32) -> Option<&RouteEntry> {
        self.entries.get(&id)
    }

    /// Starts (or restarts) an enumeration under `criterion`, returning
    /// the first match.
    pub fn get_first(&mut self, criterion: Criterion) -> Option<&RouteEntry> {
        self.cursor.criterion = Some(criterion);
        self.cursor.after = None;
        self.advance(criterion, None)
    }

    /// Continues an enumeration previously started by `get_first`, using
    /// the same predicate.
    pub fn get_next(&mut self) -> Option<&RouteEntry> {
        let criterion = self.cursor.criterion?;
        let after = self.cursor.after;
        self.advance(criterion, after)
    }

    fn advance(&mut self, criterion: Criterion, after: Option<u32>) -> Option<&RouteEntry> {
        let start = after.map(|id| id + 1).unwrap_or(0);
        let found = self
            .entries
            .range(start..)
            .find(|(_, e)| criterion.matches(e))
            .map(|(id, _)| *id);
        self.cursor.after = found;
        found.and_then(|id| self.entries.get(&id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(db: &mut RouteDb, id: u32) {
        db.add(
            IpAddr::from([10, 0, 0, id as u8]),
            MacAddr::from([0, 0, 0, 0, 0, id as u8]),
            PhyIfId(0),
            id,
            0,
            false,
        )
        .unwrap();
    }

    #[test]
    fn add_without_overwrite_rejects_duplicate_id() {
        let mut db = RouteDb::new();
        entry(&mut db, 7);
        let err = db
            .add(IpAddr::from([1, 1, 1, 1]), MacAddr::ZERO, PhyIfId(0), 7, 0, false)
            .unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::WrongCommandParam);
    }

    #[test]
    fn add_with_overwrite_replaces_entry() {
        let mut db = RouteDb::new();
        entry(&mut db, 7);
        db.add(IpAddr::from([9, 9, 9, 9]), MacAddr::ZERO, PhyIfId(1), 7, 0, true)
            .unwrap();
        assert_eq!(db.get(7).unwrap().iface, PhyIfId(1));
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn enumeration_terminates_cleanly() {
        let mut db = RouteDb::new();
        entry(&mut db, 7);
        entry(&mut db, 42);
        let first = db.get_first(Criterion::All).unwrap().id;
        let second = db.get_next().unwrap().id;
        let third = db.get_next();
        assert_eq!((first, second), (7, 42));
        assert!(third.is_none());
    }

    #[test]
    fn removing_cursor_entry_during_iteration_does_not_skip_or_revisit() {
        let mut db = RouteDb::new();
        entry(&mut db, 1);
        entry(&mut db, 2);
        entry(&mut db, 3);

        let mut seen = Vec::new();
        let first = db.get_first(Criterion::All).unwrap().id;
        seen.push(first);
        db.remove(first).unwrap();

        while let Some(next) = db.get_next() {
            seen.push(next.id);
        }

        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn by_if_criterion_filters() {
        let mut db = RouteDb::new();
        db.add(IpAddr::from([1, 1, 1, 1]), MacAddr::ZERO, PhyIfId(0), 1, 0, false)
            .unwrap();
        db.add(IpAddr::from([2, 2, 2, 2]), MacAddr::ZERO, PhyIfId(1), 2, 0, false)
            .unwrap();
        let found = db.get_first(Criterion::ByIf(PhyIfId(1))).unwrap();
        assert_eq!(found.id, 2);
        assert!(db.get_next().is_none());
    }
}
