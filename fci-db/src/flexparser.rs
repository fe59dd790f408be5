//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Flex-parser rule/table DB. Grounded on `fci_fp.c` (original_source)
// for the rule/table/USE_RULE/UNUSE_RULE
// contract. Binding a table into classifier DMEM is delegated to
// `fci-driver::Classifier`; this module only tracks the resulting
// address and reference count.

use std::collections::HashMap;

use fci_types::{DmemAddr, ReturnCode};

use crate::error::Error;
use crate::position::{shift_insert, shift_remove};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OffsetFrom {
    L2,
    L3,
    L4,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchAction {
    Accept,
    Reject,
    NextRule,
}

#[derive(Clone, Debug)]
pub struct FpRule {
    pub name: String,
    pub data: u32,
    pub mask: u32,
    pub offset: u16,
    pub offset_from: OffsetFrom,
    pub invert: bool,
    pub action: MatchAction,
    pub next_rule: Option<String>,
    /// Name of the table this rule belongs to, if any (a rule joins at
    /// most one table).
    member_of: Option<String>,
}

impl FpRule {
    /// Constructs a freshly-defined rule, not yet a member of any table.
    pub fn new(
        name: String,
        data: u32,
        mask: u32,
        offset: u16,
        offset_from: OffsetFrom,
        invert: bool,
        action: MatchAction,
    ) -> Self {
        Self {
            name,
            data,
            mask,
            offset,
            offset_from,
            invert,
            action,
            next_rule: None,
            member_of: None,
        }
    }
}

#[derive(Default)]
pub struct FpTable {
    pub name: String,
    pub rules: Vec<String>,
    pub binding: Option<DmemAddr>,
    pub refcount: u32,
}

#[derive(Default)]
pub struct FlexParserDb {
    rules: HashMap<String, FpRule>,
    tables: HashMap<String, FpTable>,
}

impl FlexParserDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_rule(&mut self, rule: FpRule) -> Result<(), Error> {
        if self.rules.contains_key(&rule.name) {
            return Err(Error::AlreadyExists(ReturnCode::WrongCommandParam));
        }
        self.rules.insert(rule.name.clone(), rule);
        Ok(())
    }

    pub fn rule(&self, name: &str) -> Option<&FpRule> {
        self.rules.get(name)
    }

    pub fn deregister_rule(&mut self, name: &str) -> Result<(), Error> {
        let rule = self
            .rules
            .get(name)
            .ok_or(Error::NotFound(ReturnCode::FpRuleNotFound))?;
        if rule.member_of.is_some() {
            return Err(Error::Invalid(ReturnCode::WrongCommandParam));
        }
        self.rules.remove(name);
        Ok(())
    }

    pub fn register_table(&mut self, name: String) -> Result<(), Error> {
        if self.tables.contains_key(&name) {
            return Err(Error::AlreadyExists(ReturnCode::WrongCommandParam));
        }
        self.tables.insert(
            name.clone(),
            FpTable {
                name,
                rules: Vec::new(),
                binding: None,
                refcount: 0,
            },
        );
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&FpTable> {
        self.tables.get(name)
    }

    pub fn deregister_table(&mut self, name: &str) -> Result<(), Error> {
        let table = self
            .tables
            .get(name)
            .ok_or(Error::NotFound(ReturnCode::FpTableNotFound))?;
        if table.refcount > 0 {
            return Err(Error::Invalid(ReturnCode::WrongCommandParam));
        }
        let rules = table.rules.clone();
        for rule_name in rules {
            if let Some(rule) = self.rules.get_mut(&rule_name) {
                rule.member_of = None;
            }
        }
        self.tables.remove(name);
        Ok(())
    }

    /// Inserts `rule` into `table` at dense position `pos`, shifting
    /// successors. Fails if the rule is already a member of a table.
    pub fn use_rule(&mut self, table: &str, rule: &str, pos: usize) -> Result<usize, Error> {
        if !self.rules.contains_key(rule) {
            return Err(Error::NotFound(ReturnCode::FpRuleNotFound));
        }
        if self.rules[rule].member_of.is_some() {
            return Err(Error::Invalid(ReturnCode::WrongCommandParam));
        }
        let table = self
            .tables
            .get_mut(table)
            .ok_or(Error::NotFound(ReturnCode::FpTableNotFound))?;
        let pos = shift_insert(&mut table.rules, pos, rule.to_owned());
        self.rules.get_mut(rule).unwrap().member_of = Some(table.name.clone());
        Ok(pos)
    }

    pub fn unuse_rule(&mut self, table: &str, rule: &str) -> Result<(), Error> {
        let table = self
            .tables
            .get_mut(table)
            .ok_or(Error::NotFound(ReturnCode::FpTableNotFound))?;
        let pos = table
            .rules
            .iter()
            .position(|r| r == rule)
            .ok_or(Error::NotFound(ReturnCode::FpRuleNotFound))?;
        shift_remove(&mut table.rules, pos);
        if let Some(r) = self.rules.get_mut(rule) {
            r.member_of = None;
        }
        Ok(())
    }

    pub fn bind(&mut self, table: &str, addr: DmemAddr) -> Result<(), Error> {
        let table = self
            .tables
            .get_mut(table)
            .ok_or(Error::NotFound(ReturnCode::FpTableNotFound))?;
        table.binding = Some(addr);
        table.refcount += 1;
        Ok(())
    }

    pub fn unbind(&mut self, table: &str) -> Result<Option<DmemAddr>, Error> {
        let table = self
            .tables
            .get_mut(table)
            .ok_or(Error::NotFound(ReturnCode::FpTableNotFound))?;
        table.refcount = table.refcount.saturating_sub(1);
        if table.refcount == 0 {
            return Ok(table.binding.take());
        }
        Ok(None)
    }

    /// Resolves a classifier DMEM address back to the table bound at it
    /// (end-to-end scenario 6's "reverse lookup").
    pub fn table_at_address(&self, addr: DmemAddr) -> Option<&FpTable> {
        self.tables.values().find(|t| t.binding == Some(addr))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rule(name: &str) -> FpRule {
        FpRule::new(name.to_owned(), 0xDEAD, 0xFFFF, 14, OffsetFrom::L2, false, MatchAction::Accept)
    }

    #[test]
    fn use_rule_places_at_position_and_shifts() {
        let mut db = FlexParserDb::new();
        db.register_table("t0".to_owned()).unwrap();
        db.register_rule(rule("r0")).unwrap();
        db.register_rule(rule("r1")).unwrap();
        db.use_rule("t0", "r0", 0).unwrap();
        db.use_rule("t0", "r1", 0).unwrap();
        assert_eq!(db.table("t0").unwrap().rules, vec!["r1", "r0"]);
    }

    #[test]
    fn rule_can_join_at_most_one_table() {
        let mut db = FlexParserDb::new();
        db.register_table("t0".to_owned()).unwrap();
        db.register_table("t1".to_owned()).unwrap();
        db.register_rule(rule("r0")).unwrap();
        db.use_rule("t0", "r0", 0).unwrap();
        assert!(db.use_rule("t1", "r0", 0).is_err());
    }

    #[test]
    fn mirror_table_binding_resolves_back_via_address() {
        let mut db = FlexParserDb::new();
        db.register_table("t0".to_owned()).unwrap();
        db.bind("t0", DmemAddr(0x1000)).unwrap();
        assert_eq!(db.table_at_address(DmemAddr(0x1000)).unwrap().name, "t0");
    }
}
