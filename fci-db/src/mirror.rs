//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Mirror registry. Grounded on `fci_mirror.c` (original_source) for the
// named-rule contract backing
// the `ingress_mirrors`/`egress_mirrors` slots carried on each physical
// interface in `ifview`. Rebinding a mirror's filter table re-derives the
// classifier binding through `fci-driver::Classifier`.

use std::collections::BTreeMap;

use fci_types::{DmemAddr, PhyIfId, ReturnCode};

use crate::error::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MirrorDirection {
    Rx,
    Tx,
}

#[derive(Clone, Debug)]
pub struct MirrorRule {
    pub name: String,
    pub egress: PhyIfId,
    pub filter_table: Option<String>,
    binding: Option<DmemAddr>,
}

#[derive(Default)]
pub struct MirrorRegistry {
    rules: BTreeMap<String, MirrorRule>,
}

impl MirrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: String, egress: PhyIfId) -> Result<(), Error> {
        if self.rules.contains_key(&name) {
            return Err(Error::AlreadyExists(ReturnCode::MirrorAlreadyRegistered));
        }
        self.rules.insert(
            name.clone(),
            MirrorRule {
                name,
                egress,
                filter_table: None,
                binding: None,
            },
        );
        Ok(())
    }

    pub fn rule(&self, name: &str) -> Option<&MirrorRule> {
        self.rules.get(name)
    }

    pub fn set_egress(&mut self, name: &str, egress: PhyIfId) -> Result<(), Error> {
        let rule = self
            .rules
            .get_mut(name)
            .ok_or(Error::NotFound(ReturnCode::MirrorNotFound))?;
        rule.egress = egress;
        Ok(())
    }

    /// Rebinds a mirror's filter table. The previous classifier binding
    /// (if any) is dropped in favor of the new one; callers are
    /// responsible for unbinding the old table via `Classifier::unbind_table`
    /// before calling this.
    pub fn set_filter_table(
        &mut self,
        name: &str,
        table: Option<String>,
        binding: Option<DmemAddr>,
    ) -> Result<(), Error> {
        let rule = self
            .rules
            .get_mut(name)
            .ok_or(Error::NotFound(ReturnCode::MirrorNotFound))?;
        rule.filter_table = table;
        rule.binding = binding;
        Ok(())
    }

    pub fn deregister(&mut self, name: &str) -> Result<MirrorRule, Error> {
        self.rules
            .remove(name)
            .ok_or(Error::NotFound(ReturnCode::MirrorNotFound))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MirrorRule> {
        self.rules.values()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn register_rejects_duplicate_name() {
        let mut reg = MirrorRegistry::new();
        reg.register("mirror0".to_owned(), PhyIfId(0)).unwrap();
        assert!(reg.register("mirror0".to_owned(), PhyIfId(1)).is_err());
    }

    #[test]
    fn egress_is_rebindable() {
        let mut reg = MirrorRegistry::new();
        reg.register("mirror0".to_owned(), PhyIfId(0)).unwrap();
        reg.set_egress("mirror0", PhyIfId(2)).unwrap();
        assert_eq!(reg.rule("mirror0").unwrap().egress, PhyIfId(2));
    }

    #[test]
    fn filter_table_rebind_replaces_binding() {
        let mut reg = MirrorRegistry::new();
        reg.register("mirror0".to_owned(), PhyIfId(0)).unwrap();
        reg.set_filter_table("mirror0", Some("t0".to_owned()), Some(DmemAddr(0x100)))
            .unwrap();
        reg.set_filter_table("mirror0", Some("t1".to_owned()), Some(DmemAddr(0x200)))
            .unwrap();
        assert_eq!(reg.rule("mirror0").unwrap().filter_table.as_deref(), Some("t1"));
    }
}
