//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Stable integer handles used to reference the interface catalog and
// classifier DMEM from route/mirror/logical-interface records, instead of
// owning references — per DESIGN NOTES §9 ("cyclic references"), deletion
// of the referenced object is observed by dependents as "not found"
// rather than as a dangling pointer.

/// Physical interface identifier, as handed out by the interface catalog.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhyIfId(pub u32);

/// Address of a table resident in classifier DMEM, returned by
/// `Classifier::bind_table` and required by `Classifier::unbind_table`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct DmemAddr(pub u32);

impl std::fmt::Display for PhyIfId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "phy{}", self.0)
    }
}

impl std::fmt::Display for DmemAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
