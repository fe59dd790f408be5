//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Ownership arbiter: a coarse mutual-exclusion mechanism deciding whether
// a given sender may mutate configuration right now. Grounded on
// `fci_ownership_mask.h` (original_source) for the host-interface-id
// sender classes; `AuthorizedMask` is a `bitflags!` set the same way
// `holo-interface::interface::Owner` models a small capability bitset.

use std::sync::Mutex;

use bitflags::bitflags;
use fci_types::ReturnCode;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SenderClass {
    Hif0,
    Hif1,
    Hif2,
    Hif3,
    HifNoCpy,
}

impl TryFrom<u32> for SenderClass {
    type Error = ReturnCode;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SenderClass::Hif0),
            1 => Ok(SenderClass::Hif1),
            2 => Ok(SenderClass::Hif2),
            3 => Ok(SenderClass::Hif3),
            4 => Ok(SenderClass::HifNoCpy),
            _ => Err(ReturnCode::WrongCommandParam),
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct AuthorizedMask: u8 {
        const HIF0      = 0x01;
        const HIF1      = 0x02;
        const HIF2      = 0x04;
        const HIF3      = 0x08;
        const HIF_NOCPY = 0x10;
    }
}

impl AuthorizedMask {
    fn bit_for(class: SenderClass) -> Self {
        match class {
            SenderClass::Hif0 => AuthorizedMask::HIF0,
            SenderClass::Hif1 => AuthorizedMask::HIF1,
            SenderClass::Hif2 => AuthorizedMask::HIF2,
            SenderClass::Hif3 => AuthorizedMask::HIF3,
            SenderClass::HifNoCpy => AuthorizedMask::HIF_NOCPY,
        }
    }

    pub fn permits(&self, class: SenderClass) -> bool {
        self.contains(Self::bit_for(class))
    }
}

struct Inner {
    authorized_mask: AuthorizedMask,
    lock_owner: Option<SenderClass>,
}

/// `lock_owner != None` implies the owner's bit is set in
/// `authorized_mask` — authorization is only checked going into the
/// lock, never re-derived from it afterwards, so revoking a bit while a
/// sender already holds the lock does not retroactively evict them.
pub struct OwnershipState {
    inner: Mutex<Inner>,
}

impl OwnershipState {
    /// An empty mask means "every sender class is authorized".
    pub fn new(authorized_mask: AuthorizedMask) -> Self {
        let authorized_mask = if authorized_mask.is_empty() {
            AuthorizedMask::all()
        } else {
            authorized_mask
        };
        Self {
            inner: Mutex::new(Inner {
                authorized_mask,
                lock_owner: None,
            }),
        }
    }

    pub fn lock(&self, sender: SenderClass) -> Result<(), ReturnCode> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.authorized_mask.permits(sender) {
            return Err(ReturnCode::FciOwnershipNotAuthorized);
        }
        match inner.lock_owner {
            Some(owner) if owner == sender => Ok(()),
            Some(_) => Err(ReturnCode::FciOwnershipAlreadyLocked),
            None => {
                inner.lock_owner = Some(sender);
                Ok(())
            }
        }
    }

    pub fn unlock(&self, sender: SenderClass) -> Result<(), ReturnCode> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.authorized_mask.permits(sender) {
            return Err(ReturnCode::FciOwnershipNotAuthorized);
        }
        match inner.lock_owner {
            Some(owner) if owner == sender => {
                inner.lock_owner = None;
                Ok(())
            }
            Some(_) => Err(ReturnCode::FciOwnershipNotOwner),
            None => Err(ReturnCode::FciOwnershipNotOwner),
        }
    }

    /// `true` when `sender` may run a non-ownership command right now,
    /// either because it already holds the permanent lock or because no
    /// one does and it is authorized.
    pub fn may_execute(&self, sender: SenderClass) -> bool {
        let inner = self.inner.lock().unwrap();
        match inner.lock_owner {
            Some(owner) => owner == sender,
            None => inner.authorized_mask.permits(sender),
        }
    }

    pub fn is_authorized(&self, sender: SenderClass) -> bool {
        self.inner.lock().unwrap().authorized_mask.permits(sender)
    }

    /// Transiently assigns `lock_owner = sender` for the duration of one
    /// command. Succeeds only when no permanent/floating lock is held and
    /// `sender` is authorized; the caller must pair a success with
    /// `clear_floating_lock`.
    pub fn get_floating_lock(&self, sender: SenderClass) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.lock_owner.is_some() || !inner.authorized_mask.permits(sender) {
            return false;
        }
        inner.lock_owner = Some(sender);
        true
    }

    pub fn clear_floating_lock(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.lock_owner = None;
    }

    pub fn lock_owner(&self) -> Option<SenderClass> {
        self.inner.lock().unwrap().lock_owner
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mutual_exclusion_across_distinct_senders() {
        let state = OwnershipState::new(AuthorizedMask::empty());
        state.lock(SenderClass::Hif0).unwrap();
        assert_eq!(
            state.lock(SenderClass::Hif1).unwrap_err(),
            ReturnCode::FciOwnershipAlreadyLocked
        );
        state.unlock(SenderClass::Hif0).unwrap();
        state.lock(SenderClass::Hif1).unwrap();
    }

    #[test]
    fn unauthorized_sender_is_rejected() {
        let state = OwnershipState::new(AuthorizedMask::HIF0);
        assert_eq!(
            state.lock(SenderClass::Hif1).unwrap_err(),
            ReturnCode::FciOwnershipNotAuthorized
        );
    }

    #[test]
    fn floating_lock_is_transient() {
        let state = OwnershipState::new(AuthorizedMask::empty());
        assert!(state.get_floating_lock(SenderClass::Hif2));
        assert_eq!(state.lock_owner(), Some(SenderClass::Hif2));
        state.clear_floating_lock();
        assert_eq!(state.lock_owner(), None);
    }

    #[test]
    fn floating_lock_unavailable_while_permanently_held() {
        let state = OwnershipState::new(AuthorizedMask::empty());
        state.lock(SenderClass::Hif0).unwrap();
        assert!(!state.get_floating_lock(SenderClass::Hif1));
    }
}
