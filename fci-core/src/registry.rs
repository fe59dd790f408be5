//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Client registry: the set of command-channel peers currently attached
// to this endpoint. Grounded on `holo-interface::interface::Interfaces`'s
// arena-plus-lookup shape, simplified to a flat fixed-capacity slot array
// since clients here are "up to N" with dense reuse rather than an
// unbounded arena.

use std::sync::Mutex;

use fci_types::ReturnCode;

/// Default slot count, matching the accelerator's compiled-in client
/// limit when no explicit `max_clients` is configured.
pub const DEFAULT_MAX_CLIENTS: usize = 5;

#[derive(Clone, Debug)]
pub struct Client {
    pub sender: u32,
}

struct Inner {
    slots: Vec<Option<Client>>,
}

pub struct ClientRegistry {
    inner: Mutex<Inner>,
}

impl ClientRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                slots: vec![None; max_clients.max(1)],
            }),
        }
    }

    pub fn register(&self, sender: u32) -> Result<(), ReturnCode> {
        let mut inner = self.inner.lock().unwrap();
        if inner.slots.iter().flatten().any(|c| c.sender == sender) {
            return Err(ReturnCode::WrongCommandParam);
        }
        let slot = inner
            .slots
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(ReturnCode::WrongCommandParam)?;
        *slot = Some(Client { sender });
        Ok(())
    }

    pub fn unregister(&self, sender: u32) -> Result<(), ReturnCode> {
        let mut inner = self.inner.lock().unwrap();
        let slot = inner
            .slots
            .iter_mut()
            .find(|s| matches!(s, Some(c) if c.sender == sender))
            .ok_or(ReturnCode::WrongCommandParam)?;
        *slot = None;
        Ok(())
    }

    pub fn is_connected(&self, sender: u32) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.slots.iter().flatten().any(|c| c.sender == sender)
    }

    /// Whether any client is currently registered. Computed from the slot
    /// array under the same mutex as `register`/`unregister` rather than
    /// tracked as a separate out-of-band flag, which would otherwise race
    /// against a concurrent register/unregister pair.
    pub fn has_any_connected(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.slots.iter().any(|s| s.is_some())
    }

    pub fn connected_senders(&self) -> Vec<u32> {
        let inner = self.inner.lock().unwrap();
        inner.slots.iter().flatten().map(|c| c.sender).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registry_rejects_beyond_capacity() {
        let reg = ClientRegistry::new(2);
        reg.register(1).unwrap();
        reg.register(2).unwrap();
        assert!(reg.register(3).is_err());
    }

    #[test]
    fn unregister_frees_the_slot_for_reuse() {
        let reg = ClientRegistry::new(1);
        reg.register(1).unwrap();
        reg.unregister(1).unwrap();
        reg.register(2).unwrap();
        assert!(reg.is_connected(2));
    }

    #[test]
    fn has_any_connected_reflects_slot_state() {
        let reg = ClientRegistry::new(2);
        assert!(!reg.has_any_connected());
        reg.register(1).unwrap();
        assert!(reg.has_any_connected());
    }
}
