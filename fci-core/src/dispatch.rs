//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// The endpoint's lifecycle and per-message dispatch loop. Grounded on
// `holo-protocol`'s instance-lifecycle state machine (Down/Up phases
// driving subsystem bring-up in order) generalized to the four-phase
// bring-up this accelerator's control plane needs, and on
// `holo-northbound`'s single dispatch table keyed by a numeric code.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use fci_driver::DriverSurface;
use fci_types::{CommandCode, Errno, ReturnCode};
use tracing::{info, warn};

use crate::codec::{self, CmdBody, MessageRecord, ReplyFraming, ReplyRecord};
use crate::handlers::{self, HandlerFn};
use crate::ownership::{AuthorizedMask, OwnershipState, SenderClass};
use crate::registry::ClientRegistry;
use crate::state::Databases;
use crate::transport::Transport;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Uninit,
    CoreUp,
    DbUp,
    Ready,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LifecycleError {
    AlreadyInitialized,
    NotInitialized,
}

impl std::fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleError::AlreadyInitialized => write!(f, "endpoint is already initialized"),
            LifecycleError::NotInitialized => write!(f, "endpoint was never initialized"),
        }
    }
}

impl std::error::Error for LifecycleError {}

/// Everything the endpoint needs at bring-up; handed in once by
/// `fci-daemon` after it has loaded configuration and attached to the
/// accelerator.
pub struct EndpointInit {
    pub driver: Arc<DriverSurface>,
    pub transport: Arc<dyn Transport>,
    pub authorized_mask: AuthorizedMask,
    pub max_clients: usize,
    pub namespace: String,
    pub reply_framing: ReplyFraming,
}

pub struct Endpoint {
    phase: Mutex<Phase>,
    registry: ClientRegistry,
    ownership: OwnershipState,
    driver: Arc<DriverSurface>,
    transport: Arc<dyn Transport>,
    databases: Mutex<Databases>,
    reply_framing: ReplyFraming,
    namespace: String,
    handlers: HashMap<u16, HandlerFn>,
}

impl Endpoint {
    pub fn new(init: EndpointInit) -> Self {
        Self {
            phase: Mutex::new(Phase::Uninit),
            registry: ClientRegistry::new(init.max_clients),
            ownership: OwnershipState::new(init.authorized_mask),
            driver: init.driver,
            transport: init.transport,
            databases: Mutex::new(Databases::new()),
            reply_framing: init.reply_framing,
            namespace: init.namespace,
            handlers: handlers::dispatch_table(),
        }
    }

    /// Brings the endpoint from `Uninit` to `Ready`, one phase at a time.
    /// There is nothing left to fail once the driver surface and
    /// transport have been handed in at construction, so this only
    /// guards against being called twice.
    pub fn init(&self) -> Result<(), LifecycleError> {
        let mut phase = self.phase.lock().unwrap();
        if *phase != Phase::Uninit {
            return Err(LifecycleError::AlreadyInitialized);
        }
        *phase = Phase::CoreUp;
        *phase = Phase::DbUp;
        *phase = Phase::Ready;
        info!(namespace = %self.namespace, "endpoint ready");
        Ok(())
    }

    pub fn fini(&self) -> Result<(), LifecycleError> {
        let mut phase = self.phase.lock().unwrap();
        if *phase == Phase::Uninit {
            return Err(LifecycleError::NotInitialized);
        }
        *phase = Phase::Uninit;
        info!(namespace = %self.namespace, "endpoint torn down");
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap()
    }

    pub fn reply_framing(&self) -> ReplyFraming {
        self.reply_framing
    }

    fn reply(&self, errno: Errno, code: u16, payload: Vec<u8>) -> ReplyRecord {
        ReplyRecord { errno, code, payload }
    }

    fn dispatch_ownership(&self, body: &CmdBody, sender: SenderClass, lock: bool) -> ReplyRecord {
        let result = if lock { self.ownership.lock(sender) } else { self.ownership.unlock(sender) };
        match result {
            Ok(()) => self.reply(Errno::Ok, body.code(), Vec::new()),
            Err(rc) => self.reply(Errno::Eperm, body.code(), rc_payload(rc)),
        }
    }

    /// Runs one command through ownership arbitration and the handler
    /// table. A sender already holding the permanent lock executes
    /// directly; otherwise a floating lock is acquired and released
    /// around the single call, so only one command runs at a time
    /// regardless of which sender issued it.
    fn dispatch_command(&self, body: &CmdBody) -> ReplyRecord {
        let sender = match SenderClass::try_from(body.sender) {
            Ok(s) => s,
            Err(rc) => return self.reply(Errno::Einval, body.code(), rc_payload(rc)),
        };

        if let Some(code) = CommandCode::from_u16(body.code()) {
            if code.is_ownership() {
                return self.dispatch_ownership(body, sender, code == CommandCode::FciOwnershipLock);
            }
        }

        if !self.ownership.is_authorized(sender) {
            return self.reply(Errno::Eperm, body.code(), rc_payload(ReturnCode::FciOwnershipNotAuthorized));
        }

        let already_owner = self.ownership.lock_owner() == Some(sender);
        let acquired_floating = if already_owner { false } else { self.ownership.get_floating_lock(sender) };
        if !already_owner && !acquired_floating {
            return self.reply(Errno::Eperm, body.code(), rc_payload(ReturnCode::FciOwnershipAlreadyLocked));
        }

        let handler = self.handlers.get(&body.code()).copied();
        let (errno, rc, payload) = match handler {
            Some(f) => {
                let mut db = self.databases.lock().unwrap();
                f(&mut db, &self.driver, body)
            }
            None => (Errno::Einval, ReturnCode::UnknownCommand, Vec::new()),
        };

        if acquired_floating {
            self.ownership.clear_floating_lock();
        }

        ReplyRecord { errno, code: body.code(), payload: with_return_code(rc, payload) }
    }

    fn broadcast(&self, body: &CmdBody) {
        let reply = ReplyRecord {
            errno: Errno::Ok,
            code: body.code(),
            payload: body.payload.clone(),
        };
        let frame = codec::emit(&reply, self.reply_framing);
        for sender in self.registry.connected_senders() {
            if let Err(e) = self.transport.send(sender, &frame) {
                warn!(sender, error = %e, "broadcast delivery failed");
            }
        }
    }

    /// Processes one parsed message. Returns the reply to unicast back to
    /// the originating sender, or `None` when the message fans out
    /// instead (a broadcast) or carries no reply of its own.
    pub fn process(&self, record: MessageRecord) -> Option<ReplyRecord> {
        match record {
            MessageRecord::ClientRegister { sender } => {
                let first = !self.registry.has_any_connected();
                let result = self.registry.register(sender);
                if first && result.is_ok() {
                    for event in self.driver.health_monitor.pending_events() {
                        let reply = ReplyRecord { errno: Errno::Ok, code: 0, payload: event };
                        let frame = codec::emit(&reply, self.reply_framing);
                        let _ = self.transport.send(sender, &frame);
                    }
                }
                Some(match result {
                    Ok(()) => self.reply(Errno::Ok, 0, Vec::new()),
                    Err(rc) => self.reply(Errno::Enospc, 0, rc_payload(rc)),
                })
            }
            MessageRecord::ClientUnregister { sender } => {
                self.registry.unregister(sender);
                Some(self.reply(Errno::Ok, 0, Vec::new()))
            }
            MessageRecord::Cmd(body) => Some(self.dispatch_command(&body)),
            MessageRecord::CoreClientBroadcast(body) => {
                self.broadcast(&body);
                None
            }
        }
    }
}

fn rc_payload(rc: ReturnCode) -> Vec<u8> {
    rc.as_u16().to_be_bytes().to_vec()
}

/// Every non-ownership reply carries the protocol return code as its
/// first two bytes, ahead of whatever the handler itself produced.
fn with_return_code(rc: ReturnCode, mut payload: Vec<u8>) -> Vec<u8> {
    let mut out = rc.as_u16().to_be_bytes().to_vec();
    out.append(&mut payload);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use fci_driver::stub::StubDriver;

    fn endpoint(mask: AuthorizedMask) -> Endpoint {
        let driver = Arc::new(DriverSurface {
            classifier: Box::new(StubDriver::new()),
            l2_bridge: Box::new(StubDriver::new()),
            routing_table: Box::new(StubDriver::new()),
            tmu: Box::new(StubDriver::new()),
            interfaces: Box::new(StubDriver::new()),
            features: Box::new(StubDriver::new()),
            health_monitor: Box::new(StubDriver::new()),
        });
        let ep = Endpoint::new(EndpointInit {
            driver,
            transport: Arc::new(crate::transport::NullTransport),
            authorized_mask: mask,
            max_clients: 5,
            namespace: "test".to_owned(),
            reply_framing: ReplyFraming::Standard,
        });
        ep.init().unwrap();
        ep
    }

    fn l2bd_register(vlan: u16) -> CmdBody {
        let mut payload = vec![1u8];
        payload.extend_from_slice(&vlan.to_be_bytes());
        CmdBody::new(fci_types::CommandCode::L2Bd.as_u16(), 0, payload)
    }

    #[test]
    fn double_init_is_rejected() {
        let ep = endpoint(AuthorizedMask::empty());
        assert_eq!(ep.init().unwrap_err(), LifecycleError::AlreadyInitialized);
    }

    #[test]
    fn fini_before_init_is_rejected() {
        let driver = Arc::new(DriverSurface {
            classifier: Box::new(StubDriver::new()),
            l2_bridge: Box::new(StubDriver::new()),
            routing_table: Box::new(StubDriver::new()),
            tmu: Box::new(StubDriver::new()),
            interfaces: Box::new(StubDriver::new()),
            features: Box::new(StubDriver::new()),
            health_monitor: Box::new(StubDriver::new()),
        });
        let ep = Endpoint::new(EndpointInit {
            driver,
            transport: Arc::new(crate::transport::NullTransport),
            authorized_mask: AuthorizedMask::empty(),
            max_clients: 5,
            namespace: "test".to_owned(),
            reply_framing: ReplyFraming::Standard,
        });
        assert_eq!(ep.fini().unwrap_err(), LifecycleError::NotInitialized);
    }

    #[test]
    fn ownership_lock_blocks_other_senders_command() {
        let ep = endpoint(AuthorizedMask::empty());
        let lock_body = CmdBody::new(fci_types::CommandCode::FciOwnershipLock.as_u16(), 0, Vec::new());
        let reply = ep.process(MessageRecord::Cmd(lock_body)).unwrap();
        assert_eq!(reply.errno, Errno::Ok);

        let mut other_cmd = l2bd_register(100);
        other_cmd.sender = 1;
        let reply = ep.process(MessageRecord::Cmd(other_cmd)).unwrap();
        assert_eq!(reply.errno, Errno::Eperm);
    }

    #[test]
    fn unauthorized_sender_class_is_rejected() {
        let ep = endpoint(AuthorizedMask::HIF0);
        let mut body = l2bd_register(100);
        body.sender = 1;
        let reply = ep.process(MessageRecord::Cmd(body)).unwrap();
        assert_eq!(reply.errno, Errno::Eperm);
    }

    #[test]
    fn command_without_any_lock_held_executes_and_releases_floating_lock() {
        let ep = endpoint(AuthorizedMask::empty());
        let body = l2bd_register(100);
        let reply = ep.process(MessageRecord::Cmd(body)).unwrap();
        assert_eq!(reply.errno, Errno::Ok);
        assert_eq!(ep.ownership.lock_owner(), None);
    }

    #[test]
    fn client_register_replays_pending_health_events_once() {
        let ep = endpoint(AuthorizedMask::empty());
        let reply = ep.process(MessageRecord::ClientRegister { sender: 9 }).unwrap();
        assert_eq!(reply.errno, Errno::Ok);
    }
}
