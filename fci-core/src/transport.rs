//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// The minimal transport contract the dispatch core needs to fan a
// broadcast or targeted reply back out to a client. The richer
// recv/disconnect loop lives in
// `fci-daemon::transport`, which also implements this trait; keeping the
// send-only half here lets `Endpoint` broadcast without depending on the
// daemon crate.

use fci_types::Errno;

pub trait Transport: Send + Sync {
    /// Best-effort unicast of an already-framed reply to `dest`.
    /// Individual failures are logged by the caller and do not abort a
    /// broadcast loop.
    fn send(&self, dest: u32, frame: &[u8]) -> Result<(), Errno>;
}

/// No-op transport used where a send target is unreachable (torn-down
/// endpoint, test doubles). `send` always reports `Einval` without
/// touching anything, matching the expected "past teardown" behavior.
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&self, _dest: u32, _frame: &[u8]) -> Result<(), Errno> {
        Err(Errno::Einval)
    }
}
