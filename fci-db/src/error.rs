//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

use fci_types::{Errno, ReturnCode};
use tracing::warn;

// Database-level errors. Every variant carries enough information to
// derive both halves of the dual transport-errno/protocol-return-code
// encoding required at the command boundary; the handler that catches
// one of these decides the exact transport errno (some commands zero
// the reply and return a fault, others return `Ok` with a
// family-specific return code; both conventions appear and must be
// preserved).
#[derive(Debug)]
pub enum Error {
    NotFound(ReturnCode),
    AlreadyExists(ReturnCode),
    Capacity(ReturnCode),
    Invalid(ReturnCode),
    Internal(ReturnCode),
}

impl Error {
    pub fn return_code(&self) -> ReturnCode {
        match self {
            Error::NotFound(rc)
            | Error::AlreadyExists(rc)
            | Error::Capacity(rc)
            | Error::Invalid(rc)
            | Error::Internal(rc) => *rc,
        }
    }

    /// Default transport errno for this failure family. Handlers that need
    /// the other documented convention (e.g. `Ok` during query
    /// enumeration exhaustion) override this explicitly rather than
    /// calling this helper.
    pub fn errno(&self) -> Errno {
        match self {
            Error::NotFound(_) => Errno::Enotfound,
            Error::AlreadyExists(_) => Errno::Ealready,
            Error::Capacity(_) => Errno::Enospc,
            Error::Invalid(_) => Errno::Einval,
            Error::Internal(_) => Errno::Efault,
        }
    }

    pub fn log(&self) {
        warn!(return_code = %self.return_code(), "{}", self);
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotFound(rc) => write!(f, "entry not found ({rc})"),
            Error::AlreadyExists(rc) => write!(f, "entry already registered ({rc})"),
            Error::Capacity(rc) => write!(f, "capacity exceeded ({rc})"),
            Error::Invalid(rc) => write!(f, "invalid argument ({rc})"),
            Error::Internal(rc) => write!(f, "internal failure ({rc})"),
        }
    }
}

impl std::error::Error for Error {}
