//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Transport-level completion code. Every command reply carries both this
// transport errno and a protocol-level `ReturnCode`, and the two are
// allowed to disagree (e.g. `Ok` with a family `*_NOT_FOUND` return code
// during query enumeration exhaustion).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Errno {
    Ok,
    Einval,
    Enospc,
    Eagain,
    Enotfound,
    Eperm,
    Ealready,
    Efault,
}

impl Errno {
    pub fn is_ok(&self) -> bool {
        matches!(self, Errno::Ok)
    }
}

impl std::fmt::Display for Errno {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Errno::Ok => "ok",
            Errno::Einval => "invalid argument",
            Errno::Enospc => "no space left",
            Errno::Eagain => "try again",
            Errno::Enotfound => "not found",
            Errno::Eperm => "operation not permitted",
            Errno::Ealready => "already in progress",
            Errno::Efault => "bad address",
        };
        f.write_str(s)
    }
}
