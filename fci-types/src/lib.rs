//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod errno;
pub mod ids;
pub mod mac_addr;
pub mod retcode;
pub mod wire;

pub use errno::Errno;
pub use ids::{DmemAddr, PhyIfId};
pub use mac_addr::MacAddr;
pub use retcode::{CommandCode, ReturnCode};
