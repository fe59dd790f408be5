//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Endpoint core: the framed-message codec, the payload cursor, the
// client registry and ownership arbiter, the attached database bundle,
// and the dispatch loop tying them together. `fci-daemon` is the only
// crate that owns a real transport; everything here is transport-agnostic
// beyond the narrow `Transport` trait.

pub mod codec;
pub mod cursor;
pub mod dispatch;
pub mod handlers;
pub mod ownership;
pub mod registry;
pub mod state;
pub mod transport;

pub use dispatch::{Endpoint, EndpointInit, LifecycleError, Phase};
pub use state::Databases;
