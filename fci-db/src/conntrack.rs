//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Connection DB: IPv4/IPv6 5-tuple keyed conntracks plus per-protocol
// default timeouts. Grounded on
// `fci_rt_ct.c` (original_source) for the `IPV4_CONNTRACK` /
// `IPV6_CONNTRACK` / `IPV4_SET_TIMEOUT` command family, and on
// `holo-routing::rib::Rib`'s "HashMap keyed by tuple" shape.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use bitflags::bitflags;
use fci_types::ReturnCode;

use crate::error::Error;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct ConntrackFlags: u8 {
        const TTL_DECREMENT  = 0x01;
        const ORIG_DISABLED  = 0x02;
        const REPLY_DISABLED = 0x04;
    }
}

impl ConntrackFlags {
    /// `orig-disabled` and `reply-disabled` are never both set.
    pub fn is_valid(&self) -> bool {
        !(self.contains(ConntrackFlags::ORIG_DISABLED)
            && self.contains(ConntrackFlags::REPLY_DISABLED))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Tuple4 {
    pub saddr: Ipv4Addr,
    pub daddr: Ipv4Addr,
    pub sport: u16,
    pub dport: u16,
    pub protocol: u8,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Tuple6 {
    pub saddr: Ipv6Addr,
    pub daddr: Ipv6Addr,
    pub sport: u16,
    pub dport: u16,
    pub protocol: u8,
}

#[derive(Clone, Debug)]
pub struct Conntrack<T> {
    pub orig: T,
    pub reply: T,
    pub orig_route_id: Option<u32>,
    pub reply_route_id: Option<u32>,
    pub orig_vlan: Option<u16>,
    pub reply_vlan: Option<u16>,
    pub flags: ConntrackFlags,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IpProtocolFamily {
    V4,
    V6,
}

const PROTOCOL_SLOTS: usize = 256;

pub struct ConntrackDb {
    v4: HashMap<Tuple4, Conntrack<Tuple4>>,
    v6: HashMap<Tuple6, Conntrack<Tuple6>>,
    v4_timeouts: Vec<Duration>,
    v6_timeouts: Vec<Duration>,
}

impl Default for ConntrackDb {
    fn default() -> Self {
        Self {
            v4: HashMap::new(),
            v6: HashMap::new(),
            v4_timeouts: vec![Duration::from_secs(300); PROTOCOL_SLOTS],
            v6_timeouts: vec![Duration::from_secs(300); PROTOCOL_SLOTS],
        }
    }
}

impl ConntrackDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_v4(&mut self, key: Tuple4, entry: Conntrack<Tuple4>) -> Result<(), Error> {
        if !entry.flags.is_valid() {
            return Err(Error::Invalid(ReturnCode::WrongCommandParam));
        }
        self.v4.insert(key, entry);
        Ok(())
    }

    pub fn add_v6(&mut self, key: Tuple6, entry: Conntrack<Tuple6>) -> Result<(), Error> {
        if !entry.flags.is_valid() {
            return Err(Error::Invalid(ReturnCode::WrongCommandParam));
        }
        self.v6.insert(key, entry);
        Ok(())
    }

    pub fn get_v4(&self, key: &Tuple4) -> Option<&Conntrack<Tuple4>> {
        self.v4.get(key)
    }

    pub fn get_v6(&self, key: &Tuple6) -> Option<&Conntrack<Tuple6>> {
        self.v6.get(key)
    }

    /// Restricted update: only VLAN tags, route refs and flags may be
    /// mutated post-creation.
    pub fn update_v4(
        &mut self,
        key: &Tuple4,
        orig_route_id: Option<u32>,
        reply_route_id: Option<u32>,
        orig_vlan: Option<u16>,
        reply_vlan: Option<u16>,
        flags: ConntrackFlags,
    ) -> Result<(), Error> {
        if !flags.is_valid() {
            return Err(Error::Invalid(ReturnCode::WrongCommandParam));
        }
        let ct = self
            .v4
            .get_mut(key)
            .ok_or(Error::NotFound(ReturnCode::ConntrackNotFound))?;
        ct.orig_route_id = orig_route_id;
        ct.reply_route_id = reply_route_id;
        ct.orig_vlan = orig_vlan;
        ct.reply_vlan = reply_vlan;
        ct.flags = flags;
        Ok(())
    }

    /// Restricted update: only VLAN tags, route refs and flags may be
    /// mutated post-creation.
    pub fn update_v6(
        &mut self,
        key: &Tuple6,
        orig_route_id: Option<u32>,
        reply_route_id: Option<u32>,
        orig_vlan: Option<u16>,
        reply_vlan: Option<u16>,
        flags: ConntrackFlags,
    ) -> Result<(), Error> {
        if !flags.is_valid() {
            return Err(Error::Invalid(ReturnCode::WrongCommandParam));
        }
        let ct = self
            .v6
            .get_mut(key)
            .ok_or(Error::NotFound(ReturnCode::ConntrackNotFound))?;
        ct.orig_route_id = orig_route_id;
        ct.reply_route_id = reply_route_id;
        ct.orig_vlan = orig_vlan;
        ct.reply_vlan = reply_vlan;
        ct.flags = flags;
        Ok(())
    }

    pub fn remove_v4(&mut self, key: &Tuple4) -> Result<(), Error> {
        self.v4
            .remove(key)
            .map(|_| ())
            .ok_or(Error::NotFound(ReturnCode::ConntrackNotFound))
    }

    pub fn remove_v6(&mut self, key: &Tuple6) -> Result<(), Error> {
        self.v6
            .remove(key)
            .map(|_| ())
            .ok_or(Error::NotFound(ReturnCode::ConntrackNotFound))
    }

    pub fn set_timeout(&mut self, family: IpProtocolFamily, protocol: u8, timeout: Duration) {
        let table = match family {
            IpProtocolFamily::V4 => &mut self.v4_timeouts,
            IpProtocolFamily::V6 => &mut self.v6_timeouts,
        };
        table[protocol as usize] = timeout;
    }

    pub fn timeout(&self, family: IpProtocolFamily, protocol: u8) -> Duration {
        match family {
            IpProtocolFamily::V4 => self.v4_timeouts[protocol as usize],
            IpProtocolFamily::V6 => self.v6_timeouts[protocol as usize],
        }
    }

    pub fn iter_v4(&self) -> impl Iterator<Item = &Conntrack<Tuple4>> {
        self.v4.values()
    }

    pub fn iter_v6(&self) -> impl Iterator<Item = &Conntrack<Tuple6>> {
        self.v6.values()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tuple(n: u8) -> Tuple4 {
        Tuple4 {
            saddr: Ipv4Addr::new(10, 0, 0, n),
            daddr: Ipv4Addr::new(10, 0, 1, n),
            sport: 1000 + n as u16,
            dport: 80,
            protocol: 6,
        }
    }

    #[test]
    fn both_directions_disabled_is_rejected() {
        let mut db = ConntrackDb::new();
        let entry = Conntrack {
            orig: tuple(1),
            reply: tuple(1),
            orig_route_id: None,
            reply_route_id: None,
            orig_vlan: None,
            reply_vlan: None,
            flags: ConntrackFlags::ORIG_DISABLED | ConntrackFlags::REPLY_DISABLED,
        };
        assert!(db.add_v4(tuple(1), entry).is_err());
    }

    #[test]
    fn per_protocol_timeout_is_settable() {
        let mut db = ConntrackDb::new();
        db.set_timeout(IpProtocolFamily::V4, 6, Duration::from_secs(60));
        assert_eq!(db.timeout(IpProtocolFamily::V4, 6), Duration::from_secs(60));
        assert_eq!(db.timeout(IpProtocolFamily::V4, 17), Duration::from_secs(300));
    }
}
