//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Per-command handlers. Each function validates its payload via
// `Cursor`, mutates the relevant `fci-db` table and/or calls through the
// driver surface, and returns the dual transport-errno/protocol-return-
// code pair the dispatcher records into the reply. Handlers never
// raise; every failure path returns through this pair.
//
// The wire payload for every command begins with a one-byte action tag
// (`Action`); per-command fields follow. String-keyed entities (interface,
// table/rule, and mirror names) use a fixed 16-byte NUL-padded field.

use std::collections::HashMap;
use std::net::IpAddr;
use std::ops::Bound;
use std::time::Duration;

use fci_driver::{DriverSurface, FlushScope};
use fci_types::{CommandCode, Errno, PhyIfId, ReturnCode};

use crate::codec::CmdBody;
use crate::cursor::Cursor;
use crate::state::Databases;

pub type HandlerFn = fn(&mut Databases, &DriverSurface, &CmdBody) -> (Errno, ReturnCode, Vec<u8>);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Action {
    Register,
    Deregister,
    Update,
    Query,
    QueryCont,
    Use,
    Unuse,
}

impl Action {
    fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            1 => Action::Register,
            2 => Action::Deregister,
            3 => Action::Update,
            4 => Action::Query,
            5 => Action::QueryCont,
            6 => Action::Use,
            7 => Action::Unuse,
            _ => return None,
        })
    }
}

fn ok(rc: ReturnCode, payload: Vec<u8>) -> (Errno, ReturnCode, Vec<u8>) {
    (Errno::Ok, rc, payload)
}

fn err_invalid(rc: ReturnCode) -> (Errno, ReturnCode, Vec<u8>) {
    (Errno::Einval, rc, Vec::new())
}

/// A `fci-db` error maps to its own errno/return-code pair (`Error::errno`
/// / `Error::return_code`); not-found during enumeration is the one case
/// callers special-case into `Errno::Ok` themselves.
fn err_db(e: fci_db::Error) -> (Errno, ReturnCode, Vec<u8>) {
    e.log();
    (e.errno(), e.return_code(), Vec::new())
}

fn action_of(body: &CmdBody) -> Result<(Action, Cursor<'_>), ReturnCode> {
    let mut cur = Cursor::new(&body.payload);
    let tag = cur.u8()?;
    let action = Action::from_u8(tag).ok_or(ReturnCode::UnknownAction)?;
    Ok((action, cur))
}

macro_rules! action_or_return {
    ($body:expr) => {
        match action_of($body) {
            Ok(v) => v,
            Err(rc) => return err_invalid(rc),
        }
    };
}

macro_rules! field_or_return {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(rc) => return err_invalid(rc),
        }
    };
}

fn encode_mac(mac: &fci_types::MacAddr) -> Vec<u8> {
    mac.as_bytes().to_vec()
}

fn h_if_mac(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    let (action, mut cur) = action_or_return!(body);
    let name = field_or_return!(cur.name16());
    match action {
        Action::Register => {
            let mac = field_or_return!(cur.mac());
            match db.ifview.mac_register(&name, mac) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Deregister => {
            let mac = field_or_return!(cur.mac());
            match db.ifview.mac_deregister(&name, &mac) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Query => {
            let iface = match db.ifview.physical_by_name(&name) {
                Some(iface) => iface,
                None => return err_db(fci_db::Error::NotFound(ReturnCode::IfEntryNotFound)),
            };
            match iface.mac_list.iter().next() {
                Some(mac) => ok(ReturnCode::Ok, encode_mac(mac)),
                None => ok(ReturnCode::IfMacNotFound, Vec::new()),
            }
        }
        Action::QueryCont => {
            let after = field_or_return!(cur.mac());
            let iface = match db.ifview.physical_by_name(&name) {
                Some(iface) => iface,
                None => return err_db(fci_db::Error::NotFound(ReturnCode::IfEntryNotFound)),
            };
            match iface
                .mac_list
                .range((Bound::Excluded(after), Bound::Unbounded))
                .next()
            {
                Some(mac) => ok(ReturnCode::Ok, encode_mac(mac)),
                None => ok(ReturnCode::IfMacNotFound, Vec::new()),
            }
        }
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn h_if_session(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    let code = body.code();
    let result = if code == CommandCode::IfLockSession.as_u16() {
        db.ifview.lock_session(body.sender)
    } else {
        db.ifview.unlock_session(body.sender)
    };
    match result {
        Ok(()) => ok(ReturnCode::Ok, Vec::new()),
        Err(e) => err_db(e),
    }
}

fn encode_route(entry: &fci_db::route::RouteEntry) -> Vec<u8> {
    let mut out = Vec::with_capacity(24);
    out.extend_from_slice(&entry.id.to_be_bytes());
    match entry.dst_ip {
        IpAddr::V4(a) => out.extend_from_slice(&a.octets()),
        IpAddr::V6(_) => out.extend_from_slice(&[0u8; 4]),
    }
    out.extend_from_slice(entry.dst_mac.as_bytes());
    out.extend_from_slice(&entry.iface.0.to_be_bytes());
    out.extend_from_slice(&entry.mtu.to_be_bytes());
    out.extend_from_slice(&entry.refptr.to_be_bytes());
    out
}

fn h_ip_route(db: &mut Databases, drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    let (action, mut cur) = action_or_return!(body);
    match action {
        Action::Register => {
            let dst_ip = IpAddr::V4(field_or_return!(cur.ipv4()));
            let dst_mac = field_or_return!(cur.mac());
            let iface = PhyIfId(field_or_return!(cur.u32()));
            let id = field_or_return!(cur.u32());
            let refptr = field_or_return!(cur.u32());
            let overwrite = field_or_return!(cur.u8()) != 0;
            match db.route.add(dst_ip, dst_mac, iface, id, refptr, overwrite) {
                Ok(()) => {
                    let _ = drv.routing_table.add_route(id, iface);
                    ok(ReturnCode::Ok, Vec::new())
                }
                Err(e) => err_db(e),
            }
        }
        Action::Deregister => {
            let id = field_or_return!(cur.u32());
            match db.route.remove(id) {
                Ok(()) => {
                    let _ = drv.routing_table.remove_route(id);
                    ok(ReturnCode::Ok, Vec::new())
                }
                Err(e) => err_db(e),
            }
        }
        Action::Query => match db.route.get_first(fci_db::route::Criterion::All) {
            Some(entry) => ok(ReturnCode::Ok, encode_route(entry)),
            None => ok(ReturnCode::RouteNotFound, Vec::new()),
        },
        Action::QueryCont => match db.route.get_next() {
            Some(entry) => ok(ReturnCode::Ok, encode_route(entry)),
            None => ok(ReturnCode::RouteNotFound, Vec::new()),
        },
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn h_ip_family_reset(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    let v4 = body.code() == CommandCode::Ipv4Reset.as_u16();
    db.route.drop_family(v4);
    ok(ReturnCode::Ok, Vec::new())
}

fn h_ipv4_conntrack(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::conntrack::{Conntrack, ConntrackFlags, Tuple4};
    let (action, mut cur) = action_or_return!(body);
    let tuple = |cur: &mut Cursor<'_>| -> Result<Tuple4, ReturnCode> {
        Ok(Tuple4 {
            saddr: cur.ipv4()?,
            daddr: cur.ipv4()?,
            sport: cur.u16()?,
            dport: cur.u16()?,
            protocol: cur.u8()?,
        })
    };
    match action {
        Action::Register => {
            let key = field_or_return!(tuple(&mut cur));
            let entry = Conntrack {
                orig: key,
                reply: key,
                orig_route_id: None,
                reply_route_id: None,
                orig_vlan: None,
                reply_vlan: None,
                flags: ConntrackFlags::empty(),
            };
            match db.conntrack.add_v4(key, entry) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Deregister => {
            let key = field_or_return!(tuple(&mut cur));
            match db.conntrack.remove_v4(&key) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Update => {
            let key = field_or_return!(tuple(&mut cur));
            let flags = ConntrackFlags::from_bits_truncate(field_or_return!(cur.u8()));
            match db.conntrack.update_v4(&key, None, None, None, None, flags) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn h_ipv6_conntrack(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::conntrack::{Conntrack, ConntrackFlags, Tuple6};
    let (action, mut cur) = action_or_return!(body);
    let tuple = |cur: &mut Cursor<'_>| -> Result<Tuple6, ReturnCode> {
        Ok(Tuple6 {
            saddr: cur.ipv6()?,
            daddr: cur.ipv6()?,
            sport: cur.u16()?,
            dport: cur.u16()?,
            protocol: cur.u8()?,
        })
    };
    match action {
        Action::Register => {
            let key = field_or_return!(tuple(&mut cur));
            let entry = Conntrack {
                orig: key,
                reply: key,
                orig_route_id: None,
                reply_route_id: None,
                orig_vlan: None,
                reply_vlan: None,
                flags: ConntrackFlags::empty(),
            };
            match db.conntrack.add_v6(key, entry) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Deregister => {
            let key = field_or_return!(tuple(&mut cur));
            match db.conntrack.remove_v6(&key) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Update => {
            let key = field_or_return!(tuple(&mut cur));
            let flags = ConntrackFlags::from_bits_truncate(field_or_return!(cur.u8()));
            match db.conntrack.update_v6(&key, None, None, None, None, flags) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn h_ipv4_set_timeout(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::conntrack::IpProtocolFamily;
    let mut cur = Cursor::new(&body.payload);
    let protocol = field_or_return!(cur.u8());
    let secs = field_or_return!(cur.u32());
    db.conntrack
        .set_timeout(IpProtocolFamily::V4, protocol, Duration::from_secs(secs as u64));
    ok(ReturnCode::Ok, Vec::new())
}

fn decode_l2_action(v: u8) -> fci_db::l2::L2Action {
    use fci_db::l2::L2Action;
    match v {
        0 => L2Action::Forward,
        1 => L2Action::Flood,
        2 => L2Action::Punt,
        _ => L2Action::Discard,
    }
}

fn decode_port_list(cur: &mut Cursor<'_>) -> Result<Vec<PhyIfId>, ReturnCode> {
    let count = cur.u8()?;
    let mut ports = Vec::with_capacity(count as usize);
    for _ in 0..count {
        ports.push(PhyIfId(cur.u32()?));
    }
    Ok(ports)
}

fn h_l2_bd(db: &mut Databases, drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::l2::DomainActions;
    let (action, mut cur) = action_or_return!(body);
    let vlan = field_or_return!(cur.u16());
    match action {
        Action::Register => match db.l2.add_domain(vlan) {
            Ok(()) => {
                if drv.l2_bridge.add_domain(vlan, 0).is_err() {
                    let _ = db.l2.remove_domain(vlan);
                    return err_invalid(ReturnCode::InternalFailure);
                }
                ok(ReturnCode::Ok, Vec::new())
            }
            Err(e) => err_db(e),
        },
        Action::Deregister => match db.l2.remove_domain(vlan) {
            Ok(()) => {
                let _ = drv.l2_bridge.remove_domain(vlan);
                ok(ReturnCode::Ok, Vec::new())
            }
            Err(e) => err_db(e),
        },
        Action::Update => {
            let ports = field_or_return!(decode_port_list(&mut cur));
            let untagged_ports = field_or_return!(decode_port_list(&mut cur));
            let actions = DomainActions {
                ucast_hit: decode_l2_action(field_or_return!(cur.u8())),
                ucast_miss: decode_l2_action(field_or_return!(cur.u8())),
                mcast_hit: decode_l2_action(field_or_return!(cur.u8())),
                mcast_miss: decode_l2_action(field_or_return!(cur.u8())),
            };
            match db.l2.update_domain(vlan, ports, untagged_ports, actions) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn h_l2_static_ent(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::l2::StaticEntryAction;
    let (action, mut cur) = action_or_return!(body);
    let vlan = field_or_return!(cur.u16());
    let mac = field_or_return!(cur.mac());
    match action {
        Action::Register => {
            let iface_raw = field_or_return!(cur.u32());
            let entry_action = if iface_raw == u32::MAX {
                StaticEntryAction::Discard
            } else {
                StaticEntryAction::Forward(PhyIfId(iface_raw))
            };
            match db.l2.add_static_entry(vlan, mac, entry_action) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Deregister => match db.l2.remove_static_entry(vlan, &mac) {
            Ok(()) => ok(ReturnCode::Ok, Vec::new()),
            Err(e) => err_db(e),
        },
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn h_l2_flush(_db: &mut Databases, drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    let scope = if body.code() == CommandCode::L2FlushAll.as_u16() {
        FlushScope::All
    } else if body.code() == CommandCode::L2FlushLearned.as_u16() {
        FlushScope::Learned
    } else {
        FlushScope::Static
    };
    match drv.l2_bridge.flush(scope) {
        Ok(()) => ok(ReturnCode::Ok, Vec::new()),
        Err(_) => err_invalid(ReturnCode::InternalFailure),
    }
}

fn h_fp_table(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    let (action, mut cur) = action_or_return!(body);
    let name = field_or_return!(cur.name16());
    match action {
        Action::Register => match db.flexparser.register_table(name) {
            Ok(()) => ok(ReturnCode::Ok, Vec::new()),
            Err(e) => err_db(e),
        },
        Action::Deregister => match db.flexparser.deregister_table(&name) {
            Ok(()) => ok(ReturnCode::Ok, Vec::new()),
            Err(e) => err_db(e),
        },
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn h_fp_rule(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::flexparser::{FpRule, MatchAction, OffsetFrom};
    let (action, mut cur) = action_or_return!(body);
    match action {
        Action::Register => {
            let name = field_or_return!(cur.name16());
            let data = field_or_return!(cur.u32());
            let mask = field_or_return!(cur.u32());
            let offset = field_or_return!(cur.u16());
            let offset_from = match field_or_return!(cur.u8()) {
                0 => OffsetFrom::L2,
                1 => OffsetFrom::L3,
                _ => OffsetFrom::L4,
            };
            let invert = field_or_return!(cur.u8()) != 0;
            let action = match field_or_return!(cur.u8()) {
                0 => MatchAction::Accept,
                1 => MatchAction::Reject,
                _ => MatchAction::NextRule,
            };
            let rule = FpRule::new(name, data, mask, offset, offset_from, invert, action);
            match db.flexparser.register_rule(rule) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Deregister => {
            let name = field_or_return!(cur.name16());
            match db.flexparser.deregister_rule(&name) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Use => {
            let table = field_or_return!(cur.name16());
            let rule = field_or_return!(cur.name16());
            let pos = field_or_return!(cur.u8());
            match db.flexparser.use_rule(&table, &rule, pos as usize) {
                Ok(_) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Unuse => {
            let table = field_or_return!(cur.name16());
            let rule = field_or_return!(cur.name16());
            match db.flexparser.unuse_rule(&table, &rule) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn h_fw_feature(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    let (action, mut cur) = action_or_return!(body);
    let name = field_or_return!(cur.name16());
    match action {
        Action::Update => {
            let value = field_or_return!(cur.u8());
            match db.feature.set_value(&name, value) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Query => match db.feature.feature(&name) {
            Some(f) => ok(
                ReturnCode::Ok,
                vec![f.present as u8, f.runtime_toggleable as u8, f.default_value, f.current_value],
            ),
            None => ok(ReturnCode::FwFeatureNotFound, Vec::new()),
        },
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn h_fw_feature_element(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::feature::FeatureState;
    let (action, mut cur) = action_or_return!(body);
    let feature = field_or_return!(cur.name16());
    let group = field_or_return!(cur.name16());
    let index = field_or_return!(cur.u16());
    match action {
        Action::Update => {
            let state = if field_or_return!(cur.u8()) != 0 {
                FeatureState::Enabled
            } else {
                FeatureState::Disabled
            };
            match db.feature.set_element_state(&feature, &group, index, state) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Query => match db.feature.element(&feature, &group, index) {
            Some(el) => ok(ReturnCode::Ok, vec![(el.state == FeatureState::Enabled) as u8]),
            None => ok(ReturnCode::FwFeatureElementNotFound, Vec::new()),
        },
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn encode_name16(name: &str) -> [u8; 16] {
    let mut buf = [0u8; 16];
    let bytes = name.as_bytes();
    let len = bytes.len().min(16);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

fn encode_mirror(rule: &fci_db::mirror::MirrorRule) -> Vec<u8> {
    let mut out = encode_name16(&rule.name).to_vec();
    out.extend_from_slice(&rule.egress.0.to_be_bytes());
    out.push(rule.filter_table.is_some() as u8);
    out
}

fn h_mirror(db: &mut Databases, drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    let (action, mut cur) = action_or_return!(body);
    match action {
        Action::Register => {
            let name = field_or_return!(cur.name16());
            let egress = PhyIfId(field_or_return!(cur.u32()));
            match db.mirror.register(name, egress) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Deregister => {
            let name = field_or_return!(cur.name16());
            match db.mirror.deregister(&name) {
                Ok(rule) => {
                    if let Some(old_table) = rule.filter_table.as_deref() {
                        if let Ok(Some(addr)) = db.flexparser.unbind(old_table) {
                            let _ = drv.classifier.unbind_table(addr);
                        }
                    }
                    ok(ReturnCode::Ok, Vec::new())
                }
                Err(e) => err_db(e),
            }
        }
        Action::Update => {
            let name = field_or_return!(cur.name16());
            let egress_raw = field_or_return!(cur.u32());
            if egress_raw != u32::MAX {
                if let Err(e) = db.mirror.set_egress(&name, PhyIfId(egress_raw)) {
                    return err_db(e);
                }
            }
            let table = field_or_return!(cur.name16());
            let table = if table.is_empty() { None } else { Some(table) };

            let old_table = match db.mirror.rule(&name) {
                Some(rule) => rule.filter_table.clone(),
                None => return err_db(fci_db::Error::NotFound(ReturnCode::MirrorNotFound)),
            };
            if old_table.as_deref() != table.as_deref() {
                if let Some(old) = old_table.as_deref() {
                    if let Ok(Some(addr)) = db.flexparser.unbind(old) {
                        let _ = drv.classifier.unbind_table(addr);
                    }
                }
            }

            let addr = match table.as_deref() {
                Some(new_table) => match drv.classifier.bind_table(new_table.as_bytes()) {
                    Ok(addr) => {
                        if db.flexparser.bind(new_table, addr).is_err() {
                            let _ = drv.classifier.unbind_table(addr);
                            return err_invalid(ReturnCode::FpTableNotFound);
                        }
                        Some(addr)
                    }
                    Err(_) => return err_invalid(ReturnCode::InternalFailure),
                },
                None => None,
            };

            match db.mirror.set_filter_table(&name, table, addr) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Query => match db.mirror.iter().next() {
            Some(rule) => ok(ReturnCode::Ok, encode_mirror(rule)),
            None => ok(ReturnCode::MirrorNotFound, Vec::new()),
        },
        Action::QueryCont => {
            let after = field_or_return!(cur.name16());
            match db.mirror.iter().find(|r| r.name > after) {
                Some(rule) => ok(ReturnCode::Ok, encode_mirror(rule)),
                None => ok(ReturnCode::MirrorNotFound, Vec::new()),
            }
        }
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn encode_queue(q: &fci_db::qos::Queue) -> Vec<u8> {
    use fci_db::qos::QueueMode;
    let mode = match q.mode {
        QueueMode::Disabled => 0u8,
        QueueMode::Default => 1,
        QueueMode::TailDrop => 2,
        QueueMode::Wred => 3,
    };
    let mut out = vec![mode];
    out.extend_from_slice(&q.max_len.to_be_bytes());
    out
}

fn h_qos_queue(db: &mut Databases, drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::qos::QueueMode;
    let (action, mut cur) = action_or_return!(body);
    if action == Action::Query {
        let iface = PhyIfId(field_or_return!(cur.u32()));
        let id = field_or_return!(cur.u8());
        return match db.qos.queue(iface, id) {
            Some(q) => ok(ReturnCode::Ok, encode_queue(q)),
            None => ok(ReturnCode::QosQueueNotFound, Vec::new()),
        };
    }
    if action != Action::Update {
        return err_invalid(ReturnCode::UnknownAction);
    }
    let iface = PhyIfId(field_or_return!(cur.u32()));
    let id = field_or_return!(cur.u8());
    let mode = match field_or_return!(cur.u8()) {
        0 => QueueMode::Disabled,
        1 => QueueMode::Default,
        2 => QueueMode::TailDrop,
        _ => QueueMode::Wred,
    };
    let max_len = field_or_return!(cur.u16());
    match db.qos.update_queue(iface, id, mode, max_len, [None; fci_db::qos::WRED_ZONES]) {
        Ok(()) => {
            let _ = drv.tmu.apply_queue(iface, id);
            ok(ReturnCode::Ok, Vec::new())
        }
        Err(e) => err_db(e),
    }
}

fn encode_scheduler(s: &fci_db::qos::Scheduler) -> Vec<u8> {
    match s.inputs[0] {
        Some(input) => {
            let mut out = vec![1u8];
            out.extend_from_slice(&input.weight.to_be_bytes());
            out.push(input.source);
            out
        }
        None => vec![0u8],
    }
}

fn h_qos_scheduler(db: &mut Databases, drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    let (action, mut cur) = action_or_return!(body);
    if action == Action::Query {
        let iface = PhyIfId(field_or_return!(cur.u32()));
        let id = field_or_return!(cur.u8());
        return match db.qos.scheduler(iface, id) {
            Some(s) => ok(ReturnCode::Ok, encode_scheduler(s)),
            None => ok(ReturnCode::QosSchedulerNotFound, Vec::new()),
        };
    }
    if action != Action::Update {
        return err_invalid(ReturnCode::UnknownAction);
    }
    let iface = PhyIfId(field_or_return!(cur.u32()));
    let id = field_or_return!(cur.u8());
    let mode = field_or_return!(cur.u8());
    let inputs = if mode == 0 {
        [None; fci_db::qos::SCHEDULER_INPUTS]
    } else {
        let mut inputs = [None; fci_db::qos::SCHEDULER_INPUTS];
        inputs[0] = Some(fci_db::qos::SchedInput {
            weight: field_or_return!(cur.u16()),
            source: field_or_return!(cur.u8()),
        });
        inputs
    };
    db.qos.update_scheduler(iface, id, inputs);
    let _ = drv.tmu.apply_scheduler(iface, id);
    ok(ReturnCode::Ok, Vec::new())
}

fn decode_shaper(cur: &mut Cursor<'_>) -> Result<fci_db::qos::Shaper, ReturnCode> {
    use fci_db::qos::ShaperMode;
    let mode = match cur.u8()? {
        0 => None,
        1 => Some(ShaperMode::DataRate),
        2 => Some(ShaperMode::PacketRate),
        _ => Some(ShaperMode::Disabled),
    };
    Ok(fci_db::qos::Shaper {
        mode,
        min_credit: cur.u32()? as i32,
        max_credit: cur.u32()? as i32,
        idle_slope: cur.u32()?,
        position: cur.u8()?,
    })
}

fn encode_shaper(s: &fci_db::qos::Shaper) -> Vec<u8> {
    use fci_db::qos::ShaperMode;
    let mode = match s.mode {
        None => 0u8,
        Some(ShaperMode::DataRate) => 1,
        Some(ShaperMode::PacketRate) => 2,
        Some(ShaperMode::Disabled) => 3,
    };
    let mut out = vec![mode];
    out.extend_from_slice(&(s.min_credit as u32).to_be_bytes());
    out.extend_from_slice(&(s.max_credit as u32).to_be_bytes());
    out.extend_from_slice(&s.idle_slope.to_be_bytes());
    out.push(s.position);
    out
}

fn h_qos_shaper(db: &mut Databases, drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    let (action, mut cur) = action_or_return!(body);
    if action == Action::Query {
        let iface = PhyIfId(field_or_return!(cur.u32()));
        let id = field_or_return!(cur.u8());
        return match db.qos.shaper(iface, id) {
            Some(s) => ok(ReturnCode::Ok, encode_shaper(s)),
            None => ok(ReturnCode::QosShaperNotFound, Vec::new()),
        };
    }
    if action != Action::Update {
        return err_invalid(ReturnCode::UnknownAction);
    }
    let iface = PhyIfId(field_or_return!(cur.u32()));
    let id = field_or_return!(cur.u8());
    let shaper = field_or_return!(decode_shaper(&mut cur));
    db.qos.update_shaper(iface, id, shaper);
    let _ = drv.tmu.apply_shaper(iface, id);
    ok(ReturnCode::Ok, Vec::new())
}

fn h_qos_policer(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    let (action, mut cur) = action_or_return!(body);
    if action != Action::Update {
        return err_invalid(ReturnCode::UnknownAction);
    }
    let iface = PhyIfId(field_or_return!(cur.u32()));
    let enabled = field_or_return!(cur.u8()) != 0;
    db.qos.set_policer_enabled(iface, enabled);
    ok(ReturnCode::Ok, Vec::new())
}

fn h_qos_policer_flow(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::qos::PolicerFlow;
    let (action, mut cur) = action_or_return!(body);
    let iface = PhyIfId(field_or_return!(cur.u32()));
    match action {
        Action::Register => {
            let position = field_or_return!(cur.u8());
            let match_bits = field_or_return!(cur.u32());
            match db.qos.policer_flow_register(iface, position, PolicerFlow { match_bits }) {
                Ok(pos) => ok(ReturnCode::Ok, vec![pos]),
                Err(e) => err_db(e),
            }
        }
        Action::Deregister => {
            let position = field_or_return!(cur.u8());
            match db.qos.policer_flow_deregister(iface, position) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Query => {
            let position = field_or_return!(cur.u8());
            match db.qos.policer_flows(iface).find(|(p, _)| *p == position) {
                Some((_, flow)) => ok(ReturnCode::Ok, flow.match_bits.to_be_bytes().to_vec()),
                None => ok(ReturnCode::QosPolicerFlowNotFound, Vec::new()),
            }
        }
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn h_qos_policer_wred(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::qos::{PolicerQueue, WredZone};
    let (action, mut cur) = action_or_return!(body);
    if action != Action::Update {
        return err_invalid(ReturnCode::UnknownAction);
    }
    let iface = PhyIfId(field_or_return!(cur.u32()));
    let queue = match field_or_return!(cur.u8()) {
        0 => PolicerQueue::Dmem,
        1 => PolicerQueue::Lmem,
        _ => PolicerQueue::Rxf,
    };
    let id = field_or_return!(cur.u8());
    let zone = WredZone {
        min: field_or_return!(cur.u16()),
        max: field_or_return!(cur.u16()),
        drop_probability: field_or_return!(cur.u8()),
    };
    db.qos.set_policer_wred(iface, queue, id, zone);
    ok(ReturnCode::Ok, Vec::new())
}

fn h_qos_policer_shp(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    let (action, mut cur) = action_or_return!(body);
    if action != Action::Update {
        return err_invalid(ReturnCode::UnknownAction);
    }
    let iface = PhyIfId(field_or_return!(cur.u32()));
    let id = field_or_return!(cur.u8());
    let shaper = field_or_return!(decode_shaper(&mut cur));
    db.qos.set_policer_shaper(iface, id, shaper);
    ok(ReturnCode::Ok, Vec::new())
}

fn encode_spd_entry(entry: &fci_db::spd::SpdEntry) -> Vec<u8> {
    use fci_db::spd::SpdAction;
    let mut out = Vec::new();
    match entry.selector.src {
        Some(IpAddr::V4(a)) => {
            out.push(1);
            out.extend_from_slice(&a.octets());
        }
        _ => out.push(0),
    }
    match entry.selector.dst {
        Some(IpAddr::V4(a)) => {
            out.push(1);
            out.extend_from_slice(&a.octets());
        }
        _ => out.push(0),
    }
    match entry.selector.protocol {
        Some(p) => {
            out.push(1);
            out.push(p);
        }
        None => out.push(0),
    }
    match entry.action {
        SpdAction::Bypass => out.push(0),
        SpdAction::Discard => out.push(1),
        SpdAction::Process(sa) => {
            out.push(2);
            out.extend_from_slice(&sa.to_be_bytes());
        }
    }
    out
}

fn h_spd(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::spd::{SpdAction, SpdEntry, SpdSelector};
    let (action, mut cur) = action_or_return!(body);
    let iface = PhyIfId(field_or_return!(cur.u32()));
    let pos = field_or_return!(cur.u8());
    match action {
        Action::Register => {
            let src_present = field_or_return!(cur.u8()) != 0;
            let src = if src_present { Some(IpAddr::V4(field_or_return!(cur.ipv4()))) } else { None };
            let dst_present = field_or_return!(cur.u8()) != 0;
            let dst = if dst_present { Some(IpAddr::V4(field_or_return!(cur.ipv4()))) } else { None };
            let proto_present = field_or_return!(cur.u8()) != 0;
            let protocol = if proto_present { Some(field_or_return!(cur.u8())) } else { None };
            let action = match field_or_return!(cur.u8()) {
                0 => SpdAction::Bypass,
                1 => SpdAction::Discard,
                _ => SpdAction::Process(field_or_return!(cur.u32())),
            };
            let entry = SpdEntry {
                selector: SpdSelector { src, dst, protocol },
                action,
            };
            let pos = db.spd.insert(iface, pos as usize, entry);
            ok(ReturnCode::Ok, vec![pos as u8])
        }
        Action::Deregister => match db.spd.remove(iface, pos as usize) {
            Ok(_) => ok(ReturnCode::Ok, Vec::new()),
            Err(e) => err_db(e),
        },
        Action::Query => match db.spd.entries(iface).get(pos as usize) {
            Some(entry) => ok(ReturnCode::Ok, encode_spd_entry(entry)),
            None => ok(ReturnCode::SpdNotFound, Vec::new()),
        },
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn encode_phy_if(p: &fci_db::ifview::PhysicalInterface) -> Vec<u8> {
    let mut out = Vec::with_capacity(24);
    out.extend_from_slice(&p.id.0.to_be_bytes());
    out.extend_from_slice(&encode_name16(&p.name));
    out.extend_from_slice(&p.flags.bits().to_be_bytes());
    out.push(p.mode as u8);
    out.push(p.block_state as u8);
    out.push(p.mac_list.len() as u8);
    out
}

fn h_phy_if(db: &mut Databases, drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::ifview::InterfaceFlags;
    let (action, mut cur) = action_or_return!(body);
    match action {
        Action::Register => {
            let name = field_or_return!(cur.name16());
            let id = field_or_return!(cur.u32());
            match db.ifview.add_physical(PhyIfId(id), name) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Update => {
            let name = field_or_return!(cur.name16());
            let iface = match db.ifview.physical_by_name(&name) {
                Some(p) => p.id,
                None => return err_invalid(ReturnCode::IfEntryNotFound),
            };
            let enabled = field_or_return!(cur.u8()) != 0;
            let has_mac = field_or_return!(cur.u8()) != 0;
            let mac = if has_mac { Some(field_or_return!(cur.mac())) } else { None };
            if drv.interfaces.set_admin_status(iface, enabled).is_err() {
                return err_invalid(ReturnCode::InternalFailure);
            }
            if let Some(mac) = mac {
                if drv.interfaces.set_mac(iface, mac).is_err() {
                    return err_invalid(ReturnCode::InternalFailure);
                }
            }
            let phy = db
                .ifview
                .physical_by_name_mut(&name)
                .expect("checked present above");
            if enabled {
                phy.flags.insert(InterfaceFlags::ENABLED);
            } else {
                phy.flags.remove(InterfaceFlags::ENABLED);
            }
            ok(ReturnCode::Ok, Vec::new())
        }
        Action::Query => match db.ifview.iter_physical().next() {
            Some(p) => ok(ReturnCode::Ok, encode_phy_if(p)),
            None => ok(ReturnCode::IfEntryNotFound, Vec::new()),
        },
        Action::QueryCont => {
            let after = field_or_return!(cur.name16());
            match db.ifview.iter_physical().find(|p| p.name > after) {
                Some(p) => ok(ReturnCode::Ok, encode_phy_if(p)),
                None => ok(ReturnCode::IfEntryNotFound, Vec::new()),
            }
        }
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn encode_log_if(l: &fci_db::ifview::LogicalInterface) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(&l.id.to_be_bytes());
    out.extend_from_slice(&l.parent.0.to_be_bytes());
    out.extend_from_slice(&l.egress.bits().to_be_bytes());
    out.extend_from_slice(&l.match_rules.bits().to_be_bytes());
    out.extend_from_slice(&l.flags.bits().to_be_bytes());
    out
}

fn h_log_if(db: &mut Databases, _drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    use fci_db::ifview::PortSet;
    let (action, mut cur) = action_or_return!(body);
    match action {
        Action::Register => {
            let name = field_or_return!(cur.name16());
            let parent_name = field_or_return!(cur.name16());
            match db.ifview.register_logical(name, &parent_name) {
                Ok(id) => ok(ReturnCode::Ok, id.to_be_bytes().to_vec()),
                Err(e) => err_db(e),
            }
        }
        Action::Deregister => {
            let name = field_or_return!(cur.name16());
            match db.ifview.deregister_logical(&name) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Update => {
            let name = field_or_return!(cur.name16());
            let egress_bits = field_or_return!(cur.u32());
            match db.ifview.update_logical_egress(&name, PortSet::from_bits(egress_bits)) {
                Ok(()) => ok(ReturnCode::Ok, Vec::new()),
                Err(e) => err_db(e),
            }
        }
        Action::Query => match db.ifview.iter_logical().next() {
            Some(l) => ok(ReturnCode::Ok, encode_log_if(l)),
            None => ok(ReturnCode::IfEntryNotFound, Vec::new()),
        },
        Action::QueryCont => {
            let after = field_or_return!(cur.name16());
            match db.ifview.iter_logical().find(|l| l.name > after) {
                Some(l) => ok(ReturnCode::Ok, encode_log_if(l)),
                None => ok(ReturnCode::IfEntryNotFound, Vec::new()),
            }
        }
        _ => err_invalid(ReturnCode::UnknownAction),
    }
}

fn h_data_buf_put(_db: &mut Databases, drv: &DriverSurface, body: &CmdBody) -> (Errno, ReturnCode, Vec<u8>) {
    const MAX_BUF: usize = 64;
    if body.payload.len() > MAX_BUF {
        return err_invalid(ReturnCode::WrongCommandParam);
    }
    match drv.classifier.put_data(&body.payload) {
        Ok(()) => ok(ReturnCode::Ok, Vec::new()),
        Err(_) => err_invalid(ReturnCode::InternalFailure),
    }
}

pub fn dispatch_table() -> HashMap<u16, HandlerFn> {
    let mut table: HashMap<u16, HandlerFn> = HashMap::new();
    table.insert(CommandCode::PhyIf.as_u16(), h_phy_if);
    table.insert(CommandCode::LogIf.as_u16(), h_log_if);
    table.insert(CommandCode::IfMac.as_u16(), h_if_mac);
    table.insert(CommandCode::IfLockSession.as_u16(), h_if_session);
    table.insert(CommandCode::IfUnlockSession.as_u16(), h_if_session);
    table.insert(CommandCode::IpRoute.as_u16(), h_ip_route);
    table.insert(CommandCode::Ipv4Reset.as_u16(), h_ip_family_reset);
    table.insert(CommandCode::Ipv6Reset.as_u16(), h_ip_family_reset);
    table.insert(CommandCode::Ipv4Conntrack.as_u16(), h_ipv4_conntrack);
    table.insert(CommandCode::Ipv6Conntrack.as_u16(), h_ipv6_conntrack);
    table.insert(CommandCode::Ipv4SetTimeout.as_u16(), h_ipv4_set_timeout);
    table.insert(CommandCode::L2Bd.as_u16(), h_l2_bd);
    table.insert(CommandCode::L2StaticEnt.as_u16(), h_l2_static_ent);
    table.insert(CommandCode::L2FlushAll.as_u16(), h_l2_flush);
    table.insert(CommandCode::L2FlushLearned.as_u16(), h_l2_flush);
    table.insert(CommandCode::L2FlushStatic.as_u16(), h_l2_flush);
    table.insert(CommandCode::FpTable.as_u16(), h_fp_table);
    table.insert(CommandCode::FpRule.as_u16(), h_fp_rule);
    table.insert(CommandCode::FwFeature.as_u16(), h_fw_feature);
    table.insert(CommandCode::FwFeatureElement.as_u16(), h_fw_feature_element);
    table.insert(CommandCode::Mirror.as_u16(), h_mirror);
    table.insert(CommandCode::QosQueue.as_u16(), h_qos_queue);
    table.insert(CommandCode::QosScheduler.as_u16(), h_qos_scheduler);
    table.insert(CommandCode::QosShaper.as_u16(), h_qos_shaper);
    table.insert(CommandCode::QosPolicer.as_u16(), h_qos_policer);
    table.insert(CommandCode::QosPolicerFlow.as_u16(), h_qos_policer_flow);
    table.insert(CommandCode::QosPolicerWred.as_u16(), h_qos_policer_wred);
    table.insert(CommandCode::QosPolicerShp.as_u16(), h_qos_policer_shp);
    table.insert(CommandCode::Spd.as_u16(), h_spd);
    table.insert(CommandCode::DataBufPut.as_u16(), h_data_buf_put);
    table
}

#[cfg(test)]
mod test {
    use super::*;
    use fci_driver::stub::StubDriver;

    fn surface() -> DriverSurface {
        DriverSurface {
            classifier: Box::new(StubDriver::new()),
            l2_bridge: Box::new(StubDriver::new()),
            routing_table: Box::new(StubDriver::new()),
            tmu: Box::new(StubDriver::new()),
            interfaces: Box::new(StubDriver::new()),
            features: Box::new(StubDriver::new()),
            health_monitor: Box::new(StubDriver::new()),
        }
    }

    fn cmd(code: u16, payload: Vec<u8>) -> CmdBody {
        CmdBody::new(code, 0, payload)
    }

    #[test]
    fn l2_bd_register_then_deregister() {
        let table = dispatch_table();
        let mut db = Databases::new();
        let drv = surface();
        let handler = table[&CommandCode::L2Bd.as_u16()];

        let mut payload = vec![1u8]; // Register
        payload.extend_from_slice(&100u16.to_be_bytes());
        let (errno, rc, _) = handler(&mut db, &drv, &cmd(CommandCode::L2Bd.as_u16(), payload));
        assert_eq!(errno, Errno::Ok);
        assert_eq!(rc, ReturnCode::Ok);

        let mut payload = vec![2u8]; // Deregister
        payload.extend_from_slice(&100u16.to_be_bytes());
        let (_, rc, _) = handler(&mut db, &drv, &cmd(CommandCode::L2Bd.as_u16(), payload));
        assert_eq!(rc, ReturnCode::Ok);
    }

    #[test]
    fn ip_route_query_then_query_cont_terminates() {
        let table = dispatch_table();
        let mut db = Databases::new();
        let drv = surface();
        let handler = table[&CommandCode::IpRoute.as_u16()];

        let mut payload = vec![1u8]; // Register
        payload.extend_from_slice(&[10, 0, 0, 1]);
        payload.extend_from_slice(&[0, 0, 0, 0, 0, 1]);
        payload.extend_from_slice(&0u32.to_be_bytes());
        payload.extend_from_slice(&7u32.to_be_bytes());
        payload.extend_from_slice(&0u32.to_be_bytes());
        payload.push(0);
        handler(&mut db, &drv, &cmd(CommandCode::IpRoute.as_u16(), payload));

        let (_, rc, data) = handler(&mut db, &drv, &cmd(CommandCode::IpRoute.as_u16(), vec![4]));
        assert_eq!(rc, ReturnCode::Ok);
        assert!(!data.is_empty());

        let (_, rc, _) = handler(&mut db, &drv, &cmd(CommandCode::IpRoute.as_u16(), vec![5]));
        assert_eq!(rc, ReturnCode::RouteNotFound);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let table = dispatch_table();
        let mut db = Databases::new();
        let drv = surface();
        let handler = table[&CommandCode::L2Bd.as_u16()];
        let (errno, rc, _) = handler(&mut db, &drv, &cmd(CommandCode::L2Bd.as_u16(), vec![0xff, 0, 0]));
        assert_eq!(errno, Errno::Einval);
        assert_eq!(rc, ReturnCode::UnknownAction);
    }

    fn name16(s: &str) -> [u8; 16] {
        encode_name16(s)
    }

    #[test]
    fn l2_bd_update_sets_independent_actions() {
        let table = dispatch_table();
        let mut db = Databases::new();
        let drv = surface();
        let handler = table[&CommandCode::L2Bd.as_u16()];

        let mut payload = vec![1u8]; // Register
        payload.extend_from_slice(&100u16.to_be_bytes());
        handler(&mut db, &drv, &cmd(CommandCode::L2Bd.as_u16(), payload));

        let mut payload = vec![3u8]; // Update
        payload.extend_from_slice(&100u16.to_be_bytes());
        payload.push(1); // one port
        payload.extend_from_slice(&0u32.to_be_bytes());
        payload.push(0); // no untagged ports
        payload.extend_from_slice(&[0, 2, 0, 3]); // ucast_hit=Forward, ucast_miss=Punt, mcast_hit=Forward, mcast_miss=Discard
        let (_, rc, _) = handler(&mut db, &drv, &cmd(CommandCode::L2Bd.as_u16(), payload));
        assert_eq!(rc, ReturnCode::Ok);
        let domain = db.l2.domain(100).unwrap();
        assert_eq!(domain.ports, vec![PhyIfId(0)]);
        assert_eq!(domain.actions.ucast_miss, fci_db::l2::L2Action::Punt);
        assert_eq!(domain.actions.mcast_miss, fci_db::l2::L2Action::Discard);
    }

    #[test]
    fn mirror_register_requires_egress_then_query_returns_it() {
        let table = dispatch_table();
        let mut db = Databases::new();
        let drv = surface();
        let handler = table[&CommandCode::Mirror.as_u16()];

        let mut payload = vec![1u8]; // Register
        payload.extend_from_slice(&name16("mirror0"));
        payload.extend_from_slice(&3u32.to_be_bytes()); // egress
        let (_, rc, _) = handler(&mut db, &drv, &cmd(CommandCode::Mirror.as_u16(), payload));
        assert_eq!(rc, ReturnCode::Ok);

        let payload = vec![4u8]; // Query
        let (_, rc, data) = handler(&mut db, &drv, &cmd(CommandCode::Mirror.as_u16(), payload));
        assert_eq!(rc, ReturnCode::Ok);
        assert_eq!(&data[16..20], &3u32.to_be_bytes());
    }

    #[test]
    fn phy_if_register_then_update_sets_enabled_flag() {
        let table = dispatch_table();
        let mut db = Databases::new();
        let drv = surface();
        let handler = table[&CommandCode::PhyIf.as_u16()];

        let mut payload = vec![1u8]; // Register
        payload.extend_from_slice(&name16("emac0"));
        payload.extend_from_slice(&0u32.to_be_bytes());
        handler(&mut db, &drv, &cmd(CommandCode::PhyIf.as_u16(), payload));

        let mut payload = vec![3u8]; // Update
        payload.extend_from_slice(&name16("emac0"));
        payload.push(1); // enabled
        payload.push(0); // no mac change
        let (_, rc, _) = handler(&mut db, &drv, &cmd(CommandCode::PhyIf.as_u16(), payload));
        assert_eq!(rc, ReturnCode::Ok);
        assert!(db
            .ifview
            .physical_by_name("emac0")
            .unwrap()
            .flags
            .contains(fci_db::ifview::InterfaceFlags::ENABLED));
    }

    #[test]
    fn fw_feature_value_roundtrips_through_update_and_query() {
        let table = dispatch_table();
        let mut db = Databases::new();
        db.feature.register("l2bridge", "L2 bridging", true, true, 0);
        let drv = surface();
        let handler = table[&CommandCode::FwFeature.as_u16()];

        let mut payload = vec![3u8]; // Update
        payload.extend_from_slice(&name16("l2bridge"));
        payload.push(1);
        let (_, rc, _) = handler(&mut db, &drv, &cmd(CommandCode::FwFeature.as_u16(), payload));
        assert_eq!(rc, ReturnCode::Ok);

        let mut payload = vec![4u8]; // Query
        payload.extend_from_slice(&name16("l2bridge"));
        let (_, rc, data) = handler(&mut db, &drv, &cmd(CommandCode::FwFeature.as_u16(), payload));
        assert_eq!(rc, ReturnCode::Ok);
        assert_eq!(data[3], 1);
    }
}
