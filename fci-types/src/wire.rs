//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Big-endian scalar/address helpers for FCI command payloads. Every
// multi-byte field inside a payload is wire-encoded big-endian; these
// extension traits keep the big-endian conversion at the parse/emit
// boundary, the same way `holo-utils::bytes` keeps it at TLV boundaries.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut, Bytes, BytesMut, TryGetError};

use crate::mac_addr::MacAddr;

pub trait BytesExt {
    fn try_get_ipv4(&mut self) -> Result<Ipv4Addr, TryGetError>;
    fn try_get_ipv6(&mut self) -> Result<Ipv6Addr, TryGetError>;
    fn try_get_mac(&mut self) -> Result<MacAddr, TryGetError>;
}

pub trait BytesMutExt {
    fn put_ip(&mut self, addr: &IpAddr);
    fn put_ipv4(&mut self, addr: &Ipv4Addr);
    fn put_ipv6(&mut self, addr: &Ipv6Addr);
    fn put_mac(&mut self, addr: &MacAddr);
}

impl BytesExt for Bytes {
    fn try_get_ipv4(&mut self) -> Result<Ipv4Addr, TryGetError> {
        let bytes = self.try_get_u32()?;
        Ok(Ipv4Addr::from(bytes))
    }

    fn try_get_ipv6(&mut self) -> Result<Ipv6Addr, TryGetError> {
        let bytes = self.try_get_u128()?;
        Ok(Ipv6Addr::from(bytes))
    }

    fn try_get_mac(&mut self) -> Result<MacAddr, TryGetError> {
        let mut bytes: [u8; MacAddr::LENGTH] = [0; MacAddr::LENGTH];
        self.try_copy_to_slice(&mut bytes)?;
        Ok(MacAddr::from(bytes))
    }
}

impl BytesMutExt for BytesMut {
    fn put_ip(&mut self, addr: &IpAddr) {
        match addr {
            IpAddr::V4(addr) => self.put_slice(&addr.octets()),
            IpAddr::V6(addr) => self.put_slice(&addr.octets()),
        }
    }

    fn put_ipv4(&mut self, addr: &Ipv4Addr) {
        self.put_u32((*addr).into())
    }

    fn put_ipv6(&mut self, addr: &Ipv6Addr) {
        self.put_slice(&addr.octets())
    }

    fn put_mac(&mut self, addr: &MacAddr) {
        self.put_slice(&addr.as_bytes())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mac_round_trip() {
        let mut buf = BytesMut::new();
        let mac = MacAddr::from([1, 2, 3, 4, 5, 6]);
        buf.put_mac(&mac);
        let mut bytes = buf.freeze();
        assert_eq!(bytes.try_get_mac().unwrap(), mac);
    }

    #[test]
    fn ipv4_round_trip() {
        let mut buf = BytesMut::new();
        let addr: Ipv4Addr = "10.0.0.1".parse().unwrap();
        buf.put_ipv4(&addr);
        let mut bytes = buf.freeze();
        assert_eq!(bytes.try_get_ipv4().unwrap(), addr);
    }

    #[test]
    fn short_buffer_is_an_error() {
        let mut bytes = Bytes::from_static(&[0, 1]);
        assert!(bytes.try_get_ipv4().is_err());
    }
}
