//! CIDR parsing and sweep address enumeration.

use std::net::Ipv4Addr;

use ipnet::{IpNet, Ipv4Net};

use crate::error::{Result, ScanError};

/// Parse a target range such as `192.168.1.0/24`.
///
/// Host bits are allowed and masked off (`192.168.1.7/24` is the same
/// network as `192.168.1.0/24`). IPv6 networks are rejected.
pub fn parse_cidr(range: &str) -> Result<Ipv4Net> {
    match range.parse::<IpNet>() {
        Ok(IpNet::V4(net)) => Ok(net.trunc()),
        Ok(IpNet::V6(_)) => Err(invalid(range, "IPv6 ranges are not supported")),
        Err(e) => Err(invalid(range, &e.to_string())),
    }
}

fn invalid(range: &str, reason: &str) -> ScanError {
    ScanError::InvalidRange {
        range: range.to_string(),
        reason: reason.to_string(),
    }
}

/// Addresses probed for `net`: everything after the network address, up to
/// and including the broadcast address.
pub fn sweep_addresses(net: &Ipv4Net) -> SweepAddresses {
    SweepAddresses {
        next: u64::from(u32::from(net.network())) + 1,
        last: u64::from(u32::from(net.broadcast())),
    }
}

/// Lazy ascending iterator over a block of IPv4 addresses.
#[derive(Debug, Clone)]
pub struct SweepAddresses {
    next: u64,
    last: u64,
}

impl Iterator for SweepAddresses {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        if self.next > self.last {
            return None;
        }
        // `next <= last <= u32::MAX` here, so the narrowing is lossless.
        let addr = Ipv4Addr::from(self.next as u32);
        self.next += 1;
        Some(addr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.last + 1).saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SweepAddresses {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_cidr() {
        let net = parse_cidr("192.168.1.0/24").unwrap();
        assert_eq!(net.network(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(net.prefix_len(), 24);
    }

    #[test]
    fn test_parse_masks_host_bits() {
        let net = parse_cidr("10.1.2.77/16").unwrap();
        assert_eq!(net.to_string(), "10.1.0.0/16");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let malformed = [
            "not-a-cidr",
            "",
            "192.168.1.0",
            "192.168.1.0/33",
            "300.1.1.1/24",
            "10.0.0.0/",
        ];
        for bad in malformed {
            let err = parse_cidr(bad).unwrap_err();
            assert!(
                matches!(err, ScanError::InvalidRange { ref range, .. } if range == bad),
                "expected InvalidRange for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_ipv6() {
        let err = parse_cidr("fe80::/64").unwrap_err();
        assert!(matches!(err, ScanError::InvalidRange { .. }));
    }

    #[test]
    fn test_sweep_slash_24_keeps_broadcast() {
        let net = parse_cidr("192.168.1.0/24").unwrap();
        let addrs: Vec<_> = sweep_addresses(&net).collect();

        assert_eq!(addrs.len(), 255);
        assert_eq!(addrs.first(), Some(&Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(addrs.last(), Some(&Ipv4Addr::new(192, 168, 1, 255)));
        assert!(!addrs.contains(&Ipv4Addr::new(192, 168, 1, 0)));
    }

    #[test]
    fn test_sweep_small_blocks() {
        let slash30: Vec<_> = sweep_addresses(&parse_cidr("10.0.0.4/30").unwrap()).collect();
        assert_eq!(
            slash30,
            vec![
                Ipv4Addr::new(10, 0, 0, 5),
                Ipv4Addr::new(10, 0, 0, 6),
                Ipv4Addr::new(10, 0, 0, 7),
            ]
        );

        let slash31 = sweep_addresses(&parse_cidr("10.0.0.8/31").unwrap());
        assert_eq!(slash31.len(), 1);

        let slash32 = sweep_addresses(&parse_cidr("10.0.0.9/32").unwrap());
        assert_eq!(slash32.count(), 0);
    }

    #[test]
    fn test_sweep_top_of_address_space() {
        let net = parse_cidr("255.255.255.252/30").unwrap();
        let addrs: Vec<_> = sweep_addresses(&net).collect();
        assert_eq!(addrs.last(), Some(&Ipv4Addr::BROADCAST));
        assert_eq!(addrs.len(), 3);
    }
}
