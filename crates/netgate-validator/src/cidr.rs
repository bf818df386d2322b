//! Address and prefix parsing

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Parsed `address/prefix`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    /// Address part
    pub addr: IpAddr,
    /// Prefix length
    pub prefix: u8,
}

impl Cidr {
    /// Parse an IPv4 (prefix <= 32) or IPv6 (prefix <= 128) CIDR
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (addr, prefix) = text.trim().split_once('/')?;
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let prefix: u8 = prefix.parse().ok()?;
        let addr: IpAddr = addr.parse().ok()?;
        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        (prefix <= max).then_some(Self { addr, prefix })
    }
}

/// Plain address or CIDR
#[must_use]
pub fn is_address_or_cidr(text: &str) -> bool {
    text.parse::<IpAddr>().is_ok() || Cidr::parse(text).is_some()
}

/// Plain IPv4 address
#[must_use]
pub fn is_ipv4(text: &str) -> bool {
    text.parse::<Ipv4Addr>().is_ok()
}

/// Plain IPv6 address
#[must_use]
pub fn is_ipv6(text: &str) -> bool {
    text.parse::<Ipv6Addr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_prefixes() {
        assert_eq!(Cidr::parse("192.168.1.10/24").map(|c| c.prefix), Some(24));
        assert!(Cidr::parse("10.0.0.1/32").is_some());
        assert!(Cidr::parse("2001:db8::1/64").is_some());
        assert!(Cidr::parse("::/0").is_some());
        assert!(Cidr::parse("fe80::1/128").is_some());
    }

    #[test]
    fn rejects_bad_prefixes() {
        assert!(Cidr::parse("192.168.1.10/33").is_none());
        assert!(Cidr::parse("2001:db8::1/129").is_none());
        assert!(Cidr::parse("192.168.1.10").is_none());
        assert!(Cidr::parse("192.168.1.300/24").is_none());
        assert!(Cidr::parse("10.0.0.1/+8").is_none());
        assert!(Cidr::parse("10.0.0.1/").is_none());
    }

    #[test]
    fn address_or_cidr() {
        assert!(is_address_or_cidr("10.0.0.1"));
        assert!(is_address_or_cidr("10.0.0.0/8"));
        assert!(!is_address_or_cidr("eth0"));
    }
}
