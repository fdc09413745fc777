//! IPv4 CIDR blocks

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 network in CIDR notation, host bits cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    network: u32,
    prefix_len: u8,
}

impl Ipv4Cidr {
    fn mask(prefix_len: u8) -> u32 {
        if prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix_len))
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_len))
    }

    /// Whether `other` lies entirely inside this block
    pub fn contains(&self, other: &Self) -> bool {
        other.prefix_len >= self.prefix_len
            && other.network & Self::mask(self.prefix_len) == self.network
    }

    pub fn contains_addr(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & Self::mask(self.prefix_len) == self.network
    }

    /// Address at `offset` from the network address, if inside the block
    pub fn host(&self, offset: u32) -> Option<Ipv4Addr> {
        if u64::from(offset) >= self.size() {
            return None;
        }
        Some(Ipv4Addr::from(self.network + offset))
    }
}

impl FromStr for Ipv4Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| "missing '/<prefix length>'".to_string())?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| format!("'{addr}' is not an IPv4 address"))?;
        let prefix_len: u8 = len
            .parse()
            .map_err(|_| format!("'{len}' is not a prefix length"))?;
        if prefix_len > 32 {
            return Err(format!("prefix length {prefix_len} exceeds 32"));
        }

        let raw = u32::from(addr);
        let network = raw & Self::mask(prefix_len);
        if network != raw {
            return Err(format!(
                "host bits set (did you mean {}/{prefix_len}?)",
                Ipv4Addr::from(network)
            ));
        }

        Ok(Self {
            network,
            prefix_len,
        })
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len())
    }
}
