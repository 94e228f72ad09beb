//! IPv4 network arithmetic for the temporary address fallback.

use std::net::Ipv4Addr;

/// Maximum length for an IPv4 subnet mask (32 bits).
const MAX_LENGTH: u8 = 32;

/// Subnet mask for a prefix length, lengths past 32 are clamped.
fn cidr_mask(len: u8) -> u32 {
    let right_len = MAX_LENGTH - len.min(MAX_LENGTH);
    let all_bits = u32::MAX as u64;
    ((all_bits >> right_len) << right_len) as u32
}

/// An address and the prefix length of its network.
#[derive(Eq, PartialEq, Debug, Copy, Clone, Hash)]
pub struct Ipv4 {
    pub addr: Ipv4Addr,
    pub mask: u8,
}

impl Ipv4 {
    /// Lowest (network) address of the subnet.
    pub fn lo(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) & cidr_mask(self.mask))
    }

    /// Highest (broadcast) address of the subnet.
    pub fn hi(&self) -> Ipv4Addr {
        let mask = cidr_mask(self.mask);
        Ipv4Addr::from((u32::from(self.addr) & mask) | !mask)
    }

    /// The `n`-th address counted from the network address, if it is still
    /// inside the subnet.
    pub fn nth_host(&self, n: u32) -> Option<Ipv4Addr> {
        let ip = Ipv4Addr::from(u32::from(self.lo()).checked_add(n)?);
        (ip <= self.hi()).then_some(ip)
    }
}
