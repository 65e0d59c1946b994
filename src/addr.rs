//! Address classification and derivation helpers shared by the Ethernet and
//! IPv4 layers.
//!
//! Every predicate here is a pure function of a [`MacAddr`]/[`IpV4Addr`] (and,
//! where relevant, our own interface address) with no side effects.

use crate::{IpV4Addr, MacAddr};

/// `true` if `addr` has the multicast bit (the low bit of the first octet) set.
pub fn is_multicast_ethernet_address(addr: &MacAddr) -> bool {
    addr.0[0] & 0x01 != 0
}

/// `true` if `addr` is a unicast address: not multicast and not the broadcast address.
pub fn is_unicast_ethernet_address(addr: &MacAddr) -> bool {
    !is_multicast_ethernet_address(addr) && !is_broadcast_ethernet_address(addr)
}

/// `true` if `addr` has the locally-administered bit (the second-lowest bit
/// of the first octet) set.
pub fn is_locally_administered_ethernet_address(addr: &MacAddr) -> bool {
    addr.0[0] & 0x02 != 0
}

/// `true` if `addr` is the all-ones local broadcast address.
pub fn is_broadcast_ethernet_address(addr: &MacAddr) -> bool {
    addr.0 == [0xFF; 6]
}

/// `true` if `a` and `b` are the same 6-byte address.
pub fn is_same_ethernet_address(a: &MacAddr, b: &MacAddr) -> bool {
    a.0 == b.0
}

/// `true` if `addr` is our own interface address.
pub fn is_our_ethernet_address(addr: &MacAddr, ours: &MacAddr) -> bool {
    is_same_ethernet_address(addr, ours)
}

/// Derive the Ethernet multicast address for an IPv4 multicast group per
/// RFC 1112: `01:00:5E` followed by the low 23 bits of the group address.
pub fn convert_multicast(group: &IpV4Addr) -> MacAddr {
    MacAddr::from([
        0x01,
        0x00,
        0x5E,
        group.0[1] & 0x7F,
        group.0[2],
        group.0[3],
    ])
}

/// `true` if `addr` falls in 127.0.0.0/8.
pub fn is_localhost_ipv4_address(addr: &IpV4Addr) -> bool {
    addr.0[0] == 127
}

/// `true` if `addr` is a class D (multicast) address: 224.0.0.0/4.
pub fn is_multicast_ipv4_address(addr: &IpV4Addr) -> bool {
    addr.0[0] >= 224 && addr.0[0] <= 239
}

/// `true` if `addr` is the limited broadcast address 255.255.255.255.
pub fn is_limited_broadcast_ipv4_address(addr: &IpV4Addr) -> bool {
    addr.0 == [255, 255, 255, 255]
}

/// `true` if `addr` falls in one of the RFC 1918 private ranges, the RFC
/// 3927 link-local range, or one of the RFC 5737 documentation (TEST-NET)
/// ranges.
pub fn is_private_ipv4_address(addr: &IpV4Addr) -> bool {
    let o = addr.0;
    o[0] == 10
        || (o[0] == 172 && (16..=31).contains(&o[1]))
        || (o[0] == 192 && o[1] == 168)
        || (o[0] == 169 && o[1] == 254)
        || (o[0] == 192 && o[1] == 0 && o[2] == 2)
        || (o[0] == 198 && o[1] == 51 && o[2] == 100)
        || (o[0] == 203 && o[1] == 0 && o[2] == 113)
}

/// `true` if `addr`'s first octet is 240 or above: the reserved
/// "future use" range that a conformant host never emits or accepts as a
/// unicast source/destination.
pub fn is_reserved_ipv4_address(addr: &IpV4Addr) -> bool {
    addr.0[0] >= 240
}

/// `true` if `a` and `b` are the same 4-byte address.
pub fn is_same_ipv4_address(a: &IpV4Addr, b: &IpV4Addr) -> bool {
    a.0 == b.0
}

/// `true` if `addr` is our own interface address.
pub fn is_our_ipv4_address(addr: &IpV4Addr, ours: &IpV4Addr) -> bool {
    is_same_ipv4_address(addr, ours)
}

/// `true` if `addr` and `ours` share the same network under `netmask`.
pub fn is_in_network(addr: &IpV4Addr, ours: &IpV4Addr, netmask: &IpV4Addr) -> bool {
    addr.0
        .iter()
        .zip(ours.0.iter())
        .zip(netmask.0.iter())
        .all(|((a, o), m)| a & m == o & m)
}
