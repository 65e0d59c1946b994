//! Link layer: Ethernet II framing, with optional 802.1Q VLAN tagging.
//!
//! Diagram at <https://en.wikipedia.org/wiki/Ethernet_frame#Ethernet_II>.
//!
//! A frame is parsed in two steps rather than as one fixed-size
//! [`ByteStruct`]: [`EthernetHeader`] always covers the first 14 bytes
//! (destination, source, ethertype-or-TPID); if `ethertype` reads back as
//! [`EtherType::Vlan`], the following 4 bytes are a [`VlanTag`] and the real
//! ethertype follows that, rather than treating the header as one fixed
//! 18- or 14-byte layout.

use crate::MacAddr;

use byte_struct::*;

/// The fixed leading portion of every Ethernet II frame.
///
/// value [0:5] destination macaddr ([`MacAddr::BROADCAST`] for broadcast, or
/// a multicast-derived address -- see [`crate::addr::convert_multicast`])
///
/// value [6:11] source macaddr
///
/// value [12:13] ethertype, or `0x8100` if a VLAN tag follows
#[derive(ByteStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[byte_struct_be]
pub struct EthernetHeader {
    /// Destination address.
    pub dst_macaddr: MacAddr,
    /// Source address.
    pub src_macaddr: MacAddr,
    /// Ethertype, or the VLAN TPID `0x8100` if a [`VlanTag`] follows.
    pub ethertype: EtherType,
}

bitfields!(
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    TagControlInfo: u16 {
        pub priority: 3,
        pub drop_eligible: 1,
        pub vlan_id: 12
    }
);

/// An 802.1Q VLAN tag, present only when [`EthernetHeader::ethertype`] read
/// back as [`EtherType::Vlan`].
#[derive(ByteStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[byte_struct_be]
pub struct VlanTag {
    /// Priority / drop-eligibility / VLAN ID.
    pub tci: TagControlInfo,
    /// The real ethertype that follows this tag.
    pub ethertype: EtherType,
}

/// EtherType tag values (incomplete list -- there are many more not
/// implemented here). See <https://en.wikipedia.org/wiki/EtherType>.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum EtherType {
    /// IPv4
    IpV4 = 0x0800,
    /// ARP
    Arp = 0x0806,
    /// 802.1Q VLAN tag -- when read as the top-level ethertype, the real
    /// ethertype follows a [`VlanTag`].
    Vlan = 0x8100,
    /// IPv6 (not handled by this stack; recognized so it can be rejected
    /// cleanly rather than falling into `Unimplemented`).
    IpV6 = 0x86DD,
    /// Catch-all for uncommon types not handled here.
    Unimplemented,
}

impl From<u16> for EtherType {
    fn from(value: u16) -> Self {
        match value {
            x if x == EtherType::Arp as u16 => EtherType::Arp,
            x if x == EtherType::IpV4 as u16 => EtherType::IpV4,
            x if x == EtherType::IpV6 as u16 => EtherType::IpV6,
            x if x == EtherType::Vlan as u16 => EtherType::Vlan,
            _ => EtherType::Unimplemented,
        }
    }
}

impl ByteStructLen for EtherType {
    const BYTE_LEN: usize = 2;
}

impl ByteStruct for EtherType {
    fn read_bytes(bytes: &[u8]) -> Self {
        let mut bytes_read = [0_u8; 2];
        bytes_read.copy_from_slice(&bytes[0..2]);
        EtherType::from(u16::from_be_bytes(bytes_read))
    }

    fn write_bytes(&self, bytes: &mut [u8]) {
        let bytes_to_write = (*self as u16).to_be_bytes();
        bytes[0] = bytes_to_write[0];
        bytes[1] = bytes_to_write[1];
    }
}
