//! Address Resolution Protocol: mapping an IPv4 address to the Ethernet MAC
//! address that should receive frames addressed to it.
//!
//! ARP is not a distinct network abstraction layer, but is still required for
//! most networks to function because switches learn a host's MAC address
//! from traffic it sends, not from its IPv4 address. A host that never speaks
//! is invisible until it announces itself.
//!
//! Only announcement (gratuitous request) is implemented here. Incoming ARP
//! requests are parsed so the frame can be accounted for and dropped
//! cleanly, but this crate does not answer them or learn cache entries from
//! them -- see [`crate::engine::Engine::receive_arp_packet`].

use crate::enet::EtherType;
use crate::{IpV4Addr, MacAddr};

use byte_struct::*;
use static_assertions::const_assert;

const_assert!(ArpPacket::BYTE_LEN == 28);

/// An ARP request or reply for IPv4-over-Ethernet.
///
/// Wire layout, all fields big-endian (RFC 826):
///
/// ```text
/// hardware_type    (2)   1 for Ethernet
/// protocol_type    (2)   0x0800 for IPv4
/// hardware_len     (1)   6
/// protocol_len     (1)   4
/// operation        (2)   1 request, 2 reply
/// sender_mac       (6)
/// sender_ip        (4)
/// target_mac       (6)
/// target_ip        (4)
/// ```
///
/// 28 octets total, unpadded -- short-frame padding, if a driver requires it,
/// is the Ethernet layer's concern, not this packet's.
#[derive(ByteStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[byte_struct_be]
pub struct ArpPacket {
    /// Hardware type (1 for Ethernet).
    pub hardware_type: u16,
    /// Protocol type, reusing the Ethernet layer's EtherType so the two
    /// never drift apart.
    pub protocol_type: EtherType,
    /// Hardware address length (6 for a standard MAC).
    pub hardware_len: u8,
    /// Protocol address length (4 for IPv4).
    pub protocol_len: u8,
    /// Request or reply.
    pub operation: ArpOperation,
    /// Address of the sender of this packet.
    pub sender_mac: MacAddr,
    /// IPv4 address of the sender of this packet.
    pub sender_ip: IpV4Addr,
    /// Address of the intended recipient, or broadcast/zero if unknown.
    pub target_mac: MacAddr,
    /// IPv4 address being queried or confirmed.
    pub target_ip: IpV4Addr,
}

impl ArpPacket {
    /// Build a request: "who has `target_ip`? tell `sender_mac`/`sender_ip`".
    /// `target_mac` should be [`MacAddr::BROADCAST`] for a conventional
    /// request, or the known MAC for a directed probe.
    pub fn request(
        sender_mac: MacAddr,
        sender_ip: IpV4Addr,
        target_mac: MacAddr,
        target_ip: IpV4Addr,
    ) -> Self {
        ArpPacket::new(sender_mac, sender_ip, target_mac, target_ip, ArpOperation::Request)
    }

    /// Build a reply: "`sender_ip` is at `sender_mac`", addressed to
    /// `target_mac`/`target_ip`.
    pub fn reply(
        sender_mac: MacAddr,
        sender_ip: IpV4Addr,
        target_mac: MacAddr,
        target_ip: IpV4Addr,
    ) -> Self {
        ArpPacket::new(sender_mac, sender_ip, target_mac, target_ip, ArpOperation::Reply)
    }

    fn new(
        sender_mac: MacAddr,
        sender_ip: IpV4Addr,
        target_mac: MacAddr,
        target_ip: IpV4Addr,
        operation: ArpOperation,
    ) -> Self {
        ArpPacket {
            hardware_type: 1,
            protocol_type: EtherType::IpV4,
            hardware_len: 6,
            protocol_len: 4,
            operation,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        }
    }

    /// Convert to a big-endian byte array.
    pub fn to_be_bytes(&self) -> [u8; Self::BYTE_LEN] {
        let mut bytes = [0_u8; Self::BYTE_LEN];
        self.write_bytes(&mut bytes);
        bytes
    }

    /// Wire size of an ARP packet for IPv4-over-Ethernet, 28 octets.
    pub const BYTE_LEN: usize = 28;
}

/// Whether an ARP packet is asking a question or answering one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum ArpOperation {
    /// "Who has this IP? Tell me."
    Request = 1,
    /// "This IP is at this MAC."
    Reply = 2,
    /// Anything else -- the packet is still structurally valid, but this
    /// crate only originates and recognizes request/reply.
    Unimplemented,
}

impl From<u16> for ArpOperation {
    fn from(value: u16) -> Self {
        match value {
            x if x == ArpOperation::Request as u16 => ArpOperation::Request,
            x if x == ArpOperation::Reply as u16 => ArpOperation::Reply,
            _ => ArpOperation::Unimplemented,
        }
    }
}

impl ByteStructLen for ArpOperation {
    const BYTE_LEN: usize = 2;
}

impl ByteStruct for ArpOperation {
    fn read_bytes(bytes: &[u8]) -> Self {
        let mut bytes_read = [0_u8; 2];
        bytes_read.copy_from_slice(&bytes[0..=1]);
        ArpOperation::from(u16::from_be_bytes(bytes_read))
    }

    fn write_bytes(&self, bytes: &mut [u8]) {
        let bytes_to_write = self.to_be_bytes();
        bytes[0] = bytes_to_write[0];
        bytes[1] = bytes_to_write[1];
    }
}

impl ArpOperation {
    /// Convert to a big-endian byte array.
    pub fn to_be_bytes(&self) -> [u8; Self::BYTE_LEN] {
        (*self as u16).to_be_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_wire_bytes() {
        let msg = ArpPacket::request(
            MacAddr::new([7_u8; 6]),
            IpV4Addr::new([8_u8; 4]),
            MacAddr::BROADCAST,
            IpV4Addr::new([10_u8; 4]),
        );
        let bytes: [u8; ArpPacket::BYTE_LEN] = msg.to_be_bytes();
        assert_eq!(bytes.len(), 28);
        let parsed = ArpPacket::read_bytes(&bytes);
        assert_eq!(msg, parsed);
        assert_eq!(parsed.operation, ArpOperation::Request);
    }

    #[test]
    fn reply_round_trips_through_wire_bytes() {
        let msg = ArpPacket::reply(
            MacAddr::new([1, 2, 3, 4, 5, 6]),
            IpV4Addr::new([10, 0, 0, 1]),
            MacAddr::new([9, 8, 7, 6, 5, 4]),
            IpV4Addr::new([10, 0, 0, 2]),
        );
        let bytes = msg.to_be_bytes();
        let parsed = ArpPacket::read_bytes(&bytes);
        assert_eq!(msg, parsed);
        assert_eq!(parsed.operation, ArpOperation::Reply);
        assert_eq!(parsed.protocol_type, EtherType::IpV4);
    }

    #[test]
    fn unrecognized_operation_value_decodes_to_unimplemented() {
        let mut bytes = ArpPacket::request(
            MacAddr::ANY,
            IpV4Addr::ANY,
            MacAddr::BROADCAST,
            IpV4Addr::ANY,
        )
        .to_be_bytes();
        // operation field occupies bytes 6..8
        bytes[6] = 0x00;
        bytes[7] = 0x63;
        let parsed = ArpPacket::read_bytes(&bytes);
        assert_eq!(parsed.operation, ArpOperation::Unimplemented);
    }
}
