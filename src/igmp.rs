//! Internet Group Management Protocol, version 2 (RFC 2236): announcing and
//! leaving multicast groups.
//!
//! Only the two messages a host needs to originate are built here --
//! membership report and leave group -- incoming IGMP traffic is never
//! parsed. These are sent with TTL 64 and no Router Alert option, a known
//! deviation from RFC 2236 kept deliberately rather than corrected.

use crate::checksum;
use crate::IpV4Addr;

use byte_struct::*;

/// An IGMPv2 message: membership report or leave group.
///
/// value [0] type (`0x16` report, `0x17` leave)
///
/// value [1] max response time (unused for these message kinds, always 0)
///
/// value [2:3] checksum over this 8-byte message
///
/// value [4:7] multicast group address
#[derive(ByteStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[byte_struct_be]
pub struct IgmpMessage {
    /// Message type.
    pub kind: IgmpType,
    /// Max response time; always `0` for report/leave.
    pub max_response_time: u8,
    /// Checksum over this message, computed with the field zeroed.
    pub checksum: u16,
    /// The multicast group being joined or left.
    pub group: IpV4Addr,
}

impl IgmpMessage {
    /// Byte length of the message.
    pub const BYTE_LEN: usize = 8;

    /// Build a membership report for `group`, with its checksum filled in.
    pub fn membership_report(group: IpV4Addr) -> Self {
        Self::new(IgmpType::MembershipReportV2, group)
    }

    /// Build a leave-group message for `group`, with its checksum filled in.
    pub fn leave_group(group: IpV4Addr) -> Self {
        Self::new(IgmpType::LeaveGroup, group)
    }

    fn new(kind: IgmpType, group: IpV4Addr) -> Self {
        let mut message = IgmpMessage {
            kind,
            max_response_time: 0,
            checksum: 0,
            group,
        };
        message.checksum = checksum::checksum(&message.to_be_bytes());
        message
    }

    /// Pack into a big-endian (network) byte array.
    pub fn to_be_bytes(&self) -> [u8; Self::BYTE_LEN] {
        let mut bytes = [0_u8; Self::BYTE_LEN];
        self.write_bytes(&mut bytes);
        bytes
    }
}

/// IGMPv2 message type byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum IgmpType {
    /// Version 2 membership report.
    MembershipReportV2 = 0x16,
    /// Leave group.
    LeaveGroup = 0x17,
    /// Catch-all for message kinds this stack never originates or parses.
    Unimplemented,
}

impl ByteStructLen for IgmpType {
    const BYTE_LEN: usize = 1;
}

impl ByteStruct for IgmpType {
    fn read_bytes(bytes: &[u8]) -> Self {
        match bytes[0] {
            x if x == (IgmpType::MembershipReportV2 as u8) => IgmpType::MembershipReportV2,
            x if x == (IgmpType::LeaveGroup as u8) => IgmpType::LeaveGroup,
            _ => IgmpType::Unimplemented,
        }
    }

    fn write_bytes(&self, bytes: &mut [u8]) {
        bytes[0] = *self as u8;
    }
}
