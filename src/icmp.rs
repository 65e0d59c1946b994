//! Internet Control Message Protocol: header shape only.
//!
//! The stack parses far enough to hand an echo request's payload to
//! [`crate::external::ExternalInterface::receive_icmp`], whose default
//! implementation answers `Status::NotImplemented`. Generating ICMP replies
//! or errors is out of scope.

use crate::checksum;
use byte_struct::*;

/// The 8-byte fixed header common to every ICMP message type.
///
/// value [0] type
///
/// value [1] code
///
/// value [2:3] checksum over this header and the payload
///
/// value [4:7] rest-of-header, whose meaning depends on `kind`/`code`
/// (echo identifier/sequence number for echo request/reply)
#[derive(ByteStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[byte_struct_be]
pub struct IcmpHeader {
    /// Message type; `8` for echo request, `0` for echo reply.
    pub kind: u8,
    /// Type-specific code; `0` for echo request/reply.
    pub code: u8,
    /// Checksum over the header and payload, computed with this field zeroed.
    pub checksum: u16,
    /// Echo identifier (echo request/reply only).
    pub identifier: u16,
    /// Echo sequence number (echo request/reply only).
    pub sequence: u16,
}

impl IcmpHeader {
    /// Byte length of the header.
    pub const BYTE_LEN: usize = 8;

    /// Echo request message type.
    pub const ECHO_REQUEST: u8 = 8;
    /// Echo reply message type.
    pub const ECHO_REPLY: u8 = 0;

    /// Pack into a big-endian (network) byte array.
    pub fn to_be_bytes(&self) -> [u8; Self::BYTE_LEN] {
        let mut bytes = [0_u8; Self::BYTE_LEN];
        self.write_bytes(&mut bytes);
        bytes
    }

    /// Compute this header's checksum over itself (with `checksum` zeroed)
    /// and `payload`.
    pub fn compute_checksum(&self, payload: &[u8]) -> u16 {
        let mut zeroed = *self;
        zeroed.checksum = 0;
        checksum::checksum_spans(&[&zeroed.to_be_bytes(), payload])
    }

    /// `true` if `checksum` verifies against this header and `payload`.
    pub fn checksum_is_valid(&self, payload: &[u8]) -> bool {
        checksum::checksum_spans(&[&self.to_be_bytes(), payload]) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_request_checksum_round_trips() {
        let mut header = IcmpHeader {
            kind: IcmpHeader::ECHO_REQUEST,
            code: 0,
            checksum: 0,
            identifier: 1,
            sequence: 1,
        };
        let payload = [0xAAu8; 4];
        header.checksum = header.compute_checksum(&payload);
        assert!(header.checksum_is_valid(&payload));
    }
}
