//! The flat status/error type shared by every layer of the stack.
//!
//! There is exactly one error type in this crate. Every fallible operation
//! returns a [`Status`]; nothing here allocates, unwinds, or boxes a cause.

use ufmt::derive::uDebug;

/// The result of any operation in the stack.
///
/// `Ok` is the only success variant; everything else is a specific,
/// comparable reason for failure so callers (and the `report` callback,
/// see [`crate::external::ExternalInterface::report`]) can discriminate
/// without string matching.
#[derive(Clone, Copy, Debug, uDebug, PartialEq, Eq)]
pub enum Status {
    /// The operation completed successfully.
    Ok,
    /// The operation failed for an unspecified reason.
    Failure,
    /// The operation is not implemented in this build.
    NotImplemented,
    /// The requested feature is not supported in this configuration.
    NotSupported,
    /// An argument (other than frame/context plumbing) was invalid.
    InvalidArgument,
    /// The frame allocator returned no frame.
    OutOfMemory,
    /// The ARP cache has no free slots for the requested insertion.
    ArpTableFull,
    /// The MAC filter table has no free slots for the requested insertion.
    EthernetFilterTableFull,
    /// The IPv4 filter table has no free slots for the requested insertion.
    IPv4FilterTableFull,
    /// The interface's MAC address is not a valid unicast address.
    InvalidMacAddress,
    /// The interface's IPv4 address is not usable (multicast or localhost).
    InvalidIpAddress,
    /// The interface's address/netmask/gateway triple is not on one subnet.
    InvalidNetwork,
    /// The destination MAC was not accepted by the MAC filter or acceptance rules.
    MacRejected,
    /// The ethertype was not one the stack understands, or a VLAN ID mismatch.
    EthernetTypeRejected,
    /// VLAN filtering is enabled and the tag's VLAN ID did not match.
    StaticVlanFiltered,
    /// The IPv4 header checksum did not verify.
    IPv4ChecksumRejected,
    /// The IPv4 header failed a structural invariant (version/IHL/length/fragmentation).
    IPv4HeaderRejected,
    /// The IPv4 destination address policy rejected the packet.
    IPv4DestinationRejected,
    /// The IPv4 source address policy rejected the packet.
    IPv4SourceRejected,
    /// The IPv4 source address was not present in the IPv4 filter.
    IPv4SourceFiltered,
    /// The UDP checksum did not verify.
    UDPChecksumRejected,
    /// The ICMP checksum did not verify.
    ICMPChecksumRejected,
    /// The IP protocol number was not one this stack demultiplexes.
    UnsupportedProtocol,
    /// The payload given to a transmit call was empty or otherwise malformed.
    InvalidSpan,
    /// The payload given to the IPv4 transmit path exceeds the MTU.
    IPv4PacketTooLarge,
}

impl Status {
    /// `true` iff the operation succeeded.
    pub fn is_success(self) -> bool {
        matches!(self, Status::Ok)
    }

    /// `true` iff the operation failed. The complement of [`Status::is_success`].
    pub fn is_failure(self) -> bool {
        !self.is_success()
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_is_success_everything_else_is_failure() {
        assert!(Status::Ok.is_success());
        assert!(!Status::Ok.is_failure());
        assert!(Status::MacRejected.is_failure());
        assert!(!Status::MacRejected.is_success());
    }
}
