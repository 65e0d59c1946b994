//! Per-datagram metadata handed to and returned from the UDP callbacks, and
//! the diagnostic level/layer tags used by [`crate::external::ExternalInterface::report`].

use crate::IpV4Addr;

/// A monotonic timestamp in host-defined units (typically microseconds or
/// milliseconds since boot). The stack never interprets the units; it only
/// compares and stores values obtained from
/// [`crate::external::ExternalInterface::get_monotonic_timestamp`].
pub type Timestamp = i64;

/// Source and destination address/port pair for one UDP datagram, plus the
/// timestamp at which it was sent or received.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Metadata {
    /// Peer (for receive: sender; for transmit: intended recipient) address.
    pub peer_address: IpV4Addr,
    /// Peer UDP port.
    pub peer_port: u16,
    /// Local UDP port.
    pub local_port: u16,
    /// The IPv4 destination address the datagram actually arrived on (for
    /// receive) or will be sent to (for transmit): our own address, a
    /// broadcast address, or the multicast group, distinguishing which
    /// group a host joined to more than one is currently being delivered.
    pub destination_address: IpV4Addr,
    /// Timestamp captured when the datagram was handed to or from the driver.
    pub timestamp: Timestamp,
}

/// Severity of a diagnostic event passed to
/// [`crate::external::ExternalInterface::report`]/`print`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrintLevel {
    /// Routine, high-volume trace information.
    Trace,
    /// Notable but non-error conditions.
    Info,
    /// A rejected or dropped frame/packet/datagram.
    Warning,
    /// A condition that prevents the engine from continuing to operate correctly.
    Error,
}

/// Which layer produced a diagnostic event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrintLayer {
    /// The Ethernet/link layer.
    Ethernet,
    /// The IPv4 layer.
    IPv4,
    /// The UDP layer.
    Udp,
    /// The ARP layer.
    Arp,
    /// The IGMP layer.
    Igmp,
    /// The engine's own lifecycle/driving-loop logic.
    Engine,
}
