//! The engine: the facade that ties addressing, filtering, framing, and the
//! [`ExternalInterface`] driver callbacks into one driving loop.
//!
//! This is an owned, instantiable struct rather than a process-wide global
//! -- a host may run more than one `Engine`, one per interface.
//!
//! [`Engine<E>`] is split into a [`Core`] (every field except the driver)
//! and the driver `E` itself. The split exists so that `receive_udp`/
//! `receive_icmp` can be handed `&mut Core` alongside their own `&mut self`:
//! two genuinely disjoint borrows, so a driver can reenter `Core` to
//! transmit a reply from inside the callback without aliasing the
//! reference it was called through.

use byte_struct::{ByteStruct, ByteStructLen};

use crate::addr;
use crate::arp::ArpPacket;
use crate::counters::Statistics;
use crate::enet::{EtherType, EthernetHeader, TagControlInfo, VlanTag};
use crate::error::Status;
use crate::external::ExternalInterface;
use crate::features::{self, Features};
use crate::filter::{ArpCache, FilterTable};
use crate::icmp::IcmpHeader;
use crate::igmp::IgmpMessage;
use crate::ip::{DscpEcn, Fragmentation, IpV4Header, Protocol, VersionAndHeaderLength};
use crate::metadata::{Metadata, PrintLayer, PrintLevel};
use crate::udp::{self, UdpHeader};
use crate::{IpV4Addr, MacAddr};

/// Largest frame this engine will build or accept: a 14-byte Ethernet
/// header, an optional 4-byte VLAN tag, and an MTU-sized IPv4 payload.
pub const FRAME_CAPACITY: usize = EthernetHeader::BYTE_LEN + VlanTag::BYTE_LEN + features::MTU;

/// The largest UDP payload that fits in a single frame alongside the IPv4
/// and UDP headers.
pub const MAX_UDP_CHUNK: usize = features::MTU - IpV4Header::BYTE_LEN - UdpHeader::BYTE_LEN;

/// This host's addressing: its own Ethernet and IPv4 addresses plus the
/// netmask and default gateway used to decide whether a destination is
/// on-link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interface {
    /// Our Ethernet address.
    pub mac: MacAddr,
    /// Our IPv4 address.
    pub ip: IpV4Addr,
    /// Our subnet mask.
    pub netmask: IpV4Addr,
    /// Our default gateway, consulted when a destination is not on-link.
    pub gateway: IpV4Addr,
}

impl Interface {
    fn validate(&self) -> Status {
        if !addr::is_unicast_ethernet_address(&self.mac) {
            return Status::InvalidMacAddress;
        }
        if addr::is_multicast_ipv4_address(&self.ip) || addr::is_localhost_ipv4_address(&self.ip) {
            return Status::InvalidIpAddress;
        }
        if !addr::is_in_network(&self.gateway, &self.ip, &self.netmask) {
            return Status::InvalidNetwork;
        }
        Status::Ok
    }

    fn on_link(&self, dst: &IpV4Addr) -> bool {
        addr::is_in_network(dst, &self.ip, &self.netmask)
    }
}

/// Everything about an `Engine` except the driver: addressing, runtime
/// feature flags, filter/ARP tables, statistics, and the reusable frame
/// buffer.
///
/// Handed to [`ExternalInterface::receive_udp`]/`receive_icmp` as a
/// reentry point: its transmit methods are generic over `E` and take the
/// driver as an explicit argument, so a callback already holding `&mut
/// Self: E` can pass itself back in alongside the borrowed `Core` without
/// the two references ever aliasing.
pub struct Core {
    interface: Interface,
    features: Features,
    mac_filter: FilterTable<MacAddr, { features::MAC_FILTER_TABLE_SIZE }>,
    ip_filter: FilterTable<IpV4Addr, { features::IP_FILTER_TABLE_SIZE }>,
    arp_cache: ArpCache<{ features::ARP_TABLE_SIZE }>,
    statistics: Statistics,
    identification: u16,
}

impl Core {
    fn new(interface: Interface) -> Self {
        Core {
            interface,
            features: Features::default(),
            mac_filter: FilterTable::default(),
            ip_filter: FilterTable::default(),
            arp_cache: ArpCache::default(),
            statistics: Statistics::default(),
            identification: 0,
        }
    }

    /// A snapshot of the accumulated traffic statistics.
    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// The currently active capability flags.
    pub fn features(&self) -> Features {
        self.features
    }

    /// Replace the MAC filter table contents. Implicitly enables MAC
    /// filtering on success.
    pub fn populate_ethernet_filter<E: ExternalInterface>(&mut self, external: &mut E, addrs: &[MacAddr]) -> Status {
        let now = external.get_monotonic_timestamp();
        let status = self.mac_filter.populate(
            addrs,
            now,
            features::EXPIRATION_TIME,
            Status::EthernetFilterTableFull,
        );
        if status.is_success() {
            self.features.allow_mac_filtering = true;
        }
        status
    }

    /// Replace the IPv4 filter table contents. Implicitly enables IPv4
    /// source filtering on success.
    pub fn populate_ipv4_filter<E: ExternalInterface>(&mut self, external: &mut E, addrs: &[IpV4Addr]) -> Status {
        let now = external.get_monotonic_timestamp();
        let status = self.ip_filter.populate(
            addrs,
            now,
            features::EXPIRATION_TIME,
            Status::IPv4FilterTableFull,
        );
        if status.is_success() {
            self.features.allow_ip_filtering = true;
        }
        status
    }

    /// Insert into the ARP cache's free slots. Implicitly enables ARP cache
    /// lookups on success.
    pub fn populate_arp_table<E: ExternalInterface>(
        &mut self,
        external: &mut E,
        pairs: &[(IpV4Addr, MacAddr)],
    ) -> Status {
        let now = external.get_monotonic_timestamp();
        match self.arp_cache.populate(pairs, now, features::EXPIRATION_TIME) {
            Ok(inserted) => {
                self.features.allow_arp_cache = true;
                self.statistics.arp.additions.add(inserted as u32);
                Status::Ok
            }
            Err(status) => status,
        }
    }

    /// Look up the IPv4 address cached for `mac`, if any.
    pub fn find_ipv4_address(&mut self, mac: &MacAddr) -> Option<IpV4Addr> {
        let found = self.arp_cache.find_ip(mac);
        if found.is_some() {
            self.statistics.arp.lookups.increment();
        } else {
            self.statistics.arp.misses.increment();
        }
        found
    }

    /// Look up the MAC address cached for `ip`, if any.
    pub fn find_ethernet_address(&mut self, ip: &IpV4Addr) -> Option<MacAddr> {
        let found = self.arp_cache.find_mac(ip);
        if found.is_some() {
            self.statistics.arp.lookups.increment();
        } else {
            self.statistics.arp.misses.increment();
        }
        found
    }

    /// Acquire a frame buffer from the driver, recording the outcome in the
    /// frame-allocator counters.
    fn acquire_frame<E: ExternalInterface>(&mut self, external: &mut E) -> Status {
        let status = external.acquire();
        if status.is_success() {
            self.statistics.frame_allocator.acquires.increment();
        } else {
            self.statistics.frame_allocator.failures.increment();
        }
        status
    }

    /// Release a frame buffer previously obtained from [`Self::acquire_frame`].
    fn release_frame<E: ExternalInterface>(&mut self, external: &mut E) {
        external.release();
        self.statistics.frame_allocator.releases.increment();
    }

    /// Forward a non-`Ok` status to the driver's `report` callback, and count
    /// it in [`crate::counters::Statistics::reports`].
    fn report<E: ExternalInterface>(&mut self, external: &mut E, layer: PrintLayer, status: Status) {
        external.report(layer, status);
        self.statistics.reports.increment();
    }

    /// Poll the driver once: receive at most one frame, run it through the
    /// acceptance pipeline, and report the outcome. Returns `Status::Ok`
    /// both when a frame was accepted and when there was nothing to receive.
    pub fn run_once<E: ExternalInterface>(&mut self, external: &mut E) -> Status {
        let acquired = self.acquire_frame(external);
        if acquired.is_failure() {
            self.report(external, PrintLayer::Engine, acquired);
            return acquired;
        }

        let mut buffer = [0u8; FRAME_CAPACITY];
        let received = external.receive(&mut buffer);
        self.release_frame(external);

        let n = match received {
            Ok(0) => return Status::Ok,
            Ok(n) => n,
            Err(status) => {
                self.report(external, PrintLayer::Engine, status);
                return status;
            }
        };

        let status = self.receive_ethernet_frame(external, &buffer[..n]);
        if status.is_failure() {
            self.report(external, PrintLayer::Ethernet, status);
        }
        status
    }

    fn receive_ethernet_frame<E: ExternalInterface>(&mut self, external: &mut E, frame: &[u8]) -> Status {
        if frame.len() < EthernetHeader::BYTE_LEN {
            self.statistics.frames.other.reject();
            return Status::InvalidArgument;
        }

        self.statistics.ethernet.rx.record(frame.len());

        let header = EthernetHeader::read_bytes(&frame[0..EthernetHeader::BYTE_LEN]);

        let mac_accepted = addr::is_our_ethernet_address(&header.dst_macaddr, &self.interface.mac)
            || (self.features.allow_any_multicast && addr::is_multicast_ethernet_address(&header.dst_macaddr))
            || (self.features.allow_any_broadcast && addr::is_broadcast_ethernet_address(&header.dst_macaddr))
            || !self.features.allow_mac_filtering
            || self.mac_filter.contains(&header.dst_macaddr);
        if !mac_accepted {
            self.statistics.frames.other.reject();
            return Status::MacRejected;
        }

        let mut offset = EthernetHeader::BYTE_LEN;
        let mut ethertype = header.ethertype;

        if ethertype == EtherType::Vlan {
            if frame.len() < offset + VlanTag::BYTE_LEN {
                self.statistics.frames.other.reject();
                return Status::InvalidArgument;
            }
            let tag = VlanTag::read_bytes(&frame[offset..offset + VlanTag::BYTE_LEN]);
            if self.features.allow_vlan_filtering && tag.tci.vlan_id() != features::VLAN_ID {
                self.statistics.frames.other.reject();
                return Status::StaticVlanFiltered;
            }
            offset += VlanTag::BYTE_LEN;
            ethertype = tag.ethertype;
        }

        let payload = &frame[offset..];
        match ethertype {
            EtherType::IpV4 => {
                let status = self.receive_ipv4_packet(external, payload);
                if status.is_success() {
                    self.statistics.frames.ipv4.accept();
                } else {
                    self.statistics.frames.ipv4.reject();
                }
                status
            }
            EtherType::Arp => {
                let status = self.receive_arp_packet(payload);
                if status.is_success() || status == Status::NotImplemented {
                    self.statistics.frames.arp.accept();
                } else {
                    self.statistics.frames.arp.reject();
                }
                status
            }
            _ => {
                self.statistics.frames.other.reject();
                Status::EthernetTypeRejected
            }
        }
    }

    fn receive_arp_packet(&mut self, payload: &[u8]) -> Status {
        if payload.len() < ArpPacket::BYTE_LEN {
            return Status::InvalidArgument;
        }
        // Parsed and counted, never acted on: cache population and reply
        // generation are left to an explicit `populate_arp_table` call.
        let _parsed = ArpPacket::read_bytes(&payload[0..ArpPacket::BYTE_LEN]);
        self.statistics.arp.received.increment();
        Status::NotImplemented
    }

    fn receive_ipv4_packet<E: ExternalInterface>(&mut self, external: &mut E, payload: &[u8]) -> Status {
        if payload.len() < IpV4Header::BYTE_LEN {
            self.statistics.ipv4_result.reject();
            return Status::IPv4HeaderRejected;
        }

        let header = IpV4Header::read_bytes(&payload[0..IpV4Header::BYTE_LEN]);

        if features::USE_IP_CHECKSUM && !header.checksum_is_valid() {
            self.statistics.ipv4_result.reject();
            return Status::IPv4ChecksumRejected;
        }

        if header.version_and_length.version() != 4 || header.version_and_length.header_length() != 5 {
            self.statistics.ipv4_result.reject();
            return Status::IPv4HeaderRejected;
        }
        if header.fragmentation.more_fragments() != 0 || header.fragmentation.offset() != 0 {
            self.statistics.ipv4_result.reject();
            return Status::IPv4HeaderRejected;
        }
        if (header.total_length as usize) > payload.len() {
            self.statistics.ipv4_result.reject();
            return Status::IPv4HeaderRejected;
        }

        let dst = header.dst_ipaddr;
        let destination_ok = addr::is_our_ipv4_address(&dst, &self.interface.ip)
            || (self.features.allow_any_localhost && addr::is_localhost_ipv4_address(&dst))
            || (self.features.allow_any_broadcast && addr::is_limited_broadcast_ipv4_address(&dst))
            || (self.features.allow_any_multicast && addr::is_multicast_ipv4_address(&dst));
        if !destination_ok {
            self.statistics.ipv4_result.reject();
            return Status::IPv4DestinationRejected;
        }

        let src = header.src_ipaddr;
        let source_ok = self.interface.on_link(&src)
            || (addr::is_localhost_ipv4_address(&dst)
                && addr::is_localhost_ipv4_address(&src)
                && self.features.allow_any_localhost);
        if !source_ok {
            self.statistics.ipv4_result.reject();
            return Status::IPv4SourceRejected;
        }
        if self.features.allow_ip_filtering
            && !addr::is_our_ipv4_address(&src, &self.interface.ip)
            && !self.ip_filter.contains(&src)
        {
            self.statistics.ipv4_result.reject();
            return Status::IPv4SourceFiltered;
        }

        self.statistics.ipv4.rx.record(payload.len());
        self.statistics.ipv4_result.accept();

        let ihl_bytes = (header.version_and_length.header_length() as usize) * 4;
        let body = &payload[ihl_bytes..header.total_length as usize];

        match header.protocol {
            Protocol::Udp => self.receive_udp_datagram(external, &header, body),
            Protocol::Icmp => self.receive_icmp_message(external, &header, body),
            Protocol::Igmp => Status::NotImplemented,
            _ => Status::UnsupportedProtocol,
        }
    }

    fn receive_udp_datagram<E: ExternalInterface>(
        &mut self,
        external: &mut E,
        ip_header: &IpV4Header,
        body: &[u8],
    ) -> Status {
        if body.len() < UdpHeader::BYTE_LEN {
            self.statistics.udp_result.reject();
            return Status::InvalidArgument;
        }
        let udp_header = UdpHeader::read_bytes(&body[0..UdpHeader::BYTE_LEN]);
        if (udp_header.length as usize) < UdpHeader::BYTE_LEN || (udp_header.length as usize) > body.len() {
            self.statistics.udp_result.reject();
            return Status::InvalidArgument;
        }
        let payload = &body[UdpHeader::BYTE_LEN..udp_header.length as usize];

        if features::USE_UDP_CHECKSUM
            && !udp::checksum_is_valid(&ip_header.src_ipaddr, &ip_header.dst_ipaddr, &udp_header, payload)
        {
            self.statistics.udp_result.reject();
            return Status::UDPChecksumRejected;
        }

        self.statistics.udp.rx.record(body.len());
        self.statistics.udp_result.accept();

        let metadata = Metadata {
            peer_address: ip_header.src_ipaddr,
            peer_port: udp_header.src_port,
            local_port: udp_header.dst_port,
            destination_address: ip_header.dst_ipaddr,
            timestamp: external.get_monotonic_timestamp(),
        };
        // `self` is reborrowed, not moved: the driver may use it to reenter
        // `Core::transmit_udp_datagram` (with itself as the `external`
        // argument) before returning, per the engine's reentrancy contract.
        external.receive_udp(self, &metadata, payload)
    }

    fn receive_icmp_message<E: ExternalInterface>(
        &mut self,
        external: &mut E,
        ip_header: &IpV4Header,
        body: &[u8],
    ) -> Status {
        if body.len() < IcmpHeader::BYTE_LEN {
            return Status::InvalidArgument;
        }
        let icmp_header = IcmpHeader::read_bytes(&body[0..IcmpHeader::BYTE_LEN]);
        let payload = &body[IcmpHeader::BYTE_LEN..];

        if features::USE_IP_CHECKSUM && !icmp_header.checksum_is_valid(payload) {
            return Status::ICMPChecksumRejected;
        }

        let metadata = Metadata {
            peer_address: ip_header.src_ipaddr,
            peer_port: 0,
            local_port: 0,
            destination_address: ip_header.dst_ipaddr,
            timestamp: external.get_monotonic_timestamp(),
        };
        if icmp_header.kind != IcmpHeader::ECHO_REQUEST {
            return Status::NotImplemented;
        }
        external.receive_icmp(self, &metadata, payload)
    }

    /// Resolve the MAC address a frame destined for `dst` should carry,
    /// consulting the ARP cache for on-link unicast destinations and the
    /// gateway's cached MAC otherwise. Deliberately one-way: the engine
    /// never answers ARP requests or learns cache entries from traffic it
    /// receives, only from explicit [`Self::populate_arp_table`] calls.
    fn resolve(&mut self, dst: &IpV4Addr) -> Option<MacAddr> {
        if addr::is_limited_broadcast_ipv4_address(dst) {
            return Some(MacAddr::BROADCAST);
        }
        if addr::is_multicast_ipv4_address(dst) {
            return Some(addr::convert_multicast(dst));
        }
        let lookup = if self.interface.on_link(dst) {
            *dst
        } else {
            self.interface.gateway
        };
        let found = self.arp_cache.find_mac(&lookup);
        if found.is_some() {
            self.statistics.arp.lookups.increment();
        } else {
            self.statistics.arp.misses.increment();
        }
        found
    }

    /// Write the Ethernet header -- and, when VLAN tagging is enabled, the
    /// 802.1Q tag between it and the real ethertype -- at the front of
    /// `frame`. Returns the offset at which the caller's payload begins.
    fn write_ethernet_header(&self, frame: &mut [u8], dst_mac: MacAddr, ethertype: EtherType) -> usize {
        if self.features.allow_vlan_filtering {
            let eth_header = EthernetHeader {
                dst_macaddr: dst_mac,
                src_macaddr: self.interface.mac,
                ethertype: EtherType::Vlan,
            };
            eth_header.write_bytes(&mut frame[0..EthernetHeader::BYTE_LEN]);
            let tag = VlanTag {
                tci: TagControlInfo::new().with_vlan_id(features::VLAN_ID),
                ethertype,
            };
            let offset = EthernetHeader::BYTE_LEN;
            tag.write_bytes(&mut frame[offset..offset + VlanTag::BYTE_LEN]);
            offset + VlanTag::BYTE_LEN
        } else {
            let eth_header = EthernetHeader {
                dst_macaddr: dst_mac,
                src_macaddr: self.interface.mac,
                ethertype,
            };
            eth_header.write_bytes(&mut frame[0..EthernetHeader::BYTE_LEN]);
            EthernetHeader::BYTE_LEN
        }
    }

    fn next_identification(&mut self) -> u16 {
        self.identification = self.identification.wrapping_add(1);
        self.identification
    }

    fn build_ipv4_header(&mut self, dst: IpV4Addr, protocol: Protocol, payload_len: usize) -> IpV4Header {
        let total_length = (IpV4Header::BYTE_LEN + payload_len) as u16;
        IpV4Header {
            version_and_length: VersionAndHeaderLength::new()
                .with_version(4)
                .with_header_length((IpV4Header::BYTE_LEN / 4) as u8),
            dscp_ecn: DscpEcn::new(),
            total_length,
            identification: self.next_identification(),
            fragmentation: Fragmentation::new(),
            time_to_live: features::TTL,
            protocol,
            checksum: 0,
            src_ipaddr: self.interface.ip,
            dst_ipaddr: dst,
        }
    }

    /// Assemble and hand one Ethernet frame carrying `ip_header` and
    /// `payload` to the driver. Loops back internally, without touching the
    /// driver, when `ip_header.dst_ipaddr` is our own address or localhost.
    ///
    /// This stack is single-subnet: the destination must be multicast,
    /// limited-broadcast, localhost, or our own address. There is no
    /// provision for transmitting to an arbitrary on-link or gatewayed
    /// unicast peer.
    fn transmit_ipv4_frame<E: ExternalInterface>(
        &mut self,
        external: &mut E,
        mut ip_header: IpV4Header,
        payload: &[u8],
    ) -> Status {
        let dst = ip_header.dst_ipaddr;
        let destination_ok = addr::is_our_ipv4_address(&dst, &self.interface.ip)
            || addr::is_multicast_ipv4_address(&dst)
            || addr::is_limited_broadcast_ipv4_address(&dst)
            || addr::is_localhost_ipv4_address(&dst);
        if !destination_ok {
            return Status::IPv4DestinationRejected;
        }

        if features::USE_IP_CHECKSUM {
            ip_header.checksum = ip_header.compute_checksum();
        }

        let loopback = addr::is_our_ipv4_address(&ip_header.dst_ipaddr, &self.interface.ip)
            || addr::is_localhost_ipv4_address(&ip_header.dst_ipaddr);
        if loopback {
            let mut body = [0u8; FRAME_CAPACITY];
            let header_bytes = ip_header.to_be_bytes();
            body[0..IpV4Header::BYTE_LEN].copy_from_slice(&header_bytes);
            body[IpV4Header::BYTE_LEN..IpV4Header::BYTE_LEN + payload.len()].copy_from_slice(payload);
            return self.receive_ipv4_packet(external, &body[0..IpV4Header::BYTE_LEN + payload.len()]);
        }

        // An ARP-cache miss still falls back to the broadcast MAC rather
        // than failing the transmit outright (the resolver never returns
        // `None` for multicast/broadcast destinations, which is all that
        // reaches this point today, but the fallback matches the general
        // Ethernet transmit composer's contract either way).
        let dst_mac = self.resolve(&ip_header.dst_ipaddr).unwrap_or(MacAddr::BROADCAST);

        let acquired = self.acquire_frame(external);
        if acquired.is_failure() {
            return acquired;
        }

        let mut frame = [0u8; FRAME_CAPACITY];
        let mut offset = self.write_ethernet_header(&mut frame, dst_mac, EtherType::IpV4);
        frame[offset..offset + IpV4Header::BYTE_LEN].copy_from_slice(&ip_header.to_be_bytes());
        offset += IpV4Header::BYTE_LEN;
        frame[offset..offset + payload.len()].copy_from_slice(payload);
        offset += payload.len();

        let status = external.transmit(&frame[0..offset]);
        self.release_frame(external);

        if status.is_success() {
            self.statistics.ethernet.tx.record(offset);
            self.statistics.ipv4.tx.record(IpV4Header::BYTE_LEN + payload.len());
        }
        status
    }

    /// Transmit `payload` as one or more UDP datagrams to
    /// `metadata.peer_address`/`metadata.peer_port`, chunking it across
    /// multiple datagrams if it exceeds [`MAX_UDP_CHUNK`]. This is payload
    /// chunking at the UDP layer, not IPv4 fragmentation.
    ///
    /// Safe to call from inside [`ExternalInterface::receive_udp`] or
    /// `receive_icmp` with the `&mut Core` those callbacks are handed: the
    /// driver passes itself back in as `external`, which borrows nothing
    /// from `self`.
    pub fn transmit_udp_datagram<E: ExternalInterface>(
        &mut self,
        external: &mut E,
        metadata: &Metadata,
        payload: &[u8],
    ) -> Status {
        if payload.is_empty() {
            return Status::InvalidSpan;
        }
        for chunk in payload.chunks(MAX_UDP_CHUNK) {
            let status = self.transmit_udp_chunk(external, metadata, chunk);
            if status.is_failure() {
                return status;
            }
        }
        Status::Ok
    }

    fn transmit_udp_chunk<E: ExternalInterface>(
        &mut self,
        external: &mut E,
        metadata: &Metadata,
        chunk: &[u8],
    ) -> Status {
        if UdpHeader::BYTE_LEN + chunk.len() > features::MTU - IpV4Header::BYTE_LEN {
            return Status::IPv4PacketTooLarge;
        }

        let mut udp_header = UdpHeader {
            src_port: metadata.local_port,
            dst_port: metadata.peer_port,
            length: (UdpHeader::BYTE_LEN + chunk.len()) as u16,
            checksum: 0,
        };

        let ip_header = self.build_ipv4_header(
            metadata.peer_address,
            Protocol::Udp,
            UdpHeader::BYTE_LEN + chunk.len(),
        );

        if features::USE_UDP_CHECKSUM {
            udp_header.checksum =
                udp::compute_checksum(&self.interface.ip, &metadata.peer_address, &udp_header, chunk);
        }

        let mut body = [0u8; FRAME_CAPACITY];
        body[0..UdpHeader::BYTE_LEN].copy_from_slice(&udp_header.to_be_bytes());
        body[UdpHeader::BYTE_LEN..UdpHeader::BYTE_LEN + chunk.len()].copy_from_slice(chunk);

        let status = self.transmit_ipv4_frame(external, ip_header, &body[0..UdpHeader::BYTE_LEN + chunk.len()]);
        if status.is_success() {
            self.statistics.udp.tx.record(UdpHeader::BYTE_LEN + chunk.len());
        }
        status
    }

    /// Broadcast an ARP announcement for our own address (a gratuitous ARP
    /// request). The target hardware address is the broadcast MAC: no peer
    /// is expected to answer, this just seeds switch MAC tables and probes
    /// for address conflicts.
    pub fn arp_announcement<E: ExternalInterface>(&mut self, external: &mut E) -> Status {
        let arp = ArpPacket::request(
            self.interface.mac,
            self.interface.ip,
            MacAddr::BROADCAST,
            self.interface.ip,
        );

        let acquired = self.acquire_frame(external);
        if acquired.is_failure() {
            return acquired;
        }

        let mut frame = [0u8; FRAME_CAPACITY];
        let offset = self.write_ethernet_header(&mut frame, MacAddr::BROADCAST, EtherType::Arp);
        frame[offset..offset + ArpPacket::BYTE_LEN].copy_from_slice(&arp.to_be_bytes());

        let status = external.transmit(&frame[0..offset + ArpPacket::BYTE_LEN]);
        self.release_frame(external);

        if status.is_success() {
            self.statistics.arp.announces.increment();
        }
        status
    }

    /// Send an IGMPv2 membership report for `group`.
    fn membership_report<E: ExternalInterface>(&mut self, external: &mut E, group: IpV4Addr) -> Status {
        let status = self.send_igmp_message(external, IgmpMessage::membership_report(group), group);
        if status.is_success() {
            self.statistics.igmp_sent.increment();
        }
        status
    }

    /// Send an IGMPv2 leave-group message for `group`.
    fn leave_group<E: ExternalInterface>(&mut self, external: &mut E, group: IpV4Addr) -> Status {
        let status = self.send_igmp_message(external, IgmpMessage::leave_group(group), group);
        if status.is_success() {
            self.statistics.igmp_sent.increment();
        }
        status
    }

    /// Join a multicast group so the host can receive its traffic, emitting
    /// an IGMPv2 Membership Report. `multicast` must be a class D address;
    /// this stack keeps no per-port listener table, so any other address is
    /// rejected with [`Status::NotSupported`] rather than silently ignored.
    pub fn prepare_udp_receive<E: ExternalInterface>(&mut self, external: &mut E, multicast: IpV4Addr, _port: u16) -> Status {
        if !addr::is_multicast_ipv4_address(&multicast) {
            return Status::NotSupported;
        }
        self.membership_report(external, multicast)
    }

    /// Leave a multicast group previously joined with
    /// [`Self::prepare_udp_receive`], emitting an IGMPv2 Leave Group message.
    pub fn prepare_udp_leave<E: ExternalInterface>(&mut self, external: &mut E, multicast: IpV4Addr) -> Status {
        if !addr::is_multicast_ipv4_address(&multicast) {
            return Status::NotSupported;
        }
        self.leave_group(external, multicast)
    }

    /// Prepare to transmit to `destination`. Unicast/broadcast destinations
    /// need no preparation; a multicast destination needs none either --
    /// [`Self::transmit_udp_datagram`] derives the multicast MAC directly --
    /// so this is always a no-op that returns [`Status::Ok`].
    pub fn prepare_udp_transmit(&mut self, _destination: IpV4Addr) -> Status {
        Status::Ok
    }

    fn send_igmp_message<E: ExternalInterface>(
        &mut self,
        external: &mut E,
        message: IgmpMessage,
        group: IpV4Addr,
    ) -> Status {
        let ip_header = self.build_ipv4_header(group, Protocol::Igmp, IgmpMessage::BYTE_LEN);
        self.transmit_ipv4_frame(external, ip_header, &message.to_be_bytes())
    }
}

/// The stack instance: one per network interface. A thin, owned wrapper
/// around a [`Core`] and the driver `E`, forwarding every public operation
/// to `Core` with `&mut self.external` supplied automatically.
pub struct Engine<E: ExternalInterface> {
    core: Core,
    external: E,
}

impl<E: ExternalInterface> Engine<E> {
    /// Construct a new engine for `interface`, driven by `external`.
    /// Fails if the interface's own addresses are not usable, per
    /// [`Interface::validate`].
    pub fn new(interface: Interface, external: E) -> Result<Self, Status> {
        let status = interface.validate();
        if status.is_failure() {
            return Err(status);
        }
        Ok(Engine {
            core: Core::new(interface),
            external,
        })
    }

    /// A snapshot of the accumulated traffic statistics.
    pub fn statistics(&self) -> Statistics {
        self.core.statistics()
    }

    /// The currently active capability flags.
    pub fn features(&self) -> Features {
        self.core.features()
    }

    /// Replace the MAC filter table contents. Implicitly enables MAC
    /// filtering on success.
    pub fn populate_ethernet_filter(&mut self, addrs: &[MacAddr]) -> Status {
        self.core.populate_ethernet_filter(&mut self.external, addrs)
    }

    /// Replace the IPv4 filter table contents. Implicitly enables IPv4
    /// source filtering on success.
    pub fn populate_ipv4_filter(&mut self, addrs: &[IpV4Addr]) -> Status {
        self.core.populate_ipv4_filter(&mut self.external, addrs)
    }

    /// Insert into the ARP cache's free slots. Implicitly enables ARP cache
    /// lookups on success.
    pub fn populate_arp_table(&mut self, pairs: &[(IpV4Addr, MacAddr)]) -> Status {
        self.core.populate_arp_table(&mut self.external, pairs)
    }

    /// Look up the IPv4 address cached for `mac`, if any.
    pub fn find_ipv4_address(&mut self, mac: &MacAddr) -> Option<IpV4Addr> {
        self.core.find_ipv4_address(mac)
    }

    /// Look up the MAC address cached for `ip`, if any.
    pub fn find_ethernet_address(&mut self, ip: &IpV4Addr) -> Option<MacAddr> {
        self.core.find_ethernet_address(ip)
    }

    /// Poll the driver once: receive at most one frame, run it through the
    /// acceptance pipeline, and report the outcome. Returns `Status::Ok`
    /// both when a frame was accepted and when there was nothing to receive.
    pub fn run_once(&mut self) -> Status {
        self.core.run_once(&mut self.external)
    }

    /// Transmit `payload` as one or more UDP datagrams to
    /// `metadata.peer_address`/`metadata.peer_port`, chunking it across
    /// multiple datagrams if it exceeds [`MAX_UDP_CHUNK`].
    pub fn transmit_udp_datagram(&mut self, metadata: &Metadata, payload: &[u8]) -> Status {
        self.core.transmit_udp_datagram(&mut self.external, metadata, payload)
    }

    /// Broadcast an ARP announcement for our own address (a gratuitous ARP
    /// request).
    pub fn arp_announcement(&mut self) -> Status {
        self.core.arp_announcement(&mut self.external)
    }

    /// Join a multicast group so the host can receive its traffic, emitting
    /// an IGMPv2 Membership Report.
    pub fn prepare_udp_receive(&mut self, multicast: IpV4Addr, port: u16) -> Status {
        self.core.prepare_udp_receive(&mut self.external, multicast, port)
    }

    /// Leave a multicast group previously joined with
    /// [`Self::prepare_udp_receive`], emitting an IGMPv2 Leave Group message.
    pub fn prepare_udp_leave(&mut self, multicast: IpV4Addr) -> Status {
        self.core.prepare_udp_leave(&mut self.external, multicast)
    }

    /// Prepare to transmit to `destination`. Always a no-op success; see
    /// [`Core::prepare_udp_transmit`].
    pub fn prepare_udp_transmit(&mut self, destination: IpV4Addr) -> Status {
        self.core.prepare_udp_transmit(destination)
    }

    #[cfg(test)]
    fn receive_ethernet_frame(&mut self, frame: &[u8]) -> Status {
        self.core.receive_ethernet_frame(&mut self.external, frame)
    }

    #[cfg(test)]
    fn receive_ipv4_packet(&mut self, payload: &[u8]) -> Status {
        self.core.receive_ipv4_packet(&mut self.external, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;
    use std::vec::Vec;

    struct MockDriver {
        transmitted: Vec<Vec<u8>>,
        to_receive: Vec<Vec<u8>>,
        acquire_fails: bool,
    }

    impl MockDriver {
        fn new() -> Self {
            MockDriver {
                transmitted: Vec::new(),
                to_receive: Vec::new(),
                acquire_fails: false,
            }
        }
    }

    impl ExternalInterface for MockDriver {
        fn acquire(&mut self) -> Status {
            if self.acquire_fails {
                Status::OutOfMemory
            } else {
                Status::Ok
            }
        }

        fn release(&mut self) {}

        fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, Status> {
            match self.to_receive.pop() {
                Some(frame) => {
                    buffer[0..frame.len()].copy_from_slice(&frame);
                    Ok(frame.len())
                }
                None => Ok(0),
            }
        }

        fn transmit(&mut self, frame: &[u8]) -> Status {
            self.transmitted.push(frame.to_vec());
            Status::Ok
        }

        fn get_monotonic_timestamp(&mut self) -> i64 {
            0
        }

        fn print(&mut self, _level: PrintLevel, _layer: PrintLayer, _message: &str) {}

        fn report(&mut self, _layer: PrintLayer, _status: Status) {}

        fn receive_udp(&mut self, _core: &mut Core, _metadata: &Metadata, _payload: &[u8]) -> Status {
            Status::Ok
        }
    }

    /// A driver that, on receiving a UDP datagram, immediately reenters the
    /// engine through the `Core` handle it was passed to echo the payload
    /// back to the sender -- exercising the reentrancy contract directly.
    struct EchoingDriver {
        transmitted: Vec<Vec<u8>>,
        to_receive: Vec<Vec<u8>>,
        echoed: Vec<Vec<u8>>,
    }

    impl EchoingDriver {
        fn new() -> Self {
            EchoingDriver {
                transmitted: Vec::new(),
                to_receive: Vec::new(),
                echoed: Vec::new(),
            }
        }
    }

    impl ExternalInterface for EchoingDriver {
        fn acquire(&mut self) -> Status {
            Status::Ok
        }

        fn release(&mut self) {}

        fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, Status> {
            match self.to_receive.pop() {
                Some(frame) => {
                    buffer[0..frame.len()].copy_from_slice(&frame);
                    Ok(frame.len())
                }
                None => Ok(0),
            }
        }

        fn transmit(&mut self, frame: &[u8]) -> Status {
            self.transmitted.push(frame.to_vec());
            Status::Ok
        }

        fn get_monotonic_timestamp(&mut self) -> i64 {
            0
        }

        fn print(&mut self, _level: PrintLevel, _layer: PrintLayer, _message: &str) {}

        fn report(&mut self, _layer: PrintLayer, _status: Status) {}

        fn receive_udp(&mut self, core: &mut Core, metadata: &Metadata, payload: &[u8]) -> Status {
            self.echoed.push(payload.to_vec());
            // This stack cannot unicast back to an ordinary on-subnet
            // sender (§4.6 Transmit step 2), so the echo relays onto a
            // second multicast group instead of the literal peer address.
            let reply = Metadata {
                peer_address: IpV4Addr::new([239, 0, 0, 200]),
                peer_port: metadata.peer_port,
                local_port: metadata.local_port,
                destination_address: IpV4Addr::new([239, 0, 0, 200]),
                timestamp: metadata.timestamp,
            };
            core.transmit_udp_datagram(self, &reply, payload)
        }
    }

    fn test_interface() -> Interface {
        Interface {
            mac: MacAddr::new([0x02, 0xAF, 0xFF, 0x1A, 0xE5, 0x3C]),
            ip: IpV4Addr::new([10, 0, 0, 120]),
            netmask: IpV4Addr::new([255, 255, 255, 0]),
            gateway: IpV4Addr::new([10, 0, 0, 1]),
        }
    }

    #[test]
    fn new_rejects_a_multicast_interface_mac() {
        let mut interface = test_interface();
        interface.mac = MacAddr::new([0x01, 0, 0, 0, 0, 1]);
        assert!(Engine::new(interface, MockDriver::new()).is_err());
    }

    #[test]
    fn arp_announcement_targets_broadcast_mac_and_increments_announces() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        assert_eq!(engine.arp_announcement(), Status::Ok);

        let frame = &engine.external.transmitted[0];
        let header = EthernetHeader::read_bytes(&frame[0..EthernetHeader::BYTE_LEN]);
        assert_eq!(header.dst_macaddr, MacAddr::BROADCAST);
        let arp_offset = if header.ethertype == EtherType::Vlan {
            EthernetHeader::BYTE_LEN + VlanTag::BYTE_LEN
        } else {
            EthernetHeader::BYTE_LEN
        };
        let arp = ArpPacket::read_bytes(&frame[arp_offset..arp_offset + ArpPacket::BYTE_LEN]);
        assert_eq!(arp.target_mac, MacAddr::BROADCAST);
        assert_eq!(arp.sender_mac, engine.core.interface.mac);
        assert_eq!(engine.statistics().arp.announces.value, 1);
    }

    #[test]
    fn transmitted_frames_carry_the_configured_vlan_tag_by_default() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        assert!(engine.features().allow_vlan_filtering);
        assert_eq!(engine.arp_announcement(), Status::Ok);

        let frame = &engine.external.transmitted[0];
        let header = EthernetHeader::read_bytes(&frame[0..EthernetHeader::BYTE_LEN]);
        assert_eq!(header.ethertype, EtherType::Vlan);
        let tag = VlanTag::read_bytes(
            &frame[EthernetHeader::BYTE_LEN..EthernetHeader::BYTE_LEN + VlanTag::BYTE_LEN],
        );
        assert_eq!(tag.ethertype, EtherType::Arp);
        assert_eq!(tag.tci.vlan_id(), features::VLAN_ID);
    }

    #[test]
    fn populate_arp_table_counts_additions_and_enables_lookups() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        let ip = IpV4Addr::new([10, 0, 0, 5]);
        let mac = MacAddr::new([1, 2, 3, 4, 5, 6]);
        assert_eq!(engine.populate_arp_table(&[(ip, mac)]), Status::Ok);
        assert_eq!(engine.statistics().arp.additions.value, 1);

        assert_eq!(engine.find_ethernet_address(&ip), Some(mac));
        assert_eq!(engine.statistics().arp.lookups.value, 1);

        assert_eq!(engine.find_ethernet_address(&IpV4Addr::new([10, 0, 0, 9])), None);
        assert_eq!(engine.statistics().arp.misses.value, 1);
    }

    #[test]
    fn transmit_to_own_address_loops_back_without_invoking_driver() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        let metadata = Metadata {
            peer_address: engine.core.interface.ip,
            peer_port: 9382,
            local_port: 1025,
            destination_address: engine.core.interface.ip,
            timestamp: 0,
        };
        assert_eq!(engine.transmit_udp_datagram(&metadata, b"hello"), Status::Ok);
        assert!(engine.external.transmitted.is_empty());
    }

    #[test]
    fn chunking_splits_oversized_payload_into_multiple_transmits() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        let metadata = Metadata {
            peer_address: IpV4Addr::BROADCAST,
            peer_port: 9382,
            local_port: 1025,
            destination_address: IpV4Addr::BROADCAST,
            timestamp: 0,
        };

        let payload_len = MAX_UDP_CHUNK * 2 + 10;
        let payload = std::vec![0xABu8; payload_len];
        assert_eq!(engine.transmit_udp_datagram(&metadata, &payload), Status::Ok);

        let expected_chunks = (payload_len + MAX_UDP_CHUNK - 1) / MAX_UDP_CHUNK;
        assert_eq!(engine.external.transmitted.len(), expected_chunks);
    }

    #[test]
    fn acquire_failure_is_counted_in_frame_allocator_failures() {
        let mut driver = MockDriver::new();
        driver.acquire_fails = true;
        let mut engine = Engine::new(test_interface(), driver).unwrap();
        assert_eq!(engine.run_once(), Status::OutOfMemory);
        assert_eq!(engine.statistics().frame_allocator.failures.value, 1);
    }

    #[test]
    fn transmit_udp_datagram_rejects_empty_payload() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        let metadata = Metadata {
            peer_address: IpV4Addr::new([10, 0, 0, 50]),
            peer_port: 9382,
            local_port: 1025,
            destination_address: engine.core.interface.ip,
            timestamp: 0,
        };
        assert_eq!(engine.transmit_udp_datagram(&metadata, &[]), Status::InvalidSpan);
        assert!(engine.external.transmitted.is_empty());
    }

    #[test]
    fn transmit_to_an_ordinary_on_subnet_unicast_peer_is_rejected() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        let metadata = Metadata {
            peer_address: IpV4Addr::new([10, 0, 0, 50]),
            peer_port: 9382,
            local_port: 1025,
            destination_address: IpV4Addr::new([10, 0, 0, 50]),
            timestamp: 0,
        };
        assert_eq!(
            engine.transmit_udp_datagram(&metadata, b"hi"),
            Status::IPv4DestinationRejected
        );
        assert!(engine.external.transmitted.is_empty());
    }

    #[test]
    fn prepare_udp_receive_rejects_non_multicast_with_not_supported() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        let unicast = IpV4Addr::new([10, 0, 0, 50]);
        assert_eq!(engine.prepare_udp_receive(unicast, 9382), Status::NotSupported);
        assert!(engine.external.transmitted.is_empty());
    }

    #[test]
    fn prepare_udp_receive_emits_membership_report_for_multicast() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        let group = IpV4Addr::new([239, 1, 2, 3]);
        assert_eq!(engine.prepare_udp_receive(group, 9382), Status::Ok);
        assert_eq!(engine.statistics().igmp_sent.value, 1);
        assert_eq!(engine.external.transmitted.len(), 1);
    }

    #[test]
    fn prepare_udp_transmit_is_always_a_no_op_success() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        assert_eq!(
            engine.prepare_udp_transmit(IpV4Addr::new([10, 0, 0, 50])),
            Status::Ok
        );
        assert!(engine.external.transmitted.is_empty());
    }

    #[test]
    fn mac_filtering_disabled_by_default_accepts_unmatched_unicast_destination() {
        // USE_MAC_FILTER defaults the filtering flag on, but with an empty
        // table populated this falls through to accepting everything --
        // matching the "OR MAC filtering is disabled" acceptance clause.
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        engine.core.features.allow_mac_filtering = false;
        let frame_dst = MacAddr::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        assert_ne!(frame_dst, engine.core.interface.mac);
        let status = engine.receive_ethernet_frame(&{
            let eth = EthernetHeader {
                dst_macaddr: frame_dst,
                src_macaddr: MacAddr::new([0x80, 0x90, 0xA0, 0x12, 0x34, 0x56]),
                ethertype: EtherType::Arp,
            };
            let mut frame = std::vec![0u8; EthernetHeader::BYTE_LEN + ArpPacket::BYTE_LEN];
            eth.write_bytes(&mut frame[0..EthernetHeader::BYTE_LEN]);
            frame
        });
        // The frame is malformed past the Ethernet header (all zero ARP
        // bytes), but it must get past MAC acceptance to reach that point.
        assert_ne!(status, Status::MacRejected);
    }

    #[test]
    fn broadcast_destination_rejected_when_filtering_enabled_and_broadcast_disallowed() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        engine.core.features.allow_mac_filtering = true;
        engine.core.features.allow_any_broadcast = false;
        let eth = EthernetHeader {
            dst_macaddr: MacAddr::BROADCAST,
            src_macaddr: MacAddr::new([0x80, 0x90, 0xA0, 0x12, 0x34, 0x56]),
            ethertype: EtherType::Arp,
        };
        let mut frame = std::vec![0u8; EthernetHeader::BYTE_LEN + ArpPacket::BYTE_LEN];
        eth.write_bytes(&mut frame[0..EthernetHeader::BYTE_LEN]);
        assert_eq!(engine.receive_ethernet_frame(&frame), Status::MacRejected);
    }

    #[test]
    fn ipv4_source_outside_subnet_is_rejected() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        let header = IpV4Header {
            version_and_length: VersionAndHeaderLength::new().with_version(4).with_header_length(5),
            dscp_ecn: DscpEcn::new(),
            total_length: IpV4Header::BYTE_LEN as u16,
            identification: 0,
            fragmentation: Fragmentation::new(),
            time_to_live: 64,
            protocol: Protocol::Udp,
            checksum: 0,
            src_ipaddr: IpV4Addr::new([8, 8, 8, 8]),
            dst_ipaddr: engine.core.interface.ip,
        };
        let mut header = header;
        header.checksum = header.compute_checksum();
        assert_eq!(
            engine.receive_ipv4_packet(&header.to_be_bytes()),
            Status::IPv4SourceRejected
        );
    }

    #[test]
    fn ipv4_source_filtering_exempts_our_own_address() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        engine.core.features.allow_ip_filtering = true;
        let our_ip = engine.core.interface.ip;
        let header = IpV4Header {
            version_and_length: VersionAndHeaderLength::new().with_version(4).with_header_length(5),
            dscp_ecn: DscpEcn::new(),
            total_length: IpV4Header::BYTE_LEN as u16,
            identification: 0,
            fragmentation: Fragmentation::new(),
            time_to_live: 64,
            protocol: Protocol::Udp,
            checksum: 0,
            src_ipaddr: our_ip,
            dst_ipaddr: our_ip,
        };
        let mut header = header;
        header.checksum = header.compute_checksum();
        assert_ne!(
            engine.receive_ipv4_packet(&header.to_be_bytes()),
            Status::IPv4SourceFiltered
        );
    }

    fn udp_packet_with_wire_length(our_ip: IpV4Addr, wire_length: u16, body: &[u8]) -> Vec<u8> {
        let udp_header = UdpHeader {
            src_port: 1025,
            dst_port: 9382,
            length: wire_length,
            checksum: 0,
        };
        let mut udp_bytes = Vec::new();
        udp_bytes.extend_from_slice(&udp_header.to_be_bytes());
        udp_bytes.extend_from_slice(body);

        let mut ip_header = IpV4Header {
            version_and_length: VersionAndHeaderLength::new().with_version(4).with_header_length(5),
            dscp_ecn: DscpEcn::new(),
            total_length: (IpV4Header::BYTE_LEN + udp_bytes.len()) as u16,
            identification: 0,
            fragmentation: Fragmentation::new(),
            time_to_live: 64,
            protocol: Protocol::Udp,
            checksum: 0,
            src_ipaddr: our_ip,
            dst_ipaddr: our_ip,
        };
        ip_header.checksum = ip_header.compute_checksum();

        let mut packet = ip_header.to_be_bytes().to_vec();
        packet.extend_from_slice(&udp_bytes);
        packet
    }

    #[test]
    fn udp_length_field_smaller_than_header_is_rejected_not_panicking() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        let our_ip = engine.core.interface.ip;
        let packet = udp_packet_with_wire_length(our_ip, 3, b"hello");
        assert_eq!(engine.receive_ipv4_packet(&packet), Status::InvalidArgument);
    }

    #[test]
    fn udp_length_field_larger_than_body_is_rejected_not_panicking() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        let our_ip = engine.core.interface.ip;
        let packet = udp_packet_with_wire_length(our_ip, 0xFFFF, b"hello");
        assert_eq!(engine.receive_ipv4_packet(&packet), Status::InvalidArgument);
    }

    #[test]
    fn icmp_echo_request_with_bad_checksum_is_rejected() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        let our_ip = engine.core.interface.ip;
        let icmp_header = IcmpHeader {
            kind: IcmpHeader::ECHO_REQUEST,
            code: 0,
            checksum: 0,
            identifier: 1,
            sequence: 1,
        };
        let payload = b"ping";
        // Correct checksum would be `icmp_header.compute_checksum(payload)`;
        // a deliberately wrong one exercises the rejection path.
        let mut icmp_bytes = icmp_header.to_be_bytes().to_vec();
        icmp_bytes.extend_from_slice(payload);

        let mut ip_header = IpV4Header {
            version_and_length: VersionAndHeaderLength::new().with_version(4).with_header_length(5),
            dscp_ecn: DscpEcn::new(),
            total_length: (IpV4Header::BYTE_LEN + icmp_bytes.len()) as u16,
            identification: 0,
            fragmentation: Fragmentation::new(),
            time_to_live: 64,
            protocol: Protocol::Icmp,
            checksum: 0,
            src_ipaddr: our_ip,
            dst_ipaddr: our_ip,
        };
        ip_header.checksum = ip_header.compute_checksum();

        let mut packet = ip_header.to_be_bytes().to_vec();
        packet.extend_from_slice(&icmp_bytes);
        assert_eq!(
            engine.receive_ipv4_packet(&packet),
            Status::ICMPChecksumRejected
        );
    }

    #[test]
    fn icmp_echo_request_with_valid_checksum_reaches_the_driver_callback() {
        let mut engine = Engine::new(test_interface(), MockDriver::new()).unwrap();
        let our_ip = engine.core.interface.ip;
        let mut icmp_header = IcmpHeader {
            kind: IcmpHeader::ECHO_REQUEST,
            code: 0,
            checksum: 0,
            identifier: 1,
            sequence: 1,
        };
        let payload = b"ping";
        icmp_header.checksum = icmp_header.compute_checksum(payload);
        let mut icmp_bytes = icmp_header.to_be_bytes().to_vec();
        icmp_bytes.extend_from_slice(payload);

        let mut ip_header = IpV4Header {
            version_and_length: VersionAndHeaderLength::new().with_version(4).with_header_length(5),
            dscp_ecn: DscpEcn::new(),
            total_length: (IpV4Header::BYTE_LEN + icmp_bytes.len()) as u16,
            identification: 0,
            fragmentation: Fragmentation::new(),
            time_to_live: 64,
            protocol: Protocol::Icmp,
            checksum: 0,
            src_ipaddr: our_ip,
            dst_ipaddr: our_ip,
        };
        ip_header.checksum = ip_header.compute_checksum();

        let mut packet = ip_header.to_be_bytes().to_vec();
        packet.extend_from_slice(&icmp_bytes);
        // MockDriver does not override `receive_icmp`, so the default
        // implementation's `Status::NotImplemented` proves the checksum
        // gate let a validly-checksummed echo request through.
        assert_eq!(engine.receive_ipv4_packet(&packet), Status::NotImplemented);
    }

    #[test]
    fn receive_udp_reentering_transmit_udp_datagram_echoes_the_payload() {
        let mut driver = EchoingDriver::new();
        let multicast_group = IpV4Addr::new([239, 0, 0, 155]);
        let src_ip = IpV4Addr::new([10, 0, 0, 7]);

        let payload = b"ping-pong";
        let udp_header = UdpHeader {
            src_port: 1025,
            dst_port: 9382,
            length: (UdpHeader::BYTE_LEN + payload.len()) as u16,
            checksum: 0,
        };
        let mut udp_bytes = udp_header.to_be_bytes().to_vec();
        udp_bytes.extend_from_slice(payload);

        let mut ip_header = IpV4Header {
            version_and_length: VersionAndHeaderLength::new().with_version(4).with_header_length(5),
            dscp_ecn: DscpEcn::new(),
            total_length: (IpV4Header::BYTE_LEN + udp_bytes.len()) as u16,
            identification: 0,
            fragmentation: Fragmentation::new(),
            time_to_live: 64,
            protocol: Protocol::Udp,
            checksum: 0,
            src_ipaddr: src_ip,
            dst_ipaddr: multicast_group,
        };
        ip_header.checksum = ip_header.compute_checksum();

        let mut packet = ip_header.to_be_bytes().to_vec();
        packet.extend_from_slice(&udp_bytes);

        let eth = EthernetHeader {
            dst_macaddr: addr::convert_multicast(&multicast_group),
            src_macaddr: MacAddr::new([0x80, 0x90, 0xA0, 0x12, 0x34, 0x56]),
            ethertype: EtherType::IpV4,
        };
        let mut eth_bytes = [0u8; EthernetHeader::BYTE_LEN];
        eth.write_bytes(&mut eth_bytes);
        let mut frame = eth_bytes.to_vec();
        frame.extend_from_slice(&packet);

        driver.to_receive.push(frame);
        let mut engine = Engine::new(test_interface(), driver).unwrap();
        assert_eq!(engine.run_once(), Status::Ok);

        assert_eq!(engine.external.echoed, std::vec![payload.to_vec()]);
        // The echo reenters `transmit_udp_datagram` from inside
        // `receive_udp`, and since the destination is multicast it does not
        // loop back, so exactly one frame reaches the driver.
        assert_eq!(engine.external.transmitted.len(), 1);
    }
}
