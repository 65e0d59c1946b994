//! Compile-time defaults and the runtime capability flags seeded from them.
//!
//! These are expressed as `const` items carried into a runtime struct so a
//! host can flip a flag (e.g. after calling [`crate::filter`] populate
//! functions) without recompiling, rather than as build-time switches that
//! compile a code path in or out.

/// Maximum Ethernet payload size this build will emit or accept.
pub const MTU: usize = 1500;

/// Default IPv4 time-to-live.
pub const TTL: u8 = 64;

/// Whether VLAN tagging is compiled into the Ethernet header shape.
pub const USE_VLAN: bool = true;

/// The VLAN ID tagged on transmit and expected on receive when VLAN filtering applies.
pub const VLAN_ID: u16 = 1;

/// Default acceptance of 127.0.0.0/8 traffic.
pub const ALLOW_ANY_LOCALHOST: bool = true;

/// Default acceptance of any multicast traffic.
pub const ALLOW_ANY_MULTICAST: bool = true;

/// Default acceptance of the limited broadcast address.
pub const ALLOW_ANY_BROADCAST: bool = false;

/// Whether the MAC filter table is consulted by default.
pub const USE_MAC_FILTER: bool = true;

/// Whether the IPv4 filter table is consulted by default.
pub const USE_IP_FILTER: bool = true;

/// Whether the ARP cache is consulted by default.
pub const USE_ARP_CACHE: bool = true;

/// Whether the IPv4 header checksum is verified on receive and emitted on transmit.
pub const USE_IP_CHECKSUM: bool = true;

/// Whether the UDP checksum is verified on receive and emitted on transmit.
pub const USE_UDP_CHECKSUM: bool = false;

/// Capacity of the MAC filter table.
pub const MAC_FILTER_TABLE_SIZE: usize = 32;

/// Capacity of the IPv4 filter table.
pub const IP_FILTER_TABLE_SIZE: usize = 32;

/// Capacity of the ARP cache.
pub const ARP_TABLE_SIZE: usize = 32;

/// Default lifetime, in the host's monotonic timestamp units, of a populated
/// filter/cache entry. Entries are stamped with this on insertion; the core
/// records the expiration but does not age entries out implicitly.
pub const EXPIRATION_TIME: i64 = 1_000_000_000_000;

/// Runtime capability flags, seeded from the constants above at [`crate::engine::Engine::new`]
/// time and mutated afterwards by populate calls and direct assignment.
///
/// Populating a filter table implicitly flips the matching `allow_*_filtering`/`allow_arp_cache`
/// flag to `true`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Features {
    /// Accept traffic addressed to 127.0.0.0/8.
    pub allow_any_localhost: bool,
    /// Accept any multicast-addressed traffic.
    pub allow_any_multicast: bool,
    /// Accept the limited broadcast address (255.255.255.255).
    pub allow_any_broadcast: bool,
    /// Consult the MAC filter table during Ethernet acceptance.
    pub allow_mac_filtering: bool,
    /// Consult the IPv4 filter table during IPv4 acceptance.
    pub allow_ip_filtering: bool,
    /// Consult the ARP cache for destination MAC resolution.
    pub allow_arp_cache: bool,
    /// Reject VLAN-tagged frames whose VLAN ID does not match [`VLAN_ID`].
    pub allow_vlan_filtering: bool,
}

impl Default for Features {
    fn default() -> Self {
        Features {
            allow_any_localhost: ALLOW_ANY_LOCALHOST,
            allow_any_multicast: ALLOW_ANY_MULTICAST,
            allow_any_broadcast: ALLOW_ANY_BROADCAST,
            allow_mac_filtering: USE_MAC_FILTER,
            allow_ip_filtering: USE_IP_FILTER,
            allow_arp_cache: USE_ARP_CACHE,
            allow_vlan_filtering: USE_VLAN,
        }
    }
}
