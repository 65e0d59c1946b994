//! A no-std, panic-never, heapless IPv4/UDP ethernet stack for hosts that own
//! their own MAC.
//!
//! The host supplies frame buffers, a transmit primitive, a receive
//! primitive, a monotonic clock, and a printer/report pair through
//! [`external::ExternalInterface`]; this crate supplies the interpretation of
//! the wire and the dispatch of UDP datagrams through [`engine::Engine`].
//!
//! Makes use of const generics to size the MAC/IPv4/ARP tables and the frame
//! buffer without an allocator.
//!
//! ```rust
//! use embernet::{IpV4Addr, MacAddr};
//! use embernet::engine::{Engine, Interface};
//!
//! # struct NullDriver;
//! # impl embernet::external::ExternalInterface for NullDriver {
//! #     fn acquire(&mut self) -> embernet::error::Status { embernet::error::Status::Ok }
//! #     fn release(&mut self) {}
//! #     fn receive(&mut self, _buffer: &mut [u8]) -> Result<usize, embernet::error::Status> { Ok(0) }
//! #     fn transmit(&mut self, _frame: &[u8]) -> embernet::error::Status { embernet::error::Status::Ok }
//! #     fn get_monotonic_timestamp(&mut self) -> i64 { 0 }
//! #     fn print(&mut self, _level: embernet::metadata::PrintLevel, _layer: embernet::metadata::PrintLayer, _message: &str) {}
//! #     fn report(&mut self, _layer: embernet::metadata::PrintLayer, _status: embernet::error::Status) {}
//! #     fn receive_udp(&mut self, _core: &mut embernet::engine::Core, _metadata: &embernet::metadata::Metadata, _payload: &[u8]) -> embernet::error::Status { embernet::error::Status::Ok }
//! # }
//! let interface = Interface {
//!     mac: MacAddr::new([0x02, 0xAF, 0xFF, 0x1A, 0xE5, 0x3C]),
//!     ip: IpV4Addr::new([10, 0, 0, 120]),
//!     netmask: IpV4Addr::new([255, 255, 255, 0]),
//!     gateway: IpV4Addr::new([10, 0, 0, 1]),
//! };
//! let mut engine = Engine::new(interface, NullDriver).unwrap();
//! engine.run_once();
//! ```

#![no_std]
#![allow(dead_code)]
#![deny(missing_docs)]
#![feature(generic_const_exprs)]
#![allow(incomplete_features)]

#[cfg(feature = "panic_never")]
use panic_never as _;

pub use byte_struct::{ByteStruct, ByteStructLen};
pub use ufmt::{derive::uDebug, uDebug, uDisplay, uWrite};

pub mod addr; // Address classification/derivation primitives
pub mod arp; // Address Resolution Protocol
pub mod checksum; // RFC 1071 one's-complement checksum
pub mod counters; // Traffic/acceptance statistics
pub mod engine; // The stack instance: lifecycle, receive pump, transmit API
pub mod enet; // Link layer
pub mod error; // The crate's single Status/error type
pub mod external; // Driver-facing callback trait
pub mod features; // Compile-time defaults and the runtime Features flags
pub mod filter; // MAC/IPv4 filter tables and the ARP cache
pub mod icmp; // Internet Control Message Protocol (echo request ingest only)
pub mod igmp; // Internet Group Management Protocol v2 (report/leave emission)
pub mod ip; // Internet layer
pub mod metadata; // Per-datagram metadata and diagnostic tags
pub mod udp; // Transport layer

/// Standard 6-byte MAC address.
/// Split 24/24 format, Block ID | Device ID.
/// Locally-administered addresses are `[0x02, ...]`, `[0x06, ...]`, `[0x0A, ...]`, `[0x0E, ...]`.
pub type MacAddr = ByteArray<6>;

impl MacAddr {
    /// New from bytes.
    pub fn new(v: [u8; 6]) -> Self {
        ByteArray(v)
    }

    /// Broadcast address (all ones).
    pub const BROADCAST: MacAddr = ByteArray([0xFF_u8; 6]);

    /// Unspecified local address (all zeroes) -- the sentinel used where a
    /// MAC is absent, e.g. a filter-table/ARP-cache miss.
    pub const ANY: MacAddr = ByteArray([0x0_u8; 6]);
}

/// IPv4 address as bytes.
pub type IpV4Addr = ByteArray<4>;

impl IpV4Addr {
    /// New from bytes.
    pub fn new(v: [u8; 4]) -> Self {
        ByteArray(v)
    }

    /// Limited broadcast address, 255.255.255.255.
    pub const BROADCAST: IpV4Addr = ByteArray([0xFF_u8; 4]);

    /// The default-route sentinel (0.0.0.0) returned on an IPv4 filter/ARP
    /// cache miss.
    pub const ANY: IpV4Addr = ByteArray([0x0_u8; 4]);

    /// Localhost, 127.0.0.1.
    pub const LOCALHOST: IpV4Addr = ByteArray([127, 0, 0, 1]);
}

/// Newtype for `[u8; N]` in order to be able to implement foreign traits on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ByteArray<const N: usize>(pub [u8; N]);

impl<const N: usize> ByteStructLen for ByteArray<N> {
    const BYTE_LEN: usize = N;
}

impl<const N: usize> ByteStruct for ByteArray<N> {
    fn read_bytes(bytes: &[u8]) -> Self {
        let mut out = [0_u8; N];
        out.copy_from_slice(&bytes[0..N]);
        ByteArray(out)
    }

    fn write_bytes(&self, bytes: &mut [u8]) {
        bytes[0..N].copy_from_slice(&self.0);
    }
}

impl<const N: usize> From<[u8; N]> for ByteArray<N> {
    fn from(v: [u8; N]) -> Self {
        ByteArray(v)
    }
}

impl<const N: usize> Default for ByteArray<N> {
    fn default() -> Self {
        ByteArray([0_u8; N])
    }
}

impl uDebug for ByteArray<4> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        <[u8; 4] as uDebug>::fmt(&self.0, f)
    }
}

impl uDebug for ByteArray<6> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        <[u8; 6] as uDebug>::fmt(&self.0, f)
    }
}
