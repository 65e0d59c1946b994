//! Traffic statistics: a tree of accept/reject and byte/frame counts kept
//! alongside the engine's own state.
//!
//! Every counter is a plain [`u32`] (wrapping on overflow, never panicking)
//! so the structure can be read by value at any time without locking.

/// Bytes and frames moved in one direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Throughput {
    /// Total bytes.
    pub bytes: u32,
    /// Total frames/packets/datagrams.
    pub count: u32,
}

impl Throughput {
    /// Record one unit of `len` bytes, wrapping both counters on overflow.
    pub fn record(&mut self, len: usize) {
        self.bytes = self.bytes.wrapping_add(len as u32);
        self.count = self.count.wrapping_add(1);
    }
}

/// Transmit and receive [`Throughput`] for one layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirectionalThroughput {
    /// Transmitted.
    pub tx: Throughput,
    /// Received.
    pub rx: Throughput,
}

/// Accept/reject counts for one layer's acceptance pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerResult {
    /// Accepted.
    pub accepted: u32,
    /// Rejected for any reason.
    pub rejected: u32,
}

impl LayerResult {
    /// Record an accept.
    pub fn accept(&mut self) {
        self.accepted = self.accepted.wrapping_add(1);
    }

    /// Record a reject.
    pub fn reject(&mut self) {
        self.rejected = self.rejected.wrapping_add(1);
    }
}

/// A generic named counter with a single running total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counter {
    /// Running total.
    pub value: u32,
}

impl Counter {
    /// Increment by one, wrapping on overflow.
    pub fn increment(&mut self) {
        self.value = self.value.wrapping_add(1);
    }

    /// Increment by `n`, wrapping on overflow.
    pub fn add(&mut self, n: u32) {
        self.value = self.value.wrapping_add(n);
    }
}

/// ARP-specific counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArpCounter {
    /// Cache lookups that found a match.
    pub lookups: Counter,
    /// Announcements sent.
    pub announces: Counter,
    /// Entries successfully inserted into the cache.
    pub additions: Counter,
    /// Entries evicted or overwritten in the cache.
    pub removals: Counter,
    /// Requests or replies received (parsed but not acted on).
    pub received: Counter,
    /// Cache lookups that found no match.
    pub misses: Counter,
}

/// Frame-buffer acquire/release counters, shared by every layer that takes a
/// buffer from the host via [`crate::external::ExternalInterface::acquire`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameAllocatorCounter {
    /// Successful acquisitions.
    pub acquires: Counter,
    /// Releases back to the host.
    pub releases: Counter,
    /// Acquisitions the host refused.
    pub failures: Counter,
}

/// Per-frame-kind accept/reject counters for the Ethernet layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameCounter {
    /// IPv4 frames.
    pub ipv4: LayerResult,
    /// ARP frames.
    pub arp: LayerResult,
    /// Frames of any other ethertype.
    pub other: LayerResult,
}

/// The full statistics tree for one [`crate::engine::Engine`] instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Ethernet-layer throughput.
    pub ethernet: DirectionalThroughput,
    /// Ethernet-layer accept/reject counts by frame kind.
    pub frames: FrameCounter,
    /// IPv4-layer throughput.
    pub ipv4: DirectionalThroughput,
    /// IPv4-layer accept/reject counts.
    pub ipv4_result: LayerResult,
    /// UDP-layer throughput.
    pub udp: DirectionalThroughput,
    /// UDP-layer accept/reject counts.
    pub udp_result: LayerResult,
    /// ARP activity.
    pub arp: ArpCounter,
    /// IGMP messages sent.
    pub igmp_sent: Counter,
    /// Non-`Ok` statuses reported via [`crate::external::ExternalInterface::report`].
    pub reports: Counter,
    /// Frame-buffer acquisitions/releases across every layer.
    pub frame_allocator: FrameAllocatorCounter,
}
