//! The driver-facing trait a host implements to plug a real (or simulated)
//! Ethernet interface into an [`crate::engine::Engine`].
//!
//! The frame-acquire/release pair does not hand back a raw pointer -- the
//! engine owns its frame buffer and only asks the driver to confirm a slot
//! is available (`acquire`) and to signal it is done with one (`release`);
//! `receive`/`transmit` read and write that buffer directly through a slice.

use crate::engine::Core;
use crate::error::Status;
use crate::metadata::{Metadata, PrintLayer, PrintLevel};

/// The set of callbacks a host provides to drive one [`crate::engine::Engine`].
///
/// `receive_udp` and `receive_icmp` are handed `&mut Core` alongside their
/// own `&mut self`: two disjoint borrows (the engine's `external: E` field
/// and its `core: Core` field), so an implementation that wants to reply to
/// an incoming datagram can reenter [`Core::transmit_udp_datagram`] directly
/// from inside the callback, passing itself back in as the driver argument,
/// rather than queuing the reply for a later call.
pub trait ExternalInterface {
    /// Confirm that a frame buffer is available for the engine to write an
    /// outgoing frame into. Returns `Status::OutOfMemory` if none is free.
    fn acquire(&mut self) -> Status;

    /// Signal that the engine is done with the frame buffer claimed by the
    /// most recent `acquire`.
    fn release(&mut self);

    /// Poll the driver for one received frame, if any, writing it into
    /// `buffer` and returning the number of bytes written. Returns `Ok(0)`
    /// (no bytes written) when nothing is waiting.
    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, Status>;

    /// Hand `frame` to the driver for transmission.
    fn transmit(&mut self, frame: &[u8]) -> Status;

    /// The host's current monotonic timestamp, in host-defined units.
    fn get_monotonic_timestamp(&mut self) -> i64;

    /// Emit a free-form diagnostic line at `level` from `layer`. Hosts that
    /// do not want diagnostics may no-op this.
    fn print(&mut self, level: PrintLevel, layer: PrintLayer, message: &str);

    /// Report a non-`Ok` [`Status`] returned by any engine operation, with
    /// the layer that produced it. Called for every rejection and error,
    /// not only fatal ones, so a host can keep its own rejection counters
    /// or logs independent of [`crate::counters::Statistics`].
    fn report(&mut self, layer: PrintLayer, status: Status);

    /// Deliver one received UDP datagram's payload to the host.
    ///
    /// `payload` borrows the engine's receive buffer for the duration of
    /// this call only. `core` is the same engine the datagram arrived on;
    /// it is legal to call `core.transmit_udp_datagram(self, ...)` from
    /// inside this method to send a reply before returning.
    fn receive_udp(&mut self, core: &mut Core, metadata: &Metadata, payload: &[u8]) -> Status;

    /// Deliver one received ICMP echo request's payload to the host.
    /// The default implementation reports `Status::NotImplemented` and
    /// takes no further action -- a host that wants to answer pings
    /// overrides it. `core` carries the same reentrancy guarantee as in
    /// `receive_udp`.
    fn receive_icmp(&mut self, core: &mut Core, metadata: &Metadata, payload: &[u8]) -> Status {
        let _ = (core, metadata, payload);
        Status::NotImplemented
    }
}
