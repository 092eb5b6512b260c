//! Claim callback traits
//!
//! A claim is the application's request for ownership of one physical
//! resource. The application constructs the claim, keeps its own `Arc`, and
//! registers a shared handle with the dispatcher; the arbiter holds that
//! handle only while the claim is queued and invokes the callbacks below
//! from the dispatch thread.
//!
//! Callbacks take `&self`: a claim that needs to record state uses interior
//! mutability. None of the callbacks may block; they run on the thread that
//! drains the transport.

use pinport_protocol::PinMode;

/// Callbacks for a claim on a physical pin
///
/// Lifecycle: zero or more `opened`/`closed` pairs while the claim is at the
/// head of its pin's queue, with `set_value` calls only between an `opened`
/// and the matching `closed`. `lost` replaces any further callbacks once the
/// link drops with the claim still queued.
pub trait PinClaim: Send + Sync {
    /// The device acknowledged the pin is now in `mode` and this claim owns it
    fn opened(&self, mode: PinMode);

    /// The pin left the claimed mode; ownership is released
    fn closed(&self);

    /// The link dropped while this claim was queued or open
    fn lost(&self);

    /// A sample arrived for the owned pin (digital levels arrive as 0/1)
    fn set_value(&self, value: u16);
}

impl std::fmt::Debug for dyn PinClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PinClaim")
    }
}

/// Callbacks for a claim on a UART module
///
/// UART ownership is release-by-pop: when the module is shut down the claim
/// is simply removed from the queue, with no callback. Delivery callbacks
/// fire only while the claim owns the module.
pub trait UartClaim: Send + Sync {
    /// Bytes received on the owned module
    fn data_received(&self, data: &[u8]);

    /// Transmit-buffer space report for the owned module
    fn buffer_remaining(&self, bytes: usize);

    /// The link dropped while this claim was queued or open
    fn lost(&self);
}
