//! Pin arbitration
//!
//! One [`ClaimQueue`] per physical pin. The arbiter is pure bookkeeping
//! behind the dispatcher's lock: every method that changes ownership
//! returns the claim handles to notify, and the dispatcher fires the
//! callbacks after releasing the lock.

use std::sync::Arc;

use pinport_protocol::{PinMode, PIN_COUNT};

use crate::claim::PinClaim;
use crate::error::{DispatchError, ResourceId};
use crate::queue::{ClaimQueue, QueueViolation};

fn desync(pin: usize, violation: QueueViolation) -> DispatchError {
    DispatchError::Desync {
        resource: ResourceId::Pin(pin),
        detail: match violation {
            QueueViolation::Empty => "no queued claim",
            QueueViolation::NotOpen => "no open claim",
        },
    }
}

/// Per-pin claim queues for the whole board
pub struct PinArbiter {
    queues: Vec<ClaimQueue<dyn PinClaim>>,
}

impl PinArbiter {
    /// Create queues for every pin the board exposes
    pub fn new() -> Self {
        Self {
            queues: (0..PIN_COUNT).map(|_| ClaimQueue::new()).collect(),
        }
    }

    /// Queue a claim for `pin`. Caller-input error if the index is out of
    /// range; never clamped.
    pub fn register(&mut self, pin: usize, claim: Arc<dyn PinClaim>) -> Result<(), DispatchError> {
        let queue = self
            .queues
            .get_mut(pin)
            .ok_or(DispatchError::PinOutOfRange {
                pin,
                limit: PIN_COUNT,
            })?;
        queue.push(claim);
        Ok(())
    }

    /// Device acknowledged `pin` entering `mode`: open the head claim.
    ///
    /// Returns the claim to notify as `opened(mode)`, or `None` when the
    /// head was already open.
    pub fn activate(
        &mut self,
        pin: usize,
        mode: PinMode,
    ) -> Result<Option<(Arc<dyn PinClaim>, PinMode)>, DispatchError> {
        let queue = self.event_slot(pin)?;
        let opened = queue.open_next().map_err(|v| desync(pin, v))?;
        Ok(opened.map(|claim| (claim, mode)))
    }

    /// Device released `pin`: close and pop the open claim.
    ///
    /// Returns the claim to notify as `closed`, or `None` when nothing was
    /// open on the pin.
    pub fn deactivate(&mut self, pin: usize) -> Result<Option<Arc<dyn PinClaim>>, DispatchError> {
        let queue = self.event_slot(pin)?;
        queue.close_current().map_err(|v| desync(pin, v))
    }

    /// A sample arrived for `pin`; returns the claim to deliver it to
    pub fn report(&self, pin: usize) -> Result<Arc<dyn PinClaim>, DispatchError> {
        let queue = self.queues.get(pin).ok_or(DispatchError::Desync {
            resource: ResourceId::Pin(pin),
            detail: "index outside board geometry",
        })?;
        queue.active().map_err(|v| desync(pin, v))
    }

    /// Link loss: drain every queue, in pin order then FIFO order.
    ///
    /// Returns the claims to notify as `lost`.
    pub fn sweep_all(&mut self) -> Vec<Arc<dyn PinClaim>> {
        self.queues.iter_mut().flat_map(ClaimQueue::drain).collect()
    }

    /// Soft reset: close the open claim on every pin that has one.
    ///
    /// Queues are retained — a reset drops every pin back to its default
    /// function but queued claims are still eligible for the next
    /// activation. Pins with nothing open are skipped, so the broadcast
    /// never desyncs.
    pub fn reset_open(&mut self) -> Vec<Arc<dyn PinClaim>> {
        self.queues
            .iter_mut()
            .filter(|queue| queue.is_open())
            .filter_map(|queue| queue.close_current().ok().flatten())
            .collect()
    }

    /// Number of claims queued on `pin` (the open one included)
    pub fn claims_waiting(&self, pin: usize) -> Option<usize> {
        self.queues.get(pin).map(ClaimQueue::len)
    }

    fn event_slot(&mut self, pin: usize) -> Result<&mut ClaimQueue<dyn PinClaim>, DispatchError> {
        // An event-carried index outside the board is decoder desync, not a
        // caller error.
        self.queues.get_mut(pin).ok_or(DispatchError::Desync {
            resource: ResourceId::Pin(pin),
            detail: "index outside board geometry",
        })
    }
}

impl Default for PinArbiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullClaim;

    impl PinClaim for NullClaim {
        fn opened(&self, _mode: PinMode) {}
        fn closed(&self) {}
        fn lost(&self) {}
        fn set_value(&self, _value: u16) {}
    }

    #[test]
    fn register_out_of_range_is_caller_error() {
        let mut arbiter = PinArbiter::new();
        let err = arbiter.register(PIN_COUNT, Arc::new(NullClaim)).unwrap_err();
        assert_eq!(
            err,
            DispatchError::PinOutOfRange {
                pin: PIN_COUNT,
                limit: PIN_COUNT
            }
        );
    }

    #[test]
    fn activate_out_of_range_is_desync() {
        let mut arbiter = PinArbiter::new();
        let err = arbiter.activate(PIN_COUNT, PinMode::AnalogIn).unwrap_err();
        assert!(matches!(err, DispatchError::Desync { .. }));
    }

    #[test]
    fn activate_empty_pin_is_desync() {
        let mut arbiter = PinArbiter::new();
        let err = arbiter.activate(3, PinMode::DigitalOut).unwrap_err();
        assert_eq!(
            err,
            DispatchError::Desync {
                resource: ResourceId::Pin(3),
                detail: "no queued claim",
            }
        );
    }

    #[test]
    fn reset_open_skips_idle_pins() {
        let mut arbiter = PinArbiter::new();
        arbiter.register(1, Arc::new(NullClaim)).unwrap();
        arbiter.register(2, Arc::new(NullClaim)).unwrap();
        arbiter.activate(1, PinMode::DigitalOut).unwrap();

        // Pin 1 open, pin 2 queued-but-closed, every other pin empty
        let closed = arbiter.reset_open();
        assert_eq!(closed.len(), 1);
        assert_eq!(arbiter.claims_waiting(1), Some(0));
        assert_eq!(arbiter.claims_waiting(2), Some(1));
    }
}
