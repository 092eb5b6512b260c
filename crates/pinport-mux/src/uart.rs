//! UART module arbitration
//!
//! One [`ClaimQueue`] per hardware UART module. UART has a single mode, so
//! activation carries no tag, and release pops the head silently — the
//! claim's own API surface has no close notification, only delivery and
//! loss.

use std::sync::Arc;

use pinport_protocol::UART_MODULE_COUNT;

use crate::claim::UartClaim;
use crate::error::{DispatchError, ResourceId};
use crate::queue::{ClaimQueue, QueueViolation};

fn desync(uart: usize, violation: QueueViolation) -> DispatchError {
    DispatchError::Desync {
        resource: ResourceId::Uart(uart),
        detail: match violation {
            QueueViolation::Empty => "no queued claim",
            QueueViolation::NotOpen => "no open claim",
        },
    }
}

/// Per-module claim queues for the board's UARTs
pub struct UartArbiter {
    queues: Vec<ClaimQueue<dyn UartClaim>>,
}

impl UartArbiter {
    /// Create queues for every UART module the board exposes
    pub fn new() -> Self {
        Self {
            queues: (0..UART_MODULE_COUNT).map(|_| ClaimQueue::new()).collect(),
        }
    }

    /// Queue a claim for `uart`. Caller-input error if the index is out of
    /// range; never clamped.
    pub fn register(
        &mut self,
        uart: usize,
        claim: Arc<dyn UartClaim>,
    ) -> Result<(), DispatchError> {
        let queue = self
            .queues
            .get_mut(uart)
            .ok_or(DispatchError::UartOutOfRange {
                uart,
                limit: UART_MODULE_COUNT,
            })?;
        queue.push(claim);
        Ok(())
    }

    /// Device acknowledged a non-zero rate configuration: open the head claim
    pub fn activate(&mut self, uart: usize) -> Result<(), DispatchError> {
        let queue = self.event_slot(uart)?;
        queue.open_next().map_err(|v| desync(uart, v))?;
        Ok(())
    }

    /// Device acknowledged a zero-rate (shutdown) configuration: pop the
    /// open claim, silently
    pub fn deactivate(&mut self, uart: usize) -> Result<(), DispatchError> {
        let queue = self.event_slot(uart)?;
        queue.close_current().map_err(|v| desync(uart, v))?;
        Ok(())
    }

    /// Received bytes for `uart`; returns the claim to deliver them to
    pub fn deliver(&self, uart: usize) -> Result<Arc<dyn UartClaim>, DispatchError> {
        self.active(uart)
    }

    /// Transmit-buffer report for `uart`; returns the claim to notify
    pub fn report_flow(&self, uart: usize) -> Result<Arc<dyn UartClaim>, DispatchError> {
        self.active(uart)
    }

    /// Link loss: drain every module's queue, FIFO order per module.
    ///
    /// Returns the claims to notify as `lost`.
    pub fn sweep_all(&mut self) -> Vec<Arc<dyn UartClaim>> {
        self.queues.iter_mut().flat_map(ClaimQueue::drain).collect()
    }

    /// Number of claims queued on `uart` (the open one included)
    pub fn claims_waiting(&self, uart: usize) -> Option<usize> {
        self.queues.get(uart).map(ClaimQueue::len)
    }

    fn active(&self, uart: usize) -> Result<Arc<dyn UartClaim>, DispatchError> {
        let queue = self.queues.get(uart).ok_or(DispatchError::Desync {
            resource: ResourceId::Uart(uart),
            detail: "index outside board geometry",
        })?;
        queue.active().map_err(|v| desync(uart, v))
    }

    fn event_slot(&mut self, uart: usize) -> Result<&mut ClaimQueue<dyn UartClaim>, DispatchError> {
        self.queues.get_mut(uart).ok_or(DispatchError::Desync {
            resource: ResourceId::Uart(uart),
            detail: "index outside board geometry",
        })
    }
}

impl Default for UartArbiter {
    fn default() -> Self {
        Self::new()
    }
}
