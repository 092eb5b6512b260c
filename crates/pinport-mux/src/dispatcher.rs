//! Event dispatcher
//!
//! The single entry point for decoded incoming events. Each event maps to
//! exactly one arbitration or lifecycle action; the match is exhaustive, so
//! a new frame kind cannot be added to the protocol crate without deciding
//! its behavior here.
//!
//! # Locking
//!
//! One mutex guards everything the dispatch thread and waiting application
//! threads share: link state, device ids, and both arbiters. Queue mutation
//! happens under the lock; claim callbacks are collected and fired after the
//! lock is released, so a callback can re-enter the dispatcher (to register
//! a follow-up claim, say) without deadlocking. Waiters are woken under the
//! lock on every lifecycle transition.
//!
//! # Threading
//!
//! [`process_event`](Dispatcher::process_event) is meant to be called from
//! one thread — the transport's decode thread. The mutex makes concurrent
//! calls memory-safe, but callback ordering is only meaningful with a single
//! caller. `register_*` and the blocking waits are free-threaded.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use pinport_protocol::{DeviceEvent, PinMode};
use tracing::{debug, error, info, warn};

use crate::claim::{PinClaim, UartClaim};
use crate::error::{ConnectionFailed, DispatchError};
use crate::link::{DeviceIds, LinkState};
use crate::pins::PinArbiter;
use crate::uart::UartArbiter;

/// Everything under the dispatcher's single lock
struct Shared {
    link: LinkState,
    device: Option<DeviceIds>,
    pins: PinArbiter,
    uarts: UartArbiter,
}

/// A claim callback collected under the lock, fired after release
enum Notify {
    PinOpened(Arc<dyn PinClaim>, PinMode),
    PinClosed(Arc<dyn PinClaim>),
    PinLost(Arc<dyn PinClaim>),
    PinValue(Arc<dyn PinClaim>, u16),
    UartData(Arc<dyn UartClaim>, Vec<u8>),
    UartFlow(Arc<dyn UartClaim>, usize),
    UartLost(Arc<dyn UartClaim>),
}

impl Notify {
    fn fire(self) {
        match self {
            Notify::PinOpened(claim, mode) => claim.opened(mode),
            Notify::PinClosed(claim) => claim.closed(),
            Notify::PinLost(claim) => claim.lost(),
            Notify::PinValue(claim, value) => claim.set_value(value),
            Notify::UartData(claim, data) => claim.data_received(&data),
            Notify::UartFlow(claim, bytes) => claim.buffer_remaining(bytes),
            Notify::UartLost(claim) => claim.lost(),
        }
    }
}

/// Routes decoded events to the arbiters and the link lifecycle
pub struct Dispatcher {
    shared: Mutex<Shared>,
    link_changed: Condvar,
}

impl Dispatcher {
    /// Create a dispatcher with queues for the board's full geometry
    pub fn new() -> Self {
        Self {
            shared: Mutex::new(Shared {
                link: LinkState::Uninitialized,
                device: None,
                pins: PinArbiter::new(),
                uarts: UartArbiter::new(),
            }),
            link_changed: Condvar::new(),
        }
    }

    /// Queue a claim for a pin. Callable from any thread, before or after
    /// the matching mode-change request goes out to the device.
    pub fn register_pin_claim(
        &self,
        pin: usize,
        claim: Arc<dyn PinClaim>,
    ) -> Result<(), DispatchError> {
        self.shared.lock().pins.register(pin, claim)
    }

    /// Queue a claim for a UART module. Callable from any thread.
    pub fn register_uart_claim(
        &self,
        uart: usize,
        claim: Arc<dyn UartClaim>,
    ) -> Result<(), DispatchError> {
        self.shared.lock().uarts.register(uart, claim)
    }

    /// Dispatch one decoded event.
    ///
    /// Fatal errors (desync) close the link before returning: every queued
    /// claim observes `lost()` and blocked waiters wake. Non-fatal errors
    /// ([`Unsupported`](DispatchError::Unsupported)) leave all state
    /// untouched.
    pub fn process_event(&self, event: DeviceEvent) -> Result<(), DispatchError> {
        debug!(%event, "dispatch");

        let mut notifies = Vec::new();
        let result = {
            let mut shared = self.shared.lock();
            let result = self.route(&mut shared, event, &mut notifies);
            if let Err(err) = &result {
                if err.is_fatal() {
                    error!("{err}; closing link");
                    self.close_link(&mut shared, &mut notifies);
                }
            }
            result
        };

        for notify in notifies {
            notify.fire();
        }
        result
    }

    /// Block until the link leaves `Uninitialized`.
    ///
    /// Returns `Ok` if a handshake ever completed — even if the link has
    /// since closed — and [`ConnectionFailed`] if it closed without one.
    pub fn await_connected(&self) -> Result<(), ConnectionFailed> {
        let mut shared = self.shared.lock();
        while shared.link == LinkState::Uninitialized {
            self.link_changed.wait(&mut shared);
        }
        if shared.device.is_some() {
            Ok(())
        } else {
            Err(ConnectionFailed)
        }
    }

    /// Block until the link is `Closed`
    pub fn await_disconnected(&self) {
        let mut shared = self.shared.lock();
        while shared.link != LinkState::Closed {
            self.link_changed.wait(&mut shared);
        }
    }

    /// Current lifecycle state
    pub fn link_state(&self) -> LinkState {
        self.shared.lock().link
    }

    /// Whether the link has closed
    pub fn is_closed(&self) -> bool {
        self.link_state() == LinkState::Closed
    }

    /// Identifiers from the connection handshake, if one completed
    pub fn device_ids(&self) -> Option<DeviceIds> {
        self.shared.lock().device
    }

    /// Claims queued on `pin`, or `None` for an out-of-range index
    pub fn pin_claims_waiting(&self, pin: usize) -> Option<usize> {
        self.shared.lock().pins.claims_waiting(pin)
    }

    /// Claims queued on `uart`, or `None` for an out-of-range index
    pub fn uart_claims_waiting(&self, uart: usize) -> Option<usize> {
        self.shared.lock().uarts.claims_waiting(uart)
    }

    fn route(
        &self,
        shared: &mut Shared,
        event: DeviceEvent,
        notifies: &mut Vec<Notify>,
    ) -> Result<(), DispatchError> {
        match event {
            DeviceEvent::ConnectionEstablished {
                hardware_id,
                bootloader_id,
                firmware_id,
            } => {
                if shared.link != LinkState::Uninitialized {
                    warn!(
                        link = shared.link.name(),
                        "connection-established on a live or closed link, ignored"
                    );
                    return Ok(());
                }
                // TODO(fw-policy): validate hardware/firmware/bootloader ids
                // against a compatibility table and refuse mismatches.
                shared.device = Some(DeviceIds {
                    hardware_id,
                    bootloader_id,
                    firmware_id,
                });
                shared.link = LinkState::Connected;
                self.link_changed.notify_all();
                info!(hardware_id, bootloader_id, firmware_id, "device connected");
                Ok(())
            }

            DeviceEvent::ConnectionLost => {
                if shared.link == LinkState::Closed {
                    debug!("connection-lost on a closed link, ignored");
                } else {
                    self.close_link(shared, notifies);
                }
                Ok(())
            }

            DeviceEvent::SoftReset => {
                let closed = shared.pins.reset_open();
                debug!(pins_closed = closed.len(), "soft reset");
                notifies.extend(closed.into_iter().map(Notify::PinClosed));
                Ok(())
            }

            DeviceEvent::SetPinDigitalOut { pin, .. } => {
                self.activate_pin(shared, notifies, pin, PinMode::DigitalOut)
            }

            DeviceEvent::SetPinDigitalIn { pin, .. } => self.deactivate_pin(shared, notifies, pin),

            DeviceEvent::SetChangeNotify { pin, enabled } => {
                if enabled {
                    self.activate_pin(shared, notifies, pin, PinMode::DigitalIn)
                } else {
                    // Disabling change-notify precedes the pin's mode change;
                    // the release happens on the mode-change event itself.
                    Ok(())
                }
            }

            DeviceEvent::SetPinAnalogIn { pin } => {
                self.activate_pin(shared, notifies, pin, PinMode::AnalogIn)
            }

            DeviceEvent::SetPinUartRx { pin, enable, .. }
            | DeviceEvent::SetPinUartTx { pin, enable, .. } => {
                if enable {
                    self.activate_pin(shared, notifies, pin, PinMode::Uart)
                } else {
                    self.deactivate_pin(shared, notifies, pin)
                }
            }

            DeviceEvent::UartConfigure { uart, rate, .. } => {
                if rate == 0 {
                    shared.uarts.deactivate(uart)
                } else {
                    shared.uarts.activate(uart)
                }
            }

            DeviceEvent::UartData { uart, data } => {
                let claim = shared.uarts.deliver(uart)?;
                notifies.push(Notify::UartData(claim, data));
                Ok(())
            }

            DeviceEvent::UartTxStatus {
                uart,
                bytes_remaining,
            } => {
                let claim = shared.uarts.report_flow(uart)?;
                notifies.push(Notify::UartFlow(claim, bytes_remaining));
                Ok(())
            }

            DeviceEvent::DigitalInStatus { pin, level } => {
                let claim = shared.pins.report(pin)?;
                notifies.push(Notify::PinValue(claim, u16::from(level)));
                Ok(())
            }

            DeviceEvent::AnalogInStatus { pins, values } => {
                if pins.len() != values.len() {
                    return Err(DispatchError::MalformedEvent {
                        kind: "analog in status",
                        detail: "parallel pin/value arrays of unequal length",
                    });
                }
                // Resolve the whole batch before delivering any of it, so a
                // desync mid-batch delivers nothing.
                let mut batch = Vec::with_capacity(pins.len());
                for (pin, value) in pins.into_iter().zip(values) {
                    batch.push((shared.pins.report(pin)?, value));
                }
                notifies.extend(
                    batch
                        .into_iter()
                        .map(|(claim, value)| Notify::PinValue(claim, value)),
                );
                Ok(())
            }

            DeviceEvent::RegisterPeriodicDigitalSampling { .. } => {
                Err(DispatchError::Unsupported("periodic digital sampling"))
            }
            DeviceEvent::PeriodicDigitalInStatus { .. } => {
                Err(DispatchError::Unsupported("periodic digital in status"))
            }
            DeviceEvent::SpiConfigureMaster { .. } => {
                Err(DispatchError::Unsupported("spi configure master"))
            }
            DeviceEvent::SetPinSpi { .. } => Err(DispatchError::Unsupported("set pin spi")),
            DeviceEvent::SpiData { .. } => Err(DispatchError::Unsupported("spi data")),
            DeviceEvent::SpiTxStatus { .. } => Err(DispatchError::Unsupported("spi tx status")),
            DeviceEvent::I2cConfigureMaster { .. } => {
                Err(DispatchError::Unsupported("i2c configure master"))
            }
            DeviceEvent::I2cResult { .. } => Err(DispatchError::Unsupported("i2c result")),
        }
    }

    fn activate_pin(
        &self,
        shared: &mut Shared,
        notifies: &mut Vec<Notify>,
        pin: usize,
        mode: PinMode,
    ) -> Result<(), DispatchError> {
        if let Some((claim, mode)) = shared.pins.activate(pin, mode)? {
            notifies.push(Notify::PinOpened(claim, mode));
        }
        Ok(())
    }

    fn deactivate_pin(
        &self,
        shared: &mut Shared,
        notifies: &mut Vec<Notify>,
        pin: usize,
    ) -> Result<(), DispatchError> {
        if let Some(claim) = shared.pins.deactivate(pin)? {
            notifies.push(Notify::PinClosed(claim));
        }
        Ok(())
    }

    /// Terminal transition: sweep both arbiters, close the link, wake
    /// waiters. Idempotent.
    fn close_link(&self, shared: &mut Shared, notifies: &mut Vec<Notify>) {
        if shared.link == LinkState::Closed {
            return;
        }
        let pin_claims = shared.pins.sweep_all();
        let uart_claims = shared.uarts.sweep_all();
        info!(
            pin_claims = pin_claims.len(),
            uart_claims = uart_claims.len(),
            "device link closed"
        );
        notifies.extend(pin_claims.into_iter().map(Notify::PinLost));
        notifies.extend(uart_claims.into_iter().map(Notify::UartLost));
        shared.link = LinkState::Closed;
        self.link_changed.notify_all();
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
