//! Pinport Multiplexer Core
//!
//! This crate is the host-side resource-arbitration and dispatch layer for
//! the pinport I/O board. It consumes decoded incoming events (produced by
//! the transport's codec, which lives elsewhere) and routes each one to the
//! right in-process claim, while tracking the connection lifecycle and
//! per-resource ownership.
//!
//! # Architecture
//!
//! Many independent requests may queue against the same physical pin or
//! UART module, and the device acknowledges configuration changes
//! asynchronously. Each resource therefore carries a [`ClaimQueue`]: claims
//! wait in registration order, and the head becomes the owner only when the
//! device's own acknowledgment event arrives. That reservation-before-
//! activation discipline is what keeps the host's ownership model and the
//! hardware mux in lockstep across reconfiguration, soft reset, and abrupt
//! disconnect.
//!
//! - [`Dispatcher`] — the single entry point: an exhaustive routing table
//!   from decoded events to arbitration and lifecycle actions, plus the
//!   blocking [`await_connected`](Dispatcher::await_connected) /
//!   [`await_disconnected`](Dispatcher::await_disconnected) waits.
//! - [`PinClaim`] / [`UartClaim`] — the callback surface toward application
//!   code.
//! - [`run_event_pump`] — drains a channel of decoded events into the
//!   dispatcher on a dedicated thread.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pinport_mux::{Dispatcher, PinClaim};
//! use pinport_protocol::{DeviceEvent, PinMode};
//!
//! struct LogClaim;
//!
//! impl PinClaim for LogClaim {
//!     fn opened(&self, mode: PinMode) { println!("opened as {mode}"); }
//!     fn closed(&self) { println!("closed"); }
//!     fn lost(&self) { println!("lost"); }
//!     fn set_value(&self, value: u16) { println!("sample {value}"); }
//! }
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.register_pin_claim(3, Arc::new(LogClaim)).unwrap();
//!
//! // Events normally arrive from the transport's decode thread
//! dispatcher
//!     .process_event(DeviceEvent::ConnectionEstablished {
//!         hardware_id: 1,
//!         bootloader_id: 1,
//!         firmware_id: 1,
//!     })
//!     .unwrap();
//! dispatcher
//!     .process_event(DeviceEvent::SetPinAnalogIn { pin: 3 })
//!     .unwrap();
//! ```

pub mod claim;
pub mod dispatcher;
pub mod error;
pub mod link;
pub mod pins;
pub mod pump;
pub mod queue;
pub mod uart;

pub use claim::{PinClaim, UartClaim};
pub use dispatcher::Dispatcher;
pub use error::{ConnectionFailed, DispatchError, ResourceId};
pub use link::{DeviceIds, LinkState};
pub use pins::PinArbiter;
pub use pump::{run_event_pump, spawn_event_pump};
pub use queue::{ClaimQueue, QueueViolation};
pub use uart::UartArbiter;
