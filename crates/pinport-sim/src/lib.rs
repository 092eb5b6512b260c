//! Pinport Simulation Library
//!
//! This crate provides a simulation layer for testing the pinport host
//! stack without a physical I/O board. It includes:
//!
//! - **VirtualDevice**: emits the same decoded event stream a real board's
//!   codec would, from fluent scripting calls, with a per-pin mode map so
//!   scripts stay self-consistent
//!
//! # Example
//!
//! ```rust
//! use pinport_sim::VirtualDevice;
//!
//! let mut device = VirtualDevice::new();
//! device.establish();
//! device.open_analog_in(3);
//! device.report_analog(&[(3, 512)]);
//!
//! // Feed the pending events to a dispatcher or pump channel
//! while let Some(event) = device.take_event() {
//!     println!("{event}");
//! }
//! ```

pub mod device;

pub use device::{VirtualDevice, VirtualDeviceConfig};
