//! Pinport Protocol Types
//!
//! This crate provides the typed model of decoded incoming frames for the
//! pinport I/O-board host stack. The transport layer (USB/Bluetooth/serial)
//! and the byte-level codec live elsewhere; by the time an event reaches this
//! crate it is already a [`DeviceEvent`] with typed fields.
//!
//! # Architecture
//!
//! - [`DeviceEvent`] is a closed enum with one variant per incoming frame
//!   kind. Consumers match it exhaustively, so adding a frame kind is a
//!   compile-checked obligation on every dispatcher rather than a silently
//!   ignored default case.
//! - [`PinMode`], [`Pull`] and [`Parity`] give wire fields a typed rendering,
//!   with fallible conversions from the raw encodings.
//! - Board geometry is fixed at compile time: [`PIN_COUNT`] pins and
//!   [`UART_MODULE_COUNT`] UART modules.
//!
//! # Example
//!
//! ```rust
//! use pinport_protocol::{DeviceEvent, PinMode};
//!
//! let event = DeviceEvent::SetPinAnalogIn { pin: 3 };
//! assert_eq!(event.kind(), "set pin analog in");
//! assert_eq!(event.pin(), Some(3));
//! ```

pub mod display;
pub mod error;
pub mod event;

pub use error::FieldError;
pub use event::DeviceEvent;

/// Number of physical pins the board exposes
pub const PIN_COUNT: usize = 48;

/// Number of hardware UART modules on the board
pub const UART_MODULE_COUNT: usize = 4;

/// Hardware function a pin can be switched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PinMode {
    /// Digital input (level or change-notify sampling)
    DigitalIn,
    /// Digital output (push-pull or open-drain)
    DigitalOut,
    /// Analog input (ADC sampling)
    AnalogIn,
    /// Routed to a UART module (rx or tx side)
    Uart,
    /// Routed to an SPI module
    Spi,
    /// Routed to an I2C module
    I2c,
}

impl PinMode {
    /// Returns a human-readable name for the mode
    pub fn name(&self) -> &'static str {
        match self {
            PinMode::DigitalIn => "digital in",
            PinMode::DigitalOut => "digital out",
            PinMode::AnalogIn => "analog in",
            PinMode::Uart => "uart",
            PinMode::Spi => "spi",
            PinMode::I2c => "i2c",
        }
    }

    /// Returns whether the device reports samples for pins in this mode
    pub fn is_input(&self) -> bool {
        matches!(self, PinMode::DigitalIn | PinMode::AnalogIn)
    }
}

/// Pull resistor configuration for a digital input pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Pull {
    /// No pull resistor
    Floating,
    /// Weak pull-up
    Up,
    /// Weak pull-down
    Down,
}

impl TryFrom<u8> for Pull {
    type Error = FieldError;

    fn try_from(raw: u8) -> Result<Self, FieldError> {
        match raw {
            0 => Ok(Pull::Floating),
            1 => Ok(Pull::Up),
            2 => Ok(Pull::Down),
            other => Err(FieldError::Pull(other)),
        }
    }
}

/// UART parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parity {
    /// No parity bit
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

impl TryFrom<u8> for Parity {
    type Error = FieldError;

    fn try_from(raw: u8) -> Result<Self, FieldError> {
        match raw {
            0 => Ok(Parity::None),
            1 => Ok(Parity::Even),
            2 => Ok(Parity::Odd),
            other => Err(FieldError::Parity(other)),
        }
    }
}
