//! Decoded incoming frame representation
//!
//! One [`DeviceEvent`] per decoded frame, in arrival order. The enum is
//! deliberately closed: the dispatcher matches it exhaustively, so a new
//! frame kind cannot be added without deciding its host-side behavior.

use crate::{Parity, PinMode, Pull};

/// A decoded incoming frame from the I/O board
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceEvent {
    /// Handshake completed; the board identifies itself
    ConnectionEstablished {
        /// Hardware revision identifier
        hardware_id: u32,
        /// Bootloader version identifier
        bootloader_id: u32,
        /// Firmware version identifier
        firmware_id: u32,
    },

    /// The transport layer reports the link is gone
    ConnectionLost,

    /// The board performed a soft reset; all pins return to their default
    /// function but the link stays up
    SoftReset,

    /// A pin was switched to digital output
    SetPinDigitalOut {
        /// Pin index
        pin: usize,
        /// Initial output level
        value: bool,
        /// Open-drain instead of push-pull
        open_drain: bool,
    },

    /// A pin was switched to digital input (its default function)
    SetPinDigitalIn {
        /// Pin index
        pin: usize,
        /// Pull resistor configuration
        pull: Pull,
    },

    /// Change-notify sampling toggled for a digital input pin
    SetChangeNotify {
        /// Pin index
        pin: usize,
        /// Whether the board now reports level changes
        enabled: bool,
    },

    /// Periodic digital sampling registered for a pin
    RegisterPeriodicDigitalSampling {
        /// Pin index
        pin: usize,
        /// Sampling frequency divider
        freq_scale: u8,
    },

    /// A pin was switched to analog input
    SetPinAnalogIn {
        /// Pin index
        pin: usize,
    },

    /// A pin was bound to (or released from) a UART module's receive side
    SetPinUartRx {
        /// Pin index
        pin: usize,
        /// UART module index
        uart: usize,
        /// Bound when true, released when false
        enable: bool,
    },

    /// A pin was bound to (or released from) a UART module's transmit side
    SetPinUartTx {
        /// Pin index
        pin: usize,
        /// UART module index
        uart: usize,
        /// Bound when true, released when false
        enable: bool,
    },

    /// A UART module was configured; rate 0 disables the module
    UartConfigure {
        /// UART module index
        uart: usize,
        /// Baud rate divisor; 0 means the module is being shut down
        rate: u32,
        /// High-speed (4x oversampling) mode
        speed_4x: bool,
        /// Two stop bits instead of one
        two_stop_bits: bool,
        /// Parity setting
        parity: Parity,
    },

    /// Bytes received on a UART module
    UartData {
        /// UART module index
        uart: usize,
        /// Received payload
        data: Vec<u8>,
    },

    /// Transmit buffer occupancy report for a UART module
    UartTxStatus {
        /// UART module index
        uart: usize,
        /// Free space remaining in the board-side transmit buffer
        bytes_remaining: usize,
    },

    /// Level report for a change-notify digital input pin
    DigitalInStatus {
        /// Pin index
        pin: usize,
        /// Sampled level
        level: bool,
    },

    /// Batched periodic digital sample frame
    PeriodicDigitalInStatus {
        /// Frame sequence number
        frame: u32,
        /// Sampled levels, in registration order
        values: Vec<bool>,
    },

    /// Batched analog sample report; `pins` and `values` are parallel arrays
    AnalogInStatus {
        /// Sampled pin indices
        pins: Vec<usize>,
        /// ADC readings, one per entry in `pins`
        values: Vec<u16>,
    },

    /// An SPI module was configured as master
    SpiConfigureMaster {
        /// SPI module index
        spi: usize,
        /// Clock prescaler
        scale: u8,
        /// Clock divider
        div: u8,
        /// Sample on trailing clock edge
        sample_at_end: bool,
        /// Clock edge selection
        clk_edge: bool,
        /// Clock polarity
        clk_pol: bool,
    },

    /// A pin was bound to an SPI module function
    SetPinSpi {
        /// Pin index
        pin: usize,
        /// SPI pin function selector
        mode: u8,
        /// Bound when true, released when false
        enable: bool,
        /// SPI module index
        spi: usize,
    },

    /// Response bytes from an SPI transfer
    SpiData {
        /// SPI module index
        spi: usize,
        /// Slave-select pin the transfer addressed
        ss_pin: usize,
        /// Response payload
        data: Vec<u8>,
    },

    /// Transmit buffer occupancy report for an SPI module
    SpiTxStatus {
        /// SPI module index
        spi: usize,
        /// Free space remaining in the board-side transmit buffer
        bytes_remaining: usize,
    },

    /// An I2C module was configured as master
    I2cConfigureMaster {
        /// I2C module index
        i2c: usize,
        /// Bus rate selector
        rate: u8,
        /// SMBus voltage levels
        smbus_levels: bool,
    },

    /// Result bytes from an I2C transaction
    I2cResult {
        /// I2C module index
        i2c: usize,
        /// Response payload
        data: Vec<u8>,
    },
}

impl DeviceEvent {
    /// Returns a stable human-readable name for the frame kind
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceEvent::ConnectionEstablished { .. } => "connection established",
            DeviceEvent::ConnectionLost => "connection lost",
            DeviceEvent::SoftReset => "soft reset",
            DeviceEvent::SetPinDigitalOut { .. } => "set pin digital out",
            DeviceEvent::SetPinDigitalIn { .. } => "set pin digital in",
            DeviceEvent::SetChangeNotify { .. } => "set change notify",
            DeviceEvent::RegisterPeriodicDigitalSampling { .. } => "periodic digital sampling",
            DeviceEvent::SetPinAnalogIn { .. } => "set pin analog in",
            DeviceEvent::SetPinUartRx { .. } => "set pin uart rx",
            DeviceEvent::SetPinUartTx { .. } => "set pin uart tx",
            DeviceEvent::UartConfigure { .. } => "uart configure",
            DeviceEvent::UartData { .. } => "uart data",
            DeviceEvent::UartTxStatus { .. } => "uart tx status",
            DeviceEvent::DigitalInStatus { .. } => "digital in status",
            DeviceEvent::PeriodicDigitalInStatus { .. } => "periodic digital in status",
            DeviceEvent::AnalogInStatus { .. } => "analog in status",
            DeviceEvent::SpiConfigureMaster { .. } => "spi configure master",
            DeviceEvent::SetPinSpi { .. } => "set pin spi",
            DeviceEvent::SpiData { .. } => "spi data",
            DeviceEvent::SpiTxStatus { .. } => "spi tx status",
            DeviceEvent::I2cConfigureMaster { .. } => "i2c configure master",
            DeviceEvent::I2cResult { .. } => "i2c result",
        }
    }

    /// Returns the pin index if this event targets a single pin
    pub fn pin(&self) -> Option<usize> {
        match self {
            DeviceEvent::SetPinDigitalOut { pin, .. }
            | DeviceEvent::SetPinDigitalIn { pin, .. }
            | DeviceEvent::SetChangeNotify { pin, .. }
            | DeviceEvent::RegisterPeriodicDigitalSampling { pin, .. }
            | DeviceEvent::SetPinAnalogIn { pin }
            | DeviceEvent::SetPinUartRx { pin, .. }
            | DeviceEvent::SetPinUartTx { pin, .. }
            | DeviceEvent::SetPinSpi { pin, .. }
            | DeviceEvent::DigitalInStatus { pin, .. } => Some(*pin),
            _ => None,
        }
    }

    /// Returns the UART module index if this event targets a UART module
    pub fn uart(&self) -> Option<usize> {
        match self {
            DeviceEvent::SetPinUartRx { uart, .. }
            | DeviceEvent::SetPinUartTx { uart, .. }
            | DeviceEvent::UartConfigure { uart, .. }
            | DeviceEvent::UartData { uart, .. }
            | DeviceEvent::UartTxStatus { uart, .. } => Some(*uart),
            _ => None,
        }
    }

    /// Returns whether this event expects a configured pin or UART mode
    /// rather than establishing one
    pub fn is_report(&self) -> bool {
        matches!(
            self,
            DeviceEvent::UartData { .. }
                | DeviceEvent::UartTxStatus { .. }
                | DeviceEvent::DigitalInStatus { .. }
                | DeviceEvent::PeriodicDigitalInStatus { .. }
                | DeviceEvent::AnalogInStatus { .. }
                | DeviceEvent::SpiData { .. }
                | DeviceEvent::SpiTxStatus { .. }
                | DeviceEvent::I2cResult { .. }
        )
    }
}
