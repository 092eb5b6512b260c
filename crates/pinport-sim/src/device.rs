//! Virtual device simulation
//!
//! Generates the decoded event stream a real board would produce, from
//! scripting calls. The device tracks which mode it has "granted" each pin
//! so scripts emit acknowledgments in the same order hardware would.

use std::collections::{HashMap, VecDeque};

use pinport_protocol::{DeviceEvent, Parity, PinMode, Pull};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for creating a virtual device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualDeviceConfig {
    /// Hardware revision identifier reported on handshake
    pub hardware_id: u32,
    /// Bootloader version identifier reported on handshake
    pub bootloader_id: u32,
    /// Firmware version identifier reported on handshake
    pub firmware_id: u32,
}

impl Default for VirtualDeviceConfig {
    fn default() -> Self {
        Self {
            hardware_id: 0x0010,
            bootloader_id: 0x0102,
            firmware_id: 0x0311,
        }
    }
}

/// A simulated I/O board that emits decoded events
#[derive(Debug)]
pub struct VirtualDevice {
    config: VirtualDeviceConfig,
    /// Mode each pin has been switched to, absent = default function
    pin_modes: HashMap<usize, PinMode>,
    /// Rate each UART module was last configured with
    uart_rates: HashMap<usize, u32>,
    /// Events not yet taken by the test or pump
    pending: VecDeque<DeviceEvent>,
}

impl VirtualDevice {
    /// Create a virtual device with default identifiers
    pub fn new() -> Self {
        Self::with_config(VirtualDeviceConfig::default())
    }

    /// Create with custom identifiers
    pub fn with_config(config: VirtualDeviceConfig) -> Self {
        Self {
            config,
            pin_modes: HashMap::new(),
            uart_rates: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    /// Complete the connection handshake
    pub fn establish(&mut self) {
        self.emit(DeviceEvent::ConnectionEstablished {
            hardware_id: self.config.hardware_id,
            bootloader_id: self.config.bootloader_id,
            firmware_id: self.config.firmware_id,
        });
    }

    /// Drop the link abruptly
    pub fn drop_link(&mut self) {
        self.pin_modes.clear();
        self.uart_rates.clear();
        self.emit(DeviceEvent::ConnectionLost);
    }

    /// Soft reset: every pin returns to its default function, link stays up
    pub fn soft_reset(&mut self) {
        self.pin_modes.clear();
        self.uart_rates.clear();
        self.emit(DeviceEvent::SoftReset);
    }

    /// Acknowledge a pin switching to digital output
    pub fn open_digital_out(&mut self, pin: usize, value: bool, open_drain: bool) {
        self.pin_modes.insert(pin, PinMode::DigitalOut);
        self.emit(DeviceEvent::SetPinDigitalOut {
            pin,
            value,
            open_drain,
        });
    }

    /// Acknowledge a pin switching to change-notify digital input.
    ///
    /// Two frames, in hardware order: the mode change (which releases any
    /// previous owner), then change-notify enable (which grants ownership).
    pub fn open_digital_in(&mut self, pin: usize, pull: Pull) {
        self.pin_modes.insert(pin, PinMode::DigitalIn);
        self.emit(DeviceEvent::SetPinDigitalIn { pin, pull });
        self.emit(DeviceEvent::SetChangeNotify { pin, enabled: true });
    }

    /// Acknowledge a pin switching to analog input
    pub fn open_analog_in(&mut self, pin: usize) {
        self.pin_modes.insert(pin, PinMode::AnalogIn);
        self.emit(DeviceEvent::SetPinAnalogIn { pin });
    }

    /// Acknowledge a pin binding to a UART module's receive side
    pub fn bind_uart_rx(&mut self, pin: usize, uart: usize) {
        self.pin_modes.insert(pin, PinMode::Uart);
        self.emit(DeviceEvent::SetPinUartRx {
            pin,
            uart,
            enable: true,
        });
    }

    /// Release a pin back to its default function (digital input, floating)
    pub fn close_pin(&mut self, pin: usize) {
        self.pin_modes.remove(&pin);
        self.emit(DeviceEvent::SetPinDigitalIn {
            pin,
            pull: Pull::Floating,
        });
    }

    /// Acknowledge a UART module configuration; rate 0 shuts the module down
    pub fn configure_uart(&mut self, uart: usize, rate: u32) {
        if rate == 0 {
            self.uart_rates.remove(&uart);
        } else {
            self.uart_rates.insert(uart, rate);
        }
        self.emit(DeviceEvent::UartConfigure {
            uart,
            rate,
            speed_4x: false,
            two_stop_bits: false,
            parity: Parity::None,
        });
    }

    /// Bytes received on a UART module
    pub fn uart_rx(&mut self, uart: usize, data: &[u8]) {
        self.emit(DeviceEvent::UartData {
            uart,
            data: data.to_vec(),
        });
    }

    /// Transmit-buffer space report for a UART module
    pub fn uart_tx_space(&mut self, uart: usize, bytes_remaining: usize) {
        self.emit(DeviceEvent::UartTxStatus {
            uart,
            bytes_remaining,
        });
    }

    /// Level report for a change-notify pin
    pub fn report_digital(&mut self, pin: usize, level: bool) {
        self.emit(DeviceEvent::DigitalInStatus { pin, level });
    }

    /// Batched analog report; one event with parallel arrays
    pub fn report_analog(&mut self, readings: &[(usize, u16)]) {
        self.emit(DeviceEvent::AnalogInStatus {
            pins: readings.iter().map(|(pin, _)| *pin).collect(),
            values: readings.iter().map(|(_, value)| *value).collect(),
        });
    }

    /// Mode the device last granted to `pin`, if any
    pub fn pin_mode(&self, pin: usize) -> Option<PinMode> {
        self.pin_modes.get(&pin).copied()
    }

    /// Rate a UART module is currently configured with, if enabled
    pub fn uart_rate(&self, uart: usize) -> Option<u32> {
        self.uart_rates.get(&uart).copied()
    }

    /// Take the oldest pending event
    pub fn take_event(&mut self) -> Option<DeviceEvent> {
        self.pending.pop_front()
    }

    /// Take every pending event, oldest first
    pub fn drain(&mut self) -> Vec<DeviceEvent> {
        self.pending.drain(..).collect()
    }

    fn emit(&mut self, event: DeviceEvent) {
        debug!(%event, "virtual device emits");
        self.pending.push_back(event);
    }
}

impl Default for VirtualDevice {
    fn default() -> Self {
        Self::new()
    }
}
