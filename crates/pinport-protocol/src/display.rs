//! Log-line rendering for decoded events
//!
//! Events render as `kind(field=value, ...)` one-liners. Payload buffers are
//! abbreviated to a length so a UART burst cannot flood a log.

use std::fmt;

use crate::{DeviceEvent, Parity, PinMode, Pull};

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Pull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pull::Floating => f.write_str("floating"),
            Pull::Up => f.write_str("pull-up"),
            Pull::Down => f.write_str("pull-down"),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::None => f.write_str("none"),
            Parity::Even => f.write_str("even"),
            Parity::Odd => f.write_str("odd"),
        }
    }
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceEvent::ConnectionEstablished {
                hardware_id,
                bootloader_id,
                firmware_id,
            } => write!(
                f,
                "connection established(hw={hardware_id}, boot={bootloader_id}, fw={firmware_id})"
            ),
            DeviceEvent::ConnectionLost => f.write_str("connection lost"),
            DeviceEvent::SoftReset => f.write_str("soft reset"),
            DeviceEvent::SetPinDigitalOut {
                pin,
                value,
                open_drain,
            } => write!(
                f,
                "set pin digital out(pin={pin}, value={value}, open_drain={open_drain})"
            ),
            DeviceEvent::SetPinDigitalIn { pin, pull } => {
                write!(f, "set pin digital in(pin={pin}, pull={pull})")
            }
            DeviceEvent::SetChangeNotify { pin, enabled } => {
                write!(f, "set change notify(pin={pin}, enabled={enabled})")
            }
            DeviceEvent::RegisterPeriodicDigitalSampling { pin, freq_scale } => {
                write!(f, "periodic digital sampling(pin={pin}, scale={freq_scale})")
            }
            DeviceEvent::SetPinAnalogIn { pin } => write!(f, "set pin analog in(pin={pin})"),
            DeviceEvent::SetPinUartRx { pin, uart, enable } => {
                write!(f, "set pin uart rx(pin={pin}, uart={uart}, enable={enable})")
            }
            DeviceEvent::SetPinUartTx { pin, uart, enable } => {
                write!(f, "set pin uart tx(pin={pin}, uart={uart}, enable={enable})")
            }
            DeviceEvent::UartConfigure {
                uart,
                rate,
                speed_4x,
                two_stop_bits,
                parity,
            } => write!(
                f,
                "uart configure(uart={uart}, rate={rate}, 4x={speed_4x}, stop2={two_stop_bits}, parity={parity})"
            ),
            DeviceEvent::UartData { uart, data } => {
                write!(f, "uart data(uart={uart}, len={})", data.len())
            }
            DeviceEvent::UartTxStatus {
                uart,
                bytes_remaining,
            } => write!(f, "uart tx status(uart={uart}, remaining={bytes_remaining})"),
            DeviceEvent::DigitalInStatus { pin, level } => {
                write!(f, "digital in status(pin={pin}, level={level})")
            }
            DeviceEvent::PeriodicDigitalInStatus { frame, values } => write!(
                f,
                "periodic digital in status(frame={frame}, samples={})",
                values.len()
            ),
            DeviceEvent::AnalogInStatus { pins, values } => {
                write!(f, "analog in status(")?;
                for (i, (pin, value)) in pins.iter().zip(values.iter()).enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "pin {pin}={value}")?;
                }
                f.write_str(")")
            }
            DeviceEvent::SpiConfigureMaster { spi, scale, div, .. } => {
                write!(f, "spi configure master(spi={spi}, scale={scale}, div={div})")
            }
            DeviceEvent::SetPinSpi {
                pin,
                mode,
                enable,
                spi,
            } => write!(
                f,
                "set pin spi(pin={pin}, mode={mode}, enable={enable}, spi={spi})"
            ),
            DeviceEvent::SpiData { spi, ss_pin, data } => {
                write!(f, "spi data(spi={spi}, ss_pin={ss_pin}, len={})", data.len())
            }
            DeviceEvent::SpiTxStatus {
                spi,
                bytes_remaining,
            } => write!(f, "spi tx status(spi={spi}, remaining={bytes_remaining})"),
            DeviceEvent::I2cConfigureMaster {
                i2c,
                rate,
                smbus_levels,
            } => write!(
                f,
                "i2c configure master(i2c={i2c}, rate={rate}, smbus={smbus_levels})"
            ),
            DeviceEvent::I2cResult { i2c, data } => {
                write!(f, "i2c result(i2c={i2c}, len={})", data.len())
            }
        }
    }
}
