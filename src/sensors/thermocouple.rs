//! MCP9600-style thermocouple amplifier, one per platen.
//!
//! ## Transactions
//!
//! | Step      | Bytes                              |
//! |-----------|------------------------------------|
//! | configure | `0x05 ← 0x07`, then `0x06 ← 0x7C`  |
//! | sample    | point `0x00`, then 2-byte read     |
//!
//! ## Encoding
//!
//! Hot-junction temperature in 1/16 °C steps.  With the top bit of the
//! first byte clear the value is `b0·16 + b1/16`; with it set the value is
//! `1024 − (b0 & 0x7F)·16 − b1/16`.
//!
//! ## Glitch filter
//!
//! A sample whose two raw bytes match the previous sample exactly is
//! treated as a stalled converter: the stored temperature is kept and the
//! sample is reported as [`SampleOutcome::Stalled`].

use embedded_hal::i2c::I2c;
use log::debug;

use crate::drivers::bus::HardwareBus;
use crate::error::{Device, Result};

use super::Platen;

const REG_HOT_JUNCTION: u8 = 0x00;
const REG_SENSOR_CONFIG: u8 = 0x05;
const REG_DEVICE_CONFIG: u8 = 0x06;

/// Type K thermocouple, filter coefficient 7.
const SENSOR_CONFIG: u8 = 0x07;
/// 0.0625 °C cold-junction resolution, 12-bit ADC, normal mode.
const DEVICE_CONFIG: u8 = 0x7C;

/// Result of one sample transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// A new reading was decoded and stored.
    Fresh(f32),
    /// Raw bytes repeated; the stored temperature was left alone.
    Stalled,
}

/// Decode a raw hot-junction register pair to degrees Celsius.
pub fn decode(raw: [u8; 2]) -> f32 {
    let [b0, b1] = raw;
    let frac = f32::from(b1) / 16.0;
    if b0 & 0x80 != 0 {
        1024.0 - f32::from(b0 & 0x7F) * 16.0 - frac
    } else {
        f32::from(b0) * 16.0 + frac
    }
}

/// Inverse of [`decode`], rounded to the nearest 1/16 °C.
///
/// Covers roughly −1024 to 2048 °C; used by simulated sensors.
pub fn encode(celsius: f32) -> [u8; 2] {
    if celsius >= 0.0 {
        let q = (celsius * 16.0).round().clamp(0.0, 32_767.0) as u16;
        [(q >> 8) as u8, q as u8]
    } else {
        let q = ((1024.0 - celsius) * 16.0).round().clamp(0.0, 32_767.0) as u16;
        [0x80 | (q >> 8) as u8, q as u8]
    }
}

pub struct Thermocouple {
    platen: Platen,
    addr: u8,
    last_raw: Option<[u8; 2]>,
    celsius: f32,
}

impl Thermocouple {
    pub fn new(platen: Platen) -> Self {
        Self {
            platen,
            addr: platen.sensor_addr(),
            last_raw: None,
            celsius: 0.0,
        }
    }

    /// Write the sensor and device configuration registers.
    pub fn configure<I2C: I2c>(&self, bus: &HardwareBus<I2C>) -> Result<()> {
        let device = self.device();
        bus.write(device, self.addr, &[REG_SENSOR_CONFIG, SENSOR_CONFIG])?;
        bus.write(device, self.addr, &[REG_DEVICE_CONFIG, DEVICE_CONFIG])
    }

    /// Point at the hot-junction register and read it, under one bus lock.
    pub fn sample<I2C: I2c>(&mut self, bus: &HardwareBus<I2C>) -> Result<SampleOutcome> {
        let addr = self.addr;
        let raw = bus.exchange(self.device(), |i2c| {
            i2c.write(addr, &[REG_HOT_JUNCTION])?;
            let mut buf = [0u8; 2];
            i2c.write_read(addr, &[REG_HOT_JUNCTION], &mut buf)?;
            Ok(buf)
        })?;

        if self.last_raw == Some(raw) {
            debug!(
                "{:?} sensor: repeated sample {:02x?}, holding {:.2}",
                self.platen, raw, self.celsius
            );
            return Ok(SampleOutcome::Stalled);
        }
        self.last_raw = Some(raw);
        self.celsius = decode(raw);
        Ok(SampleOutcome::Fresh(self.celsius))
    }

    /// Last accepted temperature (0 until the first sample).
    pub fn celsius(&self) -> f32 {
        self.celsius
    }

    pub fn platen(&self) -> Platen {
        self.platen
    }

    fn device(&self) -> Device {
        self.platen.device()
    }
}
