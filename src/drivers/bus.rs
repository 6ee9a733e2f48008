//! Exclusive access to the shared I2C transport.
//!
//! The relay expander and both thermocouple amplifiers hang off one bus.
//! Every exchange runs to completion inside a single `lock` scope, so a
//! relay read-modify-write can never interleave with a sensor sample.
//!
//! ```text
//!  RelayController ──┐
//!                    ├──▶ HardwareBus::exchange(|i2c| ...) ──▶ I2C
//!  Thermocouple ×2 ──┘        (critical-section mutex)
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::i2c::{Error as _, I2c};
use heapless::Vec;
use log::{info, warn};

use crate::error::{Device, Error, Result};

/// First and last 7-bit addresses probed by [`HardwareBus::scan`].
const SCAN_FIRST: u8 = 0x03;
const SCAN_LAST: u8 = 0x77;

pub struct HardwareBus<I2C> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<I2C>>,
}

impl<I2C: I2c> HardwareBus<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(i2c)),
        }
    }

    /// Run `f` with exclusive access to the transport.
    ///
    /// Transport errors are logged and mapped to
    /// [`Error::I2cCommunication`] for `device`.
    pub fn exchange<R>(
        &self,
        device: Device,
        f: impl FnOnce(&mut I2C) -> core::result::Result<R, I2C::Error>,
    ) -> Result<R> {
        self.inner
            .lock(|cell| f(&mut cell.borrow_mut()))
            .map_err(|e| {
                warn!("I2C: {} transaction failed: {:?}", device, e.kind());
                Error::I2cCommunication(device)
            })
    }

    /// Single write transaction.
    pub fn write(&self, device: Device, addr: u8, bytes: &[u8]) -> Result<()> {
        self.exchange(device, |i2c| i2c.write(addr, bytes))
    }

    /// Register-pointer write followed by a repeated-start read.
    pub fn write_read(&self, device: Device, addr: u8, bytes: &[u8], buf: &mut [u8]) -> Result<()> {
        self.exchange(device, |i2c| i2c.write_read(addr, bytes, buf))
    }

    /// Probe every 7-bit address with an empty write and log who answers.
    ///
    /// Diagnostic only; the result never feeds back into control.
    pub fn scan(&self) -> Vec<u8, 128> {
        let found = self.inner.lock(|cell| {
            let mut i2c = cell.borrow_mut();
            let mut found = Vec::new();
            for addr in SCAN_FIRST..=SCAN_LAST {
                if i2c.write(addr, &[]).is_ok() {
                    // Capacity covers the whole probe range.
                    let _ = found.push(addr);
                }
            }
            found
        });
        info!("I2C scan: {} device(s) responding {:02x?}", found.len(), found.as_slice());
        found
    }
}
