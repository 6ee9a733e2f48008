//! RosinPress controller library.
//!
//! Exposes the press logic for integration testing and for the firmware
//! binary.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; everything else runs
//! on the host against any `embedded_hal::i2c::I2c` implementation.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod safety;
pub mod scheduler;

pub mod adapters;
pub mod control;
pub mod drivers;
pub mod sensors;

pub use error::{Error, Result};
