//! Application core: press orchestration behind port traits.
//!
//! This module holds the business rules for the press: phase sequencing,
//! start guards, command validation and persistence of finished presses.
//! Everything outside the I2C bus is reached through the **port traits**
//! in [`ports`], so the core runs unchanged against in-memory adapters.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
