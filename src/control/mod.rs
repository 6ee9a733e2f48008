//! Platen heat control: ramp law, duty schedule and the regulator loop.

pub mod duty;
pub mod temperature;
