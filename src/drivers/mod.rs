//! Hardware drivers: shared bus, relay bank, operator buttons.

pub mod bus;
pub mod button;
pub mod relay;
