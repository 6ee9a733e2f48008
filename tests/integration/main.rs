//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem against the
//! simulated board in `mock_hw`.  All tests run on the host with no real
//! hardware required.

mod interlock_tests;
mod press_cycle_tests;
mod temperature_tests;
