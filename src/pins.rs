//! GPIO pin assignments and I2C addresses for the press controller board.
//!
//! Every driver references this module rather than hard-coding numbers.

// ---------------------------------------------------------------------------
// Operator buttons (active-low, external pull-ups)
// ---------------------------------------------------------------------------

/// Momentary start button.  Falling edge requests a press.
pub const START_BUTTON_GPIO: i32 = 17;
/// Latching emergency stop.  LOW = engaged.
pub const EMERGENCY_BUTTON_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// I²C bus (relay expander + both thermocouple amplifiers)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// Standard-mode bus clock.
pub const I2C_BAUD_HZ: u32 = 100_000;

/// MCP23008 8-bit GPIO expander driving the relay board.
pub const RELAY_EXPANDER_ADDR: u8 = 0x20;
/// Thermocouple amplifier on the top platen.
pub const TOP_SENSOR_ADDR: u8 = 0x67;
/// Thermocouple amplifier on the bottom platen.
pub const BOTTOM_SENSOR_ADDR: u8 = 0x60;

// ---------------------------------------------------------------------------
// Relay bit assignments
// ---------------------------------------------------------------------------

/// Hydraulic retract valves.
pub const RELAY_RETRACT: [u8; 2] = [0, 1];
/// Extend valves (pneumatic and hydraulic).
pub const RELAY_EXTEND: [u8; 2] = [2, 3];
pub const RELAY_TOP_HEATER: u8 = 4;
pub const RELAY_BOTTOM_HEATER: u8 = 5;
