//! Press configuration parameters
//!
//! Read-only after boot.  Values can be overridden from storage via
//! [`ConfigPort`](crate::app::ports::ConfigPort); every load is validated
//! before it reaches the controllers.

use serde::{Deserialize, Serialize};

use crate::drivers::relay::Level;
use crate::error::{Error, Result};
use crate::pins;

/// How the press cylinder is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActuationType {
    Pneumatic,
    Hydraulic,
}

/// Core press configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressConfig {
    // --- Actuation ---
    pub actuation: ActuationType,
    /// Cylinder travel time for a pneumatic press (milliseconds)
    pub travel_time_pneumatic_ms: u32,
    /// Cylinder travel time for a hydraulic press (milliseconds)
    pub travel_time_hydraulic_ms: u32,

    // --- Temperature bounds ---
    /// Lowest accepted target temperature (Celsius)
    pub min_temp_c: f32,
    /// Highest accepted target temperature; also the heater cutoff (Celsius)
    pub max_temp_c: f32,
    /// Target offered to a fresh session (Celsius)
    pub default_temp_c: f32,

    // --- Duration bounds ---
    pub min_duration_secs: u16,
    pub max_duration_secs: u16,
    pub default_duration_secs: u16,

    // --- Ramp ---
    /// Width of the ramp window below target (Celsius)
    pub ramp_start_c: f32,
    /// Duty fraction at the bottom of the ramp window
    pub ramp_percent_start: f32,
    /// Duty fraction just below target
    pub ramp_percent_end: f32,

    // --- Timing ---
    /// Duty-cycle slot length (milliseconds)
    pub control_tick_ms: u32,
    /// Loop cadence after a failed relay update (milliseconds)
    pub retry_tick_ms: u32,
    /// Outbound temperature snapshot interval (milliseconds)
    pub snapshot_interval_ms: u32,
    /// Button line poll period (milliseconds)
    pub button_poll_ms: u32,
    /// Start button settle time (milliseconds)
    pub start_settle_ms: u32,
    /// Emergency line must read released this long before it clears (milliseconds)
    pub emergency_release_ms: u32,
    /// Consecutive loop failures tolerated before a forced heater stop
    pub max_loop_failures: u8,
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            // Actuation
            actuation: ActuationType::Pneumatic,
            travel_time_pneumatic_ms: 3_000,
            travel_time_hydraulic_ms: 10_000,

            // Temperature (±350 °F ceiling)
            min_temp_c: 0.0,
            max_temp_c: 176.7,
            default_temp_c: 101.667,

            // Duration
            min_duration_secs: 0,
            max_duration_secs: 600,
            default_duration_secs: 60,

            // Ramp
            ramp_start_c: 7.0,
            ramp_percent_start: 0.6,
            ramp_percent_end: 0.35,

            // Timing
            control_tick_ms: 100,
            retry_tick_ms: 1_000,
            snapshot_interval_ms: 1_000,
            button_poll_ms: 50,
            start_settle_ms: 200,
            emergency_release_ms: 500,
            max_loop_failures: 5,
        }
    }
}

impl PressConfig {
    /// Travel time for the configured actuation type.
    pub fn travel_time_ms(&self) -> u32 {
        match self.actuation {
            ActuationType::Pneumatic => self.travel_time_pneumatic_ms,
            ActuationType::Hydraulic => self.travel_time_hydraulic_ms,
        }
    }

    /// Movement profile for the configured actuation type.
    pub fn profile(&self) -> PressProfile {
        PressProfile::for_actuation(self.actuation, self.travel_time_ms())
    }

    /// Reject inconsistent values.  Invalid ranges are errors, never clamped.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_temp_c < self.max_temp_c) {
            return Err(Error::Config("min_temp_c must be below max_temp_c"));
        }
        if !(self.min_temp_c..=self.max_temp_c).contains(&self.default_temp_c) {
            return Err(Error::Config("default_temp_c must lie within the temperature bounds"));
        }
        if self.min_duration_secs >= self.max_duration_secs {
            return Err(Error::Config("min_duration_secs must be below max_duration_secs"));
        }
        if !(self.min_duration_secs..=self.max_duration_secs)
            .contains(&self.default_duration_secs)
        {
            return Err(Error::Config("default_duration_secs must lie within the duration bounds"));
        }
        if self.ramp_start_c <= 0.0 {
            return Err(Error::Config("ramp_start_c must be positive"));
        }
        if !(0.0..=1.0).contains(&self.ramp_percent_start)
            || !(0.0..=1.0).contains(&self.ramp_percent_end)
        {
            return Err(Error::Config("ramp percentages must be 0.0–1.0"));
        }
        if self.ramp_percent_end > self.ramp_percent_start {
            return Err(Error::Config("ramp_percent_end must not exceed ramp_percent_start"));
        }
        if self.control_tick_ms == 0 || self.retry_tick_ms < self.control_tick_ms {
            return Err(Error::Config("retry_tick_ms must be at least control_tick_ms"));
        }
        if self.control_tick_ms > 100 {
            return Err(Error::Config("control_tick_ms above 100 misses the cancel deadline"));
        }
        if self.button_poll_ms == 0 || self.button_poll_ms > self.control_tick_ms {
            return Err(Error::Config("button_poll_ms must be 1..=control_tick_ms"));
        }
        if self.travel_time_pneumatic_ms == 0 || self.travel_time_hydraulic_ms == 0 {
            return Err(Error::Config("travel times must be non-zero"));
        }
        if self.max_loop_failures == 0 {
            return Err(Error::Config("max_loop_failures must be at least 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Movement profile
// ---------------------------------------------------------------------------

/// One step of a close/open sequence: drive `relays` to `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceStep {
    pub relays: &'static [u8],
    pub level: Level,
}

impl SequenceStep {
    const fn new(relays: &'static [u8], level: Level) -> Self {
        Self { relays, level }
    }
}

/// Immutable, process-wide movement description.
///
/// Each sequence is pre-position, active movement, de-energize.  The
/// travel wait sits between the second and third step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressProfile {
    pub actuation: ActuationType,
    pub close: [SequenceStep; 3],
    pub open: [SequenceStep; 3],
    pub travel_time_ms: u32,
}

const RETRACT: &[u8] = &pins::RELAY_RETRACT;
const EXTEND: &[u8] = &pins::RELAY_EXTEND;
const NONE: &[u8] = &[];

impl PressProfile {
    pub const fn for_actuation(actuation: ActuationType, travel_time_ms: u32) -> Self {
        match actuation {
            // The pneumatic cylinder holds pressure while the extend
            // valves stay energised; opening just vents them.
            ActuationType::Pneumatic => Self {
                actuation,
                close: [
                    SequenceStep::new(NONE, Level::Low),
                    SequenceStep::new(EXTEND, Level::High),
                    SequenceStep::new(NONE, Level::Low),
                ],
                open: [
                    SequenceStep::new(NONE, Level::Low),
                    SequenceStep::new(EXTEND, Level::Low),
                    SequenceStep::new(NONE, Level::Low),
                ],
                travel_time_ms,
            },
            ActuationType::Hydraulic => Self {
                actuation,
                close: [
                    SequenceStep::new(RETRACT, Level::Low),
                    SequenceStep::new(EXTEND, Level::High),
                    SequenceStep::new(EXTEND, Level::Low),
                ],
                open: [
                    SequenceStep::new(EXTEND, Level::Low),
                    SequenceStep::new(RETRACT, Level::High),
                    SequenceStep::new(RETRACT, Level::Low),
                ],
                travel_time_ms,
            },
        }
    }

    /// Bitmask covering every relay this profile ever drives.
    pub fn movement_mask(&self) -> u8 {
        self.close
            .iter()
            .chain(self.open.iter())
            .flat_map(|s| s.relays.iter())
            .fold(0u8, |m, &i| m | (1 << i))
    }
}
