//! Ramp law and the ten-slot duty schedule.
//!
//! ```text
//!  duty
//!  1.0 ┤━━━━━━━━━┓
//!      │         ┃
//!  0.6 ┤         ┗━━━━━━━━━┓ (linear taper)
//! 0.35 ┤                    ━━━━┓
//!  0.0 ┤                        ┗━━━━━━━
//!      └─────────┬──────────────┬────────▶ current
//!          target − ramp     target
//! ```

use crate::config::PressConfig;

/// Slots per schedule; one slot per control tick.
pub const SLOTS: usize = 10;

/// Duty fraction as a function of distance below target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampLaw {
    pub ramp_start_c: f32,
    pub percent_start: f32,
    pub percent_end: f32,
}

impl RampLaw {
    pub fn from_config(config: &PressConfig) -> Self {
        Self {
            ramp_start_c: config.ramp_start_c,
            percent_start: config.ramp_percent_start,
            percent_end: config.ramp_percent_end,
        }
    }

    /// Fraction of the next window the heater should be on, 0.0–1.0.
    ///
    /// A zero current or target reading means "unknown" and yields 0.
    pub fn percentage(&self, current: f32, target: f32) -> f32 {
        if current >= target || current == 0.0 || target == 0.0 {
            return 0.0;
        }
        let window_floor = target - self.ramp_start_c;
        if current <= window_floor {
            return 1.0;
        }
        let progress = (current - window_floor) / self.ramp_start_c;
        self.percent_start - (self.percent_start - self.percent_end) * progress
    }
}

/// Ordered on/off slots consumed one per control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutySchedule {
    slots: [bool; SLOTS],
    cursor: usize,
}

impl DutySchedule {
    /// Heat-on slots first: slot `i` is on unless `percentage·10 ≤ i`.
    pub fn from_percentage(percentage: f32) -> Self {
        let scaled = percentage * SLOTS as f32;
        Self {
            slots: core::array::from_fn(|i| scaled > i as f32),
            cursor: 0,
        }
    }

    /// An already-consumed schedule; the next tick resamples.
    pub const fn exhausted() -> Self {
        Self {
            slots: [false; SLOTS],
            cursor: SLOTS,
        }
    }

    /// Take the next slot, or `None` once all ten are used.
    pub fn next_slot(&mut self) -> Option<bool> {
        let slot = self.slots.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(slot)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= SLOTS
    }

    pub fn on_slots(&self) -> usize {
        self.slots.iter().filter(|&&on| on).count()
    }

    pub fn slots(&self) -> &[bool; SLOTS] {
        &self.slots
    }
}

impl Default for DutySchedule {
    fn default() -> Self {
        Self::exhausted()
    }
}
