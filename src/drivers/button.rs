//! Debounced start / emergency-stop interlock.
//!
//! ## Hardware
//!
//! Two active-low lines with external pull-ups: logic 0 = depressed.
//! Both are sampled by [`ButtonLines::read`] from the main loop at the
//! button poll period; [`ButtonInterlock::sample`] turns raw levels into
//! signals for the orchestrator.
//!
//! ## Signal rules
//!
//! | Line      | Engage                   | Release                          |
//! |-----------|--------------------------|----------------------------------|
//! | Emergency | any low (or failed) read | high continuously for release_ms |
//! | Start     | falling edge + settle    | —                                |
//!
//! The start trigger is suppressed while emergency is engaged, checked on
//! the edge and again when the settle timer fires.  Neither line actuates
//! anything on its own.

use embedded_hal::digital::InputPin;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::PressConfig;
use crate::scheduler::OneShot;

/// Raw logic levels from one poll.  `None` means the read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineLevels {
    pub start: Option<bool>,
    pub emergency: Option<bool>,
}

impl LineLevels {
    /// Both buttons released.
    pub const RELEASED: Self = Self {
        start: Some(true),
        emergency: Some(true),
    };
}

/// Debounced button state, reported outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InterlockState {
    pub start_depressed: bool,
    pub emergency_depressed: bool,
}

/// Per-sample output of the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterlockSignals {
    pub emergency_engaged: bool,
    /// The debounced emergency boolean flipped on this sample.
    pub emergency_changed: bool,
    /// A settled start press, already vetted against the emergency line.
    pub start_trigger: bool,
}

pub struct ButtonInterlock {
    release_ms: u32,
    settle_ms: u32,
    emergency_engaged: bool,
    /// When the emergency line was first seen released in the current run.
    released_since: Option<u32>,
    start_depressed: bool,
    settle: OneShot<()>,
}

impl ButtonInterlock {
    /// Starts engaged: the emergency line has to prove itself released.
    pub fn new(config: &PressConfig) -> Self {
        Self {
            release_ms: config.emergency_release_ms,
            settle_ms: config.start_settle_ms,
            emergency_engaged: true,
            released_since: None,
            // A button held through boot must be released before it counts.
            start_depressed: true,
            settle: OneShot::new("start-settle"),
        }
    }

    /// Feed one poll worth of line levels.
    pub fn sample(&mut self, now_ms: u32, levels: LineLevels) -> InterlockSignals {
        let was_engaged = self.emergency_engaged;

        // ── Emergency line (fail-safe) ────────────────────────────
        let emergency_low = match levels.emergency {
            Some(high) => !high,
            None => {
                warn!("Interlock: emergency line read failed, treating as engaged");
                true
            }
        };
        if emergency_low {
            self.released_since = None;
            self.emergency_engaged = true;
            if self.settle.cancel().is_some() {
                info!("Interlock: pending start dropped by emergency stop");
            }
        } else {
            let since = *self.released_since.get_or_insert(now_ms);
            if self.emergency_engaged && now_ms.wrapping_sub(since) >= self.release_ms {
                self.emergency_engaged = false;
            }
        }
        if self.emergency_engaged != was_engaged {
            if self.emergency_engaged {
                warn!("Interlock: EMERGENCY STOP engaged");
            } else {
                info!("Interlock: emergency stop released");
            }
        }

        // ── Start line ────────────────────────────────────────────
        if let Some(high) = levels.start {
            let pressed = !high;
            if pressed && !self.start_depressed {
                if self.emergency_engaged {
                    info!("Interlock: emergency stop engaged, start ignored");
                } else {
                    self.settle.arm(now_ms, self.settle_ms, ());
                }
            }
            self.start_depressed = pressed;
        }

        let mut start_trigger = false;
        if self.settle.take_due(now_ms).is_some() {
            if self.emergency_engaged {
                info!("Interlock: emergency stop engaged, start ignored");
            } else {
                start_trigger = true;
            }
        }

        InterlockSignals {
            emergency_engaged: self.emergency_engaged,
            emergency_changed: self.emergency_engaged != was_engaged,
            start_trigger,
        }
    }

    pub fn emergency_engaged(&self) -> bool {
        self.emergency_engaged
    }

    pub fn state(&self) -> InterlockState {
        InterlockState {
            start_depressed: self.start_depressed,
            emergency_depressed: self.emergency_engaged,
        }
    }
}

// ---------------------------------------------------------------------------
// GPIO adapter
// ---------------------------------------------------------------------------

/// Reads the two button pins into [`LineLevels`].
pub struct ButtonLines<S, E> {
    start: S,
    emergency: E,
}

impl<S: InputPin, E: InputPin> ButtonLines<S, E> {
    pub fn new(start: S, emergency: E) -> Self {
        Self { start, emergency }
    }

    pub fn read(&mut self) -> LineLevels {
        LineLevels {
            start: self.start.is_high().ok(),
            emergency: self.emergency.is_high().ok(),
        }
    }
}
