//! Heater safety: over-temperature cutoff and bounded-failure supervisor.
//!
//! Both run inside the temperature loop on every control tick, before the
//! duty schedule is applied.
//!
//! ## Cutoff
//!
//! [`ThermalCutoff::evaluate`] trips whenever either platen reads above
//! the configured maximum.  While tripped, both heater relays are forced
//! off that same tick, whatever the schedule says.
//!
//! ## Failure budget
//!
//! The loop backs off after a failed relay update, but it must not leave
//! the heaters in an unknown state forever.  [`FailureSupervisor`] counts
//! consecutive failures; hitting the limit forces a stop attempt.

use log::{error, info, warn};

/// Latched over-temperature detector with edge logging.
#[derive(Debug)]
pub struct ThermalCutoff {
    max_temp_c: f32,
    tripped: bool,
}

impl ThermalCutoff {
    pub fn new(max_temp_c: f32) -> Self {
        Self {
            max_temp_c,
            tripped: false,
        }
    }

    /// Re-evaluate against the latest readings.  Returns `true` while tripped.
    pub fn evaluate(&mut self, top_c: f32, bottom_c: f32) -> bool {
        let over = top_c > self.max_temp_c || bottom_c > self.max_temp_c;
        if over && !self.tripped {
            error!(
                "SAFETY: over temperature (top {:.1}, bottom {:.1}, max {:.1}), heaters off",
                top_c, bottom_c, self.max_temp_c
            );
        } else if !over && self.tripped {
            info!("SAFETY: temperatures back under {:.1}\u{00b0}C", self.max_temp_c);
        }
        self.tripped = over;
        over
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }
}

/// Counts consecutive loop failures against a fixed budget.
#[derive(Debug)]
pub struct FailureSupervisor {
    limit: u8,
    consecutive: u8,
    total: u32,
}

impl FailureSupervisor {
    pub fn new(limit: u8) -> Self {
        Self {
            limit: limit.max(1),
            consecutive: 0,
            total: 0,
        }
    }

    pub fn record_success(&mut self) {
        if self.consecutive > 0 {
            info!("Heater loop recovered after {} failure(s)", self.consecutive);
        }
        self.consecutive = 0;
    }

    /// Count one failure.  Returns `true` when the budget is spent; the
    /// counter then restarts so the caller gets a fresh budget.
    pub fn record_failure(&mut self) -> bool {
        self.total = self.total.saturating_add(1);
        self.consecutive = self.consecutive.saturating_add(1);
        if self.consecutive >= self.limit {
            warn!(
                "Heater loop: {} consecutive failures, forcing heater stop",
                self.consecutive
            );
            self.consecutive = 0;
            true
        } else {
            false
        }
    }

    pub fn consecutive(&self) -> u8 {
        self.consecutive
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}
