//! Single-shot deadline slots.
//!
//! Every wait in the controller (travel time, dwell, duty tick, retry
//! backoff, button settle) is a named [`OneShot`] slot polled from the
//! main loop.  Nothing sleeps.
//!
//! ```text
//!   arm(now, delay, payload) ──▶ [ deadline | payload ] ──take_due(now)──▶ Some(payload)
//!          ▲                              │
//!          └── replaces (cancels) ────────┘
//! ```
//!
//! A slot holds at most one pending action.  Arming an occupied slot
//! cancels the previous occupant first, so a superseded action can never
//! fire late.  Deadlines are wrapping `u32` milliseconds (≈49.7 days).

use log::trace;

/// `true` once `now_ms` is at or past `deadline_ms`, tolerant of wrap.
pub fn deadline_reached(now_ms: u32, deadline_ms: u32) -> bool {
    (now_ms.wrapping_sub(deadline_ms) as i32) >= 0
}

/// A named slot holding one pending deadline and its payload.
#[derive(Debug)]
pub struct OneShot<T> {
    label: &'static str,
    pending: Option<(u32, T)>,
}

impl<T> OneShot<T> {
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            pending: None,
        }
    }

    /// Schedule `payload` to fire `delay_ms` after `now_ms`.
    ///
    /// Any previously armed payload is dropped without firing.
    pub fn arm(&mut self, now_ms: u32, delay_ms: u32, payload: T) {
        if self.pending.is_some() {
            trace!("{}: replacing pending action", self.label);
        }
        self.pending = Some((now_ms.wrapping_add(delay_ms), payload));
    }

    /// Clear the slot.  Returns the payload that will now never fire.
    pub fn cancel(&mut self) -> Option<T> {
        let prev = self.pending.take().map(|(_, p)| p);
        if prev.is_some() {
            trace!("{}: cancelled", self.label);
        }
        prev
    }

    /// Fire the slot if its deadline has passed.  Fires at most once.
    pub fn take_due(&mut self, now_ms: u32) -> Option<T> {
        match self.pending {
            Some((deadline, _)) if deadline_reached(now_ms, deadline) => {
                self.pending.take().map(|(_, p)| p)
            }
            _ => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<u32> {
        self.pending.as_ref().map(|(d, _)| *d)
    }

    /// Pending payload, if any.
    pub fn payload(&self) -> Option<&T> {
        self.pending.as_ref().map(|(_, p)| p)
    }

    /// Milliseconds until the deadline (0 once due), or `None` if idle.
    pub fn remaining_ms(&self, now_ms: u32) -> Option<u32> {
        self.deadline().map(|d| {
            if deadline_reached(now_ms, d) {
                0
            } else {
                d.wrapping_sub(now_ms)
            }
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}
