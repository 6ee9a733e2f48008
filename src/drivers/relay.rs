//! Relay bank behind an MCP23008-style 8-bit GPIO expander.
//!
//! ## Register map
//!
//! | Register | Addr | Use                                   |
//! |----------|------|---------------------------------------|
//! | IODIR    | 0x00 | direction, written once to all-output |
//! | GPIO     | 0x09 | relay outputs, one bit per relay      |
//!
//! ## Verified writes
//!
//! Every [`RelayController::set_relays`] call is a read-modify-write-verify
//! exchange under one bus lock:
//!
//! ```text
//!  read GPIO ──▶ updated = cur ^ ((-level ^ cur) & mask) ──▶ write ──▶ read back
//!                                                                      │
//!                                            mismatch ◀── compare ─────┘
//! ```
//!
//! Bits outside `mask` are never touched.  Any failure triggers a
//! diagnostic bus scan before the error propagates.
//!
//! ## Movement
//!
//! Close/open run the profile's pre-position and movement steps, then park
//! the de-energize step in a single motion slot until travel time elapses.
//! The dwell timer shares the same slot, so arming either always cancels
//! whatever was pending.

use core::cell::Cell;
use core::fmt;

use embedded_hal::i2c::I2c;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{PressProfile, SequenceStep};
use crate::drivers::bus::HardwareBus;
use crate::error::{Device, Error, Result};
use crate::pins;
use crate::scheduler::OneShot;

const REG_IODIR: u8 = 0x00;
const REG_GPIO: u8 = 0x09;

/// Target level for a set of relay bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// All-ones for `High`, zero for `Low` (the `-level` term of the toggle).
    const fn fill(self) -> u8 {
        match self {
            Self::Low => 0x00,
            Self::High => 0xFF,
        }
    }
}

impl From<bool> for Level {
    fn from(on: bool) -> Self {
        if on { Self::High } else { Self::Low }
    }
}

// ---------------------------------------------------------------------------
// Register value
// ---------------------------------------------------------------------------

/// The expander's 8-bit output register.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelayBitmask(u8);

impl RelayBitmask {
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn is_set(self, index: u8) -> bool {
        index < 8 && self.0 & (1 << index) != 0
    }

    /// Force every bit in `mask` to `level`, leaving the rest unchanged.
    pub const fn apply(self, mask: u8, level: Level) -> Self {
        Self(self.0 ^ ((level.fill() ^ self.0) & mask))
    }

    /// Bit 0 first, as shown on the operator UI.
    pub fn to_array(self) -> [bool; 8] {
        core::array::from_fn(|i| self.0 & (1 << i) != 0)
    }
}

impl fmt::Debug for RelayBitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelayBitmask(0b{:08b})", self.0)
    }
}

/// Fold relay indices into a bitmask, rejecting anything past bit 7.
pub fn mask_of(indices: &[u8]) -> Result<u8> {
    indices.iter().try_fold(0u8, |mask, &i| {
        if i >= 8 {
            Err(Error::InvalidRelayIndex(i))
        } else {
            Ok(mask | (1 << i))
        }
    })
}

// ---------------------------------------------------------------------------
// Motion slot
// ---------------------------------------------------------------------------

/// What a completed motion slot reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    /// Close travel elapsed and the de-energize step was applied.
    Closed,
    /// Open travel elapsed and the de-energize step was applied.
    Opened,
    /// The pressing dwell ran out.  No actuation.
    DwellElapsed,
}

#[derive(Debug, Clone, Copy)]
enum Motion {
    Travel { event: MotionEvent, finish: SequenceStep },
    Dwell,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct RelayController<'a, I2C> {
    bus: &'a HardwareBus<I2C>,
    addr: u8,
    profile: PressProfile,
    motion: OneShot<Motion>,
    /// Last verified register value.
    state: Cell<RelayBitmask>,
}

impl<'a, I2C: I2c> RelayController<'a, I2C> {
    pub fn new(bus: &'a HardwareBus<I2C>, profile: PressProfile) -> Self {
        Self {
            bus,
            addr: pins::RELAY_EXPANDER_ADDR,
            profile,
            motion: OneShot::new("relay-motion"),
            state: Cell::new(RelayBitmask::default()),
        }
    }

    pub fn profile(&self) -> &PressProfile {
        &self.profile
    }

    /// Last register value confirmed by a verification read.
    pub fn state(&self) -> RelayBitmask {
        self.state.get()
    }

    // ── Initialisation ────────────────────────────────────────

    /// Set every expander pin to output.  Failure is fatal for the relay bank.
    pub fn configure(&self) -> Result<()> {
        self.bus
            .write(Device::RelayExpander, self.addr, &[REG_IODIR, 0x00])
            .inspect_err(|_| {
                self.bus.scan();
            })
    }

    /// Configure, zero the outputs and read back the initial register.
    pub fn start(&self) -> Result<RelayBitmask> {
        self.configure()?;
        let initial = self.guarded(|| {
            self.bus
                .write(Device::RelayExpander, self.addr, &[REG_GPIO, 0x00])?;
            let value = self.read_register()?;
            if value != 0 {
                return Err(Error::HardwareStateMismatch {
                    expected: 0,
                    actual: value,
                });
            }
            Ok(RelayBitmask::new(value))
        })?;
        self.state.set(initial);
        info!("Relays: expander ready at 0x{:02x}, {:?}", self.addr, initial);
        Ok(initial)
    }

    // ── Core primitive ────────────────────────────────────────

    /// Drive every relay in `indices` to `level`, leaving the others alone.
    ///
    /// An empty set performs no bus traffic at all.
    pub fn set_relays(&self, indices: &[u8], level: Level) -> Result<RelayBitmask> {
        if indices.is_empty() {
            return Ok(self.state.get());
        }
        let mask = mask_of(indices)?;

        let updated = self.guarded(|| {
            self.bus.exchange(Device::RelayExpander, |i2c| {
                let mut cur = [0u8; 1];
                i2c.write_read(self.addr, &[REG_GPIO], &mut cur)?;
                let updated = RelayBitmask::new(cur[0]).apply(mask, level).bits();
                i2c.write(self.addr, &[REG_GPIO, updated])?;
                let mut back = [0u8; 1];
                i2c.write_read(self.addr, &[REG_GPIO], &mut back)?;
                Ok((updated, back[0]))
            })
            .and_then(|(expected, actual)| {
                if expected == actual {
                    Ok(RelayBitmask::new(actual))
                } else {
                    warn!("Relays: wrote 0b{expected:08b}, read back 0b{actual:08b}");
                    Err(Error::HardwareStateMismatch { expected, actual })
                }
            })
        })?;

        debug!("Relays: {:?} -> {:?} = {:?}", indices, level, updated);
        self.state.set(updated);
        Ok(updated)
    }

    /// Read the output register without modifying it.
    pub fn read_state(&self) -> Result<RelayBitmask> {
        let value = self.guarded(|| self.read_register())?;
        self.state.set(RelayBitmask::new(value));
        Ok(RelayBitmask::new(value))
    }

    // ── Movement ──────────────────────────────────────────────

    /// Start closing.  Resolves through [`poll_motion`](Self::poll_motion).
    pub fn close_press(&mut self, now_ms: u32) -> Result<()> {
        info!("Relays: closing press ({:?})", self.profile.actuation);
        let steps = self.profile.close;
        self.begin_travel(now_ms, &steps, MotionEvent::Closed)
    }

    /// Start opening.  Resolves through [`poll_motion`](Self::poll_motion).
    pub fn open_press(&mut self, now_ms: u32) -> Result<()> {
        info!("Relays: opening press ({:?})", self.profile.actuation);
        let steps = self.profile.open;
        self.begin_travel(now_ms, &steps, MotionEvent::Opened)
    }

    /// Arm the pressing dwell.  Pure timer, no actuation.
    pub fn start_press(&mut self, now_ms: u32, duration_secs: u16) {
        info!("Relays: holding for {}s", duration_secs);
        self.motion
            .arm(now_ms, u32::from(duration_secs) * 1000, Motion::Dwell);
    }

    /// Fire the pending motion step once its deadline passes.
    pub fn poll_motion(&mut self, now_ms: u32) -> Result<Option<MotionEvent>> {
        match self.motion.take_due(now_ms) {
            None => Ok(None),
            Some(Motion::Dwell) => Ok(Some(MotionEvent::DwellElapsed)),
            Some(Motion::Travel { event, finish }) => {
                self.set_relays(finish.relays, finish.level)?;
                debug!("Relays: travel complete ({:?})", event);
                Ok(Some(event))
            }
        }
    }

    /// Drop whatever wait is pending without running its final step.
    pub fn cancel_motion(&mut self) {
        self.motion.cancel();
    }

    pub fn is_moving(&self) -> bool {
        self.motion.is_armed()
    }

    /// Milliseconds until the pending motion step, if any.
    pub fn motion_remaining_ms(&self, now_ms: u32) -> Option<u32> {
        self.motion.remaining_ms(now_ms)
    }

    // ── Heat plates ───────────────────────────────────────────

    pub fn start_top_heat_plate(&self) -> Result<RelayBitmask> {
        self.set_relays(&[pins::RELAY_TOP_HEATER], Level::High)
    }

    pub fn stop_top_heat_plate(&self) -> Result<RelayBitmask> {
        self.set_relays(&[pins::RELAY_TOP_HEATER], Level::Low)
    }

    pub fn start_bottom_heat_plate(&self) -> Result<RelayBitmask> {
        self.set_relays(&[pins::RELAY_BOTTOM_HEATER], Level::High)
    }

    pub fn stop_bottom_heat_plate(&self) -> Result<RelayBitmask> {
        self.set_relays(&[pins::RELAY_BOTTOM_HEATER], Level::Low)
    }

    /// Clear both heater bits in one verified write.
    pub fn stop_heat_plates(&self) -> Result<RelayBitmask> {
        self.set_relays(
            &[pins::RELAY_TOP_HEATER, pins::RELAY_BOTTOM_HEATER],
            Level::Low,
        )
    }

    // ── Internal ──────────────────────────────────────────────

    fn begin_travel(
        &mut self,
        now_ms: u32,
        steps: &[SequenceStep; 3],
        event: MotionEvent,
    ) -> Result<()> {
        // A failed step must not leave an older wait behind.
        self.motion.cancel();
        self.set_relays(steps[0].relays, steps[0].level)?;
        self.set_relays(steps[1].relays, steps[1].level)?;
        self.motion.arm(
            now_ms,
            self.profile.travel_time_ms,
            Motion::Travel {
                event,
                finish: steps[2],
            },
        );
        Ok(())
    }

    fn read_register(&self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.bus
            .write_read(Device::RelayExpander, self.addr, &[REG_GPIO], &mut buf)?;
        Ok(buf[0])
    }

    /// Run `f`; on any failure scan the bus before handing the error back.
    fn guarded<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        f().inspect_err(|e| {
            warn!("Relays: {e}, scanning bus");
            self.bus.scan();
        })
    }
}
