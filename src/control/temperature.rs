//! Platen temperature regulator.
//!
//! One control tick every `control_tick_ms` (100 ms) drives one duty slot
//! per platen.  Every tenth tick the schedules run dry and both sensors are
//! resampled.
//!
//! ```text
//!        ┌────────────────── tick (OneShot) ◀───────────────────┐
//!        ▼                                                      │
//!  heater fault? ──yes──▶ retry stop ─────────────────────────▶ │ 1000 ms
//!        │no                                                    │
//!  schedule dry? ──yes──▶ resample ──fail──▶ stop both ───────▶ │ 1000 ms
//!        │                   │ok                                │
//!        ▼                   ▼                                  │
//!  over max? ──yes──▶ both heaters off ───────────────────────▶ │ 100 ms
//!        │no                                                    │
//!  apply slot ──ok──────────────────────────────────────────▶   │ 100 ms
//!        └──fail──▶ count failure (budget spent → stop both) ─▶ │ 1000 ms
//! ```
//!
//! The loop always re-arms itself.  If a forced stop fails too, the
//! controller latches `heater_fault` and keeps retrying the stop on the
//! slow cadence until a verified write goes through.

use embedded_hal::i2c::I2c;
use log::{error, info, warn};

use crate::config::PressConfig;
use crate::drivers::bus::HardwareBus;
use crate::drivers::relay::RelayController;
use crate::error::{Error, Result};
use crate::safety::{FailureSupervisor, ThermalCutoff};
use crate::scheduler::OneShot;
use crate::sensors::Platen;
use crate::sensors::thermocouple::Thermocouple;

use super::duty::{DutySchedule, RampLaw};

/// What one control tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopTick {
    /// Duty slots written to both heaters.
    Applied { top: bool, bottom: bool },
    /// A platen is over the limit; both heaters were forced off.
    CutOff,
    /// A latched heater fault cleared after a successful stop.
    Recovered,
    /// The tick failed; the loop retries on the slow cadence.
    Failed(Error),
}

/// Sensor, setpoint and schedule for one platen.
pub struct TemperatureChannel {
    sensor: Thermocouple,
    target_c: f32,
    percentage: f32,
    schedule: DutySchedule,
}

impl TemperatureChannel {
    fn new(platen: Platen) -> Self {
        Self {
            sensor: Thermocouple::new(platen),
            target_c: 0.0,
            percentage: 0.0,
            schedule: DutySchedule::exhausted(),
        }
    }

    fn resample<I2C: I2c>(&mut self, bus: &HardwareBus<I2C>, ramp: &RampLaw) -> Result<()> {
        // A stalled sample keeps the last good reading.
        self.sensor.sample(bus)?;
        self.percentage = ramp.percentage(self.sensor.celsius(), self.target_c);
        self.schedule = DutySchedule::from_percentage(self.percentage);
        Ok(())
    }

    pub fn platen(&self) -> Platen {
        self.sensor.platen()
    }

    pub fn current_c(&self) -> f32 {
        self.sensor.celsius()
    }

    pub fn target_c(&self) -> f32 {
        self.target_c
    }

    /// Duty fraction behind the current schedule.
    pub fn percentage(&self) -> f32 {
        self.percentage
    }

    pub fn schedule(&self) -> &DutySchedule {
        &self.schedule
    }
}

pub struct TemperatureController<'a, I2C> {
    bus: &'a HardwareBus<I2C>,
    top: TemperatureChannel,
    bottom: TemperatureChannel,
    ramp: RampLaw,
    cutoff: ThermalCutoff,
    supervisor: FailureSupervisor,
    control_tick_ms: u32,
    retry_tick_ms: u32,
    tick: OneShot<()>,
    started: bool,
    heater_fault: bool,
}

impl<'a, I2C: I2c> TemperatureController<'a, I2C> {
    pub fn new(bus: &'a HardwareBus<I2C>, config: &PressConfig) -> Self {
        Self {
            bus,
            top: TemperatureChannel::new(Platen::Top),
            bottom: TemperatureChannel::new(Platen::Bottom),
            ramp: RampLaw::from_config(config),
            cutoff: ThermalCutoff::new(config.max_temp_c),
            supervisor: FailureSupervisor::new(config.max_loop_failures),
            control_tick_ms: config.control_tick_ms,
            retry_tick_ms: config.retry_tick_ms,
            tick: OneShot::new("heater-tick"),
            started: false,
            heater_fault: false,
        }
    }

    /// Configure both sensors, top first, then start the loop.
    pub fn start(&mut self, now_ms: u32) -> Result<()> {
        self.top.sensor.configure(self.bus)?;
        self.bottom.sensor.configure(self.bus)?;
        self.started = true;
        self.restart(now_ms);
        info!("Heaters: control loop started");
        Ok(())
    }

    // ── Setpoints ─────────────────────────────────────────────

    pub fn set_top_target(&mut self, now_ms: u32, celsius: f32) {
        self.top.target_c = celsius;
        info!("Heaters: top target {:.1}\u{00b0}C", celsius);
        self.restart(now_ms);
    }

    pub fn set_bottom_target(&mut self, now_ms: u32, celsius: f32) {
        self.bottom.target_c = celsius;
        info!("Heaters: bottom target {:.1}\u{00b0}C", celsius);
        self.restart(now_ms);
    }

    // ── Loop ──────────────────────────────────────────────────

    /// Run the control tick if it is due, then re-arm it.
    pub fn poll(&mut self, now_ms: u32, relay: &RelayController<'_, I2C>) -> Option<LoopTick> {
        self.tick.take_due(now_ms)?;
        let outcome = self.run_tick(relay);
        let delay = match outcome {
            LoopTick::Failed(_) => self.retry_tick_ms,
            _ => self.control_tick_ms,
        };
        self.tick.arm(now_ms, delay, ());
        Some(outcome)
    }

    fn run_tick(&mut self, relay: &RelayController<'_, I2C>) -> LoopTick {
        if self.heater_fault {
            return match relay.stop_heat_plates() {
                Ok(_) => {
                    self.heater_fault = false;
                    self.supervisor.record_success();
                    self.discard_schedules();
                    info!("Heaters: shutoff confirmed, heater fault cleared");
                    LoopTick::Recovered
                }
                Err(e) => {
                    error!("Heaters: shutoff still failing ({e}), plates may be energised");
                    LoopTick::Failed(e)
                }
            };
        }

        if self.top.schedule.is_exhausted() || self.bottom.schedule.is_exhausted() {
            if let Err(e) = self.resample() {
                warn!("Heaters: resample failed ({e}), stopping both plates");
                self.supervisor.record_failure();
                self.force_stop(relay);
                return LoopTick::Failed(e);
            }
        }

        let top_on = self.top.schedule.next_slot().unwrap_or(false);
        let bottom_on = self.bottom.schedule.next_slot().unwrap_or(false);

        if self
            .cutoff
            .evaluate(self.top.current_c(), self.bottom.current_c())
        {
            return match relay.stop_heat_plates() {
                Ok(_) => {
                    self.supervisor.record_success();
                    LoopTick::CutOff
                }
                Err(e) => self.fail(relay, e),
            };
        }

        let top = if top_on {
            relay.start_top_heat_plate()
        } else {
            relay.stop_top_heat_plate()
        };
        let result = top.and_then(|_| {
            if bottom_on {
                relay.start_bottom_heat_plate()
            } else {
                relay.stop_bottom_heat_plate()
            }
        });

        match result {
            Ok(_) => {
                self.supervisor.record_success();
                LoopTick::Applied {
                    top: top_on,
                    bottom: bottom_on,
                }
            }
            Err(e) => self.fail(relay, e),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn top(&self) -> &TemperatureChannel {
        &self.top
    }

    pub fn bottom(&self) -> &TemperatureChannel {
        &self.bottom
    }

    /// A forced heater stop failed and has not yet succeeded.
    pub fn heater_fault(&self) -> bool {
        self.heater_fault
    }

    pub fn over_temperature(&self) -> bool {
        self.cutoff.is_tripped()
    }

    pub fn is_running(&self) -> bool {
        self.started
    }

    /// Deadline of the next control tick.
    pub fn next_tick_ms(&self) -> Option<u32> {
        self.tick.deadline()
    }

    // ── Internal ──────────────────────────────────────────────

    fn resample(&mut self) -> Result<()> {
        self.top.resample(self.bus, &self.ramp)?;
        self.bottom.resample(self.bus, &self.ramp)
    }

    fn discard_schedules(&mut self) {
        self.top.schedule = DutySchedule::exhausted();
        self.bottom.schedule = DutySchedule::exhausted();
    }

    /// Drop the pending tick and resample on the next poll.
    fn restart(&mut self, now_ms: u32) {
        if !self.started {
            return;
        }
        self.tick.cancel();
        self.discard_schedules();
        self.tick.arm(now_ms, 0, ());
    }

    fn fail(&mut self, relay: &RelayController<'_, I2C>, e: Error) -> LoopTick {
        warn!("Heaters: relay update failed ({e}), retrying in {} ms", self.retry_tick_ms);
        if self.supervisor.record_failure() {
            self.force_stop(relay);
        }
        LoopTick::Failed(e)
    }

    fn force_stop(&mut self, relay: &RelayController<'_, I2C>) {
        match relay.stop_heat_plates() {
            Ok(_) => info!("Heaters: both plates forced off"),
            Err(e) => {
                self.heater_fault = true;
                error!(
                    "Heaters: SHUTOFF FAILED ({e}); heater fault latched, retrying every {} ms",
                    self.retry_tick_ms
                );
            }
        }
    }
}
