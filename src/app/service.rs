//! Press orchestrator: the hexagonal core.
//!
//! [`PressOrchestrator`] owns the phase machine, the press context and both
//! hardware controllers.  It is the only writer of the press phase.  All
//! outside interaction flows through port traits injected at call sites.
//!
//! ```text
//!  ButtonInterlock ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  PressCommand    ──▶ │    PressOrchestrator      │
//!                      │ PhaseMachine · Relays ·   │ ◀─▶ PressStore
//!                      │ TemperatureController     │
//!                      └──────────────────────────┘
//! ```
//!
//! The firmware loop calls [`PressOrchestrator::on_interlock`] every button
//! poll, [`PressOrchestrator::handle_command`] for each queued command, and
//! [`PressOrchestrator::tick`] on every iteration.

use embedded_hal::i2c::I2c;
use log::{debug, error, info, warn};

use crate::config::PressConfig;
use crate::control::temperature::{LoopTick, TemperatureController};
use crate::drivers::bus::HardwareBus;
use crate::drivers::button::{InterlockSignals, InterlockState};
use crate::drivers::relay::{MotionEvent, RelayController};
use crate::error::{Error, Result};
use crate::fsm::context::{
    ActivePress, MotionRequest, PressContext, PressOutcome, PressRecord, PressSession,
};
use crate::fsm::states::build_phase_table;
use crate::fsm::{PhaseEvent, PhaseMachine, PressPhase};
use crate::scheduler::OneShot;

use super::commands::PressCommand;
use super::events::{ChannelSnapshot, PressEvent, PressSnapshot};
use super::ports::{EventSink, PressStore};

// ───────────────────────────────────────────────────────────────
// PressOrchestrator
// ───────────────────────────────────────────────────────────────

pub struct PressOrchestrator<'a, I2C> {
    config: PressConfig,
    relay: RelayController<'a, I2C>,
    temperature: TemperatureController<'a, I2C>,
    machine: PhaseMachine,
    ctx: PressContext,
    /// Last debounced button state.
    interlock: InterlockState,
    emergency_engaged: bool,
    snapshot_timer: OneShot<()>,
    last_heater_fault: bool,
    last_over_temperature: bool,
}

impl<'a, I2C: I2c> PressOrchestrator<'a, I2C> {
    /// Build the controllers on `bus`.  Nothing touches hardware until
    /// [`start`](Self::start).
    pub fn new(config: PressConfig, bus: &'a HardwareBus<I2C>) -> Self {
        let relay = RelayController::new(bus, config.profile());
        let temperature = TemperatureController::new(bus, &config);
        let machine = PhaseMachine::new(build_phase_table(), PressPhase::Idle);

        Self {
            config,
            relay,
            temperature,
            machine,
            ctx: PressContext::default(),
            // Engaged until the interlock proves otherwise.
            interlock: InterlockState {
                start_depressed: true,
                emergency_depressed: true,
            },
            emergency_engaged: true,
            snapshot_timer: OneShot::new("snapshot"),
            last_heater_fault: false,
            last_over_temperature: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring up the relay bank, restore the session and start the heater
    /// loop.  Relay or sensor configuration failure is fatal.
    pub fn start(
        &mut self,
        now_ms: u32,
        store: &impl PressStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.relay.start()?;

        match store.load_current_session() {
            Ok(Some(session)) => {
                info!("Press: restored session {:?}", session);
                self.ctx.session = session;
            }
            Ok(None) => info!("Press: no stored session"),
            Err(e) => warn!("Press: session restore failed ({e}), starting empty"),
        }

        self.machine.start(&mut self.ctx, now_ms);
        let _ = self.ctx.take_request();

        if let Some(c) = self.ctx.session.top_temp_c {
            self.temperature.set_top_target(now_ms, c);
        }
        if let Some(c) = self.ctx.session.bottom_temp_c {
            self.temperature.set_bottom_target(now_ms, c);
        }
        self.temperature.start(now_ms)?;

        sink.emit(&PressEvent::Started(self.snapshot(now_ms)));
        self.snapshot_timer
            .arm(now_ms, self.config.snapshot_interval_ms, ());
        info!("Press: orchestrator started ({:?})", self.config.actuation);
        Ok(())
    }

    // ── Inputs ────────────────────────────────────────────────

    /// Feed one debounced interlock sample.
    pub fn on_interlock(
        &mut self,
        now_ms: u32,
        signals: InterlockSignals,
        state: InterlockState,
        sink: &mut impl EventSink,
    ) {
        let changed = state != self.interlock || signals.emergency_changed;
        self.interlock = state;
        self.emergency_engaged = signals.emergency_engaged;

        let mut moved = false;
        if signals.emergency_engaged && self.machine.current().is_cancellable() {
            warn!("Press: emergency stop during {}", self.machine.name());
            moved = self.raise(PhaseEvent::Cancel, now_ms, sink);
        }

        if signals.start_trigger {
            match self.request_start(now_ms, sink) {
                Ok(()) => moved = true,
                Err(e) => self.reject("start_button", e, sink),
            }
        }

        if changed && !moved {
            sink.emit(&PressEvent::Snapshot(self.snapshot(now_ms)));
        }
    }

    /// Apply one operator command.  Rejections are also emitted as
    /// [`PressEvent::CommandRejected`].
    pub fn handle_command(
        &mut self,
        cmd: PressCommand,
        now_ms: u32,
        store: &mut impl PressStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let name = cmd.name();
        debug!("Press: command {name}");
        let result = self.dispatch(cmd, now_ms, store, sink);
        if let Err(e) = result {
            self.reject(name, e, sink);
        }
        result
    }

    /// Fire due motion steps, run the heater loop and publish periodic
    /// snapshots.
    pub fn tick(&mut self, now_ms: u32, store: &mut impl PressStore, sink: &mut impl EventSink) {
        match self.relay.poll_motion(now_ms) {
            Ok(Some(event)) => self.on_motion(event, now_ms, store, sink),
            Ok(None) => {}
            Err(e) if self.machine.current().is_active() => self.fail(now_ms, e, sink),
            Err(e) => warn!("Press: travel finish step failed while idle ({e})"),
        }

        if let Some(LoopTick::Failed(e)) = self.temperature.poll(now_ms, &self.relay) {
            debug!("Press: heater tick failed ({e})");
        }

        let heater_fault = self.temperature.heater_fault();
        let over_temperature = self.temperature.over_temperature();
        if over_temperature && !self.last_over_temperature {
            sink.emit(&PressEvent::HeaterTrip(Error::OverTemperature));
        }
        let flags_changed = heater_fault != self.last_heater_fault
            || over_temperature != self.last_over_temperature;
        self.last_heater_fault = heater_fault;
        self.last_over_temperature = over_temperature;

        if self.snapshot_timer.take_due(now_ms).is_some() || flags_changed {
            sink.emit(&PressEvent::Snapshot(self.snapshot(now_ms)));
            self.snapshot_timer
                .arm(now_ms, self.config.snapshot_interval_ms, ());
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> PressPhase {
        self.machine.current()
    }

    pub fn session(&self) -> &PressSession {
        &self.ctx.session
    }

    pub fn outcome(&self) -> Option<PressOutcome> {
        self.ctx.outcome
    }

    pub fn last_press_id(&self) -> Option<u32> {
        self.ctx.last_press_id
    }

    pub fn relay(&self) -> &RelayController<'a, I2C> {
        &self.relay
    }

    pub fn temperature(&self) -> &TemperatureController<'a, I2C> {
        &self.temperature
    }

    pub fn config(&self) -> &PressConfig {
        &self.config
    }

    /// Build the outward snapshot.
    pub fn snapshot(&self, now_ms: u32) -> PressSnapshot {
        let phase = self.machine.current();
        let top = self.temperature.top();
        let bottom = self.temperature.bottom();
        PressSnapshot {
            phase,
            remaining_secs: self.remaining_ms(now_ms).div_ceil(1000),
            top: ChannelSnapshot {
                current_c: top.current_c(),
                target_c: top.target_c(),
            },
            bottom: ChannelSnapshot {
                current_c: bottom.current_c(),
                target_c: bottom.target_c(),
            },
            interlock: self.interlock,
            last_press_id: if phase == PressPhase::Yield {
                self.ctx.last_press_id
            } else {
                None
            },
            outcome: self.ctx.outcome,
            heater_fault: self.temperature.heater_fault(),
            over_temperature: self.temperature.over_temperature(),
            relays: self.relay.state().to_array(),
        }
    }

    /// Milliseconds until the cycle is back open.
    pub fn remaining_ms(&self, now_ms: u32) -> u32 {
        let travel = self.relay.profile().travel_time_ms;
        let dwell = self
            .ctx
            .active
            .as_ref()
            .map_or(0, |p| u32::from(p.duration_secs) * 1000);
        let elapsed = self.machine.ms_in_phase(now_ms);
        // Close travel, dwell and open travel, counted down without steps.
        match self.machine.current() {
            PressPhase::Closing => travel.saturating_sub(elapsed) + dwell + travel,
            PressPhase::Pressing => dwell.saturating_sub(elapsed) + travel,
            PressPhase::Opening | PressPhase::Cancelling => {
                self.relay.motion_remaining_ms(now_ms).unwrap_or(0)
            }
            PressPhase::Idle | PressPhase::Yield => 0,
        }
    }

    // ── Internal: commands ────────────────────────────────────

    fn dispatch(
        &mut self,
        cmd: PressCommand,
        now_ms: u32,
        store: &mut impl PressStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            PressCommand::StartPress => self.request_start(now_ms, sink),
            PressCommand::CancelPress => {
                if self.machine.current().is_cancellable() {
                    self.raise(PhaseEvent::Cancel, now_ms, sink);
                } else {
                    info!("Press: nothing to cancel in {}", self.machine.name());
                }
                Ok(())
            }
            PressCommand::SetTopTemperature(c) => {
                self.check_temperature(c)?;
                self.ctx.session.top_temp_c = Some(c);
                self.temperature.set_top_target(now_ms, c);
                self.session_changed(now_ms, store, sink);
                Ok(())
            }
            PressCommand::SetBottomTemperature(c) => {
                self.check_temperature(c)?;
                self.ctx.session.bottom_temp_c = Some(c);
                self.temperature.set_bottom_target(now_ms, c);
                self.session_changed(now_ms, store, sink);
                Ok(())
            }
            PressCommand::SetDuration(secs) => {
                if secs < self.config.min_duration_secs || secs > self.config.max_duration_secs {
                    return Err(Error::InvalidParameter("duration out of range"));
                }
                self.ctx.session.duration_secs = Some(secs);
                self.session_changed(now_ms, store, sink);
                Ok(())
            }
            PressCommand::SetMetadata(metadata) => {
                if metadata.input_weight_g.is_some_and(|w| !w.is_finite() || w < 0.0) {
                    return Err(Error::InvalidParameter("input weight must be non-negative"));
                }
                self.ctx.session.metadata = metadata;
                self.session_changed(now_ms, store, sink);
                Ok(())
            }
            PressCommand::ConfirmCancel => match self.machine.current() {
                PressPhase::Yield => {
                    info!("Press: yield prompt dismissed");
                    self.raise(PhaseEvent::YieldConfirmed, now_ms, sink);
                    Ok(())
                }
                PressPhase::Idle => {
                    self.ctx.outcome = None;
                    sink.emit(&PressEvent::Snapshot(self.snapshot(now_ms)));
                    Ok(())
                }
                _ => Err(Error::PressInProgress),
            },
            PressCommand::RecordYield(weight_g) => {
                if self.machine.current() != PressPhase::Yield {
                    return Err(Error::InvalidSessionState);
                }
                if !weight_g.is_finite() || weight_g < 0.0 {
                    return Err(Error::InvalidParameter("yield weight must be non-negative"));
                }
                let id = self.ctx.last_press_id.ok_or(Error::InvalidSessionState)?;
                store.save_yield(id, weight_g)?;
                info!("Press: #{id} yielded {weight_g:.2} g");
                self.raise(PhaseEvent::YieldConfirmed, now_ms, sink);
                Ok(())
            }
        }
    }

    /// Guards run in order: phase, interlock, session.
    fn request_start(&mut self, now_ms: u32, sink: &mut impl EventSink) -> Result<()> {
        if self.machine.current() != PressPhase::Idle {
            return Err(Error::PressInProgress);
        }
        if self.emergency_engaged || self.temperature.heater_fault() {
            return Err(Error::InterlockViolation);
        }
        let active =
            ActivePress::from_session(&self.ctx.session, now_ms).ok_or(Error::InvalidSessionState)?;
        self.ctx.active = Some(active);
        self.raise(PhaseEvent::StartTrigger, now_ms, sink);
        Ok(())
    }

    fn check_temperature(&self, celsius: f32) -> Result<()> {
        if !celsius.is_finite()
            || celsius < self.config.min_temp_c
            || celsius > self.config.max_temp_c
        {
            return Err(Error::InvalidParameter("temperature out of range"));
        }
        Ok(())
    }

    fn session_changed(
        &mut self,
        now_ms: u32,
        store: &mut impl PressStore,
        sink: &mut impl EventSink,
    ) {
        if let Err(e) = store.save_current_session(&self.ctx.session) {
            warn!("Press: session save failed ({e}), change kept in memory");
        }
        sink.emit(&PressEvent::Snapshot(self.snapshot(now_ms)));
    }

    fn reject(&self, command: &'static str, reason: Error, sink: &mut impl EventSink) {
        warn!("Press: {command} rejected ({reason})");
        sink.emit(&PressEvent::CommandRejected { command, reason });
    }

    // ── Internal: transitions ─────────────────────────────────

    fn on_motion(
        &mut self,
        event: MotionEvent,
        now_ms: u32,
        store: &mut impl PressStore,
        sink: &mut impl EventSink,
    ) {
        match event {
            MotionEvent::Closed => {
                self.raise(PhaseEvent::Closed, now_ms, sink);
            }
            MotionEvent::DwellElapsed => {
                self.raise(PhaseEvent::DwellElapsed, now_ms, sink);
            }
            MotionEvent::Opened if self.machine.current() == PressPhase::Opening => {
                self.record_press(now_ms, store, sink);
            }
            MotionEvent::Opened => {
                self.raise(PhaseEvent::Opened, now_ms, sink);
            }
        }
    }

    fn record_press(
        &mut self,
        now_ms: u32,
        store: &mut impl PressStore,
        sink: &mut impl EventSink,
    ) {
        let Some(active) = self.ctx.active.as_ref() else {
            warn!("Press: opened without an active press");
            return;
        };
        let record = PressRecord::from_press(active, now_ms);
        match store.save_press(record) {
            Ok(id) => {
                info!("Press: recorded #{id}");
                self.ctx.last_press_id = Some(id);
                sink.emit(&PressEvent::PressRecorded { id });
                self.raise(PhaseEvent::Recorded, now_ms, sink);
            }
            Err(e) => self.fail(now_ms, Error::Store(e), sink),
        }
    }

    /// Offer `event` to the machine.  Returns whether the phase changed.
    fn raise(&mut self, event: PhaseEvent, now_ms: u32, sink: &mut impl EventSink) -> bool {
        let Some((from, to)) = self.machine.handle(event, &mut self.ctx, now_ms) else {
            debug!("Press: {:?} ignored in {}", event, self.machine.name());
            return false;
        };
        sink.emit(&PressEvent::PhaseChanged { from, to });
        if let Err(e) = self.apply_request(now_ms) {
            self.fail(now_ms, e, sink);
            return true;
        }
        sink.emit(&PressEvent::Snapshot(self.snapshot(now_ms)));
        true
    }

    fn apply_request(&mut self, now_ms: u32) -> Result<()> {
        match self.ctx.take_request() {
            MotionRequest::None => Ok(()),
            MotionRequest::Close => self.relay.close_press(now_ms),
            MotionRequest::Dwell { secs } => {
                self.relay.start_press(now_ms, secs);
                Ok(())
            }
            MotionRequest::Open => self.relay.open_press(now_ms),
        }
    }

    /// Hardware-class failure: back to Idle, then try to open the press.
    fn fail(&mut self, now_ms: u32, err: Error, sink: &mut impl EventSink) {
        error!("Press: hardware failure in {} ({err})", self.machine.name());
        sink.emit(&PressEvent::HardwareFault(err));

        if let Some((from, to)) = self
            .machine
            .handle(PhaseEvent::HardwareFailure, &mut self.ctx, now_ms)
        {
            let _ = self.ctx.take_request();
            sink.emit(&PressEvent::PhaseChanged { from, to });
        }
        self.ctx.outcome = Some(PressOutcome::Failed);

        if let Err(e) = self.relay.open_press(now_ms) {
            error!("Press: safety retraction failed ({e})");
        }
        sink.emit(&PressEvent::Snapshot(self.snapshot(now_ms)));
    }
}
