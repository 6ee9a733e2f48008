//! Function-pointer press-phase machine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  PhaseTable                                                  │
//! │  ┌────────────┬───────────┬──────────┬─────────────────────┐ │
//! │  │ Phase      │ on_enter  │ on_exit  │ on_event            │ │
//! │  ├────────────┼───────────┼──────────┼─────────────────────┤ │
//! │  │ Idle       │ fn(ctx)   │ —        │ fn(ctx,ev)->Option<>│ │
//! │  │ Closing    │ fn(ctx)   │ —        │ fn(ctx,ev)->Option<>│ │
//! │  │ Pressing   │ fn(ctx)   │ —        │ fn(ctx,ev)->Option<>│ │
//! │  │ Opening    │ fn(ctx)   │ —        │ fn(ctx,ev)->Option<>│ │
//! │  │ Cancelling │ fn(ctx)   │ —        │ fn(ctx,ev)->Option<>│ │
//! │  │ Yield      │ fn(ctx)   │ —        │ fn(ctx,ev)->Option<>│ │
//! │  └────────────┴───────────┴──────────┴─────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every [`PhaseEvent`] is offered to the current phase's `on_event`.  If
//! it returns `Some(next)`, the machine runs `on_exit` for the current
//! phase, then `on_enter` for the next.  Events a phase does not list are
//! ignored, which is how stale timer completions are discarded.
//!
//! Guards that need outside knowledge (emergency line, session
//! completeness, heater fault) are checked by the orchestrator before it
//! raises [`PhaseEvent::StartTrigger`].

pub mod context;
pub mod states;

use context::PressContext;
use log::info;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// Must stay in sync with [`states::build_phase_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PressPhase {
    Idle = 0,
    Closing = 1,
    Pressing = 2,
    Opening = 3,
    Cancelling = 4,
    Yield = 5,
}

impl PressPhase {
    pub const COUNT: usize = 6;

    /// Out-of-range indices fall back to `Idle`.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Closing,
            2 => Self::Pressing,
            3 => Self::Opening,
            4 => Self::Cancelling,
            5 => Self::Yield,
            _ => {
                debug_assert!(false, "invalid phase index: {idx}");
                Self::Idle
            }
        }
    }

    /// The cylinder is moving or holding pressure.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Closing | Self::Pressing | Self::Opening | Self::Cancelling
        )
    }

    /// Emergency or an explicit cancel can still abort the press.
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Closing | Self::Pressing)
    }
}

/// Inputs to the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Start button or start command, guards already passed.
    StartTrigger,
    /// Close travel finished.
    Closed,
    /// Pressing dwell ran out.
    DwellElapsed,
    /// Open travel finished and the press record was saved.
    Recorded,
    /// Open travel finished (cancel path).
    Opened,
    /// Yield weight recorded or prompt dismissed.
    YieldConfirmed,
    /// Emergency trip or cancel command.
    Cancel,
    /// A relay or store operation failed mid-press.
    HardwareFailure,
}

// ---------------------------------------------------------------------------
// Handler signatures
// ---------------------------------------------------------------------------

/// `on_enter` / `on_exit`.  Runs exactly once per transition.
pub type PhaseActionFn = fn(&mut PressContext);

/// Returns `Some(next)` to transition, `None` to ignore the event.
pub type PhaseEventFn = fn(&PressContext, PhaseEvent) -> Option<PressPhase>;

/// One row of the phase table.
pub struct PhaseDescriptor {
    pub phase: PressPhase,
    pub name: &'static str,
    pub on_enter: Option<PhaseActionFn>,
    pub on_exit: Option<PhaseActionFn>,
    pub on_event: PhaseEventFn,
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

pub struct PhaseMachine {
    table: [PhaseDescriptor; PressPhase::COUNT],
    current: usize,
    entered_at_ms: u32,
}

impl PhaseMachine {
    pub fn new(table: [PhaseDescriptor; PressPhase::COUNT], initial: PressPhase) -> Self {
        Self {
            table,
            current: initial as usize,
            entered_at_ms: 0,
        }
    }

    /// Run the initial phase's `on_enter`.  Call once before the first event.
    pub fn start(&mut self, ctx: &mut PressContext, now_ms: u32) {
        info!("Press phase machine starting in {}", self.table[self.current].name);
        self.entered_at_ms = now_ms;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Offer `event` to the current phase.  Returns `(from, to)` if it moved.
    pub fn handle(
        &mut self,
        event: PhaseEvent,
        ctx: &mut PressContext,
        now_ms: u32,
    ) -> Option<(PressPhase, PressPhase)> {
        let next = (self.table[self.current].on_event)(ctx, event)?;
        Some(self.transition(next, ctx, now_ms))
    }

    pub fn current(&self) -> PressPhase {
        PressPhase::from_index(self.current)
    }

    pub fn name(&self) -> &'static str {
        self.table[self.current].name
    }

    pub fn ms_in_phase(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.entered_at_ms)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(
        &mut self,
        next: PressPhase,
        ctx: &mut PressContext,
        now_ms: u32,
    ) -> (PressPhase, PressPhase) {
        let from = self.current();
        let next_idx = next as usize;

        info!(
            "Press phase: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.entered_at_ms = now_ms;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
        (from, next)
    }
}
