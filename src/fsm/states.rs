//! Phase handler functions and table builder.
//!
//! Each phase is three plain `fn` pointers.  Handlers only touch the
//! [`PressContext`]; actuation is left as a [`MotionRequest`].
//!
//! ```text
//!  IDLE ──[start]──▶ CLOSING ──[closed]──▶ PRESSING ──[dwell]──▶ OPENING
//!    ▲                  │                      │                    │
//!    │               [cancel]              [cancel]            [recorded]
//!    │                  ▼                      ▼                    ▼
//!    ├───[opened]─── CANCELLING ◀──────────────┘                  YIELD
//!    │                                                              │
//!    └────────────────────────[yield confirmed]─────────────────────┘
//!
//!  CLOSING | PRESSING | OPENING | CANCELLING ──[hardware failure]──▶ IDLE
//! ```

use super::context::{MotionRequest, PressContext, PressOutcome};
use super::{PhaseDescriptor, PhaseEvent, PressPhase};
use log::{info, warn};

/// Build the phase table.  Called once at startup.
pub fn build_phase_table() -> [PhaseDescriptor; PressPhase::COUNT] {
    [
        PhaseDescriptor {
            phase: PressPhase::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_event: idle_event,
        },
        PhaseDescriptor {
            phase: PressPhase::Closing,
            name: "Closing",
            on_enter: Some(closing_enter),
            on_exit: None,
            on_event: closing_event,
        },
        PhaseDescriptor {
            phase: PressPhase::Pressing,
            name: "Pressing",
            on_enter: Some(pressing_enter),
            on_exit: None,
            on_event: pressing_event,
        },
        PhaseDescriptor {
            phase: PressPhase::Opening,
            name: "Opening",
            on_enter: Some(opening_enter),
            on_exit: None,
            on_event: opening_event,
        },
        PhaseDescriptor {
            phase: PressPhase::Cancelling,
            name: "Cancelling",
            on_enter: Some(cancelling_enter),
            on_exit: None,
            on_event: cancelling_event,
        },
        PhaseDescriptor {
            phase: PressPhase::Yield,
            name: "Yield",
            on_enter: Some(yield_enter),
            on_exit: None,
            on_event: yield_event,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut PressContext) {
    ctx.active = None;
    ctx.request = MotionRequest::None;
    info!("IDLE: press open, waiting for start");
}

fn idle_event(ctx: &PressContext, event: PhaseEvent) -> Option<PressPhase> {
    match event {
        PhaseEvent::StartTrigger if ctx.active.is_some() => Some(PressPhase::Closing),
        PhaseEvent::StartTrigger => {
            warn!("IDLE: start without frozen parameters ignored");
            None
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CLOSING
// ═══════════════════════════════════════════════════════════════════════════

fn closing_enter(ctx: &mut PressContext) {
    ctx.request = MotionRequest::Close;
    ctx.outcome = None;
    if let Some(p) = &ctx.active {
        info!(
            "CLOSING: top {:.1}\u{00b0}C, bottom {:.1}\u{00b0}C, {}s",
            p.top_temp_c, p.bottom_temp_c, p.duration_secs
        );
    }
}

fn closing_event(_ctx: &PressContext, event: PhaseEvent) -> Option<PressPhase> {
    match event {
        PhaseEvent::Closed => Some(PressPhase::Pressing),
        PhaseEvent::Cancel => Some(PressPhase::Cancelling),
        PhaseEvent::HardwareFailure => Some(PressPhase::Idle),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  PRESSING
// ═══════════════════════════════════════════════════════════════════════════

fn pressing_enter(ctx: &mut PressContext) {
    let secs = ctx.active.as_ref().map_or(0, |p| p.duration_secs);
    ctx.request = MotionRequest::Dwell { secs };
    info!("PRESSING: holding for {}s", secs);
}

fn pressing_event(_ctx: &PressContext, event: PhaseEvent) -> Option<PressPhase> {
    match event {
        PhaseEvent::DwellElapsed => Some(PressPhase::Opening),
        PhaseEvent::Cancel => Some(PressPhase::Cancelling),
        PhaseEvent::HardwareFailure => Some(PressPhase::Idle),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  OPENING
// ═══════════════════════════════════════════════════════════════════════════

fn opening_enter(ctx: &mut PressContext) {
    ctx.request = MotionRequest::Open;
    info!("OPENING: dwell complete");
}

fn opening_event(_ctx: &PressContext, event: PhaseEvent) -> Option<PressPhase> {
    match event {
        PhaseEvent::Recorded => Some(PressPhase::Yield),
        PhaseEvent::HardwareFailure => Some(PressPhase::Idle),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CANCELLING
// ═══════════════════════════════════════════════════════════════════════════

fn cancelling_enter(ctx: &mut PressContext) {
    ctx.request = MotionRequest::Open;
    ctx.outcome = Some(PressOutcome::Cancelled);
    warn!("CANCELLING: press aborted, opening");
}

fn cancelling_event(_ctx: &PressContext, event: PhaseEvent) -> Option<PressPhase> {
    match event {
        PhaseEvent::Opened | PhaseEvent::HardwareFailure => Some(PressPhase::Idle),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  YIELD
// ═══════════════════════════════════════════════════════════════════════════

fn yield_enter(ctx: &mut PressContext) {
    ctx.request = MotionRequest::None;
    ctx.outcome = Some(PressOutcome::Completed);
    match ctx.last_press_id {
        Some(id) => info!("YIELD: press #{id} recorded, awaiting weight"),
        None => info!("YIELD: awaiting weight"),
    }
}

fn yield_event(_ctx: &PressContext, event: PhaseEvent) -> Option<PressPhase> {
    match event {
        PhaseEvent::YieldConfirmed => Some(PressPhase::Idle),
        _ => None,
    }
}
