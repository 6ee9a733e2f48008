//! Press state threaded through every phase handler.
//!
//! `PressContext` is the blackboard the phase handlers read and write.
//! Handlers never touch hardware: they leave a [`MotionRequest`] that the
//! orchestrator carries out after the transition completes.

use heapless::String;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session (set by commands, read when a press starts)
// ---------------------------------------------------------------------------

/// Free-form details copied into the press record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub material: String<32>,
    /// Filter bag / micron size.
    pub bag_size: String<16>,
    pub strain: String<32>,
    /// Input weight in grams.
    pub input_weight_g: Option<f32>,
}

/// Parameters for the next press.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PressSession {
    pub top_temp_c: Option<f32>,
    pub bottom_temp_c: Option<f32>,
    pub duration_secs: Option<u16>,
    pub metadata: SessionMetadata,
}

impl PressSession {
    /// Both temperatures and the duration are set.
    pub fn is_complete(&self) -> bool {
        self.top_temp_c.is_some() && self.bottom_temp_c.is_some() && self.duration_secs.is_some()
    }
}

// ---------------------------------------------------------------------------
// Active press (frozen copy of the session at start)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ActivePress {
    pub top_temp_c: f32,
    pub bottom_temp_c: f32,
    pub duration_secs: u16,
    pub metadata: SessionMetadata,
    pub started_at_ms: u32,
}

impl ActivePress {
    /// Freeze `session`.  `None` if it is incomplete.
    pub fn from_session(session: &PressSession, started_at_ms: u32) -> Option<Self> {
        Some(Self {
            top_temp_c: session.top_temp_c?,
            bottom_temp_c: session.bottom_temp_c?,
            duration_secs: session.duration_secs?,
            metadata: session.metadata.clone(),
            started_at_ms,
        })
    }
}

/// How the last press ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressOutcome {
    Completed,
    Cancelled,
    Failed,
}

/// Persisted once a press opens normally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressRecord {
    /// Assigned by the store.
    pub id: u32,
    pub top_temp_c: f32,
    pub bottom_temp_c: f32,
    pub duration_secs: u16,
    pub metadata: SessionMetadata,
    /// Uptime when the press started closing.
    pub started_at_ms: u32,
    /// Uptime when the press finished opening.
    pub completed_at_ms: u32,
    /// Grams of rosin, recorded after the fact.
    pub yield_weight_g: Option<f32>,
}

impl PressRecord {
    pub fn from_press(press: &ActivePress, completed_at_ms: u32) -> Self {
        Self {
            id: 0,
            top_temp_c: press.top_temp_c,
            bottom_temp_c: press.bottom_temp_c,
            duration_secs: press.duration_secs,
            metadata: press.metadata.clone(),
            started_at_ms: press.started_at_ms,
            completed_at_ms,
            yield_weight_g: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Motion requests (written by phase handlers; applied by the orchestrator)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionRequest {
    #[default]
    None,
    Close,
    Dwell { secs: u16 },
    Open,
}

// ---------------------------------------------------------------------------
// PressContext
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct PressContext {
    pub session: PressSession,
    /// Present from start until the press returns to Idle.
    pub active: Option<ActivePress>,
    /// Pending actuation left by the last `on_enter`.
    pub request: MotionRequest,
    pub outcome: Option<PressOutcome>,
    /// Record id of the last completed press.
    pub last_press_id: Option<u32>,
}

impl PressContext {
    pub fn new(session: PressSession) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    /// Hand the pending request to the caller, leaving `None`.
    pub fn take_request(&mut self) -> MotionRequest {
        core::mem::take(&mut self.request)
    }
}
