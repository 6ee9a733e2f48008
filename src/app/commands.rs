//! Inbound commands to the press orchestrator.
//!
//! These arrive from the operator UI through the command channel and are
//! interpreted by [`PressOrchestrator`](super::service::PressOrchestrator).

use serde::{Deserialize, Serialize};

use crate::fsm::context::SessionMetadata;

/// Everything the outside world may ask the press to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PressCommand {
    /// Begin a cycle with the current session.
    StartPress,
    /// Abort a closing or pressing cycle.
    CancelPress,
    /// Top platen target (Celsius).
    SetTopTemperature(f32),
    /// Bottom platen target (Celsius).
    SetBottomTemperature(f32),
    /// Pressing dwell (seconds).
    SetDuration(u16),
    SetMetadata(SessionMetadata),
    /// Dismiss the yield prompt, or acknowledge a cancelled/failed press.
    ConfirmCancel,
    /// Yield weight in grams for the press just recorded.
    RecordYield(f32),
}

impl PressCommand {
    /// Short tag used in logs and rejection events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartPress => "start_press",
            Self::CancelPress => "cancel_press",
            Self::SetTopTemperature(_) => "set_top_temperature",
            Self::SetBottomTemperature(_) => "set_bottom_temperature",
            Self::SetDuration(_) => "set_duration",
            Self::SetMetadata(_) => "set_metadata",
            Self::ConfirmCancel => "confirm_cancel",
            Self::RecordYield(_) => "record_yield",
        }
    }
}
