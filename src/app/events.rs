//! Outbound press events.
//!
//! The [`PressOrchestrator`](super::service::PressOrchestrator) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them: log to serial, or forward the
//! snapshot JSON to the UI transport.

use serde::Serialize;

use crate::drivers::button::InterlockState;
use crate::error::Error;
use crate::fsm::PressPhase;
use crate::fsm::context::PressOutcome;

/// Structured events emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum PressEvent {
    /// The orchestrator has started (carries the first snapshot).
    Started(PressSnapshot),

    /// The press moved between phases.
    PhaseChanged { from: PressPhase, to: PressPhase },

    /// Full outward state: on phase change, interlock change, and once per
    /// snapshot interval.
    Snapshot(PressSnapshot),

    /// A command was refused with no side effect.
    CommandRejected {
        command: &'static str,
        reason: Error,
    },

    /// A finished press was persisted under `id`.
    PressRecorded { id: u32 },

    /// A hardware-class failure ended the active press.
    HardwareFault(Error),

    /// A heater safety limit tripped and both plates were switched off.
    /// The press cycle itself keeps running.
    HeaterTrip(Error),
}

/// Current and target temperature for one platen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ChannelSnapshot {
    pub current_c: f32,
    pub target_c: f32,
}

/// Point-in-time press state for the operator UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PressSnapshot {
    pub phase: PressPhase,
    /// Whole seconds until the cycle finishes, rounded up.
    pub remaining_secs: u32,
    pub top: ChannelSnapshot,
    pub bottom: ChannelSnapshot,
    pub interlock: InterlockState,
    /// Only present while waiting for the yield weight.
    pub last_press_id: Option<u32>,
    pub outcome: Option<PressOutcome>,
    pub heater_fault: bool,
    pub over_temperature: bool,
    /// Relay register, bit 0 first.
    pub relays: [bool; 8],
}

impl PressSnapshot {
    /// Wire payload for the UI transport.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
