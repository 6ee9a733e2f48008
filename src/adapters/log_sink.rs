//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each press event as one line to the
//! ESP-IDF logger (UART / USB-CDC in production).

use log::{error, info, warn};

use crate::app::events::PressEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`PressEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &PressEvent) {
        match event {
            PressEvent::Snapshot(s) => {
                info!(
                    "SNAP  | phase={:?} | remaining={}s | top={:.1}/{:.1}\u{00b0}C | \
                     bottom={:.1}/{:.1}\u{00b0}C | estop={} | relays={:?} | \
                     outcome={:?} | heater_fault={} over_temp={}",
                    s.phase,
                    s.remaining_secs,
                    s.top.current_c,
                    s.top.target_c,
                    s.bottom.current_c,
                    s.bottom.target_c,
                    if s.interlock.emergency_depressed { "ENGAGED" } else { "clear" },
                    s.relays.map(u8::from),
                    s.outcome,
                    s.heater_fault,
                    s.over_temperature,
                );
            }
            PressEvent::PhaseChanged { from, to } => {
                info!("PHASE | {:?} -> {:?}", from, to);
            }
            PressEvent::CommandRejected { command, reason } => {
                warn!("REJECT| {} | {}", command, reason);
            }
            PressEvent::PressRecorded { id } => {
                info!("RECORD| press #{}", id);
            }
            PressEvent::HardwareFault(e) => {
                error!("FAULT | {}", e);
            }
            PressEvent::HeaterTrip(e) => {
                warn!("HEAT  | {}, plates off", e);
            }
            PressEvent::Started(s) => {
                info!("START | phase={:?} | relays={:?}", s.phase, s.relays.map(u8::from));
            }
        }
    }
}
