//! Inter-task channels between the UI transport and the control loop.
//!
//! Uses `embassy-sync` bounded MPMC channels so the transport task and the
//! synchronous control loop share static queues without heap allocation.
//!
//! ```text
//! ┌──────────────┐  PressCommand  ┌──────────────┐
//! │  UI Task     │──────────────▶│  Control Loop │
//! │              │◀──────────────│               │
//! └──────────────┘   PressEvent   └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::warn;

use crate::app::commands::PressCommand;
use crate::app::events::PressEvent;
use crate::app::ports::EventSink;

/// Channel depth for inbound commands.
pub const COMMAND_DEPTH: usize = 8;

/// Channel depth for outbound events.
pub const EVENT_DEPTH: usize = 16;

pub type CommandChannel = Channel<CriticalSectionRawMutex, PressCommand, COMMAND_DEPTH>;
pub type EventChannel = Channel<CriticalSectionRawMutex, PressEvent, EVENT_DEPTH>;

/// Inbound command channel: UI task → control loop.
pub static COMMAND_CHANNEL: CommandChannel = Channel::new();

/// Outbound event channel: control loop → UI task.
pub static EVENT_CHANNEL: EventChannel = Channel::new();

/// [`EventSink`] that forwards into a bounded channel.
///
/// Never blocks the control loop: when the consumer falls behind, the
/// event is dropped and counted.
pub struct ChannelSink<'a, const N: usize> {
    channel: &'a Channel<CriticalSectionRawMutex, PressEvent, N>,
    dropped: u32,
}

impl<'a, const N: usize> ChannelSink<'a, N> {
    pub fn new(channel: &'a Channel<CriticalSectionRawMutex, PressEvent, N>) -> Self {
        Self { channel, dropped: 0 }
    }

    /// Events lost to a full channel.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<const N: usize> EventSink for ChannelSink<'_, N> {
    fn emit(&mut self, event: &PressEvent) {
        if let Err(TrySendError::Full(_)) = self.channel.try_send(event.clone()) {
            self.dropped = self.dropped.wrapping_add(1);
            warn!("ChannelSink: consumer behind, dropped {} event(s)", self.dropped);
        }
    }
}
