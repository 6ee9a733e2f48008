//! Unified error types for the press controller.
//!
//! One `Error` enum that every subsystem converts into, so the
//! orchestrator handles hardware, safety and command failures the same
//! way.  All variants are `Copy` so they can be carried inside outbound
//! events without allocation.

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Bus devices
// ---------------------------------------------------------------------------

/// Which device on the shared I2C bus a transaction was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    RelayExpander,
    TopSensor,
    BottomSensor,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelayExpander => write!(f, "relay expander"),
            Self::TopSensor => write!(f, "top sensor"),
            Self::BottomSensor => write!(f, "bottom sensor"),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Error {
    /// A bus transaction failed (NACK, arbitration loss, timeout).
    I2cCommunication(Device),
    /// The verification read disagrees with the register value just written.
    HardwareStateMismatch { expected: u8, actual: u8 },
    /// A platen exceeded the configured maximum temperature.
    OverTemperature,
    /// Actuation requested while the emergency stop is engaged or a heater
    /// fault is latched.
    InterlockViolation,
    /// Start requested without complete session parameters.
    InvalidSessionState,
    /// Start requested while a press cycle is already running.
    PressInProgress,
    /// Relay index outside the 8-bit register.
    InvalidRelayIndex(u8),
    /// A command parameter is outside the configured bounds.
    InvalidParameter(&'static str),
    /// The press record store rejected an operation.
    Store(StoreError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2cCommunication(dev) => write!(f, "I2C communication error ({dev})"),
            Self::HardwareStateMismatch { expected, actual } => write!(
                f,
                "hardware state mismatch: wrote 0b{expected:08b}, read back 0b{actual:08b}"
            ),
            Self::OverTemperature => write!(f, "over temperature"),
            Self::InterlockViolation => write!(f, "interlock violation"),
            Self::InvalidSessionState => write!(f, "session parameters incomplete"),
            Self::PressInProgress => write!(f, "press already in progress"),
            Self::InvalidRelayIndex(i) => write!(f, "relay index {i} out of range"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Hardware-class failures force an active press back to Idle.
    pub fn is_hardware(&self) -> bool {
        matches!(
            self,
            Self::I2cCommunication(_) | Self::HardwareStateMismatch { .. } | Self::Store(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    /// Requested record does not exist.
    NotFound,
    /// Stored blob failed to deserialize.
    Corrupted,
    /// Underlying storage is full.
    Full,
    /// Generic I/O error from the storage backend.
    Io,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "record not found"),
            Self::Corrupted => write!(f, "record corrupted"),
            Self::Full => write!(f, "storage full"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
