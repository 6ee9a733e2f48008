//! Port traits: the boundary between the press core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PressOrchestrator (domain)
//! ```
//!
//! Driven adapters (event sinks, record store, flash storage) implement
//! these traits.  The orchestrator consumes them via generics, so the
//! press logic runs unchanged against the in-memory adapters in tests.

use crate::config::PressConfig;
use crate::error::StoreError;
use crate::fsm::context::{PressRecord, PressSession};

use super::events::PressEvent;

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / UI)
// ───────────────────────────────────────────────────────────────

/// The orchestrator emits structured [`PressEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &PressEvent);
}

/// Fan one event out to two sinks.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &PressEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Press store port (domain ↔ press history)
// ───────────────────────────────────────────────────────────────

/// Press history and the session that survives a reboot.
pub trait PressStore {
    /// Persist a finished press.  The store assigns and returns the id.
    fn save_press(&mut self, record: PressRecord) -> Result<u32, StoreError>;

    /// Attach a yield weight to an existing record.
    fn save_yield(&mut self, id: u32, weight_g: f32) -> Result<(), StoreError>;

    /// `Ok(None)` on first boot.
    fn load_current_session(&self) -> Result<Option<PressSession>, StoreError>;

    fn save_current_session(&mut self, session: &PressSession) -> Result<(), StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`PressConfig`].
///
/// Implementations MUST validate before persisting and after loading.
/// Out-of-range values are rejected with
/// [`ConfigError::ValidationFailed`], never clamped.
pub trait ConfigPort {
    /// Returns [`PressConfig::default()`] if nothing is stored.
    fn load(&self) -> Result<PressConfig, ConfigError>;

    fn save(&self, config: &PressConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Namespaced key/blob storage.
///
/// Writes MUST be atomic: no partial writes on power loss.  The ESP-IDF
/// NVS API guarantees this natively.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A field failed range validation.
    ValidationFailed(&'static str),
    StorageFull,
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    Full,
    IoError,
    /// Caller's buffer is smaller than the stored blob.
    BufferTooSmall,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Full => Self::Full,
            StorageError::IoError | StorageError::BufferTooSmall => Self::Io,
        }
    }
}
