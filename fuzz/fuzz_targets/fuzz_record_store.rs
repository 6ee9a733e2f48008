//! Fuzz target: `RecordStore` over corrupted storage
//!
//! Plants arbitrary bytes under the session, counter and record keys, then
//! drives the store.  A flash image written by older firmware, or torn by
//! a power cut, must surface as an error and never as a panic.
//!
//! Invariants checked:
//! - No panics under arbitrary blob contents
//! - `save_press` never hands out id 0
//! - A record saved over garbage reads back intact
//!
//! cargo fuzz run fuzz_record_store

#![no_main]

use libfuzzer_sys::fuzz_target;
use rosinpress::adapters::record_store::RecordStore;
use rosinpress::app::ports::{PressStore, StorageError, StoragePort};
use rosinpress::fsm::context::{ActivePress, PressRecord, PressSession};
use std::collections::HashMap;

// ── In-memory StoragePort for fuzz testing ────────────────────

#[derive(Default)]
struct MemStore {
    data: HashMap<String, Vec<u8>>,
}

impl StoragePort for MemStore {
    fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let v = self
            .data
            .get(&format!("{ns}::{key}"))
            .ok_or(StorageError::NotFound)?;
        if v.len() > buf.len() {
            return Err(StorageError::BufferTooSmall);
        }
        buf[..v.len()].copy_from_slice(v);
        Ok(v.len())
    }

    fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.data.insert(format!("{ns}::{key}"), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{ns}::{key}"));
        Ok(())
    }

    fn exists(&self, ns: &str, key: &str) -> bool {
        self.data.contains_key(&format!("{ns}::{key}"))
    }
}

fuzz_target!(|data: &[u8]| {
    let third = data.len() / 3;
    let (session, rest) = data.split_at(third);
    let (counter, record) = rest.split_at(third.min(rest.len()));

    let mut mem = MemStore::default();
    let _ = mem.write("press", "session", session);
    let _ = mem.write("press", "next_id", counter);
    let _ = mem.write("press", "rec_1", record);
    let mut store = RecordStore::new(mem);

    let _ = store.load_current_session();
    let _ = store.load_press(1);
    let _ = store.save_yield(1, 2.5);

    let full = PressSession {
        top_temp_c: Some(90.0),
        bottom_temp_c: Some(85.0),
        duration_secs: Some(60),
        ..PressSession::default()
    };
    let _ = store.save_current_session(&full);
    let Some(press) = ActivePress::from_session(&full, 0) else {
        return;
    };
    let record = PressRecord::from_press(&press, 66_000);
    if let Ok(id) = store.save_press(record.clone()) {
        assert_ne!(id, 0, "record ids start at 1");
        let back = store.load_press(id).expect("freshly saved record");
        assert_eq!(back.duration_secs, record.duration_secs);
        assert_eq!(back.id, id);
    }
});
