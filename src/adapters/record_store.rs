//! Press history on top of any [`StoragePort`].
//!
//! ```text
//!  namespace "press"
//!  ├── session      current PressSession
//!  ├── next_id      u32, next record id
//!  └── rec_<id>     PressRecord
//! ```
//!
//! Blobs are postcard-encoded.  Ids start at 1 and are never reused.

use core::fmt::Write as _;

use heapless::String;
use log::{debug, info};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::app::ports::{PressStore, StoragePort};
use crate::error::StoreError;
use crate::fsm::context::{PressRecord, PressSession};

const NAMESPACE: &str = "press";
const SESSION_KEY: &str = "session";
const NEXT_ID_KEY: &str = "next_id";

/// Largest encoded record or session.
const BLOB_CAPACITY: usize = 256;

pub struct RecordStore<S> {
    storage: S,
}

impl<S: StoragePort> RecordStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Fetch one record by id.
    pub fn load_press(&self, id: u32) -> Result<PressRecord, StoreError> {
        self.get(&record_key(id)?)
    }

    /// Id the next saved press will receive.
    pub fn next_id(&self) -> Result<u32, StoreError> {
        match self.get::<u32>(NEXT_ID_KEY) {
            // A zeroed or wrapped counter restarts at 1; id 0 is never issued.
            Ok(id) => Ok(id.max(1)),
            Err(StoreError::NotFound) => Ok(1),
            Err(e) => Err(e),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let mut buf = [0u8; BLOB_CAPACITY];
        let len = self.storage.read(NAMESPACE, key, &mut buf)?;
        postcard::from_bytes(&buf[..len]).map_err(|_| StoreError::Corrupted)
    }

    fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let mut buf = [0u8; BLOB_CAPACITY];
        let bytes = postcard::to_slice(value, &mut buf).map_err(|_| StoreError::Full)?;
        self.storage.write(NAMESPACE, key, bytes)?;
        Ok(())
    }
}

fn record_key(id: u32) -> Result<String<16>, StoreError> {
    let mut key = String::new();
    write!(key, "rec_{id}").map_err(|_| StoreError::Io)?;
    Ok(key)
}

impl<S: StoragePort> PressStore for RecordStore<S> {
    fn save_press(&mut self, mut record: PressRecord) -> Result<u32, StoreError> {
        let id = self.next_id()?;
        record.id = id;
        self.put(&record_key(id)?, &record)?;
        // The record is already durable; a lost counter update only risks
        // overwriting this id on the next save.
        self.put(NEXT_ID_KEY, &id.wrapping_add(1))?;
        info!("RecordStore: saved press #{id}");
        Ok(id)
    }

    fn save_yield(&mut self, id: u32, weight_g: f32) -> Result<(), StoreError> {
        let key = record_key(id)?;
        let mut record: PressRecord = self.get(&key)?;
        record.yield_weight_g = Some(weight_g);
        self.put(&key, &record)?;
        debug!("RecordStore: #{id} yield {weight_g:.2} g");
        Ok(())
    }

    fn load_current_session(&self) -> Result<Option<PressSession>, StoreError> {
        match self.get(SESSION_KEY) {
            Ok(session) => Ok(Some(session)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save_current_session(&mut self, session: &PressSession) -> Result<(), StoreError> {
        self.put(SESSION_KEY, session)
    }
}
