//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `channels`     | EventSink          | embassy-sync queues      |
//! | `log_sink`     | EventSink          | Serial log output        |
//! | `nvs`          | ConfigPort         | NVS / in-memory store    |
//! |                | StoragePort        |                          |
//! | `record_store` | PressStore         | any StoragePort          |
//! | `time`         |                    | ESP32 system timer       |

pub mod channels;
pub mod log_sink;
pub mod nvs;
pub mod record_store;
pub mod time;
