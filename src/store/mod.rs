//! Durable key/value port used by the pattern memory.
//!
//! Two logical records live in the store: the learned pattern statistics and
//! the recent query list. Adapters only deal in whole string values; the
//! JSON helpers below own encoding and decoding. Reads treat every failure
//! as a missing record, writes report failures for the caller to log.

mod file;
mod memory;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key of the pattern statistics record.
pub const PATTERNS_KEY: &str = "presearch.patterns.v1";
/// Key of the recent query list.
pub const RECENTS_KEY: &str = "presearch.recents.v1";

/// Minimal durable key/value storage.
///
/// Writes replace the whole value for a key. Implementations must tolerate
/// being used when the backing storage is gone: `get` returns `None` and
/// `set` reports an error.
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<S: PersistentStore + ?Sized> PersistentStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Read and decode a JSON value, returning `None` when it is missing or malformed.
pub fn load_json(store: &dyn PersistentStore, key: &str) -> Option<Value> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(key, error = %err, "discarding undecodable record");
            None
        }
    }
}

/// Encode and write a value.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn PersistentStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let encoded = serde_json::to_string(value)?;
    store.set(key, &encoded)
}
