//! Storage
//!
//! Every piece of device-local state is a JSON value stored under one of the
//! namespaced [`keys`]. Components receive the port as an `Arc<dyn Storage>` and
//! write through it synchronously, so a later read from any component (or a
//! later process sharing the same backing store) observes the mutation.

use std::{
    fmt::Debug,
    sync::{Mutex, PoisonError},
};

use rustc_hash::FxHashMap;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Namespaced keys for persisted values.
pub mod keys {
    /// The device's session identifier.
    pub const SESSION_ID: &str = "mala_session_id";

    /// The cart lines, in add order.
    pub const CART: &str = "mala_cart";

    /// Order identifiers per session, newest first.
    pub const ORDER_HISTORY: &str = "mala_order_history";

    /// Submission attempt timestamps per session.
    pub const RATE_LIMIT_ATTEMPTS: &str = "mala_rate_limit_attempts";

    /// Blocked-until timestamps per session.
    pub const BLOCKED_UNTIL: &str = "mala_blocked_until";
}

/// Errors raised by a storage backend or while decoding a stored value.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend failed to read or write.
    #[error("storage backend error for key {key}")]
    Backend {
        /// Key being accessed.
        key: String,

        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A stored value could not be decoded.
    #[error("stored value for key {key} could not be decoded")]
    Decode {
        /// Key being decoded.
        key: String,

        /// Underlying JSON failure.
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded for storage.
    #[error("value for key {key} could not be encoded")]
    Encode {
        /// Key being encoded.
        key: String,

        /// Underlying JSON failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Byte-oriented key/value port.
pub trait Storage: Debug + Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the backend cannot be written.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode the JSON value stored under `key`.
///
/// # Errors
///
/// Returns a [`StorageError`] if the backend fails or the value is not valid JSON for `T`.
pub fn read_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(bytes) = storage.get(key)? else {
        return Ok(None);
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StorageError::Decode {
            key: key.to_string(),
            source,
        })
}

/// Encode `value` as JSON and store it under `key`.
///
/// # Errors
///
/// Returns a [`StorageError`] if encoding or the backend write fails.
pub fn write_json<T: Serialize + ?Sized>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;

    storage.set(key, &bytes)
}

/// In-memory storage, shared by reference between components.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<FxHashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);

        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);

        values.insert(key.to_string(), value.to_vec());

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);

        values.remove(key);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn memory_storage_round_trips_values() -> TestResult {
        let storage = MemoryStorage::new();

        assert!(storage.get("missing")?.is_none());

        storage.set("key", b"value")?;

        assert_eq!(storage.get("key")?, Some(b"value".to_vec()));

        storage.remove("key")?;
        storage.remove("key")?;

        assert!(storage.is_empty());

        Ok(())
    }

    #[test]
    fn read_json_reports_undecodable_values() -> TestResult {
        let storage = MemoryStorage::new();

        storage.set(keys::CART, b"{not json")?;

        let result = read_json::<Vec<String>>(&storage, keys::CART);

        assert!(
            matches!(result, Err(StorageError::Decode { ref key, .. }) if key == keys::CART),
            "expected Decode error, got {result:?}"
        );

        Ok(())
    }

    #[test]
    fn write_then_read_json() -> TestResult {
        let storage = MemoryStorage::new();

        write_json(&storage, "list", &["a", "b"])?;

        let list: Option<Vec<String>> = read_json(&storage, "list")?;

        assert_eq!(list, Some(vec!["a".to_string(), "b".to_string()]));

        Ok(())
    }
}
