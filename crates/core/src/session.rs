//! Session identity
//!
//! A device gets one opaque session identifier the first time anything asks for
//! it. The identifier is never rotated or expired; order history and rate
//! limiting are scoped by it.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    sync::Arc,
};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    clock::Clock,
    storage::{Storage, StorageError, keys, read_json, write_json},
};

const SUFFIX_LEN: usize = 7;

/// Errors from session identity.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or writing the identifier failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Opaque per-device identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Issues and persists the device session identifier.
#[derive(Debug, Clone)]
pub struct Sessions {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl Sessions {
    /// Create a session issuer over the given storage.
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Return the persisted session identifier, creating and persisting one
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the identifier cannot be read or written.
    pub fn get_or_create(&self) -> Result<SessionId, SessionError> {
        if let Some(existing) = read_json::<SessionId>(self.storage.as_ref(), keys::SESSION_ID)? {
            return Ok(existing);
        }

        let session = generate(self.clock.now().as_millisecond(), &mut rand::thread_rng());

        write_json(self.storage.as_ref(), keys::SESSION_ID, &session)?;

        debug!(session = %session, "created device session");

        Ok(session)
    }
}

fn generate<R: Rng>(millis: i64, rng: &mut R) -> SessionId {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from_digit(rng.gen_range(0..36), 36).unwrap_or('0'))
        .collect();

    SessionId(format!("session_{millis}_{suffix}"))
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;

    use crate::{clock::ManualClock, storage::MemoryStorage};

    use super::*;

    fn sessions(storage: Arc<MemoryStorage>) -> Result<Sessions, jiff::Error> {
        let clock = ManualClock::new(Timestamp::from_millisecond(1_700_000_000_000)?);

        Ok(Sessions::new(storage, Arc::new(clock)))
    }

    #[test]
    fn creates_identifier_with_time_and_random_suffix() -> TestResult {
        let session = sessions(Arc::new(MemoryStorage::new()))?.get_or_create()?;

        let suffix = session
            .as_str()
            .strip_prefix("session_1700000000000_")
            .ok_or("missing time prefix")?;

        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));

        Ok(())
    }

    #[test]
    fn identifier_is_stable_across_calls_and_instances() -> TestResult {
        let storage = Arc::new(MemoryStorage::new());

        let first = sessions(Arc::clone(&storage))?.get_or_create()?;
        let second = sessions(Arc::clone(&storage))?.get_or_create()?;

        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn existing_identifier_is_reused() -> TestResult {
        let storage = Arc::new(MemoryStorage::new());

        write_json(storage.as_ref(), keys::SESSION_ID, "session_1_abcdefg")?;

        let session = sessions(storage)?.get_or_create()?;

        assert_eq!(session.as_str(), "session_1_abcdefg");

        Ok(())
    }
}
