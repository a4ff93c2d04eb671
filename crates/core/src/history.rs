//! Order history
//!
//! Orders placed from this device, remembered per session, newest first.
//! Recording is prepend-if-new: a known order id is neither duplicated nor
//! moved to the front.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::{
    orders::OrderUuid,
    session::SessionId,
    storage::{Storage, StorageError, keys, read_json, write_json},
};

type HistoryMap = FxHashMap<SessionId, Vec<OrderUuid>>;

/// Errors from the order history index.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Reading or writing the history failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The current session's order history.
#[derive(Debug, Clone)]
pub struct OrderHistory {
    storage: Arc<dyn Storage>,
    session: SessionId,
}

impl OrderHistory {
    /// Create a history view for `session`.
    pub fn new(storage: Arc<dyn Storage>, session: SessionId) -> Self {
        Self { storage, session }
    }

    /// Session the history is scoped to.
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Remember `order` as the newest order, unless it is already known.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Storage`] if the history cannot be read or written.
    pub fn record(&self, order: OrderUuid) -> Result<(), HistoryError> {
        let mut history = self.load()?;
        let orders = history.entry(self.session.clone()).or_default();

        if orders.contains(&order) {
            return Ok(());
        }

        orders.insert(0, order);

        write_json(self.storage.as_ref(), keys::ORDER_HISTORY, &history)?;

        debug!(session = %self.session, %order, "recorded order in history");

        Ok(())
    }

    /// Orders recorded for this session, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Storage`] if the history cannot be read.
    pub fn list(&self) -> Result<Vec<OrderUuid>, HistoryError> {
        Ok(self.load()?.remove(&self.session).unwrap_or_default())
    }

    fn load(&self) -> Result<HistoryMap, HistoryError> {
        Ok(read_json(self.storage.as_ref(), keys::ORDER_HISTORY)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{storage::MemoryStorage, uuids::TypedUuid};

    use super::*;

    #[test]
    fn empty_history_lists_nothing() -> TestResult {
        let history = OrderHistory::new(Arc::new(MemoryStorage::new()), SessionId::new("s1"));

        assert!(history.list()?.is_empty());

        Ok(())
    }

    #[test]
    fn newest_order_is_listed_first() -> TestResult {
        let history = OrderHistory::new(Arc::new(MemoryStorage::new()), SessionId::new("s1"));
        let first = TypedUuid::now_v7();
        let second = TypedUuid::now_v7();

        history.record(first)?;
        history.record(second)?;

        assert_eq!(history.list()?, vec![second, first]);

        Ok(())
    }

    #[test]
    fn duplicate_is_neither_repeated_nor_moved() -> TestResult {
        let history = OrderHistory::new(Arc::new(MemoryStorage::new()), SessionId::new("s1"));
        let a = TypedUuid::now_v7();
        let b = TypedUuid::now_v7();

        history.record(b)?;
        history.record(a)?;
        history.record(b)?;

        assert_eq!(history.list()?, vec![a, b]);

        Ok(())
    }

    #[test]
    fn histories_are_scoped_by_session() -> TestResult {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mine = OrderHistory::new(Arc::clone(&storage), SessionId::new("mine"));
        let theirs = OrderHistory::new(storage, SessionId::new("theirs"));
        let order = TypedUuid::now_v7();

        mine.record(order)?;

        assert_eq!(mine.list()?, vec![order]);
        assert!(theirs.list()?.is_empty());

        Ok(())
    }
}
