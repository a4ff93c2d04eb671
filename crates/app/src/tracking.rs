//! Order Tracking
//!
//! Keeps the most recent full snapshot of one order, or of every order in a
//! device's history. Every snapshot replaces the previous one outright; there
//! is no diffing and no attempt to detect snapshots arriving out of order.

use std::time::Duration;

use mala::orders::{Order, OrderSnapshot, OrderUuid};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::stores::{RecordStore, StoreError};

/// Latest-snapshot cache with change notification.
#[derive(Debug)]
pub struct OrderTracker {
    latest: watch::Sender<Option<OrderSnapshot>>,
}

impl Default for OrderTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderTracker {
    #[must_use]
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);

        Self { latest }
    }

    /// Replace the cached snapshot and wake subscribers.
    pub fn apply(&self, snapshot: OrderSnapshot) {
        let id = snapshot.order.id;
        let status = snapshot.order.status;

        let previous = self
            .latest
            .send_replace(Some(snapshot))
            .map(|previous| previous.order.status);

        if previous.is_some_and(|previous| previous != status) {
            info!(
                order = %id,
                from = previous.map_or("", |previous| previous.as_str()),
                to = status.as_str(),
                "order status changed"
            );
        }
    }

    /// The cached snapshot, if any has been applied.
    #[must_use]
    pub fn latest(&self) -> Option<OrderSnapshot> {
        self.latest.borrow().clone()
    }

    /// Receiver that observes every applied snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<OrderSnapshot>> {
        self.latest.subscribe()
    }

    /// Fetch the order and its lines and apply them as one snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if either fetch fails.
    pub async fn refresh(
        &self,
        store: &dyn RecordStore,
        id: OrderUuid,
    ) -> Result<OrderSnapshot, StoreError> {
        let order = store.get_order(id).await?;
        let items = store.get_order_items(id).await?;
        let snapshot = OrderSnapshot { order, items };

        debug!(order = %id, status = snapshot.order.status.as_str(), "refreshed order");

        self.apply(snapshot.clone());

        Ok(snapshot)
    }

    /// Refresh every `period` until the order reaches a terminal status.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`] encountered.
    pub async fn follow(
        &self,
        store: &dyn RecordStore,
        id: OrderUuid,
        period: Duration,
    ) -> Result<OrderSnapshot, StoreError> {
        loop {
            let snapshot = self.refresh(store, id).await?;

            if snapshot.order.status.is_terminal() {
                return Ok(snapshot);
            }

            tokio::time::sleep(period).await;
        }
    }
}

/// Latest statuses of a set of orders with change notification.
#[derive(Debug)]
pub struct HistoryTracker {
    latest: watch::Sender<Vec<Order>>,
}

impl Default for HistoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryTracker {
    #[must_use]
    pub fn new() -> Self {
        let (latest, _) = watch::channel(Vec::new());

        Self { latest }
    }

    /// Replace the cached orders and wake subscribers.
    pub fn apply(&self, orders: Vec<Order>) {
        let previous = self.latest.send_replace(orders);
        let current = self.latest.borrow();

        for order in current.iter() {
            let before = previous
                .iter()
                .find(|previous| previous.id == order.id)
                .map(|previous| previous.status);

            if let Some(before) = before.filter(|before| *before != order.status) {
                info!(
                    order = %order.id,
                    from = before.as_str(),
                    to = order.status.as_str(),
                    "order status changed"
                );
            }
        }
    }

    /// The cached orders, newest first.
    #[must_use]
    pub fn latest(&self) -> Vec<Order> {
        self.latest.borrow().clone()
    }

    /// Receiver that observes every applied set of orders.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Order>> {
        self.latest.subscribe()
    }

    /// Fetch `ids` in one request and apply the result.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the fetch fails.
    pub async fn refresh(
        &self,
        store: &dyn RecordStore,
        ids: &[OrderUuid],
    ) -> Result<Vec<Order>, StoreError> {
        let orders = store.get_orders(ids.to_vec()).await?;

        debug!(requested = ids.len(), found = orders.len(), "refreshed order history");

        self.apply(orders.clone());

        Ok(orders)
    }

    /// Refresh every `period` until every known order is terminal.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`] encountered.
    pub async fn follow(
        &self,
        store: &dyn RecordStore,
        ids: &[OrderUuid],
        period: Duration,
    ) -> Result<Vec<Order>, StoreError> {
        loop {
            let orders = self.refresh(store, ids).await?;

            if orders.iter().all(|order| order.status.is_terminal()) {
                return Ok(orders);
            }

            tokio::time::sleep(period).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use jiff::Timestamp;
    use mala::{
        orders::{OrderStatus, PaymentMethod, SpiceLevel},
        uuids::TypedUuid,
    };
    use testresult::TestResult;

    use crate::stores::MockRecordStore;

    use super::*;

    fn order(id: OrderUuid, status: OrderStatus) -> Order {
        Order {
            id,
            session: None,
            customer_name: "Somchai".to_string(),
            customer_phone: "0812345678".to_string(),
            delivery_address: "Replay".to_string(),
            spice_level: SpiceLevel::Medium,
            payment_method: PaymentMethod::Cash,
            payment_evidence: None,
            subtotal: 15_00,
            discount: 0,
            total: 15_00,
            notes: String::new(),
            status,
            is_modified: false,
            original_total: None,
            modification_note: None,
            created_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn apply_replaces_previous_snapshot() {
        let tracker = OrderTracker::new();
        let id = TypedUuid::now_v7();

        tracker.apply(OrderSnapshot {
            order: order(id, OrderStatus::Ready),
            items: Vec::new(),
        });
        tracker.apply(OrderSnapshot {
            order: order(id, OrderStatus::Pending),
            items: Vec::new(),
        });

        let latest = tracker.latest().map(|snapshot| snapshot.order.status);

        assert_eq!(latest, Some(OrderStatus::Pending));
    }

    #[tokio::test]
    async fn subscribers_see_applied_snapshots() -> TestResult {
        let tracker = OrderTracker::new();
        let mut receiver = tracker.subscribe();
        let id = TypedUuid::now_v7();

        tracker.apply(OrderSnapshot {
            order: order(id, OrderStatus::Preparing),
            items: Vec::new(),
        });

        receiver.changed().await?;

        let status = receiver
            .borrow_and_update()
            .as_ref()
            .map(|snapshot| snapshot.order.status);

        assert_eq!(status, Some(OrderStatus::Preparing));

        Ok(())
    }

    #[tokio::test]
    async fn follow_stops_at_terminal_status() -> TestResult {
        let id = TypedUuid::now_v7();
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);

        let mut store = MockRecordStore::new();
        store.expect_get_order().times(3).returning(move |id| {
            let status = match counter.fetch_add(1, Ordering::SeqCst) {
                0 => OrderStatus::Pending,
                1 => OrderStatus::Preparing,
                _ => OrderStatus::Completed,
            };

            Ok(order(id, status))
        });
        store
            .expect_get_order_items()
            .times(3)
            .returning(|_| Ok(Vec::new()));

        let tracker = OrderTracker::new();

        let snapshot = tracker
            .follow(&store, id, Duration::from_millis(1))
            .await?;

        assert_eq!(snapshot.order.status, OrderStatus::Completed);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.latest(), Some(snapshot));

        Ok(())
    }

    #[tokio::test]
    async fn refresh_surfaces_store_errors() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_order()
            .returning(|_| Err(StoreError::NotFound));

        let tracker = OrderTracker::new();

        let result = tracker.refresh(&store, TypedUuid::now_v7()).await;

        assert!(matches!(result, Err(StoreError::NotFound)));
        assert_eq!(tracker.latest(), None);
    }

    #[tokio::test]
    async fn history_follow_stops_once_every_order_is_terminal() -> TestResult {
        let first = TypedUuid::now_v7();
        let second = TypedUuid::now_v7();
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);

        let mut store = MockRecordStore::new();
        store.expect_get_orders().times(3).returning(move |ids| {
            let poll = counter.fetch_add(1, Ordering::SeqCst);

            Ok(ids
                .into_iter()
                .enumerate()
                .map(|(index, id)| {
                    let status = match (poll, index) {
                        (0, _) => OrderStatus::Pending,
                        (1, 0) => OrderStatus::Completed,
                        (1, _) => OrderStatus::Preparing,
                        (_, 0) => OrderStatus::Completed,
                        _ => OrderStatus::Cancelled,
                    };

                    order(id, status)
                })
                .collect())
        });

        let tracker = HistoryTracker::new();
        let mut receiver = tracker.subscribe();

        let orders = tracker
            .follow(&store, &[first, second], Duration::from_millis(1))
            .await?;

        let statuses: Vec<_> = orders.iter().map(|order| (order.id, order.status)).collect();

        assert_eq!(
            statuses,
            vec![(first, OrderStatus::Completed), (second, OrderStatus::Cancelled)]
        );
        assert_eq!(polls.load(Ordering::SeqCst), 3);
        assert!(receiver.has_changed()?);
        assert_eq!(*receiver.borrow_and_update(), orders);

        Ok(())
    }

    #[test]
    fn history_apply_overwrites_whole_set() {
        let tracker = HistoryTracker::new();
        let kept = TypedUuid::now_v7();

        tracker.apply(vec![
            order(kept, OrderStatus::Ready),
            order(TypedUuid::now_v7(), OrderStatus::Pending),
        ]);
        tracker.apply(vec![order(kept, OrderStatus::Completed)]);

        let latest: Vec<_> = tracker
            .latest()
            .iter()
            .map(|order| (order.id, order.status))
            .collect();

        assert_eq!(latest, vec![(kept, OrderStatus::Completed)]);
    }

    #[tokio::test]
    async fn history_refresh_surfaces_store_errors() {
        let mut store = MockRecordStore::new();
        store
            .expect_get_orders()
            .returning(|_| Err(StoreError::UnexpectedResponse("down".to_string())));

        let tracker = HistoryTracker::new();

        let result = tracker.refresh(&store, &[TypedUuid::now_v7()]).await;

        assert!(matches!(result, Err(StoreError::UnexpectedResponse(_))));
        assert!(tracker.latest().is_empty());
    }
}
