//! Order submission.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use mala::{
    cart::{CartError, CartStore},
    checkout::{CheckoutForm, order_items},
    clock::Clock,
    discounts::DiscountSchedule,
    history::OrderHistory,
    orders::Order,
    rate_limit::{RateLimitDecision, RateLimiter},
};
use tracing::{error, info, warn};

use crate::{
    checkout::errors::CheckoutError,
    stores::{BlobStore, RecordStore},
};

/// Default bucket for payment slip uploads.
pub const DEFAULT_EVIDENCE_BUCKET: &str = "payment-slips";

/// Turns the current cart and a checkout form into a placed order.
pub struct CheckoutService {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    cart: CartStore,
    history: OrderHistory,
    limiter: RateLimiter,
    schedule: DiscountSchedule<'static>,
    clock: Arc<dyn Clock>,
    evidence_bucket: String,
    in_flight: AtomicBool,
}

impl Debug for CheckoutService {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CheckoutService")
            .field("session", self.history.session())
            .field("evidence_bucket", &self.evidence_bucket)
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        cart: CartStore,
        history: OrderHistory,
        limiter: RateLimiter,
        schedule: DiscountSchedule<'static>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            blobs,
            cart,
            history,
            limiter,
            schedule,
            clock,
            evidence_bucket: DEFAULT_EVIDENCE_BUCKET.to_string(),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Upload payment slips to `bucket` instead of the default.
    #[must_use]
    pub fn with_evidence_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.evidence_bucket = bucket.into();
        self
    }

    /// Submit the cart as an order.
    ///
    /// Steps run in order and stop at the first failure: validation,
    /// rate-limit check, attempt recording, slip upload, order creation, line
    /// creation, history update, cart clear. The cart is only cleared once
    /// the order and all of its lines exist.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] describing the first failed step.
    pub async fn submit(&self, form: CheckoutForm) -> Result<Order, CheckoutError> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return Err(CheckoutError::AlreadySubmitting);
        };

        let cart = self.cart.read()?;

        form.validate(&cart)?;

        if let RateLimitDecision::Blocked {
            message,
            wait_minutes,
        } = self.limiter.check()?
        {
            return Err(CheckoutError::RateLimited {
                message,
                wait_minutes,
            });
        }

        self.limiter.record_attempt()?;

        let totals = self.schedule.totals(&cart).map_err(CartError::from)?;
        let session = self.history.session().clone();

        let evidence = match form.evidence.as_ref() {
            Some(evidence) if form.payment_method.requires_evidence() => {
                let path = evidence.object_name(&session, self.clock.now());

                let reference = self
                    .blobs
                    .upload(
                        &self.evidence_bucket,
                        &path,
                        evidence.bytes.clone(),
                        &evidence.content_type,
                    )
                    .await
                    .map_err(|source| {
                        error!(%session, %source, "payment evidence upload failed");
                        CheckoutError::Upload(source)
                    })?;

                Some(reference)
            }
            _ => None,
        };

        let new_order = form.new_order(session.clone(), &totals, evidence)?;

        let order = self
            .records
            .create_order(new_order)
            .await
            .map_err(|source| {
                error!(%session, %source, "order creation failed");
                CheckoutError::CreateOrder(source)
            })?;

        let items = order_items(order.id, &cart)?;

        if let Err(source) = self.records.create_order_items(items).await {
            error!(
                %session,
                order = %order.id,
                %source,
                "order created without items, needs manual cleanup"
            );

            return Err(CheckoutError::CreateItems {
                order: order.id,
                source,
            });
        }

        self.history.record(order.id)?;
        self.cart.clear()?;

        info!(%session, order = %order.id, total = order.total, "order placed");

        Ok(order)
    }
}

/// Marks a submission as running until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("submission already in flight");
            return None;
        }

        Some(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
