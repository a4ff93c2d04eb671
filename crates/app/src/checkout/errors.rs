//! Checkout errors.

use mala::{
    cart::CartError,
    checkout::{SnapshotError, ValidationError},
    history::HistoryError,
    orders::OrderUuid,
    rate_limit::RateLimitError,
};
use thiserror::Error;

use crate::stores::StoreError;

const GENERIC_FAILURE: &str = "Could not place your order. Please try again.";

/// Checkout error variants.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The form or cart failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The session is blocked from submitting.
    #[error("{message}")]
    RateLimited {
        /// Human-readable reason.
        message: String,
        /// Whole minutes until submission is allowed again.
        wait_minutes: i64,
    },

    /// Another submission is still in flight.
    #[error("an order is already being submitted")]
    AlreadySubmitting,

    /// The payment slip could not be uploaded.
    #[error("payment evidence upload failed")]
    Upload(#[source] StoreError),

    /// The order record could not be created.
    #[error("order could not be created")]
    CreateOrder(#[source] StoreError),

    /// The order was created but its lines were not.
    #[error("order {order} was created without its items")]
    CreateItems {
        /// The orphaned order.
        order: OrderUuid,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },

    /// The cart could not be read, priced or cleared.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The order history could not be updated.
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Rate limiter state could not be read or written.
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    /// The cart could not be turned into order records.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl CheckoutError {
    /// Text suitable for showing to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(error) => error.to_string(),
            Self::RateLimited {
                message,
                wait_minutes,
            } => format!("{message} ({wait_minutes} min)"),
            Self::AlreadySubmitting => "Your order is already being submitted.".to_string(),
            Self::Upload(_)
            | Self::CreateOrder(_)
            | Self::CreateItems { .. }
            | Self::Cart(_)
            | Self::History(_)
            | Self::RateLimit(_)
            | Self::Snapshot(_) => GENERIC_FAILURE.to_string(),
        }
    }
}
