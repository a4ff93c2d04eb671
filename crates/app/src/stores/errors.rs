//! Store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response from store: {0}")]
    UnexpectedResponse(String),

    #[error("invalid store url: {0}")]
    InvalidUrl(String),

    #[error("amount {0} cannot be represented in minor units")]
    InvalidAmount(String),
}
