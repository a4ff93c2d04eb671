//! Mala
//!
//! Device-local core of a single-venue ordering client: the persisted cart,
//! volume discount pricing, session identity, order history and the order
//! submission rate limiter. All persistence goes through the [`storage::Storage`]
//! port so every component can be driven from memory in tests.

pub mod cart;
pub mod checkout;
pub mod clock;
pub mod discounts;
pub mod history;
pub mod menu;
pub mod orders;
pub mod rate_limit;
pub mod session;
pub mod storage;
pub mod uuids;
