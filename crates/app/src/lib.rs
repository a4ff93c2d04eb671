//! Application layer: hosted stores, the submission workflow, order tracking
//! and device configuration around the `mala` core.

pub mod checkout;
pub mod config;
pub mod context;
pub mod observability;
pub mod render;
pub mod storage;
pub mod stores;
pub mod tracking;
