//! Shared identifier types used across the POS orchestration crates.

mod types;

pub use types::{CustomerId, ItemId, TransactionId};
