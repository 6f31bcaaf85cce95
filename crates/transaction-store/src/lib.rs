//! Durable local store for committed POS transactions.
//!
//! The store is the source of truth for billing. Total-mutating updates
//! carry the version the writer last observed and fail with a
//! [`StoreError::VersionConflict`] when the stored version has moved, which
//! serializes concurrent redemptions against the same transaction.

mod error;
mod memory;
mod postgres;
mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryTransactionStore;
pub use postgres::PostgresTransactionStore;
pub use store::TransactionStore;
