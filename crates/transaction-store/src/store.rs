use async_trait::async_trait;
use common::TransactionId;
use domain::{CreditStatus, Money, RedemptionRecord, Transaction, Version};

use crate::Result;

/// Core trait for transaction store implementations.
///
/// All implementations must be thread-safe (Send + Sync). Transactions are
/// never deleted; the only racy mutation is the total, which is guarded by
/// an optimistic version check.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persists a new transaction record.
    ///
    /// The ID is supplied by the caller (the orchestrator mints it before
    /// pricing). Fails if a record with the same ID already exists.
    async fn create(&self, transaction: Transaction) -> Result<()>;

    /// Retrieves a transaction by ID.
    ///
    /// Returns None if no record exists.
    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>>;

    /// Lists all transactions, oldest first.
    async fn list(&self) -> Result<Vec<Transaction>>;

    /// Updates the transaction total with an optimistic version check.
    ///
    /// Fails with [`StoreError::VersionConflict`](crate::StoreError) if the
    /// stored version does not match `expected_version`, forcing the caller
    /// to re-read and retry. On success the version is incremented and the
    /// updated record is returned.
    async fn update_total(
        &self,
        id: TransactionId,
        expected_version: Version,
        new_total: Money,
    ) -> Result<Transaction>;

    /// Appends a redemption record to the transaction's history.
    ///
    /// Does not bump the version: the history is append-only and the
    /// outcome is already settled by the time it is written.
    async fn record_redemption(&self, id: TransactionId, record: RedemptionRecord) -> Result<()>;

    /// Persists the outcome of the creation-time point credit.
    ///
    /// Absorbed credit failures must be visible on the record for later
    /// reconciliation, not merely logged.
    async fn set_credit_status(&self, id: TransactionId, status: CreditStatus) -> Result<()>;
}
