use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::TransactionId;
use domain::{CreditStatus, Money, RedemptionRecord, Transaction, Version};
use tokio::sync::RwLock;

use crate::{Result, StoreError, store::TransactionStore};

/// In-memory transaction store for tests and local runs.
///
/// Provides the same optimistic-versioning semantics as the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryTransactionStore {
    records: Arc<RwLock<HashMap<TransactionId, Transaction>>>,
}

impl InMemoryTransactionStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored transactions.
    pub async fn transaction_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(&self, transaction: Transaction) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&transaction.id) {
            // Creation mints fresh UUIDs; a duplicate is a caller bug and
            // reads as a conflict at version zero.
            return Err(StoreError::VersionConflict {
                id: transaction.id,
                expected: Version::new(0),
                actual: records[&transaction.id].version,
            });
        }
        records.insert(transaction.id, transaction);
        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Transaction>> {
        let records = self.records.read().await;
        let mut all: Vec<Transaction> = records.values().cloned().collect();
        all.sort_by_key(|tx| (tx.created_at, tx.id.as_uuid()));
        Ok(all)
    }

    async fn update_total(
        &self,
        id: TransactionId,
        expected_version: Version,
        new_total: Money,
    ) -> Result<Transaction> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if record.version != expected_version {
            return Err(StoreError::VersionConflict {
                id,
                expected: expected_version,
                actual: record.version,
            });
        }

        record.total = new_total;
        record.version = record.version.next();
        Ok(record.clone())
    }

    async fn record_redemption(&self, id: TransactionId, record: RedemptionRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let transaction = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        transaction.redemptions.push(record);
        Ok(())
    }

    async fn set_credit_status(&self, id: TransactionId, status: CreditStatus) -> Result<()> {
        let mut records = self.records.write().await;
        let transaction = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        transaction.credit = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerId, ItemId};
    use domain::{LineItem, RedemptionOutcome};

    fn sample_transaction() -> Transaction {
        Transaction::new(
            TransactionId::new(),
            Some(CustomerId::new(1)),
            vec![LineItem::resolved(
                ItemId::new(1),
                "Espresso",
                2,
                Money::from_cents(250),
            )],
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryTransactionStore::new();
        let tx = sample_transaction();
        let id = tx.id;

        store.create(tx.clone()).await.unwrap();
        let loaded = store.get(id).await.unwrap().unwrap();
        assert_eq!(loaded, tx);
        assert_eq!(store.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn test_list_returns_all_oldest_first() {
        let store = InMemoryTransactionStore::new();
        let first = sample_transaction();
        let mut second = sample_transaction();
        second.created_at = first.created_at + chrono::Duration::seconds(1);

        store.create(second.clone()).await.unwrap();
        store.create(first.clone()).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[1].id, second.id);
    }

    #[tokio::test]
    async fn test_list_empty_store() {
        let store = InMemoryTransactionStore::new();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = InMemoryTransactionStore::new();
        assert!(store.get(TransactionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_total_bumps_version() {
        let store = InMemoryTransactionStore::new();
        let tx = sample_transaction();
        let id = tx.id;
        store.create(tx).await.unwrap();

        let updated = store
            .update_total(id, Version::initial(), Money::from_cents(400))
            .await
            .unwrap();

        assert_eq!(updated.total, Money::from_cents(400));
        assert_eq!(updated.version, Version::new(2));
    }

    #[tokio::test]
    async fn test_update_total_stale_version_conflicts() {
        let store = InMemoryTransactionStore::new();
        let tx = sample_transaction();
        let id = tx.id;
        store.create(tx).await.unwrap();

        store
            .update_total(id, Version::initial(), Money::from_cents(400))
            .await
            .unwrap();

        // Second writer still holds version 1.
        let err = store
            .update_total(id, Version::initial(), Money::from_cents(300))
            .await
            .unwrap_err();

        match err {
            StoreError::VersionConflict {
                expected, actual, ..
            } => {
                assert_eq!(expected, Version::initial());
                assert_eq!(actual, Version::new(2));
            }
            other => panic!("expected version conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_total_missing_transaction() {
        let store = InMemoryTransactionStore::new();
        let err = store
            .update_total(TransactionId::new(), Version::initial(), Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_record_redemption_appends() {
        let store = InMemoryTransactionStore::new();
        let tx = sample_transaction();
        let id = tx.id;
        store.create(tx).await.unwrap();

        store
            .record_redemption(id, RedemptionRecord {
                points_used: 10,
                discount: Money::from_cents(100),
                resulting_total: Money::from_cents(400),
                outcome: RedemptionOutcome::Confirmed,
                idempotency_key: Some("key-1".to_string()),
                applied_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let loaded = store.get(id).await.unwrap().unwrap();
        assert_eq!(loaded.redemptions.len(), 1);
        // History writes do not bump the version.
        assert_eq!(loaded.version, Version::initial());
    }

    #[tokio::test]
    async fn test_set_credit_status() {
        let store = InMemoryTransactionStore::new();
        let tx = sample_transaction();
        let id = tx.id;
        store.create(tx).await.unwrap();

        store
            .set_credit_status(id, CreditStatus::Failed {
                reason: "ledger unreachable".to_string(),
            })
            .await
            .unwrap();

        let loaded = store.get(id).await.unwrap().unwrap();
        assert!(matches!(loaded.credit, CreditStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_updates_exactly_one_wins() {
        let store = InMemoryTransactionStore::new();
        let tx = sample_transaction();
        let id = tx.id;
        store.create(tx).await.unwrap();

        // Both writers read version 1 before either updates.
        let a = store.update_total(id, Version::initial(), Money::from_cents(400));
        let b = store.update_total(id, Version::initial(), Money::from_cents(300));
        let (ra, rb) = tokio::join!(a, b);

        assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
        let loaded = store.get(id).await.unwrap().unwrap();
        assert_eq!(loaded.version, Version::new(2));
    }
}
