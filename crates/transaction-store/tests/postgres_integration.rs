//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and require a Docker
//! daemon, so they are ignored by default. Run with:
//!
//! ```bash
//! cargo test -p transaction-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use common::{CustomerId, ItemId, TransactionId};
use domain::{CreditStatus, LineItem, Money, Transaction, Version};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use transaction_store::{PostgresTransactionStore, StoreError, TransactionStore};

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_transactions_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared table
async fn get_test_store() -> PostgresTransactionStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE transactions")
        .execute(&pool)
        .await
        .unwrap();

    PostgresTransactionStore::new(pool)
}

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
#[ignore = "requires Docker"]
async fn test_create_and_get_roundtrip() {
    let store = get_test_store().await;
    let tx = sample_transaction();
    let id = tx.id;

    store.create(tx.clone()).await.unwrap();
    let loaded = store.get(id).await.unwrap().unwrap();

    assert_eq!(loaded.id, tx.id);
    assert_eq!(loaded.customer_id, tx.customer_id);
    assert_eq!(loaded.line_items, tx.line_items);
    assert_eq!(loaded.total, tx.total);
    assert_eq!(loaded.version, Version::initial());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_update_total_enforces_version() {
    let store = get_test_store().await;
    let tx = sample_transaction();
    let id = tx.id;
    store.create(tx).await.unwrap();

    let updated = store
        .update_total(id, Version::initial(), Money::from_cents(400))
        .await
        .unwrap();
    assert_eq!(updated.total, Money::from_cents(400));
    assert_eq!(updated.version, Version::new(2));

    let err = store
        .update_total(id, Version::initial(), Money::from_cents(300))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::VersionConflict { .. }));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_list_orders_by_creation_time() {
    let store = get_test_store().await;
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
#[ignore = "requires Docker"]
async fn test_update_total_missing_row() {
    let store = get_test_store().await;
    let err = store
        .update_total(TransactionId::new(), Version::initial(), Money::zero())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_record_redemption_and_credit_status() {
    let store = get_test_store().await;
    let tx = sample_transaction();
    let id = tx.id;
    store.create(tx).await.unwrap();

    store
        .record_redemption(id, domain::RedemptionRecord {
            points_used: 10,
            discount: Money::from_cents(100),
            resulting_total: Money::from_cents(400),
            outcome: domain::RedemptionOutcome::Confirmed,
            idempotency_key: Some("key-1".to_string()),
            applied_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

    store
        .set_credit_status(id, CreditStatus::Credited { points: 5 })
        .await
        .unwrap();

    let loaded = store.get(id).await.unwrap().unwrap();
    assert_eq!(loaded.redemptions.len(), 1);
    assert_eq!(loaded.credit, CreditStatus::Credited { points: 5 });
    // Neither write touches the version.
    assert_eq!(loaded.version, Version::initial());
}
