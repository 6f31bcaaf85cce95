use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, TransactionId};
use domain::{CreditStatus, Money, RedemptionRecord, Transaction, Version};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{Result, StoreError, store::TransactionStore};

/// PostgreSQL-backed transaction store.
///
/// Optimistic concurrency is enforced in SQL: `update_total` only matches
/// the row when the stored version equals the expected one, so two writers
/// racing on the same transaction resolve without any application-level
/// locking.
#[derive(Clone)]
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_transaction(row: PgRow) -> Result<Transaction> {
        let line_items: serde_json::Value = row.try_get("line_items")?;
        let credit: serde_json::Value = row.try_get("credit")?;
        let redemptions: serde_json::Value = row.try_get("redemptions")?;
        let status: String = row.try_get("status")?;

        Ok(Transaction {
            id: TransactionId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: row
                .try_get::<Option<i64>, _>("customer_id")?
                .map(|id| CustomerId::new(id as u64)),
            line_items: serde_json::from_value(line_items)?,
            total: Money::from_cents(row.try_get("total_cents")?),
            status: serde_json::from_value(serde_json::Value::String(status))?,
            credit: serde_json::from_value(credit)?,
            redemptions: serde_json::from_value(redemptions)?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn create(&self, transaction: Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, customer_id, line_items, total_cents, status, credit, redemptions, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.customer_id.map(|c| c.as_u64() as i64))
        .bind(serde_json::to_value(&transaction.line_items)?)
        .bind(transaction.total.cents())
        .bind(transaction.status.to_string())
        .bind(serde_json::to_value(&transaction.credit)?)
        .bind(serde_json::to_value(&transaction.redemptions)?)
        .bind(transaction.version.as_i64())
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query("SELECT * FROM transactions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_transaction).transpose()
    }

    async fn list(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query("SELECT * FROM transactions ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_transaction).collect()
    }

    async fn update_total(
        &self,
        id: TransactionId,
        expected_version: Version,
        new_total: Money,
    ) -> Result<Transaction> {
        let row = sqlx::query(
            r#"
            UPDATE transactions
            SET total_cents = $3, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected_version.as_i64())
        .bind(new_total.cents())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_transaction(row),
            None => {
                // No row matched: the record is either gone or at a
                // different version. Re-read to report which.
                let actual: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM transactions WHERE id = $1")
                        .bind(id.as_uuid())
                        .fetch_optional(&self.pool)
                        .await?;

                match actual {
                    Some(actual) => Err(StoreError::VersionConflict {
                        id,
                        expected: expected_version,
                        actual: Version::new(actual),
                    }),
                    None => Err(StoreError::NotFound(id)),
                }
            }
        }
    }

    async fn record_redemption(&self, id: TransactionId, record: RedemptionRecord) -> Result<()> {
        let appended = serde_json::to_value(vec![&record])?;
        let result = sqlx::query(
            "UPDATE transactions SET redemptions = redemptions || $2 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(appended)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn set_credit_status(&self, id: TransactionId, status: CreditStatus) -> Result<()> {
        let result = sqlx::query("UPDATE transactions SET credit = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(serde_json::to_value(&status)?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
