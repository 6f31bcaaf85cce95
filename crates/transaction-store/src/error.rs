use common::TransactionId;
use domain::Version;
use thiserror::Error;

/// Errors that can occur when interacting with the transaction store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The transaction was not found in the store.
    #[error("Transaction not found: {0}")]
    NotFound(TransactionId),

    /// An optimistic version check failed on update.
    /// The expected version did not match the stored version.
    #[error(
        "Version conflict for transaction {id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        id: TransactionId,
        expected: Version,
        actual: Version,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
