//! Orchestrator error taxonomy.

use common::{CustomerId, TransactionId};
use thiserror::Error;
use transaction_store::StoreError;

/// Errors surfaced by the creation and redemption workflows.
///
/// Absorbed failures (partial pricing, credit failure) do not appear here:
/// they are recorded on the transaction and returned inside a successful
/// response. Everything below aborts the workflow, except `DebitFailed`
/// which reports the compensation outcome.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed input (empty item list, zero quantity, zero points,
    /// guest transaction on a redemption path).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The transaction does not exist in the local store.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// The ledger service answered and does not know this customer.
    #[error("Customer not found in loyalty ledger: {0}")]
    CustomerNotFound(CustomerId),

    /// The customer's balance does not cover the requested points.
    #[error("Insufficient points: requested {requested}, available {available}")]
    InsufficientPoints { requested: u64, available: u64 },

    /// A remote service was unreachable after retries, on a path where
    /// the failure cannot be absorbed (the redemption balance check).
    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Optimistic version conflicts persisted through all internal
    /// retries.
    #[error("Concurrent update conflict on transaction {0}, retries exhausted")]
    Conflict(TransactionId),

    /// The ledger debit failed after the local discount was applied.
    /// `compensated` tells the caller whether the local total was
    /// successfully restored to its pre-redemption value.
    #[error("Ledger debit failed ({reason}); local discount reversed: {compensated}")]
    DebitFailed { compensated: bool, reason: String },

    /// The local store failed. Fatal.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// A workflow task failed unexpectedly (panicked or was shut down).
    #[error("Internal error: {0}")]
    Internal(String),
}
