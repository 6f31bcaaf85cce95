//! Transaction data model and value objects for the POS orchestration service.
//!
//! The model is deliberately plain: a [`Transaction`] is a versioned record,
//! not an event-sourced aggregate. Consistency with the remote loyalty ledger
//! is the orchestrator's job; this crate only guarantees the local invariants
//! (line-item subtotals, clamped totals, immutable line items).

mod money;
mod transaction;

pub use money::Money;
pub use transaction::{
    CreditStatus, LineItem, LineItemStatus, RedemptionOutcome, RedemptionRecord, Transaction,
    TransactionStatus, Version,
};

/// Currency value of a single loyalty point, in cents (1 point = $0.10).
pub const POINT_VALUE_CENTS: i64 = 10;
