//! The transaction record and its parts.

use chrono::{DateTime, Utc};
use common::{CustomerId, ItemId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::Money;

/// Record version for optimistic concurrency control.
///
/// Every total-mutating update carries the version the writer last observed
/// and is rejected by the store if the stored version has since moved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version a freshly created transaction carries (1).
    pub fn initial() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a line item's price could be resolved against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemStatus {
    /// The catalog lookup succeeded and the unit price is a snapshot taken
    /// at resolution time.
    Resolved,
    /// The catalog lookup failed or the item was unknown. The line carries
    /// zero prices and is flagged for later reconciliation.
    Unresolved,
}

/// A single priced line of a transaction. Immutable once attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_id: ItemId,
    /// Catalog item name; empty when the item did not resolve.
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
    pub status: LineItemStatus,
}

impl LineItem {
    /// Creates a resolved line from a catalog price snapshot.
    pub fn resolved(item_id: ItemId, name: impl Into<String>, quantity: u32, unit_price: Money) -> Self {
        Self {
            item_id,
            name: name.into(),
            quantity,
            unit_price,
            subtotal: unit_price.multiply(quantity),
            status: LineItemStatus::Resolved,
        }
    }

    /// Creates an unresolved placeholder line carrying zero prices.
    pub fn unresolved(item_id: ItemId, quantity: u32) -> Self {
        Self {
            item_id,
            name: String::new(),
            quantity,
            unit_price: Money::zero(),
            subtotal: Money::zero(),
            status: LineItemStatus::Unresolved,
        }
    }

    /// Returns true if the line resolved against the catalog.
    pub fn is_resolved(&self) -> bool {
        self.status == LineItemStatus::Resolved
    }
}

/// Outcome of the best-effort point credit attempted after persistence.
///
/// Persisted on the record, not merely logged, so an absorbed credit
/// failure can be reconciled later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreditStatus {
    /// Guest transaction, or the total earned zero points.
    #[default]
    NotApplicable,
    /// Points were credited to the customer's ledger balance.
    Credited { points: u64 },
    /// The credit call failed; the transaction stands regardless.
    Failed { reason: String },
}

/// Ledger-debit outcome of a redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionOutcome {
    /// The ledger debit succeeded; the discount stands.
    Confirmed,
    /// The ledger debit failed and the local discount was compensated away.
    Reversed,
}

/// A redemption applied (or attempted) against a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRecord {
    pub points_used: u64,
    pub discount: Money,
    pub resulting_total: Money,
    pub outcome: RedemptionOutcome,
    /// Caller-supplied key for idempotent replay of confirmed redemptions.
    pub idempotency_key: Option<String>,
    pub applied_at: DateTime<Utc>,
}

/// Lifecycle status of a transaction record.
///
/// Creation always lands in `Completed` (partial pricing and credit
/// failures are absorbed, not fatal). The enum exists so reconciliation
/// tooling can introduce further states without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A committed POS transaction.
///
/// Invariant: `total` equals the sum of resolved line subtotals minus the
/// sum of confirmed redemption discounts, clamped at zero. Only the
/// redemption workflow mutates `total`, and only through the store's
/// version-checked update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub customer_id: Option<CustomerId>,
    pub line_items: Vec<LineItem>,
    pub total: Money,
    pub status: TransactionStatus,
    pub credit: CreditStatus,
    pub redemptions: Vec<RedemptionRecord>,
    pub version: Version,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a new transaction from priced line items.
    ///
    /// The total is the sum of resolved subtotals; unresolved lines
    /// contribute nothing but stay on the record as flags.
    pub fn new(
        id: TransactionId,
        customer_id: Option<CustomerId>,
        line_items: Vec<LineItem>,
    ) -> Self {
        let total = line_items
            .iter()
            .filter(|line| line.is_resolved())
            .map(|line| line.subtotal)
            .sum();

        Self {
            id,
            customer_id,
            line_items,
            total,
            status: TransactionStatus::Completed,
            credit: CreditStatus::default(),
            redemptions: Vec::new(),
            version: Version::initial(),
            created_at: Utc::now(),
        }
    }

    /// Returns the IDs of line items that failed to resolve.
    pub fn unresolved_items(&self) -> Vec<ItemId> {
        self.line_items
            .iter()
            .filter(|line| !line.is_resolved())
            .map(|line| line.item_id)
            .collect()
    }

    /// Looks up a confirmed redemption recorded under the given
    /// idempotency key.
    pub fn confirmed_redemption(&self, idempotency_key: &str) -> Option<&RedemptionRecord> {
        self.redemptions.iter().find(|r| {
            r.outcome == RedemptionOutcome::Confirmed
                && r.idempotency_key.as_deref() == Some(idempotency_key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn espresso_line() -> LineItem {
        LineItem::resolved(ItemId::new(1), "Espresso", 2, Money::from_cents(250))
    }

    #[test]
    fn test_version_next() {
        assert_eq!(Version::initial().next(), Version::new(2));
    }

    #[test]
    fn test_resolved_line_subtotal() {
        let line = espresso_line();
        assert_eq!(line.subtotal, Money::from_cents(500));
        assert!(line.is_resolved());
    }

    #[test]
    fn test_unresolved_line_is_zero_priced() {
        let line = LineItem::unresolved(ItemId::new(9), 3);
        assert_eq!(line.subtotal, Money::zero());
        assert_eq!(line.unit_price, Money::zero());
        assert!(!line.is_resolved());
    }

    #[test]
    fn test_total_sums_resolved_lines_only() {
        let tx = Transaction::new(
            TransactionId::new(),
            Some(CustomerId::new(1)),
            vec![espresso_line(), LineItem::unresolved(ItemId::new(9), 1)],
        );
        assert_eq!(tx.total, Money::from_cents(500));
        assert_eq!(tx.unresolved_items(), vec![ItemId::new(9)]);
        assert_eq!(tx.version, Version::initial());
    }

    #[test]
    fn test_confirmed_redemption_lookup_ignores_reversed() {
        let mut tx = Transaction::new(TransactionId::new(), Some(CustomerId::new(1)), vec![
            espresso_line(),
        ]);
        tx.redemptions.push(RedemptionRecord {
            points_used: 10,
            discount: Money::from_cents(100),
            resulting_total: Money::from_cents(400),
            outcome: RedemptionOutcome::Reversed,
            idempotency_key: Some("key-1".to_string()),
            applied_at: Utc::now(),
        });
        assert!(tx.confirmed_redemption("key-1").is_none());

        tx.redemptions.push(RedemptionRecord {
            points_used: 10,
            discount: Money::from_cents(100),
            resulting_total: Money::from_cents(400),
            outcome: RedemptionOutcome::Confirmed,
            idempotency_key: Some("key-1".to_string()),
            applied_at: Utc::now(),
        });
        let found = tx.confirmed_redemption("key-1").unwrap();
        assert_eq!(found.points_used, 10);
    }

    #[test]
    fn test_transaction_serialization_roundtrip() {
        let tx = Transaction::new(TransactionId::new(), None, vec![espresso_line()]);
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, back);
    }
}
