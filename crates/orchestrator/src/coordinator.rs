//! The transaction coordinator: creation and redemption workflows.

use std::sync::Arc;

use chrono::Utc;
use common::{CustomerId, TransactionId};
use domain::{
    CreditStatus, Money, POINT_VALUE_CENTS, RedemptionOutcome, RedemptionRecord, Transaction,
};
use transaction_store::{StoreError, TransactionStore};

use crate::error::OrchestratorError;
use crate::pricing::{ItemRequest, PriceResolver};
use crate::services::{CatalogService, LedgerService};
use crate::state::{CreationPhase, RedemptionPhase};

/// How many times a conflicted local apply is re-read and reattempted
/// before surfacing the conflict to the caller.
const MAX_CONFLICT_RETRIES: u32 = 3;

/// How many times the compensating reversal is attempted after a failed
/// ledger debit.
const COMPENSATION_RETRIES: u32 = 3;

/// Request to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub customer_id: Option<CustomerId>,
    pub items: Vec<ItemRequest>,
}

/// Request to redeem loyalty points against a transaction.
#[derive(Debug, Clone)]
pub struct RedemptionRequest {
    pub transaction_id: TransactionId,
    pub points_to_use: u64,
    /// When set, a confirmed redemption under the same key is replayed
    /// instead of re-executed.
    pub idempotency_key: Option<String>,
}

/// Outcome of a confirmed redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionReceipt {
    pub transaction_id: TransactionId,
    pub points_used: u64,
    pub discount_applied: Money,
    pub new_total: Money,
}

/// Drives the create-transaction and redeem-points workflows.
///
/// The coordinator sequences calls to the price resolver, the transaction
/// store and the loyalty ledger, and owns the compensation logic when a
/// step partially fails. It holds no locks across services; consistency
/// relies on the ordered step sequence, the store's optimistic version
/// check and the compensating reversal after a failed debit.
pub struct TransactionCoordinator<S, L, C> {
    store: Arc<S>,
    ledger: Arc<L>,
    resolver: PriceResolver<C>,
}

impl<S, L, C> TransactionCoordinator<S, L, C>
where
    S: TransactionStore + 'static,
    L: LedgerService + 'static,
    C: CatalogService + 'static,
{
    /// Creates a new coordinator over the given store and service seams.
    pub fn new(store: Arc<S>, ledger: Arc<L>, catalog: Arc<C>) -> Self {
        Self {
            store,
            ledger,
            resolver: PriceResolver::new(catalog),
        }
    }

    /// Overrides the pricing fan-out ceiling.
    pub fn with_pricing_fan_out(mut self, fan_out: usize) -> Self {
        self.resolver = self.resolver.with_fan_out(fan_out);
        self
    }

    /// Creation workflow: validate, price, persist, credit.
    ///
    /// Partial pricing and credit failures are absorbed and recorded on
    /// the returned record; persistence failure is fatal. The workflow
    /// always reaches `Completed` once the record is persisted.
    #[tracing::instrument(skip(self, request), fields(customer = ?request.customer_id))]
    pub async fn create_transaction(
        &self,
        request: CreateTransaction,
    ) -> Result<Transaction, OrchestratorError> {
        metrics::counter!("transaction_create_requests_total").increment(1);
        let started = std::time::Instant::now();

        if request.items.is_empty() {
            return Err(OrchestratorError::Validation(
                "transaction must contain at least one item".to_string(),
            ));
        }
        if let Some(bad) = request.items.iter().find(|item| item.quantity == 0) {
            return Err(OrchestratorError::Validation(format!(
                "quantity for item {} must be positive",
                bad.item_id
            )));
        }

        // The original services treated an unreachable ledger as a
        // warning here, but a definite "unknown customer" answer as 404.
        if let Some(customer_id) = request.customer_id {
            match self.ledger.customer_exists(customer_id).await {
                Ok(true) => {}
                Ok(false) => return Err(OrchestratorError::CustomerNotFound(customer_id)),
                Err(err) => {
                    tracing::warn!(
                        %customer_id,
                        error = %err,
                        "could not validate customer against ledger, proceeding"
                    );
                }
            }
        }

        tracing::debug!(phase = %CreationPhase::Pricing, "resolving item prices");
        let outcome = self.resolver.resolve(&request.items).await;
        if !outcome.unresolved.is_empty() {
            tracing::warn!(
                phase = %CreationPhase::Priced,
                unresolved = ?outcome.unresolved,
                "transaction priced partially, unresolved items flagged"
            );
        }

        let mut transaction = Transaction::new(
            TransactionId::new(),
            request.customer_id,
            outcome.line_items,
        );
        self.store.create(transaction.clone()).await?;
        tracing::debug!(
            phase = %CreationPhase::Persisted,
            id = %transaction.id,
            total = %transaction.total
        );

        if let Some(customer_id) = request.customer_id {
            transaction.credit = self.credit_points(customer_id, &transaction).await;
            tracing::debug!(phase = %CreationPhase::CreditAttempted, credit = ?transaction.credit);
        }

        metrics::counter!("transactions_created_total").increment(1);
        metrics::histogram!("transaction_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            phase = %CreationPhase::Completed,
            id = %transaction.id,
            total = %transaction.total,
            "transaction created"
        );
        Ok(transaction)
    }

    /// Best-effort point credit: 1 point per whole currency unit of the
    /// final total. Failure never rolls back the persisted transaction;
    /// the outcome lands on the record either way.
    async fn credit_points(
        &self,
        customer_id: CustomerId,
        transaction: &Transaction,
    ) -> CreditStatus {
        let points = transaction.total.whole_dollars();
        if points <= 0 {
            return CreditStatus::NotApplicable;
        }

        let credit = match self.ledger.adjust_points(customer_id, points).await {
            Ok(()) => CreditStatus::Credited {
                points: points as u64,
            },
            Err(err) => {
                tracing::warn!(
                    %customer_id,
                    error = %err,
                    "point credit failed, transaction stands"
                );
                metrics::counter!("point_credit_failures_total").increment(1);
                CreditStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };

        if let Err(err) = self
            .store
            .set_credit_status(transaction.id, credit.clone())
            .await
        {
            tracing::error!(
                id = %transaction.id,
                error = %err,
                "failed to persist credit outcome"
            );
        }
        credit
    }

    /// Loads a transaction record by ID.
    pub async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, OrchestratorError> {
        Ok(self.store.get(id).await?)
    }

    /// Lists all transaction records, oldest first.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>, OrchestratorError> {
        Ok(self.store.list().await?)
    }

    /// Redemption workflow: balance check, discount, version-checked local
    /// apply, ledger debit, compensation on debit failure.
    ///
    /// Any failure before the local apply aborts with no mutation. After
    /// it, a failed debit triggers a compensating reversal and the caller
    /// is told whether it landed.
    #[tracing::instrument(
        skip(self, request),
        fields(transaction = %request.transaction_id, points = request.points_to_use)
    )]
    pub async fn apply_loyalty(
        &self,
        request: RedemptionRequest,
    ) -> Result<RedemptionReceipt, OrchestratorError> {
        metrics::counter!("redemption_requests_total").increment(1);
        let started = std::time::Instant::now();

        if request.points_to_use == 0 {
            return Err(OrchestratorError::Validation(
                "points_to_use must be positive".to_string(),
            ));
        }

        let transaction = self
            .store
            .get(request.transaction_id)
            .await?
            .ok_or(OrchestratorError::TransactionNotFound(request.transaction_id))?;
        let customer_id = transaction.customer_id.ok_or_else(|| {
            OrchestratorError::Validation("transaction has no associated customer".to_string())
        })?;

        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(record) = transaction.confirmed_redemption(key) {
                tracing::info!(key, "replaying confirmed redemption, ledger untouched");
                return Ok(RedemptionReceipt {
                    transaction_id: transaction.id,
                    points_used: record.points_used,
                    discount_applied: record.discount,
                    new_total: record.resulting_total,
                });
            }
        }

        // The apply/debit/compensate sequence runs on its own task: a
        // caller that disappears after the local apply must not be able
        // to cancel the compensation.
        let store = Arc::clone(&self.store);
        let ledger = Arc::clone(&self.ledger);
        let receipt = tokio::spawn(Self::check_apply_debit(
            store,
            ledger,
            transaction,
            customer_id,
            request,
        ))
        .await
        .map_err(|err| OrchestratorError::Internal(format!("redemption task failed: {err}")))??;

        metrics::counter!("redemptions_confirmed_total").increment(1);
        metrics::histogram!("redemption_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(receipt)
    }

    /// The mutating tail of the redemption workflow.
    ///
    /// The balance is re-fetched on every conflict retry: a concurrent
    /// redemption may have both moved the version and debited the ledger,
    /// and a stale balance must never authorize points.
    async fn check_apply_debit(
        store: Arc<S>,
        ledger: Arc<L>,
        mut current: Transaction,
        customer_id: CustomerId,
        request: RedemptionRequest,
    ) -> Result<RedemptionReceipt, OrchestratorError> {
        let points = request.points_to_use;
        let discount = Money::from_cents(points as i64 * POINT_VALUE_CENTS);

        let mut conflicts = 0u32;
        let (prior_total, updated) = loop {
            let balance = match ledger.balance(customer_id).await {
                Ok(Some(balance)) => balance,
                Ok(None) => return Err(OrchestratorError::CustomerNotFound(customer_id)),
                Err(err) => {
                    return Err(OrchestratorError::UpstreamUnavailable(err.to_string()));
                }
            };
            tracing::debug!(phase = %RedemptionPhase::BalanceChecked, balance);

            if points > balance {
                return Err(OrchestratorError::InsufficientPoints {
                    requested: points,
                    available: balance,
                });
            }

            let new_total = current.total.sub_clamped(discount);
            tracing::debug!(phase = %RedemptionPhase::DiscountComputed, %new_total);

            match store
                .update_total(current.id, current.version, new_total)
                .await
            {
                Ok(updated) => break (current.total, updated),
                Err(StoreError::VersionConflict { .. }) => {
                    conflicts += 1;
                    metrics::counter!("redemption_conflicts_total").increment(1);
                    if conflicts >= MAX_CONFLICT_RETRIES {
                        return Err(OrchestratorError::Conflict(current.id));
                    }
                    tracing::debug!(attempt = conflicts, "version conflict, re-reading");
                    current = store
                        .get(current.id)
                        .await?
                        .ok_or(OrchestratorError::TransactionNotFound(current.id))?;
                }
                Err(err) => return Err(err.into()),
            }
        };
        tracing::debug!(phase = %RedemptionPhase::LocallyApplied, version = %updated.version);

        match ledger.adjust_points(customer_id, -(points as i64)).await {
            Ok(()) => {
                let record = RedemptionRecord {
                    points_used: points,
                    discount,
                    resulting_total: updated.total,
                    outcome: RedemptionOutcome::Confirmed,
                    idempotency_key: request.idempotency_key,
                    applied_at: Utc::now(),
                };
                if let Err(err) = store.record_redemption(updated.id, record).await {
                    // Debit and discount both stand; only the history
                    // write failed. Failing the request here would
                    // misreport a redemption that actually happened.
                    tracing::error!(
                        id = %updated.id,
                        error = %err,
                        "failed to record confirmed redemption"
                    );
                }
                tracing::info!(
                    phase = %RedemptionPhase::LedgerDebited,
                    id = %updated.id,
                    points,
                    new_total = %updated.total,
                    "redemption confirmed"
                );
                Ok(RedemptionReceipt {
                    transaction_id: updated.id,
                    points_used: points,
                    discount_applied: discount,
                    new_total: updated.total,
                })
            }
            Err(debit_err) => {
                let compensated = Self::compensate(&store, prior_total, &updated).await;
                let record = RedemptionRecord {
                    points_used: points,
                    discount,
                    resulting_total: prior_total,
                    outcome: RedemptionOutcome::Reversed,
                    idempotency_key: request.idempotency_key,
                    applied_at: Utc::now(),
                };
                if let Err(err) = store.record_redemption(updated.id, record).await {
                    tracing::error!(
                        id = %updated.id,
                        error = %err,
                        "failed to record reversed redemption"
                    );
                }
                metrics::counter!("redemptions_compensated_total").increment(1);
                tracing::warn!(
                    phase = %RedemptionPhase::Compensated,
                    id = %updated.id,
                    compensated,
                    error = %debit_err,
                    "ledger debit failed after local apply"
                );
                Err(OrchestratorError::DebitFailed {
                    compensated,
                    reason: debit_err.to_string(),
                })
            }
        }
    }

    /// Reverses the locally applied discount after a failed ledger debit.
    ///
    /// Adds back exactly the delta this redemption subtracted (which can
    /// be less than the discount when the total clamped at zero), so a
    /// concurrent redemption that landed in between is not stomped.
    async fn compensate(store: &Arc<S>, prior_total: Money, updated: &Transaction) -> bool {
        let reversal = prior_total.cents() - updated.total.cents();
        let mut current = updated.clone();

        for _ in 0..COMPENSATION_RETRIES {
            let restored = Money::from_cents(current.total.cents() + reversal);
            match store
                .update_total(current.id, current.version, restored)
                .await
            {
                Ok(_) => return true,
                Err(StoreError::VersionConflict { .. }) => match store.get(current.id).await {
                    Ok(Some(tx)) => current = tx,
                    _ => return false,
                },
                Err(err) => {
                    tracing::error!(
                        id = %current.id,
                        error = %err,
                        "compensating update failed"
                    );
                    return false;
                }
            }
        }
        false
    }
}
