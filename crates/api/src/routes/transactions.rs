//! Transaction creation, lookup and loyalty redemption endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{CustomerId, ItemId, TransactionId};
use domain::{CreditStatus, RedemptionOutcome, Transaction};
use orchestrator::{
    CatalogService, CreateTransaction, ItemRequest, LedgerService, RedemptionRequest,
    TransactionCoordinator,
};
use serde::{Deserialize, Serialize};
use transaction_store::TransactionStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, L, C> {
    pub coordinator: TransactionCoordinator<S, L, C>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateTransactionRequest {
    pub customer_id: Option<u64>,
    pub items: Vec<ItemRequestBody>,
}

#[derive(Deserialize)]
pub struct ItemRequestBody {
    pub item_id: u64,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct ApplyLoyaltyRequest {
    pub points_to_use: u64,
    pub idempotency_key: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct LineItemResponse {
    pub item_id: u64,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub resolved: bool,
}

#[derive(Serialize)]
pub struct RedemptionResponse {
    pub points_used: u64,
    pub discount_cents: i64,
    pub resulting_total_cents: i64,
    pub outcome: RedemptionOutcome,
    pub idempotency_key: Option<String>,
    pub applied_at: String,
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub customer_id: Option<u64>,
    pub line_items: Vec<LineItemResponse>,
    pub unresolved_items: Vec<u64>,
    pub total_cents: i64,
    pub status: String,
    pub credit: CreditStatus,
    pub redemptions: Vec<RedemptionResponse>,
    pub version: i64,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct ReceiptResponse {
    pub transaction_id: String,
    pub points_used: u64,
    pub discount_cents: i64,
    pub new_total_cents: i64,
}

fn transaction_response(tx: &Transaction) -> TransactionResponse {
    let line_items = tx
        .line_items
        .iter()
        .map(|line| LineItemResponse {
            item_id: line.item_id.as_u64(),
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            subtotal_cents: line.subtotal.cents(),
            resolved: line.is_resolved(),
        })
        .collect();

    let redemptions = tx
        .redemptions
        .iter()
        .map(|r| RedemptionResponse {
            points_used: r.points_used,
            discount_cents: r.discount.cents(),
            resulting_total_cents: r.resulting_total.cents(),
            outcome: r.outcome,
            idempotency_key: r.idempotency_key.clone(),
            applied_at: r.applied_at.to_rfc3339(),
        })
        .collect();

    TransactionResponse {
        id: tx.id.to_string(),
        customer_id: tx.customer_id.map(|c| c.as_u64()),
        line_items,
        unresolved_items: tx.unresolved_items().iter().map(|i| i.as_u64()).collect(),
        total_cents: tx.total.cents(),
        status: tx.status.to_string(),
        credit: tx.credit.clone(),
        redemptions,
        version: tx.version.as_i64(),
        created_at: tx.created_at.to_rfc3339(),
    }
}

// -- Handlers --

/// POST / — create a transaction, pricing its items concurrently.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<(axum::http::StatusCode, Json<TransactionResponse>), ApiError>
where
    S: TransactionStore + 'static,
    L: LedgerService + 'static,
    C: CatalogService + 'static,
{
    let command = CreateTransaction {
        customer_id: req.customer_id.map(CustomerId::new),
        items: req
            .items
            .iter()
            .map(|item| ItemRequest {
                item_id: ItemId::new(item.item_id),
                quantity: item.quantity,
            })
            .collect(),
    };

    let transaction = state.coordinator.create_transaction(command).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(transaction_response(&transaction)),
    ))
}

/// GET / — list all transaction records, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError>
where
    S: TransactionStore + 'static,
    L: LedgerService + 'static,
    C: CatalogService + 'static,
{
    let transactions = state.coordinator.list_transactions().await?;
    Ok(Json(transactions.iter().map(transaction_response).collect()))
}

/// GET /:id — load a transaction record by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
    Path(id): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError>
where
    S: TransactionStore + 'static,
    L: LedgerService + 'static,
    C: CatalogService + 'static,
{
    let transaction_id = parse_transaction_id(&id)?;
    let transaction = state
        .coordinator
        .get_transaction(transaction_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Transaction {id} not found")))?;

    Ok(Json(transaction_response(&transaction)))
}

/// POST /:id/apply_loyalty — redeem points against a transaction.
#[tracing::instrument(skip(state, req))]
pub async fn apply_loyalty<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
    Path(id): Path<String>,
    Json(req): Json<ApplyLoyaltyRequest>,
) -> Result<Json<ReceiptResponse>, ApiError>
where
    S: TransactionStore + 'static,
    L: LedgerService + 'static,
    C: CatalogService + 'static,
{
    let transaction_id = parse_transaction_id(&id)?;

    let receipt = state
        .coordinator
        .apply_loyalty(RedemptionRequest {
            transaction_id,
            points_to_use: req.points_to_use,
            idempotency_key: req.idempotency_key,
        })
        .await?;

    Ok(Json(ReceiptResponse {
        transaction_id: receipt.transaction_id.to_string(),
        points_used: receipt.points_used,
        discount_cents: receipt.discount_applied.cents(),
        new_total_cents: receipt.new_total.cents(),
    }))
}

fn parse_transaction_id(id: &str) -> Result<TransactionId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(TransactionId::from_uuid(uuid))
}
