//! HTTP API server for the POS transaction orchestrator.
//!
//! Exposes transaction creation and loyalty redemption over REST, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{CatalogService, LedgerService, TransactionCoordinator};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use transaction_store::TransactionStore;

use routes::transactions::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, L, C>(
    state: Arc<AppState<S, L, C>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    S: TransactionStore + 'static,
    L: LedgerService + 'static,
    C: CatalogService + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/",
            post(routes::transactions::create::<S, L, C>)
                .get(routes::transactions::list::<S, L, C>),
        )
        .route("/{id}", get(routes::transactions::get::<S, L, C>))
        .route(
            "/{id}/apply_loyalty",
            post(routes::transactions::apply_loyalty::<S, L, C>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over the given store and service seams.
pub fn create_state<S, L, C>(
    store: Arc<S>,
    ledger: Arc<L>,
    catalog: Arc<C>,
) -> Arc<AppState<S, L, C>>
where
    S: TransactionStore + 'static,
    L: LedgerService + 'static,
    C: CatalogService + 'static,
{
    Arc::new(AppState {
        coordinator: TransactionCoordinator::new(store, ledger, catalog),
    })
}
