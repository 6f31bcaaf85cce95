//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{HttpCatalogService, HttpLedgerService};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use transaction_store::{InMemoryTransactionStore, PostgresTransactionStore, TransactionStore};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<S: TransactionStore + 'static>(
    store: Arc<S>,
    ledger: Arc<HttpLedgerService>,
    catalog: Arc<HttpCatalogService>,
    metrics_handle: PrometheusHandle,
    config: &Config,
) {
    let state = api::create_state(store, ledger, catalog);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Wire up the remote service clients
    let client = orchestrator::build_client().expect("failed to build HTTP client");
    let ledger = Arc::new(HttpLedgerService::new(
        client.clone(),
        config.ledger_url.clone(),
    ));
    let catalog = Arc::new(HttpCatalogService::new(client, config.catalog_url.clone()));

    // 4. Pick the transaction store and serve
    match config.database_url.clone() {
        Some(url) => {
            let store = PostgresTransactionStore::connect(&url)
                .await
                .expect("failed to connect to PostgreSQL");
            store.run_migrations().await.expect("migrations failed");
            tracing::info!("using PostgreSQL transaction store");
            serve(Arc::new(store), ledger, catalog, metrics_handle, &config).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory transaction store");
            serve(
                Arc::new(InMemoryTransactionStore::new()),
                ledger,
                catalog,
                metrics_handle,
                &config,
            )
            .await;
        }
    }
}
