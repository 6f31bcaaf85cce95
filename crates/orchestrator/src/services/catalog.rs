//! Catalog service seam: HTTP client and in-memory double.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::ItemId;
use domain::Money;
use serde::Deserialize;

use crate::remote::{ClientError, RetryPolicy, send_with_retry};

/// A catalog record with its price converted to cents.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub price: Money,
}

/// Trait for catalog item lookups.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Looks up an item by ID. Returns None when the catalog answered
    /// with 404.
    async fn item(&self, item_id: ItemId) -> Result<Option<CatalogItem>, ClientError>;
}

/// Wire format of `GET /{itemId}` on the catalog service.
/// Prices travel as decimal currency and are converted to cents here.
#[derive(Deserialize)]
struct CatalogItemBody {
    id: u64,
    name: String,
    #[allow(dead_code)]
    description: Option<String>,
    price: f64,
}

/// HTTP client for the catalog service.
#[derive(Clone)]
pub struct HttpCatalogService {
    client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl HttpCatalogService {
    /// Creates a catalog client over a shared HTTP client.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            policy: RetryPolicy::default(),
        }
    }

    /// Overrides the default retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl CatalogService for HttpCatalogService {
    async fn item(&self, item_id: ItemId) -> Result<Option<CatalogItem>, ClientError> {
        let url = format!("{}/{}", self.base_url, item_id);
        let response = send_with_retry(self.client.get(url), &self.policy).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ClientError::Unexpected(format!(
                "catalog answered HTTP {}",
                response.status()
            )));
        }

        let body: CatalogItemBody = response
            .json()
            .await
            .map_err(|e| ClientError::Unexpected(e.to_string()))?;

        Ok(Some(CatalogItem {
            id: ItemId::new(body.id),
            name: body.name,
            price: Money::from_cents((body.price * 100.0).round() as i64),
        }))
    }
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    items: HashMap<ItemId, CatalogItem>,
    fail_on_lookup: bool,
}

/// In-memory catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogService {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalogService {
    /// Creates a new empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a catalog item.
    pub fn insert(&self, id: ItemId, name: impl Into<String>, price: Money) {
        self.state.write().unwrap().items.insert(id, CatalogItem {
            id,
            name: name.into(),
            price,
        });
    }

    /// Configures every subsequent lookup to fail as unreachable.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().unwrap().fail_on_lookup = fail;
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalogService {
    async fn item(&self, item_id: ItemId) -> Result<Option<CatalogItem>, ClientError> {
        let state = self.state.read().unwrap();
        if state.fail_on_lookup {
            return Err(ClientError::Unavailable { attempts: 3 });
        }
        Ok(state.items.get(&item_id).cloned())
    }
}
