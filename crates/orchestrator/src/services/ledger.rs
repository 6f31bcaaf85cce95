//! Loyalty ledger seam: HTTP client and in-memory double.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::CustomerId;
use serde::{Deserialize, Serialize};

use crate::remote::{ClientError, RetryPolicy, send_with_retry};

/// Trait for loyalty ledger operations.
///
/// The ledger owns every customer's point balance; the orchestrator only
/// touches it through these endpoints.
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// Returns whether the customer exists in the ledger.
    async fn customer_exists(&self, customer_id: CustomerId) -> Result<bool, ClientError>;

    /// Fetches the customer's current point balance.
    /// Returns None when the ledger answered with 404.
    async fn balance(&self, customer_id: CustomerId) -> Result<Option<u64>, ClientError>;

    /// Adds (positive delta) or subtracts (negative delta) points.
    async fn adjust_points(&self, customer_id: CustomerId, delta: i64) -> Result<(), ClientError>;
}

/// Wire format of `GET /{customerId}/points`.
#[derive(Deserialize)]
struct BalanceBody {
    #[allow(dead_code)]
    customer_id: u64,
    points: u64,
}

/// Wire format of `POST /{customerId}/points`.
#[derive(Serialize)]
struct AdjustBody {
    points: i64,
}

/// HTTP client for the loyalty ledger service.
#[derive(Clone)]
pub struct HttpLedgerService {
    client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl HttpLedgerService {
    /// Creates a ledger client over a shared HTTP client.
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
impl LedgerService for HttpLedgerService {
    async fn customer_exists(&self, customer_id: CustomerId) -> Result<bool, ClientError> {
        let url = format!("{}/{}", self.base_url, customer_id);
        let response = send_with_retry(self.client.get(url), &self.policy).await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(ClientError::Unexpected(format!(
                "ledger answered HTTP {status}"
            ))),
        }
    }

    async fn balance(&self, customer_id: CustomerId) -> Result<Option<u64>, ClientError> {
        let url = format!("{}/{}/points", self.base_url, customer_id);
        let response = send_with_retry(self.client.get(url), &self.policy).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ClientError::Unexpected(format!(
                "ledger answered HTTP {}",
                response.status()
            )));
        }

        let body: BalanceBody = response
            .json()
            .await
            .map_err(|e| ClientError::Unexpected(e.to_string()))?;
        Ok(Some(body.points))
    }

    async fn adjust_points(&self, customer_id: CustomerId, delta: i64) -> Result<(), ClientError> {
        let url = format!("{}/{}/points", self.base_url, customer_id);
        let request = self.client.post(url).json(&AdjustBody { points: delta });
        let response = send_with_retry(request, &self.policy).await?;

        if !response.status().is_success() {
            return Err(ClientError::Unexpected(format!(
                "ledger answered HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryLedgerState {
    balances: HashMap<CustomerId, i64>,
    fail_on_customer_lookup: bool,
    fail_on_balance: bool,
    fail_on_credit: bool,
    fail_on_debit: bool,
    adjust_calls: u32,
}

/// In-memory ledger for testing.
///
/// The failure switches simulate an unreachable ledger on specific
/// endpoints, which is how the compensation paths get exercised.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerService {
    state: Arc<RwLock<InMemoryLedgerState>>,
}

impl InMemoryLedgerService {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a customer with the given starting balance.
    pub fn register(&self, customer_id: CustomerId, points: i64) {
        self.state.write().unwrap().balances.insert(customer_id, points);
    }

    /// Returns the customer's balance, if registered.
    pub fn balance_of(&self, customer_id: CustomerId) -> Option<i64> {
        self.state.read().unwrap().balances.get(&customer_id).copied()
    }

    /// Returns how many adjust calls reached the ledger.
    pub fn adjust_call_count(&self) -> u32 {
        self.state.read().unwrap().adjust_calls
    }

    /// Makes customer-existence checks fail as unreachable.
    pub fn set_fail_on_customer_lookup(&self, fail: bool) {
        self.state.write().unwrap().fail_on_customer_lookup = fail;
    }

    /// Makes balance fetches fail as unreachable.
    pub fn set_fail_on_balance(&self, fail: bool) {
        self.state.write().unwrap().fail_on_balance = fail;
    }

    /// Makes credits (positive adjustments) fail as unreachable.
    pub fn set_fail_on_credit(&self, fail: bool) {
        self.state.write().unwrap().fail_on_credit = fail;
    }

    /// Makes debits (negative adjustments) fail as unreachable.
    pub fn set_fail_on_debit(&self, fail: bool) {
        self.state.write().unwrap().fail_on_debit = fail;
    }
}

#[async_trait]
impl LedgerService for InMemoryLedgerService {
    async fn customer_exists(&self, customer_id: CustomerId) -> Result<bool, ClientError> {
        let state = self.state.read().unwrap();
        if state.fail_on_customer_lookup {
            return Err(ClientError::Unavailable { attempts: 3 });
        }
        Ok(state.balances.contains_key(&customer_id))
    }

    async fn balance(&self, customer_id: CustomerId) -> Result<Option<u64>, ClientError> {
        let state = self.state.read().unwrap();
        if state.fail_on_balance {
            return Err(ClientError::Unavailable { attempts: 3 });
        }
        Ok(state
            .balances
            .get(&customer_id)
            .map(|points| (*points).max(0) as u64))
    }

    async fn adjust_points(&self, customer_id: CustomerId, delta: i64) -> Result<(), ClientError> {
        let mut state = self.state.write().unwrap();
        if delta >= 0 && state.fail_on_credit {
            return Err(ClientError::Unavailable { attempts: 3 });
        }
        if delta < 0 && state.fail_on_debit {
            return Err(ClientError::Unavailable { attempts: 3 });
        }

        match state.balances.get_mut(&customer_id) {
            Some(points) => {
                *points += delta;
                state.adjust_calls += 1;
                Ok(())
            }
            None => Err(ClientError::Unexpected(
                "ledger answered HTTP 404 Not Found".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_balance() {
        let ledger = InMemoryLedgerService::new();
        ledger.register(CustomerId::new(1), 20);

        assert!(ledger.customer_exists(CustomerId::new(1)).await.unwrap());
        assert!(!ledger.customer_exists(CustomerId::new(2)).await.unwrap());
        assert_eq!(ledger.balance(CustomerId::new(1)).await.unwrap(), Some(20));
        assert_eq!(ledger.balance(CustomerId::new(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_adjust_points_credits_and_debits() {
        let ledger = InMemoryLedgerService::new();
        ledger.register(CustomerId::new(1), 20);

        ledger.adjust_points(CustomerId::new(1), 5).await.unwrap();
        ledger.adjust_points(CustomerId::new(1), -10).await.unwrap();

        assert_eq!(ledger.balance_of(CustomerId::new(1)), Some(15));
        assert_eq!(ledger.adjust_call_count(), 2);
    }

    #[tokio::test]
    async fn test_adjust_points_unknown_customer() {
        let ledger = InMemoryLedgerService::new();
        let err = ledger
            .adjust_points(CustomerId::new(9), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Unexpected(_)));
    }

    #[tokio::test]
    async fn test_debit_failure_switch_leaves_credits_working() {
        let ledger = InMemoryLedgerService::new();
        ledger.register(CustomerId::new(1), 20);
        ledger.set_fail_on_debit(true);

        ledger.adjust_points(CustomerId::new(1), 5).await.unwrap();
        let err = ledger
            .adjust_points(CustomerId::new(1), -5)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Unavailable { .. }));
        assert_eq!(ledger.balance_of(CustomerId::new(1)), Some(25));
    }
}
