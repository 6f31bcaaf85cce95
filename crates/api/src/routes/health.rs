//! Liveness endpoint.

use axum::Json;
use serde_json::json;

/// GET /health — liveness probe for load balancers and compose healthchecks.
pub async fn check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
