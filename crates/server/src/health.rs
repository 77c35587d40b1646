use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use storechat_orders::OrderDirectory;

#[derive(Clone)]
pub struct HealthState {
    orders: Arc<dyn OrderDirectory>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub order_backend: HealthCheck,
    pub checked_at: String,
}

pub fn router(orders: Arc<dyn OrderDirectory>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { orders })
}

/// Always 200: a cold token cache is refreshed on the next lookup, so the service keeps
/// answering either way.
pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    let order_backend = order_backend_check(state.orders.as_ref()).await;
    let ready = order_backend.status == "ready";

    Json(HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "storechat-server runtime initialized".to_string(),
        },
        order_backend,
        checked_at: Utc::now().to_rfc3339(),
    })
}

async fn order_backend_check(orders: &dyn OrderDirectory) -> HealthCheck {
    if orders.credentials_ready().await {
        HealthCheck { status: "ready", detail: "access token cached".to_string() }
    } else {
        HealthCheck {
            status: "degraded",
            detail: "no usable access token cached; next lookup will exchange credentials"
                .to_string(),
        }
    }
}
