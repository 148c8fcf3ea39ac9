//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;
use store::Store;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub services: ServiceHealth,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub app: &'static str,
    pub database: &'static str,
}

/// Pings the store, reporting `"up"` or `"down"`.
pub async fn database_status<S: Store>(store: &S) -> &'static str {
    match store.ping().await {
        Ok(()) => "up",
        Err(err) => {
            tracing::error!(error = %err, "database ping failed");
            "down"
        }
    }
}

/// GET /health: application and database status.
pub async fn check<S: Store>(State(state): State<Arc<AppState<S>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        services: ServiceHealth {
            app: "up",
            database: database_status(&state.store).await,
        },
    })
}
