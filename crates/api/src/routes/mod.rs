//! HTTP route handlers.

pub mod admin;
pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;

use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Body of operations that answer with a confirmation message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn json(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Parses a path or body identifier.
fn parse_id<T: From<Uuid>>(raw: &str, what: &str) -> Result<T, ApiError> {
    let uuid = Uuid::parse_str(raw.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what} id: {e}")))?;
    Ok(T::from(uuid))
}
