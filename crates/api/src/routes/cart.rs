//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CartItemId, VariantId};
use domain::{AddCartItem, CartView, UpdateCartItem};
use serde::Deserialize;
use store::Store;

use super::{MessageResponse, parse_id};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_variant_id: String,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: Option<i64>,
}

/// GET /cart: the caller's active cart, created on first access.
#[tracing::instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.carts.view_cart(user.user_id).await?))
}

/// POST /cart/items: add a variant, coalescing with an existing line.
#[tracing::instrument(skip(state, user, payload), fields(user_id = %user.user_id))]
pub async fn add_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    payload: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CartView>), ApiError> {
    let Json(req) = payload?;
    let variant_id: VariantId = parse_id(&req.product_variant_id, "product variant")?;

    let cmd = AddCartItem {
        variant_id,
        quantity: req.quantity,
    };
    let view = state.carts.add_item(user.user_id, cmd).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// PATCH /cart/items/{id}: overwrite a line's quantity.
#[tracing::instrument(skip(state, user, payload), fields(user_id = %user.user_id))]
pub async fn update_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<CartView>, ApiError> {
    let item_id: CartItemId = parse_id(&id, "cart item")?;
    let Json(req) = payload?;

    let cmd = UpdateCartItem {
        item_id,
        quantity: req.quantity,
    };
    Ok(Json(state.carts.update_item_quantity(user.user_id, cmd).await?))
}

/// DELETE /cart/items/{id}: remove a line.
#[tracing::instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn remove_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    let item_id: CartItemId = parse_id(&id, "cart item")?;
    Ok(Json(state.carts.remove_item(user.user_id, item_id).await?))
}

/// DELETE /cart: remove every line.
#[tracing::instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn clear<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = state.carts.clear(user.user_id).await?;
    Ok(MessageResponse::json(message))
}
