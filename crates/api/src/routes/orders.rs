//! Customer order endpoints: checkout, listing, lookup and cancellation.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use checkout::PlaceOrder;
use common::{AddressId, FulfillmentStatus, OrderId, PaymentStatus};
use domain::{ListOrders, OrderDetails, OrderList};
use serde::Deserialize;
use store::{MAX_PAGE_SIZE, Store};

use super::{MessageResponse, parse_id};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    /// Omitted to ship to the caller's default address.
    pub address_id: Option<String>,
    pub notes: Option<String>,
}

/// Filters shared by the customer and admin listings.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQueryParams {
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl OrderQueryParams {
    pub(crate) fn into_command(self) -> Result<ListOrders, ApiError> {
        if self.page == Some(0) {
            return Err(ApiError::BadRequest("page must be at least 1".to_string()));
        }
        match self.limit {
            Some(0) => {
                return Err(ApiError::BadRequest("limit must be at least 1".to_string()));
            }
            Some(limit) if limit > MAX_PAGE_SIZE => {
                return Err(ApiError::BadRequest(format!(
                    "limit must be at most {MAX_PAGE_SIZE}"
                )));
            }
            _ => {}
        }
        Ok(ListOrders {
            payment_status: self.payment_status,
            fulfillment_status: self.fulfillment_status,
            page: self.page,
            limit: self.limit,
        })
    }
}

/// POST /orders/checkout: convert the caller's active cart into an order.
///
/// The body is optional; an empty body uses the default address.
#[tracing::instrument(skip(state, user, body), fields(user_id = %user.user_id))]
pub async fn checkout<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    body: Bytes,
) -> Result<(StatusCode, Json<OrderDetails>), ApiError> {
    let req: CheckoutRequest = if body.is_empty() {
        CheckoutRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid checkout body: {e}")))?
    };

    let address_id = req
        .address_id
        .as_deref()
        .map(|raw| parse_id::<AddressId>(raw, "address"))
        .transpose()?;
    let cmd = PlaceOrder {
        address_id,
        notes: req.notes,
    };

    let order = state.checkout.create_order(user.user_id, cmd).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip(state, user, params), fields(user_id = %user.user_id))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    params: Result<Query<OrderQueryParams>, QueryRejection>,
) -> Result<Json<OrderList>, ApiError> {
    let Query(params) = params?;
    let cmd = params.into_command()?;
    Ok(Json(state.orders.list_orders(user.user_id, cmd).await?))
}

/// GET /orders/{id}: one of the caller's orders.
#[tracing::instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OrderDetails>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    Ok(Json(state.orders.get_order(user.user_id, order_id).await?))
}

/// PATCH /orders/{id}/cancel: cancel an order and restore its stock.
#[tracing::instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn cancel<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let message = state.orders.cancel(user.user_id, order_id).await?;
    Ok(MessageResponse::json(message))
}
