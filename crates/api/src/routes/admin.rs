//! Administrative order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use common::{FulfillmentStatus, OrderId, PaymentStatus};
use domain::{OrderDetails, OrderList, UpdateOrderStatus};
use serde::Deserialize;
use store::Store;

use super::orders::OrderQueryParams;
use super::parse_id;
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
}

/// GET /admin/orders: every user's orders.
#[tracing::instrument(skip(state, params))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    params: Result<Query<OrderQueryParams>, QueryRejection>,
) -> Result<Json<OrderList>, ApiError> {
    let Query(params) = params?;
    let cmd = params.into_command()?;
    Ok(Json(state.orders.list_orders_admin(cmd).await?))
}

/// GET /admin/orders/{id}: any order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<OrderDetails>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    Ok(Json(state.orders.get_order_admin(order_id).await?))
}

/// PATCH /admin/orders/{id}/status: overwrite both status fields.
#[tracing::instrument(skip(state, payload))]
pub async fn update_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<OrderDetails>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let Json(req) = payload?;

    tracing::info!(admin_id = %admin.user_id, %order_id, "Admin status update");
    let cmd = UpdateOrderStatus::new(order_id, req.payment_status, req.fulfillment_status);
    Ok(Json(state.orders.update_status(cmd).await?))
}
