//! HTTP API server for the order fulfillment core.
//!
//! Provides REST endpoints for carts, checkout and order administration,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::PricingPolicy;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/cart",
            get(routes::cart::get::<S>).delete(routes::cart::clear::<S>),
        )
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/cart/items/{id}",
            patch(routes::cart::update_item::<S>).delete(routes::cart::remove_item::<S>),
        )
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/checkout", post(routes::orders::checkout::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", patch(routes::orders::cancel::<S>))
        .route("/admin/orders", get(routes::admin::list::<S>))
        .route("/admin/orders/{id}", get(routes::admin::get::<S>))
        .route(
            "/admin/orders/{id}/status",
            patch(routes::admin::update_status::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over a store.
pub fn create_state<S: Store>(store: S, pricing: PricingPolicy) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, pricing))
}
