//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Money, UserId, VariantId};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::{AddressRecord, MemoryStore, ProductRecord, VariantRecord};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    store: MemoryStore,
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryStore::new();
        let state = api::create_state(store.clone(), domain::PricingPolicy::default());
        let app = api::create_app(state, get_metrics_handle());
        Self { app, store }
    }

    async fn seed_variant(&self, price_cents: i64, sku: &str, stock: u32) -> VariantId {
        let product = ProductRecord::new(format!("Product {sku}"), Money::from_cents(price_cents));
        let variant = VariantRecord::new(product.id, sku, stock);
        let id = variant.id;
        self.store.insert_product(product).await;
        self.store.insert_variant(variant).await;
        id
    }

    async fn seed_address(&self, user: UserId, is_default: bool) -> String {
        let mut address = AddressRecord::new(user, "1 Main St", "Springfield", "12345", "US");
        address.is_default = is_default;
        let id = address.id.to_string();
        self.store.insert_address(address).await;
        id
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        user: Option<UserId>,
        admin: bool,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user.to_string());
        }
        if admin {
            builder = builder.header("x-user-role", "admin");
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn as_user(
        &self,
        method: &str,
        uri: &str,
        user: UserId,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send(method, uri, Some(user), false, body).await
    }

    async fn as_admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(UserId::new()), true, body).await
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let app = TestApp::new();
        let (status, json) = app.send("GET", "/health", None, false, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["services"]["app"], "up");
        assert_eq!(json["services"]["database"], "up");
        assert!(json["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = TestApp::new();
        let response = app
            .app
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let app = TestApp::new();
        let (status, json) = app.send("GET", "/cart", None, false, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(json["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_malformed_user_is_unauthorized() {
        let app = TestApp::new();
        let request = Request::builder()
            .uri("/cart")
            .header("x-user-id", "not-a-uuid")
            .body(Body::empty())
            .unwrap();
        let response = app.app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_routes_require_role() {
        let app = TestApp::new();
        let (status, _) = app
            .as_user("GET", "/admin/orders", UserId::new(), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = app.as_admin("GET", "/admin/orders", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["meta"]["total"], 0);
    }
}

mod cart {
    use super::*;

    #[tokio::test]
    async fn test_get_cart_creates_empty_cart() {
        let app = TestApp::new();
        let user = UserId::new();

        let (status, first) = app.as_user("GET", "/cart", user, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["items"].as_array().unwrap().len(), 0);
        assert_eq!(first["status"], "active");

        let (_, second) = app.as_user("GET", "/cart", user, None).await;
        assert_eq!(first["cart_id"], second["cart_id"]);
    }

    #[tokio::test]
    async fn test_add_update_remove() {
        let app = TestApp::new();
        let variant = app.seed_variant(2500, "SHIRT-M", 10).await;
        let user = UserId::new();

        let (status, cart) = app
            .as_user(
                "POST",
                "/cart/items",
                user,
                Some(json!({ "product_variant_id": variant.to_string(), "quantity": 2 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(cart["total"], 5000);
        assert_eq!(cart["item_count"], 2);
        let item_id = cart["items"][0]["item_id"].as_str().unwrap().to_string();

        let (status, cart) = app
            .as_user(
                "PATCH",
                &format!("/cart/items/{item_id}"),
                user,
                Some(json!({ "quantity": 4 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["item_count"], 4);
        assert_eq!(cart["total"], 10000);

        let (status, cart) = app
            .as_user("DELETE", &format!("/cart/items/{item_id}"), user, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["items"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_add_validation_errors() {
        let app = TestApp::new();
        let variant = app.seed_variant(2500, "SHIRT-M", 3).await;
        let user = UserId::new();

        let (status, _) = app
            .as_user(
                "POST",
                "/cart/items",
                user,
                Some(json!({ "product_variant_id": variant.to_string(), "quantity": 0 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = app
            .as_user(
                "POST",
                "/cart/items",
                user,
                Some(json!({ "product_variant_id": variant.to_string(), "quantity": 5 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("SHIRT-M"));

        let (status, _) = app
            .as_user(
                "POST",
                "/cart/items",
                user,
                Some(json!({ "product_variant_id": VariantId::new().to_string(), "quantity": 1 })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .as_user(
                "POST",
                "/cart/items",
                user,
                Some(json!({ "product_variant_id": "abc", "quantity": 1 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let app = TestApp::new();
        let variant = app.seed_variant(2500, "SHIRT-M", 10).await;
        let user = UserId::new();

        app.as_user(
            "POST",
            "/cart/items",
            user,
            Some(json!({ "product_variant_id": variant.to_string(), "quantity": 1 })),
        )
        .await;

        let (status, json) = app.as_user("DELETE", "/cart", user, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Cart cleared successfully");

        let (_, cart) = app.as_user("GET", "/cart", user, None).await;
        assert_eq!(cart["items"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_clear_without_cart_is_not_found() {
        let app = TestApp::new();
        let (status, _) = app.as_user("DELETE", "/cart", UserId::new(), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod orders {
    use super::*;

    async fn cart_with(app: &TestApp, user: UserId, variant: VariantId, quantity: i64) {
        let (status, _) = app
            .as_user(
                "POST",
                "/cart/items",
                user,
                Some(json!({ "product_variant_id": variant.to_string(), "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_checkout_and_cancel_flow() {
        let app = TestApp::new();
        let variant = app.seed_variant(2000, "TEE-M", 5).await;
        let user = UserId::new();
        let address = app.seed_address(user, false).await;
        cart_with(&app, user, variant, 3).await;

        let (status, order) = app
            .as_user(
                "POST",
                "/orders/checkout",
                user,
                Some(json!({ "address_id": address, "notes": "ring twice" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["items"][0]["quantity"], 3);
        assert_eq!(order["items"][0]["unit_price"], 2000);
        assert_eq!(order["tax_amount"], 600);
        assert_eq!(order["shipping_amount"], 999);
        assert_eq!(order["total_amount"], 7599);
        assert_eq!(order["fulfillment_status"], "pending");
        assert_eq!(order["notes"], "ring twice");
        assert_eq!(app.store.stock_of(variant).await, Some(2));

        let order_id = order["id"].as_str().unwrap().to_string();
        let order_number = order["order_number"].as_str().unwrap().to_string();

        let (status, fetched) = app
            .as_user("GET", &format!("/orders/{order_id}"), user, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["order_number"], order_number.as_str());

        let (status, json) = app
            .as_user("PATCH", &format!("/orders/{order_id}/cancel"), user, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["message"],
            format!("Order {order_number} has been cancelled successfully!")
        );
        assert_eq!(app.store.stock_of(variant).await, Some(5));

        let (status, _) = app
            .as_user("PATCH", &format!("/orders/{order_id}/cancel"), user, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_checkout_without_body_uses_default_address() {
        let app = TestApp::new();
        let variant = app.seed_variant(2000, "TEE-M", 5).await;
        let user = UserId::new();
        let address = app.seed_address(user, true).await;
        cart_with(&app, user, variant, 1).await;

        let (status, order) = app.as_user("POST", "/orders/checkout", user, None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["address"]["id"], address.as_str());
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_is_bad_request() {
        let app = TestApp::new();
        let user = UserId::new();
        let address = app.seed_address(user, false).await;

        let (status, json) = app
            .as_user(
                "POST",
                "/orders/checkout",
                user,
                Some(json!({ "address_id": address })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Cart is empty");
    }

    #[tokio::test]
    async fn test_checkout_with_foreign_address_is_not_found() {
        let app = TestApp::new();
        let variant = app.seed_variant(2000, "TEE-M", 5).await;
        let user = UserId::new();
        let foreign = app.seed_address(UserId::new(), false).await;
        cart_with(&app, user, variant, 1).await;

        let (status, _) = app
            .as_user(
                "POST",
                "/orders/checkout",
                user,
                Some(json!({ "address_id": foreign })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(app.store.stock_of(variant).await, Some(5));
    }

    #[tokio::test]
    async fn test_orders_are_private() {
        let app = TestApp::new();
        let variant = app.seed_variant(2000, "TEE-M", 5).await;
        let user = UserId::new();
        let address = app.seed_address(user, false).await;
        cart_with(&app, user, variant, 1).await;

        let (_, order) = app
            .as_user(
                "POST",
                "/orders/checkout",
                user,
                Some(json!({ "address_id": address })),
            )
            .await;
        let order_id = order["id"].as_str().unwrap().to_string();

        let (status, _) = app
            .as_user("GET", &format!("/orders/{order_id}"), UserId::new(), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, list) = app.as_user("GET", "/orders", user, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["meta"]["total"], 1);
        assert_eq!(list["meta"]["totalPages"], 1);

        let (_, other) = app.as_user("GET", "/orders", UserId::new(), None).await;
        assert_eq!(other["meta"]["total"], 0);
    }

    #[tokio::test]
    async fn test_invalid_query_is_bad_request() {
        let app = TestApp::new();
        let user = UserId::new();

        let (status, _) = app
            .as_user("GET", "/orders?payment_status=unknown", user, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app.as_user("GET", "/orders?page=0", user, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .as_user("GET", "/orders?limit=4000000000", user, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = app.as_user("GET", "/orders?limit=100", user, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["meta"]["limit"], 100);
    }

    #[tokio::test]
    async fn test_invalid_order_id_format() {
        let app = TestApp::new();
        let (status, _) = app
            .as_user("GET", "/orders/not-a-uuid", UserId::new(), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod admin {
    use super::*;

    #[tokio::test]
    async fn test_admin_status_update_blocks_cancel() {
        let app = TestApp::new();
        let variant = app.seed_variant(2000, "TEE-M", 5).await;
        let user = UserId::new();
        let address = app.seed_address(user, false).await;
        app.as_user(
            "POST",
            "/cart/items",
            user,
            Some(json!({ "product_variant_id": variant.to_string(), "quantity": 2 })),
        )
        .await;
        let (_, order) = app
            .as_user(
                "POST",
                "/orders/checkout",
                user,
                Some(json!({ "address_id": address })),
            )
            .await;
        let order_id = order["id"].as_str().unwrap().to_string();

        let (status, updated) = app
            .as_admin(
                "PATCH",
                &format!("/admin/orders/{order_id}/status"),
                Some(json!({ "payment_status": "paid", "fulfillment_status": "delivery" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["payment_status"], "paid");
        assert_eq!(updated["fulfillment_status"], "delivery");

        let (status, _) = app
            .as_user("PATCH", &format!("/orders/{order_id}/cancel"), user, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(app.store.stock_of(variant).await, Some(3));

        let (status, fetched) = app
            .as_admin("GET", &format!("/admin/orders/{order_id}"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["id"], order_id.as_str());

        let (_, filtered) = app
            .as_admin("GET", "/admin/orders?fulfillment_status=delivery", None)
            .await;
        assert_eq!(filtered["meta"]["total"], 1);
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_reopened() {
        let app = TestApp::new();
        let variant = app.seed_variant(2000, "CAP-1", 5).await;
        let user = UserId::new();
        let address = app.seed_address(user, true).await;
        app.as_user(
            "POST",
            "/cart/items",
            user,
            Some(json!({ "product_variant_id": variant.to_string(), "quantity": 3 })),
        )
        .await;
        let (_, order) = app
            .as_user(
                "POST",
                "/orders/checkout",
                user,
                Some(json!({ "address_id": address })),
            )
            .await;
        let order_id = order["id"].as_str().unwrap().to_string();

        let (status, _) = app
            .as_user("PATCH", &format!("/orders/{order_id}/cancel"), user, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.store.stock_of(variant).await, Some(5));

        let (status, json) = app
            .as_admin(
                "PATCH",
                &format!("/admin/orders/{order_id}/status"),
                Some(json!({ "payment_status": "pending", "fulfillment_status": "pending" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(json["error"].as_str().is_some());

        let (status, _) = app
            .as_user("PATCH", &format!("/orders/{order_id}/cancel"), user, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(app.store.stock_of(variant).await, Some(5));
    }

    #[tokio::test]
    async fn test_admin_update_unknown_order() {
        let app = TestApp::new();
        let (status, _) = app
            .as_admin(
                "PATCH",
                &format!("/admin/orders/{}/status", uuid_string()),
                Some(json!({ "payment_status": "paid", "fulfillment_status": "shipped" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_update_rejects_unknown_status() {
        let app = TestApp::new();
        let (status, _) = app
            .as_admin(
                "PATCH",
                &format!("/admin/orders/{}/status", uuid_string()),
                Some(json!({ "payment_status": "lost", "fulfillment_status": "shipped" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    fn uuid_string() -> String {
        common::OrderId::new().to_string()
    }
}
