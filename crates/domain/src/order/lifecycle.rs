//! Order reads, status administration and cancellation.

use common::{FulfillmentStatus, OrderId, UserId};
use store::{OrderRecord, Store, StoreTransaction};

use crate::error::{DomainError, Result};
use crate::inventory::{self, StockLine};

use super::commands::{ListOrders, UpdateOrderStatus};
use super::view::{OrderDetails, OrderList, PageMeta, hydrate_order};

/// Service owning the status fields of placed orders.
#[derive(Clone)]
pub struct OrderLifecycle<S: Store> {
    store: S,
}

impl<S: Store> OrderLifecycle<S> {
    /// Creates a new order lifecycle service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads one of the user's orders. Orders of other users are reported as missing.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderDetails> {
        let order = self.owned_order(user_id, order_id).await?;
        hydrate_order(&self.store, order).await
    }

    /// Loads any order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_admin(&self, order_id: OrderId) -> Result<OrderDetails> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;
        hydrate_order(&self.store, order).await
    }

    /// Lists the user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId, cmd: ListOrders) -> Result<OrderList> {
        self.list(cmd, Some(user_id)).await
    }

    /// Lists every user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders_admin(&self, cmd: ListOrders) -> Result<OrderList> {
        self.list(cmd, None).await
    }

    /// Overwrites both status fields.
    ///
    /// Any combination is accepted except moving a cancelled order back into
    /// an active fulfillment status, since its stock has already been returned.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, cmd: UpdateOrderStatus) -> Result<OrderDetails> {
        let mut tx = self.store.begin().await?;
        let locked = tx
            .lock_order(cmd.order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(cmd.order_id))?;

        if locked.fulfillment_status == FulfillmentStatus::Cancelled
            && cmd.fulfillment_status != FulfillmentStatus::Cancelled
        {
            return Err(DomainError::OrderClosed(locked.order_number));
        }

        tx.set_order_status(locked.id, cmd.payment_status, cmd.fulfillment_status)
            .await?;
        tx.commit().await?;

        let order = self
            .store
            .find_order(cmd.order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(cmd.order_id))?;

        tracing::info!(
            order_number = %order.order_number,
            payment_status = %order.payment_status,
            fulfillment_status = %order.fulfillment_status,
            "Order status updated"
        );
        hydrate_order(&self.store, order).await
    }

    /// Cancels one of the user's orders and returns its units to stock.
    ///
    /// The status is re-read under lock, so of two concurrent cancellations
    /// only one restores stock.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, user_id: UserId, order_id: OrderId) -> Result<String> {
        let order = self.owned_order(user_id, order_id).await?;
        let lines: Vec<StockLine> = self
            .store
            .list_order_items(order.id)
            .await?
            .iter()
            .map(|item| StockLine::new(item.variant_id, item.quantity))
            .collect();

        let mut tx = self.store.begin().await?;
        let locked = tx
            .lock_order(order.id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;

        if !locked.fulfillment_status.can_cancel() {
            return Err(DomainError::NotCancellable {
                order_number: locked.order_number,
                status: locked.fulfillment_status,
            });
        }

        tx.set_order_status(
            order.id,
            locked.payment_status,
            FulfillmentStatus::Cancelled,
        )
        .await?;
        inventory::restore_all(&mut tx, &lines).await?;
        tx.commit().await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(order_number = %order.order_number, "Order cancelled");

        Ok(format!(
            "Order {} has been cancelled successfully!",
            order.order_number
        ))
    }

    async fn owned_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderRecord> {
        self.store
            .find_order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(DomainError::OrderNotFound(order_id))
    }

    async fn list(&self, cmd: ListOrders, user_id: Option<UserId>) -> Result<OrderList> {
        let page = self.store.query_orders(cmd.into_query(user_id)).await?;
        let meta = PageMeta {
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages(),
        };

        let mut data = Vec::with_capacity(page.orders.len());
        for order in page.orders {
            data.push(hydrate_order(&self.store, order).await?);
        }
        Ok(OrderList { data, meta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use common::{AddressId, Money, OrderNumber, PaymentStatus, VariantId};
    use store::{MemoryStore, NewOrder, NewOrderItem, ProductRecord, VariantRecord};

    async fn place_order(store: &MemoryStore, user_id: UserId, stock: u32) -> (OrderId, VariantId) {
        let product = ProductRecord::new("Lamp", Money::from_cents(2000));
        let variant = VariantRecord::new(product.id, "LAMP-1", stock);
        let variant_id = variant.id;
        store.insert_product(product).await;
        store.insert_variant(variant).await;

        let mut tx = store.begin().await.unwrap();
        let order = tx
            .insert_order(NewOrder {
                user_id,
                address_id: AddressId::new(),
                order_number: OrderNumber::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), 1),
                order_date: Utc::now(),
                total_amount: Money::from_cents(6599),
                tax_amount: Money::from_cents(600),
                shipping_amount: Money::from_cents(999),
                discount_amount: Money::zero(),
                notes: None,
            })
            .await
            .unwrap();
        tx.insert_order_item(NewOrderItem {
            order_id: order.id,
            variant_id,
            quantity: 3,
            unit_price: Money::from_cents(2000),
            total_price: Money::from_cents(6000),
        })
        .await
        .unwrap();
        tx.decrement_stock(variant_id, 3).await.unwrap();
        tx.commit().await.unwrap();

        (order.id, variant_id)
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let store = MemoryStore::new();
        let user = UserId::new();
        let (order_id, variant_id) = place_order(&store, user, 5).await;
        assert_eq!(store.stock_of(variant_id).await, Some(2));

        let lifecycle = OrderLifecycle::new(store.clone());
        let message = lifecycle.cancel(user, order_id).await.unwrap();

        assert_eq!(message, "Order ORD-202406-0001 has been cancelled successfully!");
        assert_eq!(store.stock_of(variant_id).await, Some(5));
        let order = lifecycle.get_order(user, order_id).await.unwrap();
        assert_eq!(order.fulfillment_status, FulfillmentStatus::Cancelled);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_second_cancel_is_rejected_without_restoring() {
        let store = MemoryStore::new();
        let user = UserId::new();
        let (order_id, variant_id) = place_order(&store, user, 5).await;
        let lifecycle = OrderLifecycle::new(store.clone());

        lifecycle.cancel(user, order_id).await.unwrap();
        let err = lifecycle.cancel(user, order_id).await.unwrap_err();

        assert!(matches!(err, DomainError::NotCancellable { .. }));
        assert_eq!(store.stock_of(variant_id).await, Some(5));
    }

    #[tokio::test]
    async fn test_delivered_order_cannot_be_cancelled() {
        let store = MemoryStore::new();
        let user = UserId::new();
        let (order_id, variant_id) = place_order(&store, user, 5).await;
        let lifecycle = OrderLifecycle::new(store.clone());

        lifecycle
            .update_status(UpdateOrderStatus::new(
                order_id,
                PaymentStatus::Paid,
                FulfillmentStatus::Delivery,
            ))
            .await
            .unwrap();

        let err = lifecycle.cancel(user, order_id).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::NotCancellable {
                status: FulfillmentStatus::Delivery,
                ..
            }
        ));
        assert_eq!(store.stock_of(variant_id).await, Some(2));
    }

    #[tokio::test]
    async fn test_shipped_order_can_be_cancelled() {
        let store = MemoryStore::new();
        let user = UserId::new();
        let (order_id, _) = place_order(&store, user, 5).await;
        let lifecycle = OrderLifecycle::new(store.clone());

        lifecycle
            .update_status(UpdateOrderStatus::new(
                order_id,
                PaymentStatus::Paid,
                FulfillmentStatus::Shipped,
            ))
            .await
            .unwrap();

        assert!(lifecycle.cancel(user, order_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_other_users_order_is_not_found() {
        let store = MemoryStore::new();
        let (order_id, _) = place_order(&store, UserId::new(), 5).await;
        let lifecycle = OrderLifecycle::new(store);

        let err = lifecycle.get_order(UserId::new(), order_id).await.unwrap_err();
        assert!(matches!(err, DomainError::OrderNotFound(_)));

        let err = lifecycle.cancel(UserId::new(), order_id).await.unwrap_err();
        assert!(matches!(err, DomainError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_reopened() {
        let store = MemoryStore::new();
        let user = UserId::new();
        let (order_id, variant_id) = place_order(&store, user, 5).await;
        let lifecycle = OrderLifecycle::new(store.clone());
        lifecycle.cancel(user, order_id).await.unwrap();

        let err = lifecycle
            .update_status(UpdateOrderStatus::new(
                order_id,
                PaymentStatus::Pending,
                FulfillmentStatus::Pending,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OrderClosed(_)));

        let err = lifecycle.cancel(user, order_id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotCancellable { .. }));
        assert_eq!(store.stock_of(variant_id).await, Some(5));

        let refunded = lifecycle
            .update_status(UpdateOrderStatus::new(
                order_id,
                PaymentStatus::Refunded,
                FulfillmentStatus::Cancelled,
            ))
            .await
            .unwrap();
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
        assert_eq!(refunded.fulfillment_status, FulfillmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_update_status_unknown_order() {
        let lifecycle = OrderLifecycle::new(MemoryStore::new());
        let err = lifecycle
            .update_status(UpdateOrderStatus::new(
                OrderId::new(),
                PaymentStatus::Paid,
                FulfillmentStatus::Confirmed,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_hydrated_order_includes_catalog() {
        let store = MemoryStore::new();
        let user = UserId::new();
        let (order_id, variant_id) = place_order(&store, user, 5).await;
        let lifecycle = OrderLifecycle::new(store);

        let order = lifecycle.get_order_admin(order_id).await.unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].variant_id, variant_id);
        assert_eq!(
            order.items[0].variant.as_ref().map(|v| v.sku.as_str()),
            Some("LAMP-1")
        );
        assert_eq!(
            order.items[0].product.as_ref().map(|p| p.name.as_str()),
            Some("Lamp")
        );
        assert_eq!(order.subtotal(), Money::from_cents(6000));
    }

    #[tokio::test]
    async fn test_list_orders_scopes_to_user() {
        let store = MemoryStore::new();
        let user = UserId::new();
        place_order(&store, user, 5).await;
        let lifecycle = OrderLifecycle::new(store);

        let mine = lifecycle
            .list_orders(user, ListOrders::default())
            .await
            .unwrap();
        assert_eq!(mine.meta.total, 1);
        assert_eq!(mine.meta.total_pages, 1);

        let theirs = lifecycle
            .list_orders(UserId::new(), ListOrders::default())
            .await
            .unwrap();
        assert_eq!(theirs.meta.total, 0);
        assert!(theirs.data.is_empty());

        let all = lifecycle
            .list_orders_admin(ListOrders::default())
            .await
            .unwrap();
        assert_eq!(all.meta.total, 1);
    }
}
