//! Order commands.

use common::{FulfillmentStatus, OrderId, PaymentStatus, UserId};
use store::{DEFAULT_PAGE_SIZE, OrderQuery};

/// Command to overwrite both status fields of an order.
#[derive(Debug, Clone)]
pub struct UpdateOrderStatus {
    pub order_id: OrderId,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
}

impl UpdateOrderStatus {
    pub fn new(
        order_id: OrderId,
        payment_status: PaymentStatus,
        fulfillment_status: FulfillmentStatus,
    ) -> Self {
        Self {
            order_id,
            payment_status,
            fulfillment_status,
        }
    }
}

/// Filters and pagination for an order listing.
#[derive(Debug, Clone, Default)]
pub struct ListOrders {
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    /// 1-based page, defaults to 1.
    pub page: Option<u32>,
    /// Page size, defaults to 10.
    pub limit: Option<u32>,
}

impl ListOrders {
    /// Builds the store query, optionally scoped to one user.
    pub fn into_query(self, user_id: Option<UserId>) -> OrderQuery {
        let mut query = match user_id {
            Some(user_id) => OrderQuery::for_user(user_id),
            None => OrderQuery::new(),
        };
        if let Some(status) = self.payment_status {
            query = query.payment_status(status);
        }
        if let Some(status) = self.fulfillment_status {
            query = query.fulfillment_status(status);
        }
        query
            .page(self.page.unwrap_or(1))
            .limit(self.limit.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}
