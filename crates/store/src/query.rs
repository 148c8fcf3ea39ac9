use common::{FulfillmentStatus, PaymentStatus, UserId};

use crate::records::OrderRecord;

/// Default page size for order listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a listing will return.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Builder for constructing order queries.
///
/// Soft-deleted orders are always excluded. Results are ordered newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    /// Restrict to orders owned by this user. `None` lists every user's orders.
    pub user_id: Option<UserId>,

    /// Filter by payment status.
    pub payment_status: Option<PaymentStatus>,

    /// Filter by fulfillment status.
    pub fulfillment_status: Option<FulfillmentStatus>,

    /// 1-based page number.
    pub page: u32,

    /// Page size.
    pub limit: u32,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            user_id: None,
            payment_status: None,
            fulfillment_status: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl OrderQuery {
    /// Creates a query over all orders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one user's orders.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn fulfillment_status(mut self, status: FulfillmentStatus) -> Self {
        self.fulfillment_status = Some(status);
        self
    }

    /// Selects a page. Values below 1 are clamped to 1.
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Sets the page size, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Number of rows to skip for the selected page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Returns true if the order passes every filter.
    pub fn matches(&self, order: &OrderRecord) -> bool {
        if order.tombstone.is_deleted() {
            return false;
        }
        if let Some(user_id) = self.user_id
            && order.user_id != user_id
        {
            return false;
        }
        if let Some(status) = self.payment_status
            && order.payment_status != status
        {
            return false;
        }
        if let Some(status) = self.fulfillment_status
            && order.fulfillment_status != status
        {
            return false;
        }
        true
    }
}

/// One page of orders plus the total number of matching rows.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<OrderRecord>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl OrderPage {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.limit.max(1)))
    }
}
