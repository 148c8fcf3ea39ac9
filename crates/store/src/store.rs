use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    AddressId, CartId, CartItemId, FulfillmentStatus, Money, OrderId, PaymentStatus, UserId,
    VariantId,
};

use crate::Result;
use crate::query::{OrderPage, OrderQuery};
use crate::records::{
    AddressRecord, CartItemRecord, CartRecord, CatalogVariant, NewOrder, NewOrderItem,
    OrderItemRecord, OrderRecord, SequencePeriod,
};

/// Read access to the catalog.
///
/// Catalog records are returned together with their tombstone; callers decide
/// whether a soft-deleted variant is acceptable for their use.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Loads a variant joined with its product.
    async fn find_variant(&self, variant_id: VariantId) -> Result<Option<CatalogVariant>>;

    /// Loads several variants at once. Unknown ids are skipped.
    async fn find_variants(&self, variant_ids: &[VariantId]) -> Result<Vec<CatalogVariant>>;
}

/// Read access to user addresses.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Returns the address if it exists, is owned by `user_id` and is not deleted.
    async fn find_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<AddressRecord>>;

    /// Returns the user's default address, if any.
    async fn find_default_address(&self, user_id: UserId) -> Result<Option<AddressRecord>>;

    /// Returns the address regardless of owner or tombstone.
    ///
    /// Used to hydrate historical orders whose address was later removed.
    async fn get_address(&self, address_id: AddressId) -> Result<Option<AddressRecord>>;
}

/// Cart and cart item persistence.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the user's active, non-deleted cart.
    async fn find_active_cart(&self, user_id: UserId) -> Result<Option<CartRecord>>;

    /// Returns the user's active cart, creating it only if none exists.
    ///
    /// Concurrent callers for the same user observe the same cart.
    async fn get_or_create_active_cart(&self, user_id: UserId) -> Result<CartRecord>;

    /// Loads a cart by id, whatever its status. Soft-deleted carts are excluded.
    async fn get_cart(&self, cart_id: CartId) -> Result<Option<CartRecord>>;

    /// Lists the non-deleted items of a cart, oldest first.
    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItemRecord>>;

    /// Returns a non-deleted item belonging to the cart.
    async fn find_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItemRecord>>;

    /// Adds a line to an active cart, coalescing with an existing line for the
    /// same variant by summing quantities and refreshing the price snapshot.
    ///
    /// Fails with `CartNotActive` if the cart was finalized meanwhile.
    async fn add_cart_item(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
        quantity: u32,
        price: Money,
    ) -> Result<CartItemRecord>;

    /// Overwrites the quantity of a non-deleted item.
    async fn set_cart_item_quantity(
        &self,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItemRecord>;

    /// Soft-deletes a single item.
    async fn remove_cart_item(&self, item_id: CartItemId, deleted_by: UserId) -> Result<()>;

    /// Soft-deletes every non-deleted item of the cart. Returns the number removed.
    async fn clear_cart(&self, cart_id: CartId, deleted_by: UserId) -> Result<u64>;

    /// Soft-deletes active carts not touched since `cutoff`. Returns the number swept.
    async fn sweep_stale_carts(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Order persistence outside of checkout and cancellation.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Loads a non-deleted order.
    async fn find_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Lists the lines of an order.
    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>>;

    /// Runs a filtered, paginated order listing.
    async fn query_orders(&self, query: OrderQuery) -> Result<OrderPage>;
}

/// A unit of work whose mutations become visible together on `commit` and are
/// discarded if the transaction is dropped.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Decrements stock by `quantity` only if the result stays non-negative.
    ///
    /// Returns the remaining stock, or `InsufficientStock`.
    async fn decrement_stock(&mut self, variant_id: VariantId, quantity: u32) -> Result<u32>;

    /// Increments stock unconditionally. Returns the new level.
    async fn increment_stock(&mut self, variant_id: VariantId, quantity: u32) -> Result<u32>;

    /// Atomically increments the counter for `period` and returns the new value.
    async fn next_order_sequence(&mut self, period: SequencePeriod) -> Result<u32>;

    /// Marks an active cart as completed, locking it for the rest of the transaction.
    ///
    /// Fails with `CartNotActive` if the cart is no longer active.
    async fn complete_cart(&mut self, cart_id: CartId) -> Result<()>;

    /// Lists the cart's non-deleted items as seen inside the transaction.
    async fn list_cart_items(&mut self, cart_id: CartId) -> Result<Vec<CartItemRecord>>;

    /// Soft-deletes every non-deleted item of the cart.
    async fn soft_delete_cart_items(
        &mut self,
        cart_id: CartId,
        deleted_by: Option<UserId>,
    ) -> Result<u64>;

    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderRecord>;

    async fn insert_order_item(&mut self, item: NewOrderItem) -> Result<OrderItemRecord>;

    /// Loads a non-deleted order and locks it until the transaction ends.
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Overwrites both status fields of an order.
    async fn set_order_status(
        &mut self,
        order_id: OrderId,
        payment_status: PaymentStatus,
        fulfillment_status: FulfillmentStatus,
    ) -> Result<()>;

    /// Makes every mutation of this transaction visible.
    async fn commit(self) -> Result<()>;
}

/// Complete persistence backend.
///
/// All implementations must be thread-safe (Send + Sync) and cheap to clone.
#[async_trait]
pub trait Store: CatalogStore + AddressStore + CartStore + OrderStore + Clone + 'static {
    type Transaction: StoreTransaction + 'static;

    /// Starts a transaction.
    ///
    /// While a transaction is open, use only its own methods; backends may
    /// serialize access so that other calls wait until it ends.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}
