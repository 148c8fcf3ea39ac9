use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{
    AddressId, CartId, CartItemId, CartStatus, FulfillmentStatus, Money, OrderId, OrderItemId,
    PaymentStatus, ProductId, UserId, VariantId,
};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::{
    Result, StoreError,
    query::{OrderPage, OrderQuery},
    records::{
        AddressRecord, CartItemRecord, CartRecord, CatalogVariant, NewOrder, NewOrderItem,
        OrderItemRecord, OrderRecord, ProductRecord, SequencePeriod, Tombstone, VariantRecord,
    },
    store::{AddressStore, CartStore, CatalogStore, OrderStore, Store, StoreTransaction},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<ProductId, ProductRecord>,
    variants: HashMap<VariantId, VariantRecord>,
    addresses: HashMap<AddressId, AddressRecord>,
    carts: HashMap<CartId, CartRecord>,
    cart_items: HashMap<CartItemId, CartItemRecord>,
    orders: HashMap<OrderId, OrderRecord>,
    order_items: Vec<OrderItemRecord>,
    counters: HashMap<SequencePeriod, u32>,
}

impl MemoryState {
    fn catalog_variant(&self, variant_id: VariantId) -> Option<CatalogVariant> {
        let variant = self.variants.get(&variant_id)?;
        let product = self.products.get(&variant.product_id)?;
        Some(CatalogVariant {
            variant: variant.clone(),
            product: product.clone(),
        })
    }

    fn active_cart(&self, user_id: UserId) -> Option<&CartRecord> {
        self.carts.values().find(|cart| {
            cart.user_id == user_id
                && cart.status == CartStatus::Active
                && !cart.tombstone.is_deleted()
        })
    }

    fn live_items(&self, cart_id: CartId) -> Vec<CartItemRecord> {
        let mut items: Vec<_> = self
            .cart_items
            .values()
            .filter(|item| item.cart_id == cart_id && !item.tombstone.is_deleted())
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.created_at, item.id));
        items
    }

    fn touch_cart(&mut self, cart_id: CartId) {
        if let Some(cart) = self.carts.get_mut(&cart_id) {
            cart.updated_at = Utc::now();
        }
    }

    fn delete_items(&mut self, cart_id: CartId, deleted_by: Option<UserId>) -> u64 {
        let mut removed = 0;
        for item in self.cart_items.values_mut() {
            if item.cart_id == cart_id && !item.tombstone.is_deleted() {
                item.tombstone = Tombstone::now(deleted_by);
                removed += 1;
            }
        }
        removed
    }
}

/// In-memory store implementation for testing and local runs.
///
/// Every table lives behind a single lock. A transaction takes the write lock
/// for its whole lifetime and works on a copy that replaces the shared state
/// on commit, so dropping a transaction discards its changes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product.
    pub async fn insert_product(&self, product: ProductRecord) {
        self.state
            .write()
            .await
            .products
            .insert(product.id, product);
    }

    /// Inserts or replaces a variant.
    pub async fn insert_variant(&self, variant: VariantRecord) {
        self.state
            .write()
            .await
            .variants
            .insert(variant.id, variant);
    }

    /// Inserts or replaces an address. A new default clears the user's previous default.
    pub async fn insert_address(&self, address: AddressRecord) {
        let mut state = self.state.write().await;
        if address.is_default {
            for existing in state.addresses.values_mut() {
                if existing.user_id == address.user_id {
                    existing.is_default = false;
                }
            }
        }
        state.addresses.insert(address.id, address);
    }

    /// Current stock level of a variant.
    pub async fn stock_of(&self, variant_id: VariantId) -> Option<u32> {
        self.state
            .read()
            .await
            .variants
            .get(&variant_id)
            .map(|v| v.stock_quantity)
    }

    /// Overrides a cart's last activity time.
    pub async fn set_cart_updated_at(&self, cart_id: CartId, updated_at: DateTime<Utc>) {
        if let Some(cart) = self.state.write().await.carts.get_mut(&cart_id) {
            cart.updated_at = updated_at;
        }
    }

    /// Last value handed out for a sequence period.
    pub async fn sequence_value(&self, period: NaiveDate) -> Option<u32> {
        self.state.read().await.counters.get(&period).copied()
    }

    /// Number of carts ever created for a user, in any status.
    pub async fn cart_count(&self, user_id: UserId) -> usize {
        self.state
            .read()
            .await
            .carts
            .values()
            .filter(|c| c.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_variant(&self, variant_id: VariantId) -> Result<Option<CatalogVariant>> {
        Ok(self.state.read().await.catalog_variant(variant_id))
    }

    async fn find_variants(&self, variant_ids: &[VariantId]) -> Result<Vec<CatalogVariant>> {
        let state = self.state.read().await;
        Ok(variant_ids
            .iter()
            .filter_map(|id| state.catalog_variant(*id))
            .collect())
    }
}

#[async_trait]
impl AddressStore for MemoryStore {
    async fn find_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<AddressRecord>> {
        let state = self.state.read().await;
        Ok(state
            .addresses
            .get(&address_id)
            .filter(|a| a.user_id == user_id && !a.tombstone.is_deleted())
            .cloned())
    }

    async fn find_default_address(&self, user_id: UserId) -> Result<Option<AddressRecord>> {
        let state = self.state.read().await;
        Ok(state
            .addresses
            .values()
            .find(|a| a.user_id == user_id && a.is_default && !a.tombstone.is_deleted())
            .cloned())
    }

    async fn get_address(&self, address_id: AddressId) -> Result<Option<AddressRecord>> {
        Ok(self.state.read().await.addresses.get(&address_id).cloned())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_active_cart(&self, user_id: UserId) -> Result<Option<CartRecord>> {
        Ok(self.state.read().await.active_cart(user_id).cloned())
    }

    async fn get_or_create_active_cart(&self, user_id: UserId) -> Result<CartRecord> {
        let mut state = self.state.write().await;
        if let Some(cart) = state.active_cart(user_id) {
            return Ok(cart.clone());
        }

        let now = Utc::now();
        let cart = CartRecord {
            id: CartId::new(),
            user_id,
            status: CartStatus::Active,
            created_at: now,
            updated_at: now,
            tombstone: Tombstone::default(),
        };
        state.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<Option<CartRecord>> {
        let state = self.state.read().await;
        Ok(state
            .carts
            .get(&cart_id)
            .filter(|c| !c.tombstone.is_deleted())
            .cloned())
    }

    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItemRecord>> {
        Ok(self.state.read().await.live_items(cart_id))
    }

    async fn find_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItemRecord>> {
        let state = self.state.read().await;
        Ok(state
            .cart_items
            .get(&item_id)
            .filter(|i| i.cart_id == cart_id && !i.tombstone.is_deleted())
            .cloned())
    }

    async fn add_cart_item(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
        quantity: u32,
        price: Money,
    ) -> Result<CartItemRecord> {
        let mut state = self.state.write().await;

        let active = state
            .carts
            .get(&cart_id)
            .is_some_and(|c| c.status == CartStatus::Active && !c.tombstone.is_deleted());
        if !active {
            return Err(StoreError::CartNotActive(cart_id));
        }

        let now = Utc::now();
        let existing = state.cart_items.values_mut().find(|i| {
            i.cart_id == cart_id && i.variant_id == variant_id && !i.tombstone.is_deleted()
        });

        let item = match existing {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(quantity);
                item.price = price;
                item.updated_at = now;
                item.clone()
            }
            None => {
                let item = CartItemRecord {
                    id: CartItemId::new(),
                    cart_id,
                    variant_id,
                    quantity,
                    price,
                    created_at: now,
                    updated_at: now,
                    tombstone: Tombstone::default(),
                };
                state.cart_items.insert(item.id, item.clone());
                item
            }
        };

        state.touch_cart(cart_id);
        Ok(item)
    }

    async fn set_cart_item_quantity(
        &self,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItemRecord> {
        let mut state = self.state.write().await;
        let item = state
            .cart_items
            .get_mut(&item_id)
            .filter(|i| !i.tombstone.is_deleted())
            .ok_or(StoreError::CartItemNotFound(item_id))?;

        item.quantity = quantity;
        item.updated_at = Utc::now();
        let item = item.clone();

        state.touch_cart(item.cart_id);
        Ok(item)
    }

    async fn remove_cart_item(&self, item_id: CartItemId, deleted_by: UserId) -> Result<()> {
        let mut state = self.state.write().await;
        let item = state
            .cart_items
            .get_mut(&item_id)
            .filter(|i| !i.tombstone.is_deleted())
            .ok_or(StoreError::CartItemNotFound(item_id))?;

        item.tombstone = Tombstone::now(Some(deleted_by));
        let cart_id = item.cart_id;

        state.touch_cart(cart_id);
        Ok(())
    }

    async fn clear_cart(&self, cart_id: CartId, deleted_by: UserId) -> Result<u64> {
        let mut state = self.state.write().await;
        let removed = state.delete_items(cart_id, Some(deleted_by));
        state.touch_cart(cart_id);
        Ok(removed)
    }

    async fn sweep_stale_carts(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut swept = 0;
        for cart in state.carts.values_mut() {
            if cart.status == CartStatus::Active
                && !cart.tombstone.is_deleted()
                && cart.updated_at < cutoff
            {
                cart.tombstone = Tombstone::now(None);
                swept += 1;
            }
        }
        Ok(swept)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn find_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .get(&order_id)
            .filter(|o| !o.tombstone.is_deleted())
            .cloned())
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let state = self.state.read().await;
        Ok(state
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<OrderPage> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| query.matches(o))
            .cloned()
            .collect();

        orders.sort_by(|a, b| {
            b.order_date
                .cmp(&a.order_date)
                .then_with(|| b.order_number.cmp(&a.order_number))
        });

        let total = orders.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let orders = orders
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok(OrderPage {
            orders,
            total,
            page: query.page,
            limit: query.limit,
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        let guard = self.state.clone().write_owned().await;
        let working = guard.clone();
        Ok(MemoryTransaction { guard, working })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Transaction over a [`MemoryStore`].
pub struct MemoryTransaction {
    guard: OwnedRwLockWriteGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn decrement_stock(&mut self, variant_id: VariantId, quantity: u32) -> Result<u32> {
        let variant = self
            .working
            .variants
            .get_mut(&variant_id)
            .ok_or(StoreError::VariantNotFound(variant_id))?;

        if variant.stock_quantity < quantity {
            return Err(StoreError::InsufficientStock {
                variant_id,
                sku: variant.sku.clone(),
                available: variant.stock_quantity,
                requested: quantity,
            });
        }

        variant.stock_quantity -= quantity;
        Ok(variant.stock_quantity)
    }

    async fn increment_stock(&mut self, variant_id: VariantId, quantity: u32) -> Result<u32> {
        let variant = self
            .working
            .variants
            .get_mut(&variant_id)
            .ok_or(StoreError::VariantNotFound(variant_id))?;

        variant.stock_quantity = variant.stock_quantity.saturating_add(quantity);
        Ok(variant.stock_quantity)
    }

    async fn next_order_sequence(&mut self, period: SequencePeriod) -> Result<u32> {
        let counter = self.working.counters.entry(period).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn complete_cart(&mut self, cart_id: CartId) -> Result<()> {
        let cart = self
            .working
            .carts
            .get_mut(&cart_id)
            .filter(|c| c.status == CartStatus::Active && !c.tombstone.is_deleted())
            .ok_or(StoreError::CartNotActive(cart_id))?;

        cart.status = CartStatus::Completed;
        cart.updated_at = Utc::now();
        Ok(())
    }

    async fn list_cart_items(&mut self, cart_id: CartId) -> Result<Vec<CartItemRecord>> {
        Ok(self.working.live_items(cart_id))
    }

    async fn soft_delete_cart_items(
        &mut self,
        cart_id: CartId,
        deleted_by: Option<UserId>,
    ) -> Result<u64> {
        Ok(self.working.delete_items(cart_id, deleted_by))
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderRecord> {
        let now = Utc::now();
        let record = OrderRecord {
            id: OrderId::new(),
            user_id: order.user_id,
            address_id: order.address_id,
            order_number: order.order_number,
            order_date: order.order_date,
            total_amount: order.total_amount,
            tax_amount: order.tax_amount,
            shipping_amount: order.shipping_amount,
            discount_amount: order.discount_amount,
            payment_status: PaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Pending,
            notes: order.notes,
            created_at: now,
            updated_at: now,
            tombstone: Tombstone::default(),
        };

        if self
            .working
            .orders
            .values()
            .any(|o| o.order_number == record.order_number)
        {
            return Err(StoreError::DuplicateOrderNumber(record.order_number));
        }

        self.working.orders.insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_order_item(&mut self, item: NewOrderItem) -> Result<OrderItemRecord> {
        let record = OrderItemRecord {
            id: OrderItemId::new(),
            order_id: item.order_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
        };
        self.working.order_items.push(record.clone());
        Ok(record)
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self
            .working
            .orders
            .get(&order_id)
            .filter(|o| !o.tombstone.is_deleted())
            .cloned())
    }

    async fn set_order_status(
        &mut self,
        order_id: OrderId,
        payment_status: PaymentStatus,
        fulfillment_status: FulfillmentStatus,
    ) -> Result<()> {
        let order = self
            .working
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;

        order.payment_status = payment_status;
        order.fulfillment_status = fulfillment_status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}
