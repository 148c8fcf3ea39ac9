//! Checkout orchestrator for converting a cart into an order.

use chrono::Utc;
use common::{AddressId, UserId};
use domain::{
    CartService, CartView, DomainError, InventoryLedger, OrderDetails, OrderNumberSequencer,
    PricingPolicy, StockLine, hydrate_order, inventory,
};
use store::{AddressRecord, CartItemRecord, NewOrder, NewOrderItem, Store, StoreTransaction};

use crate::error::{CheckoutError, Result};

/// Command to place an order from the user's active cart.
#[derive(Debug, Clone, Default)]
pub struct PlaceOrder {
    /// Shipping address. `None` falls back to the user's default address.
    pub address_id: Option<AddressId>,
    pub notes: Option<String>,
}

impl PlaceOrder {
    pub fn new(address_id: AddressId) -> Self {
        Self {
            address_id: Some(address_id),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Orchestrates checkout across the cart, inventory and order number counter.
///
/// Validation runs before the transaction so common failures are reported
/// without locking anything. The transaction then re-checks everything it
/// depends on: the cart must still be active with the same lines, and every
/// stock decrement is conditional.
pub struct CheckoutOrchestrator<S: Store> {
    store: S,
    carts: CartService<S>,
    ledger: InventoryLedger<S>,
    sequencer: OrderNumberSequencer,
    pricing: PricingPolicy,
}

impl<S: Store> CheckoutOrchestrator<S> {
    /// Creates a new checkout orchestrator.
    pub fn new(store: S, pricing: PricingPolicy) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            ledger: InventoryLedger::new(store.clone()),
            sequencer: OrderNumberSequencer::new(),
            store,
            pricing,
        }
    }

    /// Places an order for everything in the user's active cart.
    #[tracing::instrument(skip(self, cmd), fields(address_id = ?cmd.address_id))]
    pub async fn create_order(&self, user_id: UserId, cmd: PlaceOrder) -> Result<OrderDetails> {
        metrics::counter!("checkout_total").increment(1);
        let start = std::time::Instant::now();

        let result = self.place(user_id, cmd).await;

        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                tracing::info!(
                    order_number = %order.order_number,
                    total = %order.total_amount,
                    lines = order.items.len(),
                    "Order placed"
                );
            }
            Err(err) => {
                metrics::counter!("checkout_failed_total").increment(1);
                tracing::warn!(error = %err, "Checkout failed");
            }
        }
        result
    }

    async fn place(&self, user_id: UserId, cmd: PlaceOrder) -> Result<OrderDetails> {
        // 1. Price the cart
        let cart = self.carts.view_cart(user_id).await?;
        if cart.is_empty() {
            return Err(DomainError::EmptyCart.into());
        }

        // 2. Resolve the shipping address
        let address = self.resolve_address(user_id, cmd.address_id).await?;

        // 3. Early stock validation
        for line in &cart.items {
            self.ledger.check(line.variant_id, line.quantity).await?;
        }

        // 4. Totals
        let totals = self.pricing.totals(cart.total);
        let now = Utc::now();

        // 5. Atomic conversion
        let mut tx = self.store.begin().await?;

        tx.complete_cart(cart.cart_id).await?;
        let current = tx.list_cart_items(cart.cart_id).await?;
        if !same_lines(&cart, &current) {
            return Err(DomainError::CartChanged.into());
        }

        let order_number = self.sequencer.allocate(&mut tx, now).await?;
        let order = tx
            .insert_order(NewOrder {
                user_id,
                address_id: address.id,
                order_number,
                order_date: now,
                total_amount: totals.total,
                tax_amount: totals.tax,
                shipping_amount: totals.shipping,
                discount_amount: totals.discount,
                notes: cmd.notes,
            })
            .await?;

        for line in &cart.items {
            tx.insert_order_item(NewOrderItem {
                order_id: order.id,
                variant_id: line.variant_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                total_price: line.subtotal,
            })
            .await?;
        }

        let stock: Vec<StockLine> = cart
            .items
            .iter()
            .map(|line| StockLine::new(line.variant_id, line.quantity))
            .collect();
        inventory::reserve_all(&mut tx, &stock).await?;

        tx.soft_delete_cart_items(cart.cart_id, Some(user_id)).await?;
        tx.commit().await.map_err(CheckoutError::Commit)?;

        // 6. Hydrate
        Ok(hydrate_order(&self.store, order).await?)
    }

    async fn resolve_address(
        &self,
        user_id: UserId,
        address_id: Option<AddressId>,
    ) -> Result<AddressRecord> {
        let address = match address_id {
            Some(id) => self
                .store
                .find_address(user_id, id)
                .await?
                .ok_or(DomainError::AddressNotFound)?,
            None => self
                .store
                .find_default_address(user_id)
                .await?
                .ok_or(DomainError::NoDefaultAddress)?,
        };
        Ok(address)
    }
}

/// True if the lines seen under lock are exactly the lines that were priced.
fn same_lines(cart: &CartView, current: &[CartItemRecord]) -> bool {
    let mut priced: Vec<_> = cart
        .items
        .iter()
        .map(|l| (l.item_id, l.variant_id, l.quantity))
        .collect();
    let mut locked: Vec<_> = current
        .iter()
        .map(|i| (i.id, i.variant_id, i.quantity))
        .collect();
    priced.sort();
    locked.sort();
    priced == locked
}
