//! Cart service providing the cart operations exposed to clients.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use common::{CartItemId, UserId, VariantId};
use store::{CartRecord, CatalogVariant, Store};

use crate::error::{DomainError, Result};

use super::commands::{AddCartItem, UpdateCartItem, validate_quantity};
use super::view::{CartLineView, CartView};

pub const CART_CLEARED_MESSAGE: &str = "Cart cleared successfully";

/// Service for managing a user's active cart.
///
/// Every view is priced from the current catalog; the price stored on a line
/// is reported but never used for totals.
#[derive(Clone)]
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's active cart, creating it on first access.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create_active_cart(&self, user_id: UserId) -> Result<CartRecord> {
        Ok(self.store.get_or_create_active_cart(user_id).await?)
    }

    /// Returns the priced view of the user's active cart.
    #[tracing::instrument(skip(self))]
    pub async fn view_cart(&self, user_id: UserId) -> Result<CartView> {
        let cart = self.get_or_create_active_cart(user_id).await?;
        self.compute_view(&cart).await
    }

    /// Adds a variant to the cart, merging with an existing line for it.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, user_id: UserId, cmd: AddCartItem) -> Result<CartView> {
        let quantity = validate_quantity(cmd.quantity)?;
        let entry = self.load_purchasable(cmd.variant_id).await?;

        let cart = self.get_or_create_active_cart(user_id).await?;
        let existing = self
            .store
            .list_cart_items(cart.id)
            .await?
            .into_iter()
            .find(|item| item.variant_id == cmd.variant_id)
            .map(|item| item.quantity)
            .unwrap_or(0);

        let requested = existing.saturating_add(quantity);
        ensure_in_stock(&entry, requested)?;

        self.store
            .add_cart_item(cart.id, cmd.variant_id, quantity, entry.unit_price())
            .await?;

        tracing::info!(cart_id = %cart.id, variant_id = %cmd.variant_id, quantity, "Item added to cart");
        self.compute_view(&cart).await
    }

    /// Overwrites the quantity of one line.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        user_id: UserId,
        cmd: UpdateCartItem,
    ) -> Result<CartView> {
        let quantity = validate_quantity(cmd.quantity)?;
        let cart = self.active_cart(user_id).await?;
        let item = self
            .store
            .find_cart_item(cart.id, cmd.item_id)
            .await?
            .ok_or(DomainError::CartItemNotFound(cmd.item_id))?;

        let entry = self
            .store
            .find_variant(item.variant_id)
            .await?
            .ok_or(DomainError::VariantNotFound(item.variant_id))?;
        ensure_in_stock(&entry, quantity)?;

        self.store.set_cart_item_quantity(item.id, quantity).await?;
        self.compute_view(&cart).await
    }

    /// Removes one line from the cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<CartView> {
        let cart = self.active_cart(user_id).await?;
        if self.store.find_cart_item(cart.id, item_id).await?.is_none() {
            return Err(DomainError::CartItemNotFound(item_id));
        }

        self.store.remove_cart_item(item_id, user_id).await?;
        self.compute_view(&cart).await
    }

    /// Removes every line from the cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<&'static str> {
        let cart = self.active_cart(user_id).await?;
        let removed = self.store.clear_cart(cart.id, user_id).await?;
        tracing::info!(cart_id = %cart.id, removed, "Cart cleared");
        Ok(CART_CLEARED_MESSAGE)
    }

    /// Prices every non-deleted line of the cart from the current catalog.
    pub async fn compute_view(&self, cart: &CartRecord) -> Result<CartView> {
        let items = self.store.list_cart_items(cart.id).await?;
        let variant_ids: Vec<VariantId> = items.iter().map(|i| i.variant_id).collect();
        let catalog: HashMap<VariantId, CatalogVariant> = self
            .store
            .find_variants(&variant_ids)
            .await?
            .into_iter()
            .map(|entry| (entry.variant.id, entry))
            .collect();

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let entry = catalog
                .get(&item.variant_id)
                .ok_or(DomainError::VariantNotFound(item.variant_id))?;
            let unit_price = entry.unit_price();

            lines.push(CartLineView {
                item_id: item.id,
                variant_id: item.variant_id,
                product_id: entry.product.id,
                product_name: entry.product.name.clone(),
                sku: entry.variant.sku.clone(),
                size: entry.variant.size.clone(),
                color: entry.variant.color.clone(),
                image_url: primary_image(entry),
                quantity: item.quantity,
                unit_price,
                stored_price: item.price,
                subtotal: unit_price.multiply(item.quantity),
            });
        }

        Ok(CartView {
            cart_id: cart.id,
            user_id: cart.user_id,
            status: cart.status,
            total: lines.iter().map(|l| l.subtotal).sum(),
            item_count: lines.iter().map(|l| l.quantity).sum(),
            items: lines,
        })
    }

    /// Soft-deletes active carts untouched for longer than `stale_after`.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_stale_carts(&self, stale_after: Duration) -> Result<u64> {
        let cutoff = Utc::now() - stale_after;
        let swept = self.store.sweep_stale_carts(cutoff).await?;

        metrics::counter!("carts_swept_total").increment(swept);
        tracing::info!(swept, %cutoff, "Swept stale carts");
        Ok(swept)
    }

    async fn active_cart(&self, user_id: UserId) -> Result<CartRecord> {
        self.store
            .find_active_cart(user_id)
            .await?
            .ok_or(DomainError::CartNotFound)
    }

    async fn load_purchasable(&self, variant_id: VariantId) -> Result<CatalogVariant> {
        let entry = self
            .store
            .find_variant(variant_id)
            .await?
            .filter(|e| !e.variant.tombstone.is_deleted() && !e.product.tombstone.is_deleted())
            .ok_or(DomainError::VariantNotFound(variant_id))?;

        if !entry.product.is_active {
            return Err(DomainError::ProductInactive {
                name: entry.product.name,
            });
        }
        Ok(entry)
    }
}

fn ensure_in_stock(entry: &CatalogVariant, requested: u32) -> Result<()> {
    if requested > entry.variant.stock_quantity {
        return Err(DomainError::InsufficientStock {
            sku: entry.variant.sku.clone(),
            available: entry.variant.stock_quantity,
            requested,
        });
    }
    Ok(())
}

fn primary_image(entry: &CatalogVariant) -> Option<String> {
    let images = &entry.product.images;
    images
        .iter()
        .find(|i| i.is_primary)
        .or_else(|| images.first())
        .map(|i| i.url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CartStatus, Money};
    use store::{
        CartStore, CatalogStore, MemoryStore, ProductImage, ProductRecord, Tombstone, VariantRecord,
    };

    struct Fixture {
        store: MemoryStore,
        service: CartService<MemoryStore>,
        variant_id: VariantId,
    }

    async fn fixture(stock: u32) -> Fixture {
        let store = MemoryStore::new();
        let mut product =
            ProductRecord::new("Hoodie", Money::from_cents(4000)).with_discount(Money::from_cents(3500));
        product.images = vec![
            ProductImage {
                url: "https://cdn.test/back.jpg".into(),
                is_primary: false,
                display_order: 0,
            },
            ProductImage {
                url: "https://cdn.test/front.jpg".into(),
                is_primary: true,
                display_order: 1,
            },
        ];
        let variant = VariantRecord::new(product.id, "HD-M", stock)
            .with_additional_price(Money::from_cents(500));
        let variant_id = variant.id;
        store.insert_product(product).await;
        store.insert_variant(variant).await;

        Fixture {
            service: CartService::new(store.clone()),
            store,
            variant_id,
        }
    }

    #[tokio::test]
    async fn test_view_creates_empty_cart() {
        let f = fixture(5).await;
        let view = f.service.view_cart(UserId::new()).await.unwrap();

        assert!(view.is_empty());
        assert_eq!(view.status, CartStatus::Active);
        assert_eq!(view.total, Money::zero());
    }

    #[tokio::test]
    async fn test_add_item_prices_from_discount_plus_surcharge() {
        let f = fixture(5).await;
        let user = UserId::new();

        let view = f
            .service
            .add_item(user, AddCartItem::new(f.variant_id, 2))
            .await
            .unwrap();

        assert_eq!(view.items.len(), 1);
        let line = &view.items[0];
        assert_eq!(line.unit_price, Money::from_cents(4000));
        assert_eq!(line.subtotal, Money::from_cents(8000));
        assert_eq!(line.image_url.as_deref(), Some("https://cdn.test/front.jpg"));
        assert_eq!(view.total, Money::from_cents(8000));
        assert_eq!(view.item_count, 2);
    }

    #[tokio::test]
    async fn test_view_uses_live_price_not_snapshot() {
        let f = fixture(5).await;
        let user = UserId::new();
        f.service
            .add_item(user, AddCartItem::new(f.variant_id, 1))
            .await
            .unwrap();

        let mut entry = f.store.find_variant(f.variant_id).await.unwrap().unwrap();
        entry.product.discount_price = None;
        f.store.insert_product(entry.product).await;

        let view = f.service.view_cart(user).await.unwrap();
        assert_eq!(view.items[0].stored_price, Money::from_cents(4000));
        assert_eq!(view.items[0].unit_price, Money::from_cents(4500));
        assert_eq!(view.total, Money::from_cents(4500));
    }

    #[tokio::test]
    async fn test_add_rejects_combined_quantity_over_stock() {
        let f = fixture(5).await;
        let user = UserId::new();
        f.service
            .add_item(user, AddCartItem::new(f.variant_id, 3))
            .await
            .unwrap();

        let err = f
            .service
            .add_item(user, AddCartItem::new(f.variant_id, 3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_inactive_product() {
        let f = fixture(5).await;
        let mut entry = f.store.find_variant(f.variant_id).await.unwrap().unwrap();
        entry.product.is_active = false;
        f.store.insert_product(entry.product).await;

        let err = f
            .service
            .add_item(UserId::new(), AddCartItem::new(f.variant_id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ProductInactive { .. }));
    }

    #[tokio::test]
    async fn test_add_rejects_deleted_variant() {
        let f = fixture(5).await;
        let mut entry = f.store.find_variant(f.variant_id).await.unwrap().unwrap();
        entry.variant.tombstone = Tombstone::now(None);
        f.store.insert_variant(entry.variant).await;

        let err = f
            .service
            .add_item(UserId::new(), AddCartItem::new(f.variant_id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::VariantNotFound(id) if id == f.variant_id));
    }

    #[tokio::test]
    async fn test_add_rejects_deleted_product() {
        let f = fixture(5).await;
        let mut entry = f.store.find_variant(f.variant_id).await.unwrap().unwrap();
        entry.product.tombstone = Tombstone::now(None);
        f.store.insert_product(entry.product).await;

        let err = f
            .service
            .add_item(UserId::new(), AddCartItem::new(f.variant_id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::VariantNotFound(_)));
    }

    #[tokio::test]
    async fn test_add_rejects_missing_quantity() {
        let f = fixture(5).await;
        let cmd = AddCartItem {
            variant_id: f.variant_id,
            quantity: None,
        };
        let err = f.service.add_item(UserId::new(), cmd).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity));
    }

    #[tokio::test]
    async fn test_update_requires_active_cart() {
        let f = fixture(5).await;
        let err = f
            .service
            .update_item_quantity(UserId::new(), UpdateCartItem::new(CartItemId::new(), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CartNotFound));
    }

    #[tokio::test]
    async fn test_update_checks_stock() {
        let f = fixture(4).await;
        let user = UserId::new();
        let view = f
            .service
            .add_item(user, AddCartItem::new(f.variant_id, 1))
            .await
            .unwrap();
        let item_id = view.items[0].item_id;

        let view = f
            .service
            .update_item_quantity(user, UpdateCartItem::new(item_id, 4))
            .await
            .unwrap();
        assert_eq!(view.item_count, 4);

        let err = f
            .service
            .update_item_quantity(user, UpdateCartItem::new(item_id, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
    }

    #[tokio::test]
    async fn test_remove_item_from_other_users_cart_is_not_found() {
        let f = fixture(5).await;
        let owner = UserId::new();
        let intruder = UserId::new();
        let view = f
            .service
            .add_item(owner, AddCartItem::new(f.variant_id, 1))
            .await
            .unwrap();
        f.service.view_cart(intruder).await.unwrap();

        let err = f
            .service
            .remove_item(intruder, view.items[0].item_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CartItemNotFound(_)));
    }

    #[tokio::test]
    async fn test_clear_empties_cart() {
        let f = fixture(5).await;
        let user = UserId::new();
        f.service
            .add_item(user, AddCartItem::new(f.variant_id, 2))
            .await
            .unwrap();

        let message = f.service.clear(user).await.unwrap();
        assert_eq!(message, CART_CLEARED_MESSAGE);
        assert!(f.service.view_cart(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_without_cart_is_not_found() {
        let f = fixture(5).await;
        let err = f.service.clear(UserId::new()).await.unwrap_err();
        assert!(matches!(err, DomainError::CartNotFound));
    }

    #[tokio::test]
    async fn test_sweep_removes_stale_cart() {
        let f = fixture(5).await;
        let user = UserId::new();
        let cart = f.service.get_or_create_active_cart(user).await.unwrap();
        f.store
            .set_cart_updated_at(cart.id, Utc::now() - Duration::days(10))
            .await;

        let swept = f.service.sweep_stale_carts(Duration::days(7)).await.unwrap();
        assert_eq!(swept, 1);
        assert!(f.store.find_active_cart(user).await.unwrap().is_none());
    }
}
