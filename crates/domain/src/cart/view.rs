use common::{CartId, CartItemId, CartStatus, Money, ProductId, UserId, VariantId};
use serde::Serialize;

/// A cart priced against the current catalog.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart_id: CartId,
    pub user_id: UserId,
    pub status: CartStatus,
    pub items: Vec<CartLineView>,
    /// Sum of line subtotals at live prices.
    pub total: Money,
    /// Sum of line quantities.
    pub item_count: u32,
}

impl CartView {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub item_id: CartItemId,
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub image_url: Option<String>,
    pub quantity: u32,
    /// Live unit price.
    pub unit_price: Money,
    /// Unit price captured when the line was last added.
    pub stored_price: Money,
    pub subtotal: Money,
}
