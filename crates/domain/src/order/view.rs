//! Hydrated order representations returned to clients.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{
    AddressId, FulfillmentStatus, Money, OrderId, OrderItemId, OrderNumber, PaymentStatus,
    ProductId, UserId, VariantId,
};
use serde::Serialize;
use store::{AddressRecord, CatalogVariant, OrderRecord, Store};

use crate::error::Result;

/// An order with its address, lines, variants, products and images.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub order_date: DateTime<Utc>,
    pub total_amount: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub discount_amount: Money,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub address: Option<AddressView>,
    pub items: Vec<OrderLineView>,
}

impl OrderDetails {
    /// Sum of frozen line totals.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(|i| i.total_price).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AddressView {
    pub id: AddressId,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl From<AddressRecord> for AddressView {
    fn from(a: AddressRecord) -> Self {
        Self {
            id: a.id,
            line1: a.line1,
            line2: a.line2,
            city: a.city,
            state: a.state,
            postal_code: a.postal_code,
            country: a.country,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderLineView {
    pub id: OrderItemId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    pub variant: Option<VariantView>,
    pub product: Option<ProductView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantView {
    pub id: VariantId,
    pub sku: String,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<ImageView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub url: String,
    pub is_primary: bool,
    pub display_order: i32,
}

/// One page of orders.
#[derive(Debug, Clone, Serialize)]
pub struct OrderList {
    pub data: Vec<OrderDetails>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

fn split_catalog(entry: &CatalogVariant) -> (VariantView, ProductView) {
    let variant = VariantView {
        id: entry.variant.id,
        sku: entry.variant.sku.clone(),
        size: entry.variant.size.clone(),
        color: entry.variant.color.clone(),
    };
    let product = ProductView {
        id: entry.product.id,
        name: entry.product.name.clone(),
        description: entry.product.description.clone(),
        images: entry
            .product
            .images
            .iter()
            .map(|i| ImageView {
                url: i.url.clone(),
                is_primary: i.is_primary,
                display_order: i.display_order,
            })
            .collect(),
    };
    (variant, product)
}

/// Loads everything needed to present an order.
///
/// Catalog entries are shown even if they were removed after the order was
/// placed; prices always come from the frozen order lines.
pub async fn hydrate_order<S: Store>(store: &S, order: OrderRecord) -> Result<OrderDetails> {
    let address = store.get_address(order.address_id).await?.map(AddressView::from);
    let items = store.list_order_items(order.id).await?;

    let variant_ids: Vec<VariantId> = items.iter().map(|i| i.variant_id).collect();
    let catalog: HashMap<VariantId, CatalogVariant> = store
        .find_variants(&variant_ids)
        .await?
        .into_iter()
        .map(|entry| (entry.variant.id, entry))
        .collect();

    let items = items
        .into_iter()
        .map(|item| {
            let (variant, product) = catalog.get(&item.variant_id).map(split_catalog).unzip();
            OrderLineView {
                id: item.id,
                variant_id: item.variant_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.total_price,
                variant,
                product,
            }
        })
        .collect();

    Ok(OrderDetails {
        id: order.id,
        order_number: order.order_number,
        user_id: order.user_id,
        order_date: order.order_date,
        total_amount: order.total_amount,
        tax_amount: order.tax_amount,
        shipping_amount: order.shipping_amount,
        discount_amount: order.discount_amount,
        payment_status: order.payment_status,
        fulfillment_status: order.fulfillment_status,
        notes: order.notes,
        created_at: order.created_at,
        updated_at: order.updated_at,
        address,
        items,
    })
}
