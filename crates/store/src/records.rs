//! Persisted record types.
//!
//! Records mirror table rows. Money is kept in cents, quantities as `u32`.

use chrono::{DateTime, NaiveDate, Utc};
use common::{
    AddressId, CartId, CartItemId, CartStatus, FulfillmentStatus, Money, OrderId, OrderItemId,
    OrderNumber, PaymentStatus, ProductId, UserId, VariantId,
};

/// Soft-delete marker carried by every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tombstone {
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<UserId>,
}

impl Tombstone {
    /// A tombstone stamped now.
    pub fn now(deleted_by: Option<UserId>) -> Self {
        Self {
            deleted_at: Some(Utc::now()),
            deleted_by,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub url: String,
    pub is_primary: bool,
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub is_active: bool,
    /// Non-deleted images in display order.
    pub images: Vec<ProductImage>,
    pub tombstone: Tombstone,
}

impl ProductRecord {
    /// Creates an active product with no discount and no images.
    pub fn new(name: impl Into<String>, price: Money) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            description: None,
            price,
            discount_price: None,
            is_active: true,
            images: Vec::new(),
            tombstone: Tombstone::default(),
        }
    }

    pub fn with_discount(mut self, discount_price: Money) -> Self {
        self.discount_price = Some(discount_price);
        self
    }

    /// Price a customer pays for the base product right now.
    pub fn effective_price(&self) -> Money {
        self.discount_price.unwrap_or(self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRecord {
    pub id: VariantId,
    pub product_id: ProductId,
    pub size: Option<String>,
    pub color: Option<String>,
    pub sku: String,
    pub additional_price: Money,
    pub stock_quantity: u32,
    pub tombstone: Tombstone,
}

impl VariantRecord {
    /// Creates a variant with no size, color or surcharge.
    pub fn new(product_id: ProductId, sku: impl Into<String>, stock_quantity: u32) -> Self {
        Self {
            id: VariantId::new(),
            product_id,
            size: None,
            color: None,
            sku: sku.into(),
            additional_price: Money::zero(),
            stock_quantity,
            tombstone: Tombstone::default(),
        }
    }

    pub fn with_additional_price(mut self, additional_price: Money) -> Self {
        self.additional_price = additional_price;
        self
    }
}

/// A variant joined with its parent product, as returned by catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogVariant {
    pub variant: VariantRecord,
    pub product: ProductRecord,
}

impl CatalogVariant {
    /// Live unit price: `(discount_price ?? price) + additional_price`.
    pub fn unit_price(&self) -> Money {
        self.product.effective_price() + self.variant.additional_price
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    pub id: AddressId,
    pub user_id: UserId,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub tombstone: Tombstone,
}

impl AddressRecord {
    /// Creates a non-default address.
    pub fn new(
        user_id: UserId,
        line1: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            id: AddressId::new(),
            user_id,
            line1: line1.into(),
            line2: None,
            city: city.into(),
            state: None,
            postal_code: postal_code.into(),
            country: country.into(),
            is_default: false,
            tombstone: Tombstone::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartRecord {
    pub id: CartId,
    pub user_id: UserId,
    pub status: CartStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tombstone: Tombstone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemRecord {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub variant_id: VariantId,
    pub quantity: u32,
    /// Unit price captured when the item was last added. Informational only.
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tombstone: Tombstone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub order_number: OrderNumber,
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
    pub tombstone: Tombstone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemRecord {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// Values for a new order row. The order number is allocated separately
/// within the same transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub address_id: AddressId,
    pub order_number: OrderNumber,
    pub order_date: DateTime<Utc>,
    pub total_amount: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub discount_amount: Money,
    pub notes: Option<String>,
}

/// Values for a new order line.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// Key of an order-number counter: the first day of the counting period.
pub type SequencePeriod = NaiveDate;
