//! Domain layer for the order fulfillment core.
//!
//! This crate provides:
//! - Cart aggregator with live pricing
//! - Pricing policy for tax and shipping
//! - Inventory ledger over atomic stock primitives
//! - Order number sequencer
//! - Order lifecycle with cancellation and stock restoration

pub mod cart;
pub mod error;
pub mod inventory;
pub mod order;
pub mod pricing;
pub mod sequencer;

pub use cart::{AddCartItem, CART_CLEARED_MESSAGE, CartLineView, CartService, CartView, UpdateCartItem};
pub use error::{DomainError, ErrorKind, Result};
pub use inventory::{InventoryLedger, StockLine};
pub use order::{
    AddressView, ImageView, ListOrders, OrderDetails, OrderLifecycle, OrderLineView, OrderList,
    PageMeta, ProductView, UpdateOrderStatus, VariantView, hydrate_order,
};
pub use pricing::{OrderTotals, PricingPolicy};
pub use sequencer::OrderNumberSequencer;
