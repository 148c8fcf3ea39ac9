//! Shared value types for the order fulfillment core.

pub mod money;
pub mod order_number;
pub mod status;
pub mod types;

pub use money::Money;
pub use order_number::OrderNumber;
pub use status::{CartStatus, FulfillmentStatus, ParseStatusError, PaymentStatus};
pub use types::{
    AddressId, CartId, CartItemId, OrderId, OrderItemId, ProductId, UserId, VariantId,
};
