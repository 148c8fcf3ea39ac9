//! Domain error types.

use common::{CartItemId, FulfillmentStatus, OrderId, OrderNumber, VariantId};
use store::StoreError;
use thiserror::Error;

/// Broad category of a failure, used by outer layers to pick a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Conflict,
    Internal,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The user has no active cart.
    #[error("Active cart not found")]
    CartNotFound,

    #[error("Cart item not found: {0}")]
    CartItemNotFound(CartItemId),

    /// The variant does not exist or was removed from the catalog.
    #[error("Product variant not found: {0}")]
    VariantNotFound(VariantId),

    #[error("Address not found")]
    AddressNotFound,

    #[error("No default address found, an address id is required")]
    NoDefaultAddress,

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Quantity was missing, zero, negative or too large.
    #[error("Quantity must be a positive integer")]
    InvalidQuantity,

    #[error("Product {name} is not available")]
    ProductInactive { name: String },

    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: u32,
        requested: u32,
    },

    #[error("Cart is empty")]
    EmptyCart,

    /// The cart was finalized by a concurrent checkout.
    #[error("Cart has already been checked out")]
    CartAlreadyCheckedOut,

    /// The cart contents changed between pricing and finalization.
    #[error("Cart changed during checkout, please review it and try again")]
    CartChanged,

    #[error("Order {order_number} cannot be cancelled while {status}")]
    NotCancellable {
        order_number: OrderNumber,
        status: FulfillmentStatus,
    },

    /// A cancelled order cannot be moved back into an active fulfillment status.
    #[error("Order {0} is cancelled and cannot be reopened")]
    OrderClosed(OrderNumber),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::CartNotFound
            | DomainError::CartItemNotFound(_)
            | DomainError::VariantNotFound(_)
            | DomainError::AddressNotFound
            | DomainError::NoDefaultAddress
            | DomainError::OrderNotFound(_) => ErrorKind::NotFound,
            DomainError::InvalidQuantity
            | DomainError::ProductInactive { .. }
            | DomainError::InsufficientStock { .. }
            | DomainError::EmptyCart
            | DomainError::CartAlreadyCheckedOut
            | DomainError::CartChanged
            | DomainError::NotCancellable { .. } => ErrorKind::BadRequest,
            DomainError::OrderClosed(_) => ErrorKind::Conflict,
            DomainError::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientStock {
                sku,
                available,
                requested,
                ..
            } => DomainError::InsufficientStock {
                sku,
                available,
                requested,
            },
            StoreError::CartNotActive(_) => DomainError::CartAlreadyCheckedOut,
            StoreError::VariantNotFound(id) => DomainError::VariantNotFound(id),
            StoreError::CartItemNotFound(id) => DomainError::CartItemNotFound(id),
            StoreError::OrderNotFound(id) => DomainError::OrderNotFound(id),
            other => DomainError::Store(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;
    use common::CartId;

    #[test]
    fn test_store_stock_error_becomes_bad_request() {
        let err: DomainError = StoreError::InsufficientStock {
            variant_id: VariantId::new(),
            sku: "SKU-1".to_string(),
            available: 1,
            requested: 3,
        }
        .into();

        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(
            err.to_string(),
            "Insufficient stock for SKU-1: available 1, requested 3"
        );
    }

    #[test]
    fn test_inactive_cart_maps_to_checked_out() {
        let err: DomainError = StoreError::CartNotActive(CartId::new()).into();
        assert!(matches!(err, DomainError::CartAlreadyCheckedOut));
    }

    #[test]
    fn test_database_errors_are_internal() {
        let err: DomainError = StoreError::CorruptRow("bad".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_not_found_kinds() {
        assert_eq!(DomainError::CartNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(DomainError::NoDefaultAddress.kind(), ErrorKind::NotFound);
        assert_eq!(
            DomainError::OrderNotFound(OrderId::new()).kind(),
            ErrorKind::NotFound
        );
    }
}
