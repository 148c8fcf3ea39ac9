use common::{CartId, CartItemId, OrderId, OrderNumber, ParseStatusError, VariantId};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional stock decrement would have taken the level below zero.
    #[error(
        "Insufficient stock for {sku}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        variant_id: VariantId,
        sku: String,
        available: u32,
        requested: u32,
    },

    /// The cart was no longer active when a transaction tried to finalize it.
    #[error("Cart {0} is not active")]
    CartNotActive(CartId),

    /// The variant does not exist.
    #[error("Variant not found: {0}")]
    VariantNotFound(VariantId),

    /// The cart item does not exist or was removed.
    #[error("Cart item not found: {0}")]
    CartItemNotFound(CartItemId),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Another order already carries this number.
    #[error("Duplicate order number: {0}")]
    DuplicateOrderNumber(OrderNumber),

    /// A value does not fit the column it is written to.
    #[error("Value {value} out of range for {column}")]
    OutOfRange { column: &'static str, value: u32 },

    /// A stored value could not be mapped back into a domain type.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<ParseStatusError> for StoreError {
    fn from(err: ParseStatusError) -> Self {
        StoreError::CorruptRow(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
