//! Checkout error types.

use domain::{DomainError, ErrorKind};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A business rule or lookup failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Every step succeeded but the transaction could not be committed.
    #[error("Failed to commit checkout: {0}")]
    Commit(StoreError),
}

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Domain(err) => err.kind(),
            CheckoutError::Commit(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        CheckoutError::Domain(err.into())
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
