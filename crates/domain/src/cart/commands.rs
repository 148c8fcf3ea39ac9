//! Cart commands.

use common::{CartItemId, VariantId};

use crate::error::{DomainError, Result};

/// Command to add a variant to the user's active cart.
#[derive(Debug, Clone)]
pub struct AddCartItem {
    pub variant_id: VariantId,

    /// Requested quantity as received. Validated by the service.
    pub quantity: Option<i64>,
}

impl AddCartItem {
    pub fn new(variant_id: VariantId, quantity: i64) -> Self {
        Self {
            variant_id,
            quantity: Some(quantity),
        }
    }
}

/// Command to overwrite the quantity of a cart line.
#[derive(Debug, Clone)]
pub struct UpdateCartItem {
    pub item_id: CartItemId,
    pub quantity: Option<i64>,
}

impl UpdateCartItem {
    pub fn new(item_id: CartItemId, quantity: i64) -> Self {
        Self {
            item_id,
            quantity: Some(quantity),
        }
    }
}

/// Accepts only present, positive quantities that fit a stock counter.
pub(crate) fn validate_quantity(quantity: Option<i64>) -> Result<u32> {
    match quantity {
        Some(q) if q > 0 => u32::try_from(q)
            .ok()
            .filter(|q| i32::try_from(*q).is_ok())
            .ok_or(DomainError::InvalidQuantity),
        _ => Err(DomainError::InvalidQuantity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert_eq!(validate_quantity(Some(3)).unwrap(), 3);
        assert!(validate_quantity(None).is_err());
        assert!(validate_quantity(Some(0)).is_err());
        assert!(validate_quantity(Some(-2)).is_err());
        assert!(validate_quantity(Some(i64::from(i32::MAX) + 1)).is_err());
    }
}
