//! Inventory ledger over per-variant stock counts.
//!
//! Stock only changes through the store's atomic primitives inside a
//! transaction. `check` is an advisory read for early validation.

use common::VariantId;
use store::{CatalogStore, StoreTransaction};

use crate::error::{DomainError, Result};

/// A quantity of one variant to move in or out of stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLine {
    pub variant_id: VariantId,
    pub quantity: u32,
}

impl StockLine {
    pub fn new(variant_id: VariantId, quantity: u32) -> Self {
        Self {
            variant_id,
            quantity,
        }
    }
}

pub struct InventoryLedger<S> {
    catalog: S,
}

impl<S: CatalogStore> InventoryLedger<S> {
    pub fn new(catalog: S) -> Self {
        Self { catalog }
    }

    /// Fails if the variant is unknown, removed, or holds fewer than `quantity` units.
    ///
    /// The answer may be stale by the time it is acted on; `reserve` is authoritative.
    pub async fn check(&self, variant_id: VariantId, quantity: u32) -> Result<()> {
        let entry = self
            .catalog
            .find_variant(variant_id)
            .await?
            .filter(|e| !e.variant.tombstone.is_deleted())
            .ok_or(DomainError::VariantNotFound(variant_id))?;

        if entry.variant.stock_quantity < quantity {
            return Err(DomainError::InsufficientStock {
                sku: entry.variant.sku,
                available: entry.variant.stock_quantity,
                requested: quantity,
            });
        }
        Ok(())
    }
}

/// Decrements stock for one variant, failing instead of going negative.
pub async fn reserve<T: StoreTransaction>(tx: &mut T, line: StockLine) -> Result<u32> {
    match tx.decrement_stock(line.variant_id, line.quantity).await {
        Ok(remaining) => Ok(remaining),
        Err(err) => {
            let err = DomainError::from(err);
            if let DomainError::InsufficientStock {
                sku,
                available,
                requested,
            } = &err
            {
                tracing::warn!(%sku, available, requested, "Insufficient stock");
            }
            Err(err)
        }
    }
}

/// Returns units of one variant to stock.
pub async fn restore<T: StoreTransaction>(tx: &mut T, line: StockLine) -> Result<u32> {
    Ok(tx.increment_stock(line.variant_id, line.quantity).await?)
}

/// Reserves every line in ascending variant order, so concurrent transactions
/// lock variant rows in the same order.
pub async fn reserve_all<T: StoreTransaction>(tx: &mut T, lines: &[StockLine]) -> Result<()> {
    for line in sorted(lines) {
        reserve(tx, line).await?;
    }
    Ok(())
}

/// Restores every line in ascending variant order.
pub async fn restore_all<T: StoreTransaction>(tx: &mut T, lines: &[StockLine]) -> Result<()> {
    for line in sorted(lines) {
        restore(tx, line).await?;
    }
    Ok(())
}

fn sorted(lines: &[StockLine]) -> Vec<StockLine> {
    let mut lines = lines.to_vec();
    lines.sort_by_key(|l| l.variant_id);
    lines
}
