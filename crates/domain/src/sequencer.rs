//! Order number allocation.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use common::OrderNumber;
use store::{SequencePeriod, StoreTransaction};

use crate::error::Result;

/// Allocates `ORD-{YYYY}{MM}-{NNNN}` numbers from a per-month counter row.
///
/// The counter is incremented inside the caller's transaction, so a rolled
/// back checkout does not consume a number.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderNumberSequencer;

impl OrderNumberSequencer {
    pub fn new() -> Self {
        Self
    }

    /// Counter key for a date: the first day of its month.
    pub fn period_of(date: NaiveDate) -> SequencePeriod {
        date.with_day(1).unwrap_or(date)
    }

    pub async fn allocate<T: StoreTransaction>(
        &self,
        tx: &mut T,
        now: DateTime<Utc>,
    ) -> Result<OrderNumber> {
        let date = now.date_naive();
        let sequence = tx.next_order_sequence(Self::period_of(date)).await?;
        Ok(OrderNumber::new(date, sequence))
    }
}
