//! Order totals: flat-rate tax and threshold-based shipping.

use common::Money;
use serde::Serialize;

/// Tax and shipping rules applied at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Tax rate in basis points (1000 = 10%).
    pub tax_rate_bps: u32,

    /// Shipping fee charged when the subtotal does not exceed `free_shipping_over`.
    pub flat_shipping: Money,

    /// Subtotals strictly above this ship for free.
    pub free_shipping_over: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate_bps: 1000,
            flat_shipping: Money::from_cents(999),
            free_shipping_over: Money::from_cents(10_000),
        }
    }
}

impl PricingPolicy {
    pub fn new(tax_rate_bps: u32, flat_shipping: Money, free_shipping_over: Money) -> Self {
        Self {
            tax_rate_bps,
            flat_shipping,
            free_shipping_over,
        }
    }

    pub fn tax(&self, subtotal: Money) -> Money {
        subtotal.apply_rate_bps(self.tax_rate_bps)
    }

    pub fn shipping(&self, subtotal: Money) -> Money {
        if subtotal > self.free_shipping_over {
            Money::zero()
        } else {
            self.flat_shipping
        }
    }

    /// Derives every monetary field of an order from its subtotal.
    pub fn totals(&self, subtotal: Money) -> OrderTotals {
        let tax = self.tax(subtotal);
        let shipping = self.shipping(subtotal);
        let discount = Money::zero();
        OrderTotals {
            subtotal,
            tax,
            shipping,
            discount,
            total: subtotal + tax + shipping - discount,
        }
    }
}

/// Monetary fields frozen onto an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
}
