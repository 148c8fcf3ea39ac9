//! Cart and order status enums.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a status string does not name a known status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} status: {value}")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

/// Lifecycle of a shopping cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    /// Accumulating items.
    #[default]
    Active,
    /// Converted into an order by checkout (terminal).
    Completed,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CartStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CartStatus::Active),
            "completed" => Ok(CartStatus::Completed),
            other => Err(ParseStatusError {
                kind: "cart",
                value: other.to_string(),
            }),
        }
    }
}

/// Payment state of an order. Set by administrators only; not coupled to
/// fulfillment transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(ParseStatusError {
                kind: "payment",
                value: other.to_string(),
            }),
        }
    }
}

/// Shipping/processing stage of an order.
///
/// ```text
/// Pending ──► Confirmed ──► Preparing ──► Shipped ──► Delivery
///    │            │             │            │
///    └────────────┴─────────────┴────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Shipped,
    /// Delivered to the customer (terminal).
    Delivery,
    /// Cancelled by the customer (terminal).
    Cancelled,
}

impl FulfillmentStatus {
    /// Returns true if a customer may cancel an order in this state.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if no further customer transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FulfillmentStatus::Delivery | FulfillmentStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "pending",
            FulfillmentStatus::Confirmed => "confirmed",
            FulfillmentStatus::Preparing => "preparing",
            FulfillmentStatus::Shipped => "shipped",
            FulfillmentStatus::Delivery => "delivery",
            FulfillmentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FulfillmentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FulfillmentStatus::Pending),
            "confirmed" => Ok(FulfillmentStatus::Confirmed),
            "preparing" => Ok(FulfillmentStatus::Preparing),
            "shipped" => Ok(FulfillmentStatus::Shipped),
            "delivery" => Ok(FulfillmentStatus::Delivery),
            "cancelled" => Ok(FulfillmentStatus::Cancelled),
            other => Err(ParseStatusError {
                kind: "fulfillment",
                value: other.to_string(),
            }),
        }
    }
}
