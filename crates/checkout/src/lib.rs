//! Checkout for the order fulfillment core.
//!
//! Converting a cart into an order is one store transaction that:
//! 1. Finalizes the cart and re-reads its lines under lock
//! 2. Allocates an order number
//! 3. Writes the order and its lines with frozen prices
//! 4. Decrements stock for every line
//! 5. Soft-deletes the cart's lines
//!
//! Any failure rolls back every step, including the order number.

pub mod error;
pub mod orchestrator;

pub use error::{CheckoutError, Result};
pub use orchestrator::{CheckoutOrchestrator, PlaceOrder};
