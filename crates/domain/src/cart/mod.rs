//! Cart aggregator: the user's active cart and its live-priced view.

mod commands;
mod service;
mod view;

pub use commands::{AddCartItem, UpdateCartItem};
pub use service::{CART_CLEARED_MESSAGE, CartService};
pub use view::{CartLineView, CartView};
