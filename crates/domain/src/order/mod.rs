//! Order lifecycle: reads, status administration and cancellation.

mod commands;
mod lifecycle;
mod view;

pub use commands::{ListOrders, UpdateOrderStatus};
pub use lifecycle::OrderLifecycle;
pub use view::{
    AddressView, ImageView, OrderDetails, OrderLineView, OrderList, PageMeta, ProductView,
    VariantView, hydrate_order,
};
