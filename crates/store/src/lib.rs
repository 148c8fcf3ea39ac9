//! Persistence for carts, orders, inventory and order-number counters.
//!
//! Two backends implement the [`Store`] trait family: [`MemoryStore`] for tests
//! and local runs, and [`PostgresStore`] for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{MemoryStore, MemoryTransaction};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, OrderPage, OrderQuery};
pub use records::{
    AddressRecord, CartItemRecord, CartRecord, CatalogVariant, NewOrder, NewOrderItem,
    OrderItemRecord, OrderRecord, ProductImage, ProductRecord, SequencePeriod, Tombstone,
    VariantRecord,
};
pub use store::{AddressStore, CartStore, CatalogStore, OrderStore, Store, StoreTransaction};
