//! Relational storage for items, users, orders and line items.
//!
//! The interesting operation is [`InventoryStore::ship_order`]: it decrements
//! inventory for every line item of an order and marks the order shipped in a
//! single transaction. Either every decrement and the shipped flag become
//! visible together, or nothing does.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod query;
pub mod schema;
pub mod store;

pub use common::{ItemId, LineItemId, Money, OrderId, UserId};
pub use error::{ConstraintKind, Result, StoreError};
pub use memory::InMemoryInventoryStore;
pub use model::{
    CustomerOrderDetail, CustomerOrderRow, InventorySummary, Item, LineItem, NewItem,
    NewLineItem, NewOrder, NewUser, Order, Shipment, ShippedLine, User, UserOrderCount,
};
pub use postgres::PostgresInventoryStore;
pub use query::{CustomerOrdersQuery, ItemOrder, ItemQuery};
pub use store::{InventoryStore, InventoryStoreExt, ShipOptions};
