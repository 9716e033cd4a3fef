//! Shared types for the inventory store and order fulfillment crates.

pub mod money;
pub mod types;

pub use money::{Money, ParseMoneyError};
pub use types::{ItemId, LineItemId, OrderId, UserId};
