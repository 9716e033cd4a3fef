//! Order fulfillment.
//!
//! Shipping an order removes every ordered unit from inventory and marks the
//! order shipped, as one transaction:
//! 1. Lock the order and check it may be shipped
//! 2. Decrement each referenced item by its line item quantity
//! 3. Set the shipped flag and commit
//!
//! If any step fails the transaction is rolled back and the caller gets a
//! [`FulfillmentError`]; nothing is retried.

pub mod error;
pub mod service;

pub use error::{FulfillmentError, Result};
pub use service::FulfillmentService;
