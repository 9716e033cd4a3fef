//! Row types for the inventory schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ItemId, LineItemId, Money, OrderId, UserId};

/// An inventory unit: how many are on hand and what each one costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub recipe_url: Option<String>,
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_cost: Money,
}

impl Item {
    /// Value of the stock on hand (`quantity * unit_cost`), or `None` if it
    /// does not fit in `i64` cents.
    pub fn inventory_value(&self) -> Option<Money> {
        self.unit_cost.checked_mul(self.quantity)
    }
}

/// An item that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub recipe_url: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_cost: Money,
}

impl NewItem {
    pub fn new(name: impl Into<String>, quantity: i32, unit_cost: Money) -> Self {
        Self {
            name: name.into(),
            recipe_url: None,
            sku: None,
            quantity,
            unit_cost,
        }
    }

    pub fn recipe_url(mut self, url: impl Into<String>) -> Self {
        self.recipe_url = Some(url.into());
        self
    }

    pub fn sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }
}

/// A customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email_address: String,
    pub phone: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email_address: String,
    pub phone: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        email_address: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email_address: email_address.into(),
            phone: phone.into(),
        }
    }
}

/// A customer purchase record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipped: bool,
}

/// A quantity of one item on one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub item_id: ItemId,
    pub quantity: i32,
    pub extended_cost: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub item_id: ItemId,
    pub quantity: i32,
    pub extended_cost: Money,
}

impl NewLineItem {
    pub fn new(item_id: ItemId, quantity: i32, extended_cost: Money) -> Self {
        Self {
            item_id,
            quantity,
            extended_cost,
        }
    }
}

/// An order together with its line items, inserted in one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    #[serde(default)]
    pub lines: Vec<NewLineItem>,
}

impl NewOrder {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, item_id: ItemId, quantity: i32, extended_cost: Money) -> Self {
        self.lines
            .push(NewLineItem::new(item_id, quantity, extended_cost));
        self
    }
}

/// Aggregate figures over the whole inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventorySummary {
    pub item_count: i64,
    pub total_quantity: i64,
    pub total_value: Money,
}

/// Number of orders a user has placed, zero included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOrderCount {
    pub username: String,
    pub order_count: i64,
}

/// One row of a customer's order listing.
///
/// Without details there is one row per order; with details there is one
/// row per line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerOrderRow {
    pub order_id: OrderId,
    pub username: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<CustomerOrderDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerOrderDetail {
    pub item_name: String,
    pub quantity: i32,
    pub extended_cost: Money,
}

/// Receipt of a committed shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub order_id: OrderId,
    pub lines: Vec<ShippedLine>,
}

impl Shipment {
    /// Total units removed from inventory.
    pub fn units(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }
}

/// One inventory decrement applied by a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippedLine {
    pub item_id: ItemId,
    pub quantity: i32,
    /// Quantity left on hand right after this decrement.
    pub remaining: i32,
}
