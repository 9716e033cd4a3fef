use async_trait::async_trait;

use crate::{
    CustomerOrdersQuery, CustomerOrderRow, InventorySummary, Item, ItemId, ItemQuery, LineItem,
    Money, NewItem, NewOrder, NewUser, Order, OrderId, Result, Shipment, StoreError, UserId,
    UserOrderCount, schema,
};

/// Options for shipping an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipOptions {
    /// Ship an order even if it is already marked shipped, decrementing
    /// inventory a second time. Off by default.
    pub allow_reship: bool,
}

impl ShipOptions {
    /// Creates options that refuse to ship an order twice.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options that ship regardless of the current shipped flag.
    pub fn allow_reship() -> Self {
        Self { allow_reship: true }
    }
}

/// Core trait for inventory store implementations.
///
/// All implementations must be thread-safe (Send + Sync) and must give
/// multi-row writes all-or-nothing semantics.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Inserts items atomically and returns their ids in input order.
    async fn add_items(&self, items: Vec<NewItem>) -> Result<Vec<ItemId>>;

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>>;

    /// Lists items matching a query.
    async fn list_items(&self, query: ItemQuery) -> Result<Vec<Item>>;

    /// Applies `quantity = quantity + delta` and returns the updated item.
    ///
    /// Fails with `ItemNotFound` if the item does not exist, or with a check
    /// violation if the quantity would go negative.
    async fn adjust_quantity(&self, id: ItemId, delta: i32) -> Result<Item>;

    /// Deletes an item and, by cascade, every line item referencing it.
    ///
    /// Returns false if the item did not exist.
    async fn delete_item(&self, id: ItemId) -> Result<bool>;

    async fn inventory_summary(&self) -> Result<InventorySummary>;

    /// Inserts a user. A taken username is a unique violation.
    async fn add_user(&self, user: NewUser) -> Result<UserId>;

    /// Inserts an order with its line items in one transaction.
    async fn create_order(&self, order: NewOrder) -> Result<OrderId>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Line items of an order in insertion order.
    async fn line_items_for_order(&self, id: OrderId) -> Result<Vec<LineItem>>;

    /// A customer's orders. An unknown username yields an empty list.
    async fn orders_by_customer(&self, query: CustomerOrdersQuery)
    -> Result<Vec<CustomerOrderRow>>;

    /// Order counts for every user, including users without orders.
    async fn order_counts(&self) -> Result<Vec<UserOrderCount>>;

    /// Ships an order.
    ///
    /// In one transaction: decrements every referenced item's quantity by
    /// the line item's quantity (as a relative update) and sets the order's
    /// shipped flag. If any step fails, nothing is changed.
    ///
    /// Fails with `OrderNotFound` if the order does not exist and with
    /// `AlreadyShipped` if it was shipped before, unless
    /// `options.allow_reship` is set. An order without line items ships
    /// with no decrements.
    async fn ship_order(&self, order_id: OrderId, options: ShipOptions) -> Result<Shipment>;
}

/// Extension trait providing convenience methods for inventory stores.
#[async_trait]
pub trait InventoryStoreExt: InventoryStore {
    /// Inserts a single item.
    async fn add_item(&self, item: NewItem) -> Result<ItemId> {
        let ids = self.add_items(vec![item]).await?;
        ids.into_iter()
            .next()
            .ok_or_else(|| StoreError::Validation("insert returned no id".to_string()))
    }

    /// Finds the first item with exactly this name.
    async fn find_item_by_name(&self, name: &str) -> Result<Option<Item>> {
        let items = self.list_items(ItemQuery::new().name(name).limit(1)).await?;
        Ok(items.into_iter().next())
    }

    async fn order_exists(&self, id: OrderId) -> Result<bool> {
        Ok(self.get_order(id).await?.is_some())
    }
}

// Blanket implementation for all InventoryStore implementations
impl<T: InventoryStore + ?Sized> InventoryStoreExt for T {}

fn check_length(field: &str, value: &str, max_chars: usize) -> Result<()> {
    let chars = value.chars().count();
    if chars > max_chars {
        return Err(StoreError::Validation(format!(
            "{field} is {chars} characters long, the limit is {max_chars}"
        )));
    }
    Ok(())
}

fn check_amount(field: &str, amount: Money) -> Result<()> {
    if amount.is_negative() {
        return Err(StoreError::Validation(format!(
            "{field} cannot be negative, got {amount}"
        )));
    }
    if amount > schema::MAX_AMOUNT {
        return Err(StoreError::Validation(format!(
            "{field} of {amount} exceeds {}",
            schema::MAX_AMOUNT
        )));
    }
    Ok(())
}

/// Validates items before inserting.
pub fn validate_new_items(items: &[NewItem]) -> Result<()> {
    if items.is_empty() {
        return Err(StoreError::Validation(
            "Cannot insert an empty item list".to_string(),
        ));
    }
    for item in items {
        if item.name.trim().is_empty() {
            return Err(StoreError::Validation("Item name is required".to_string()));
        }
        check_length("Item name", &item.name, schema::ITEM_NAME_MAX_CHARS)?;
        if let Some(sku) = &item.sku {
            check_length("SKU", sku, schema::ITEM_SKU_MAX_CHARS)?;
        }
        if let Some(url) = &item.recipe_url {
            check_length("Recipe URL", url, schema::ITEM_RECIPE_URL_MAX_CHARS)?;
        }
        check_amount(&format!("Unit cost of {}", item.name), item.unit_cost)?;
    }
    Ok(())
}

/// Validates an order before inserting.
pub fn validate_new_order(order: &NewOrder) -> Result<()> {
    for line in &order.lines {
        if line.quantity <= 0 {
            return Err(StoreError::Validation(format!(
                "Line item quantity must be positive, got {} for item {}",
                line.quantity, line.item_id
            )));
        }
        check_amount(
            &format!("Extended cost for item {}", line.item_id),
            line.extended_cost,
        )?;
    }
    Ok(())
}

/// Validates a user before inserting.
pub fn validate_new_user(user: &NewUser) -> Result<()> {
    if user.username.trim().is_empty() {
        return Err(StoreError::Validation("Username is required".to_string()));
    }
    check_length("Username", &user.username, schema::USERNAME_MAX_CHARS)?;
    check_length(
        "Email address",
        &user.email_address,
        schema::EMAIL_ADDRESS_MAX_CHARS,
    )?;
    check_length("Phone", &user.phone, schema::PHONE_MAX_CHARS)?;
    Ok(())
}
