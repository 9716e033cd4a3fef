use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    ConstraintKind, CustomerOrderDetail, CustomerOrderRow, CustomerOrdersQuery, InventorySummary,
    Item, ItemId, ItemOrder, ItemQuery, LineItem, LineItemId, Money, NewItem, NewOrder, NewUser,
    Order, OrderId, Result, Shipment, ShippedLine, StoreError, User, UserId, UserOrderCount,
    schema,
    store::{
        InventoryStore, ShipOptions, validate_new_items, validate_new_order, validate_new_user,
    },
};

/// Rows held by the in-memory store. Cloned to stage multi-row writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Tables {
    items: BTreeMap<ItemId, Item>,
    users: BTreeMap<UserId, User>,
    orders: BTreeMap<OrderId, Order>,
    line_items: BTreeMap<LineItemId, LineItem>,
    last_item_id: i32,
    last_user_id: i32,
    last_order_id: i32,
    last_line_item_id: i32,
}

impl Tables {
    fn next_item_id(&mut self) -> ItemId {
        self.last_item_id += 1;
        ItemId::new(self.last_item_id)
    }

    fn next_user_id(&mut self) -> UserId {
        self.last_user_id += 1;
        UserId::new(self.last_user_id)
    }

    fn next_order_id(&mut self) -> OrderId {
        self.last_order_id += 1;
        OrderId::new(self.last_order_id)
    }

    fn next_line_item_id(&mut self) -> LineItemId {
        self.last_line_item_id += 1;
        LineItemId::new(self.last_line_item_id)
    }

    fn lines_of(&self, order_id: OrderId) -> impl Iterator<Item = &LineItem> {
        self.line_items
            .values()
            .filter(move |li| li.order_id == order_id)
    }

    fn check_quantity(item_id: ItemId, quantity: i64) -> Result<i32> {
        if quantity < 0 {
            return Err(StoreError::violation(
                ConstraintKind::Check,
                schema::QUANTITY_NON_NEGATIVE,
                format!("quantity of item {item_id} would become {quantity}"),
            ));
        }
        i32::try_from(quantity).map_err(|_| {
            StoreError::OutOfRange(format!("quantity of item {item_id} overflows an integer"))
        })
    }
}

/// In-memory inventory store implementation for testing.
///
/// Mirrors the PostgreSQL store, constraint names included. Every write takes
/// the single write lock, applies its changes to a staged copy of the tables
/// and swaps the copy in only if every step succeeded.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all rows and restarts id sequences.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }

    /// Returns every item, ordered by id.
    pub async fn items(&self) -> Vec<Item> {
        self.tables.read().await.items.values().cloned().collect()
    }

    /// Returns every order, ordered by id.
    pub async fn orders(&self) -> Vec<Order> {
        self.tables.read().await.orders.values().copied().collect()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn add_items(&self, items: Vec<NewItem>) -> Result<Vec<ItemId>> {
        validate_new_items(&items)?;

        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let mut ids = Vec::with_capacity(items.len());

        for new in items {
            let id = staged.next_item_id();
            let quantity = Tables::check_quantity(id, i64::from(new.quantity))?;
            staged.items.insert(
                id,
                Item {
                    id,
                    name: new.name,
                    recipe_url: new.recipe_url,
                    sku: new.sku,
                    quantity,
                    unit_cost: new.unit_cost,
                },
            );
            ids.push(id);
        }

        *tables = staged;
        Ok(ids)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.tables.read().await.items.get(&id).cloned())
    }

    async fn list_items(&self, query: ItemQuery) -> Result<Vec<Item>> {
        let tables = self.tables.read().await;
        let mut items: Vec<Item> = tables
            .items
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect();

        match query.order {
            ItemOrder::Id => {}
            ItemOrder::QuantityAsc => items.sort_by_key(|i| (i.quantity, i.id)),
            ItemOrder::QuantityDesc => {
                items.sort_by_key(|i| (std::cmp::Reverse(i.quantity), i.id))
            }
        }

        if let Some(limit) = query.limit {
            items.truncate(limit);
        }

        Ok(items)
    }

    async fn adjust_quantity(&self, id: ItemId, delta: i32) -> Result<Item> {
        let mut tables = self.tables.write().await;
        let item = tables
            .items
            .get_mut(&id)
            .ok_or(StoreError::ItemNotFound(id))?;

        item.quantity = Tables::check_quantity(id, i64::from(item.quantity) + i64::from(delta))?;
        Ok(item.clone())
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.items.remove(&id).is_none() {
            return Ok(false);
        }
        tables.line_items.retain(|_, li| li.item_id != id);
        Ok(true)
    }

    async fn inventory_summary(&self) -> Result<InventorySummary> {
        let tables = self.tables.read().await;
        let total_value = tables
            .items
            .values()
            .try_fold(Money::ZERO, |total, item| {
                item.inventory_value()
                    .and_then(|value| total.checked_add(value))
            })
            .ok_or_else(|| {
                StoreError::OutOfRange("total inventory value overflows a bigint".to_string())
            })?;

        Ok(InventorySummary {
            item_count: tables.items.len() as i64,
            total_quantity: tables.items.values().map(|i| i64::from(i.quantity)).sum(),
            total_value,
        })
    }

    async fn add_user(&self, user: NewUser) -> Result<UserId> {
        validate_new_user(&user)?;

        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::violation(
                ConstraintKind::Unique,
                schema::USERS_USERNAME_KEY,
                format!("Key (username)=({}) already exists.", user.username),
            ));
        }

        let id = tables.next_user_id();
        let now = Utc::now();
        tables.users.insert(
            id,
            User {
                id,
                username: user.username,
                email_address: user.email_address,
                phone: user.phone,
                created_on: now,
                updated_on: now,
            },
        );
        Ok(id)
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderId> {
        validate_new_order(&order)?;

        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&order.user_id) {
            return Err(StoreError::violation(
                ConstraintKind::ForeignKey,
                schema::ORDERS_USER_ID_FKEY,
                format!("Key (user_id)=({}) is not present in table \"users\".", order.user_id),
            ));
        }

        let mut staged = tables.clone();
        let order_id = staged.next_order_id();
        staged.orders.insert(
            order_id,
            Order {
                id: order_id,
                user_id: order.user_id,
                shipped: false,
            },
        );

        for line in order.lines {
            if !staged.items.contains_key(&line.item_id) {
                return Err(StoreError::violation(
                    ConstraintKind::ForeignKey,
                    schema::LINE_ITEMS_ITEM_ID_FKEY,
                    format!(
                        "Key (item_id)=({}) is not present in table \"items\".",
                        line.item_id
                    ),
                ));
            }
            let id = staged.next_line_item_id();
            staged.line_items.insert(
                id,
                LineItem {
                    id,
                    order_id,
                    item_id: line.item_id,
                    quantity: line.quantity,
                    extended_cost: line.extended_cost,
                },
            );
        }

        *tables = staged;
        Ok(order_id)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).copied())
    }

    async fn line_items_for_order(&self, id: OrderId) -> Result<Vec<LineItem>> {
        Ok(self.tables.read().await.lines_of(id).copied().collect())
    }

    async fn orders_by_customer(
        &self,
        query: CustomerOrdersQuery,
    ) -> Result<Vec<CustomerOrderRow>> {
        let tables = self.tables.read().await;
        let Some(user) = tables.users.values().find(|u| u.username == query.username) else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::new();
        for order in tables.orders.values() {
            if order.user_id != user.id {
                continue;
            }
            if let Some(shipped) = query.shipped
                && order.shipped != shipped
            {
                continue;
            }

            let row = |details| CustomerOrderRow {
                order_id: order.id,
                username: user.username.clone(),
                phone: user.phone.clone(),
                details,
            };

            if !query.details {
                rows.push(row(None));
                continue;
            }
            // Inner join: orders without line items drop out.
            for line in tables.lines_of(order.id) {
                let item_name = tables
                    .items
                    .get(&line.item_id)
                    .map(|i| i.name.clone())
                    .unwrap_or_default();
                rows.push(row(Some(CustomerOrderDetail {
                    item_name,
                    quantity: line.quantity,
                    extended_cost: line.extended_cost,
                })));
            }
        }

        Ok(rows)
    }

    async fn order_counts(&self) -> Result<Vec<UserOrderCount>> {
        let tables = self.tables.read().await;
        let mut counts: Vec<UserOrderCount> = tables
            .users
            .values()
            .map(|user| UserOrderCount {
                username: user.username.clone(),
                order_count: tables
                    .orders
                    .values()
                    .filter(|o| o.user_id == user.id)
                    .count() as i64,
            })
            .collect();
        // Byte order, same as `COLLATE "C"` in PostgreSQL.
        counts.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(counts)
    }

    #[tracing::instrument(skip(self), fields(allow_reship = options.allow_reship))]
    async fn ship_order(&self, order_id: OrderId, options: ShipOptions) -> Result<Shipment> {
        let mut tables = self.tables.write().await;

        let order = tables
            .orders
            .get(&order_id)
            .copied()
            .ok_or(StoreError::OrderNotFound(order_id))?;
        if order.shipped && !options.allow_reship {
            return Err(StoreError::AlreadyShipped(order_id));
        }

        let mut lines: Vec<LineItem> = tables.lines_of(order_id).copied().collect();
        lines.sort_by_key(|li| (li.item_id, li.id));

        let mut staged = tables.items.clone();
        let mut shipped_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let item = staged
                .get_mut(&line.item_id)
                .ok_or(StoreError::ItemNotFound(line.item_id))?;
            item.quantity = Tables::check_quantity(
                line.item_id,
                i64::from(item.quantity) - i64::from(line.quantity),
            )?;
            shipped_lines.push(ShippedLine {
                item_id: line.item_id,
                quantity: line.quantity,
                remaining: item.quantity,
            });
        }

        tables.items = staged;
        if let Some(order) = tables.orders.get_mut(&order_id) {
            order.shipped = true;
        }
        tracing::info!(%order_id, lines = shipped_lines.len(), "order shipped");

        Ok(Shipment {
            order_id,
            lines: shipped_lines,
        })
    }
}
