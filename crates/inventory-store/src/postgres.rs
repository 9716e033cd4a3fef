use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgPoolOptions, postgres::PgRow};

use crate::{
    CustomerOrderDetail, CustomerOrderRow, CustomerOrdersQuery, InventorySummary, Item, ItemId,
    ItemOrder, ItemQuery, LineItem, LineItemId, Money, NewItem, NewOrder, NewUser, Order,
    OrderId, Result, Shipment, ShippedLine, StoreError, UserId, UserOrderCount,
    store::{
        InventoryStore, ShipOptions, validate_new_items, validate_new_order, validate_new_user,
    },
};

const ITEM_COLUMNS: &str =
    "id, name, recipe_url, sku, quantity, (unit_cost * 100)::BIGINT AS unit_cost_cents";

/// A value bound to a placeholder of a dynamically built item query.
#[derive(Debug, Clone, PartialEq)]
enum FilterParam {
    Text(String),
    Int(i32),
    BigInt(i64),
}

/// PostgreSQL-backed inventory store.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a store on top of an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool to `database_url` and wraps it.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_item(row: PgRow) -> Result<Item> {
        Ok(Item {
            id: ItemId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            recipe_url: row.try_get("recipe_url")?,
            sku: row.try_get("sku")?,
            quantity: row.try_get("quantity")?,
            unit_cost: Money::from_cents(row.try_get("unit_cost_cents")?),
        })
    }

    fn row_to_line_item(row: PgRow) -> Result<LineItem> {
        Ok(LineItem {
            id: LineItemId::new(row.try_get("id")?),
            order_id: OrderId::new(row.try_get("order_id")?),
            item_id: ItemId::new(row.try_get("item_id")?),
            quantity: row.try_get("quantity")?,
            extended_cost: Money::from_cents(row.try_get("extended_cost_cents")?),
        })
    }

    /// Renders the filters of `query` as a boolean SQL expression.
    ///
    /// Placeholders are numbered after the values already in `params`, and
    /// each value is pushed in placeholder order.
    fn item_filter(query: &ItemQuery, params: &mut Vec<FilterParam>) -> String {
        let mut conditions = Vec::new();

        if let Some(name) = &query.name {
            params.push(FilterParam::Text(name.clone()));
            conditions.push(format!("name = ${}", params.len()));
        }
        if let Some(fragment) = &query.name_contains {
            params.push(FilterParam::Text(fragment.clone()));
            conditions.push(format!("strpos(name, ${}) > 0", params.len()));
        }
        if let Some(min) = query.min_quantity {
            params.push(FilterParam::Int(min));
            conditions.push(format!("quantity >= ${}", params.len()));
        }
        if let Some(max) = query.max_quantity {
            params.push(FilterParam::Int(max));
            conditions.push(format!("quantity <= ${}", params.len()));
        }
        if let Some(amount) = query.cheaper_than {
            params.push(FilterParam::BigInt(amount.cents()));
            conditions.push(format!("unit_cost < ${}::NUMERIC / 100", params.len()));
        }
        if !query.any_of.is_empty() {
            let alternatives: Vec<String> = query
                .any_of
                .iter()
                .map(|alt| format!("({})", Self::item_filter(alt, params)))
                .collect();
            conditions.push(format!("({})", alternatives.join(" OR ")));
        }

        if conditions.is_empty() {
            "TRUE".to_string()
        } else {
            conditions.join(" AND ")
        }
    }

    /// Everything `ship_order` does between BEGIN and COMMIT.
    async fn ship_in_transaction(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
        options: ShipOptions,
    ) -> Result<Shipment> {
        // Row lock serializes concurrent shipments of the same order.
        let shipped: Option<bool> =
            sqlx::query_scalar("SELECT shipped FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id.as_i32())
                .fetch_optional(&mut **tx)
                .await?;

        match shipped {
            None => return Err(StoreError::OrderNotFound(order_id)),
            Some(true) if !options.allow_reship => {
                return Err(StoreError::AlreadyShipped(order_id));
            }
            Some(_) => {}
        }

        // Ordered by item so overlapping shipments lock item rows in the same order.
        let lines: Vec<(i32, i32)> = sqlx::query_as(
            "SELECT item_id, quantity FROM line_items WHERE order_id = $1 ORDER BY item_id, id",
        )
        .bind(order_id.as_i32())
        .fetch_all(&mut **tx)
        .await?;

        let mut shipped_lines = Vec::with_capacity(lines.len());
        for (item_id, quantity) in lines {
            let remaining: Option<i32> = sqlx::query_scalar(
                "UPDATE items SET quantity = quantity - $1 WHERE id = $2 RETURNING quantity",
            )
            .bind(quantity)
            .bind(item_id)
            .fetch_optional(&mut **tx)
            .await?;

            let item_id = ItemId::new(item_id);
            let remaining = remaining.ok_or(StoreError::ItemNotFound(item_id))?;
            tracing::debug!(%item_id, quantity, remaining, "inventory decremented");

            shipped_lines.push(ShippedLine {
                item_id,
                quantity,
                remaining,
            });
        }

        sqlx::query("UPDATE orders SET shipped = TRUE WHERE id = $1")
            .bind(order_id.as_i32())
            .execute(&mut **tx)
            .await?;

        Ok(Shipment {
            order_id,
            lines: shipped_lines,
        })
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[tracing::instrument(skip(self, items), fields(count = items.len()))]
    async fn add_items(&self, items: Vec<NewItem>) -> Result<Vec<ItemId>> {
        validate_new_items(&items)?;

        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(items.len());

        for item in &items {
            let id: i32 = sqlx::query_scalar(
                r#"
                INSERT INTO items (name, recipe_url, sku, quantity, unit_cost)
                VALUES ($1, $2, $3, $4, $5::NUMERIC / 100)
                RETURNING id
                "#,
            )
            .bind(&item.name)
            .bind(item.recipe_url.as_deref())
            .bind(item.sku.as_deref())
            .bind(item.quantity)
            .bind(item.unit_cost.cents())
            .fetch_one(&mut *tx)
            .await?;

            ids.push(ItemId::new(id));
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
                .bind(id.as_i32())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_item).transpose()
    }

    async fn list_items(&self, query: ItemQuery) -> Result<Vec<Item>> {
        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE {}",
            Self::item_filter(&query, &mut params)
        );

        sql.push_str(match query.order {
            ItemOrder::Id => " ORDER BY id ASC",
            ItemOrder::QuantityAsc => " ORDER BY quantity ASC, id ASC",
            ItemOrder::QuantityDesc => " ORDER BY quantity DESC, id ASC",
        });

        if let Some(limit) = query.limit {
            // No table outgrows a BIGINT limit, so clamping changes nothing.
            params.push(FilterParam::BigInt(i64::try_from(limit).unwrap_or(i64::MAX)));
            sql.push_str(&format!(" LIMIT ${}", params.len()));
        }

        let mut sqlx_query = sqlx::query(&sql);
        for param in params {
            sqlx_query = match param {
                FilterParam::Text(value) => sqlx_query.bind(value),
                FilterParam::Int(value) => sqlx_query.bind(value),
                FilterParam::BigInt(value) => sqlx_query.bind(value),
            };
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_item).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn adjust_quantity(&self, id: ItemId, delta: i32) -> Result<Item> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "UPDATE items SET quantity = quantity + $1 WHERE id = $2 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(delta)
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_item(row),
            None => Err(StoreError::ItemNotFound(id)),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete_item(&self, id: ItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fails with `OutOfRange` when the total value does not fit a BIGINT
    /// of cents.
    async fn inventory_summary(&self) -> Result<InventorySummary> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS item_count,
                   COALESCE(SUM(quantity), 0)::BIGINT AS total_quantity,
                   COALESCE(SUM(quantity * unit_cost) * 100, 0)::BIGINT AS total_value_cents
            FROM items
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(InventorySummary {
            item_count: row.try_get("item_count")?,
            total_quantity: row.try_get("total_quantity")?,
            total_value: Money::from_cents(row.try_get("total_value_cents")?),
        })
    }

    #[tracing::instrument(skip(self, user), fields(username = %user.username))]
    async fn add_user(&self, user: NewUser) -> Result<UserId> {
        validate_new_user(&user)?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email_address, phone)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.email_address)
        .bind(&user.phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserId::new(id))
    }

    #[tracing::instrument(skip(self, order), fields(user_id = %order.user_id, lines = order.lines.len()))]
    async fn create_order(&self, order: NewOrder) -> Result<OrderId> {
        validate_new_order(&order)?;

        let mut tx = self.pool.begin().await?;

        let order_id: i32 =
            sqlx::query_scalar("INSERT INTO orders (user_id) VALUES ($1) RETURNING id")
                .bind(order.user_id.as_i32())
                .fetch_one(&mut *tx)
                .await?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO line_items (order_id, item_id, quantity, extended_cost)
                VALUES ($1, $2, $3, $4::NUMERIC / 100)
                "#,
            )
            .bind(order_id)
            .bind(line.item_id.as_i32())
            .bind(line.quantity)
            .bind(line.extended_cost.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(OrderId::new(order_id))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row: Option<(i32, i32, bool)> =
            sqlx::query_as("SELECT id, user_id, shipped FROM orders WHERE id = $1")
                .bind(id.as_i32())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, user_id, shipped)| Order {
            id: OrderId::new(id),
            user_id: UserId::new(user_id),
            shipped,
        }))
    }

    async fn line_items_for_order(&self, id: OrderId) -> Result<Vec<LineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, item_id, quantity,
                   (extended_cost * 100)::BIGINT AS extended_cost_cents
            FROM line_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line_item).collect()
    }

    async fn orders_by_customer(
        &self,
        query: CustomerOrdersQuery,
    ) -> Result<Vec<CustomerOrderRow>> {
        let mut sql = String::from("SELECT o.id AS order_id, u.username, u.phone");
        if query.details {
            sql.push_str(
                ", i.name AS item_name, li.quantity, \
                 (li.extended_cost * 100)::BIGINT AS extended_cost_cents",
            );
        }
        sql.push_str(" FROM users u JOIN orders o ON o.user_id = u.id");
        if query.details {
            sql.push_str(
                " JOIN line_items li ON li.order_id = o.id JOIN items i ON i.id = li.item_id",
            );
        }
        sql.push_str(" WHERE u.username = $1");
        if query.shipped.is_some() {
            sql.push_str(" AND o.shipped = $2");
        }
        sql.push_str(if query.details {
            " ORDER BY o.id ASC, li.id ASC"
        } else {
            " ORDER BY o.id ASC"
        });

        let mut sqlx_query = sqlx::query(&sql).bind(&query.username);
        if let Some(shipped) = query.shipped {
            sqlx_query = sqlx_query.bind(shipped);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| -> Result<CustomerOrderRow> {
                let details = if query.details {
                    Some(CustomerOrderDetail {
                        item_name: row.try_get("item_name")?,
                        quantity: row.try_get("quantity")?,
                        extended_cost: Money::from_cents(row.try_get("extended_cost_cents")?),
                    })
                } else {
                    None
                };
                Ok(CustomerOrderRow {
                    order_id: OrderId::new(row.try_get("order_id")?),
                    username: row.try_get("username")?,
                    phone: row.try_get("phone")?,
                    details,
                })
            })
            .collect()
    }

    async fn order_counts(&self) -> Result<Vec<UserOrderCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT u.username, COUNT(o.id) AS order_count
            FROM users u
            LEFT OUTER JOIN orders o ON o.user_id = u.id
            GROUP BY u.username
            ORDER BY u.username COLLATE "C" ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(username, order_count)| UserOrderCount {
                username,
                order_count,
            })
            .collect())
    }

    #[tracing::instrument(skip(self), fields(allow_reship = options.allow_reship))]
    async fn ship_order(&self, order_id: OrderId, options: ShipOptions) -> Result<Shipment> {
        let mut tx = self.pool.begin().await?;

        match Self::ship_in_transaction(&mut tx, order_id, options).await {
            Ok(shipment) => {
                tx.commit().await?;
                tracing::info!(%order_id, lines = shipment.lines.len(), "order shipped");
                Ok(shipment)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    // The pool discards the connection, which aborts the transaction server-side.
                    tracing::warn!(%order_id, error = %rollback_err, "rollback failed");
                }
                tracing::warn!(%order_id, error = %err, "shipment rolled back");
                Err(err)
            }
        }
    }
}
