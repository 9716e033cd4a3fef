//! Constraint names and column limits of the schema in `migrations/`.
//!
//! The in-memory store reports violations under the same names PostgreSQL
//! would, so callers can match on them regardless of the backend.

use crate::Money;

/// `items.quantity >= 0`
pub const QUANTITY_NON_NEGATIVE: &str = "quantity_non_negative";

/// `line_items.quantity > 0`
pub const LINE_QUANTITY_POSITIVE: &str = "line_quantity_positive";

/// `users.username` is unique.
pub const USERS_USERNAME_KEY: &str = "users_username_key";

/// `orders.user_id -> users.id`
pub const ORDERS_USER_ID_FKEY: &str = "orders_user_id_fkey";

/// `line_items.order_id -> orders.id`
pub const LINE_ITEMS_ORDER_ID_FKEY: &str = "line_items_order_id_fkey";

/// `line_items.item_id -> items.id`
pub const LINE_ITEMS_ITEM_ID_FKEY: &str = "line_items_item_id_fkey";

// Column limits. Both stores reject values beyond them before writing.

/// `items.name VARCHAR(50)`
pub const ITEM_NAME_MAX_CHARS: usize = 50;

/// `items.sku VARCHAR(55)`
pub const ITEM_SKU_MAX_CHARS: usize = 55;

/// `items.recipe_url VARCHAR(255)`
pub const ITEM_RECIPE_URL_MAX_CHARS: usize = 255;

/// `users.username VARCHAR(15)`
pub const USERNAME_MAX_CHARS: usize = 15;

/// `users.email_address VARCHAR(255)`
pub const EMAIL_ADDRESS_MAX_CHARS: usize = 255;

/// `users.phone VARCHAR(20)`
pub const PHONE_MAX_CHARS: usize = 20;

/// Largest amount a `NUMERIC(12, 2)` column holds: 9,999,999,999.99.
pub const MAX_AMOUNT: Money = Money::from_cents(999_999_999_999);
