use serde::Deserialize;

use crate::{Item, Money};

/// Sort order for item listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOrder {
    #[default]
    Id,
    QuantityAsc,
    QuantityDesc,
}

/// Builder for filtering and ordering items.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    /// Exact name match.
    pub name: Option<String>,

    /// Name contains this substring (`LIKE '%...%'`).
    pub name_contains: Option<String>,

    /// Minimum quantity on hand (inclusive).
    pub min_quantity: Option<i32>,

    /// Maximum quantity on hand (inclusive).
    pub max_quantity: Option<i32>,

    /// Unit cost strictly below this amount.
    pub cheaper_than: Option<Money>,

    /// Alternatives of which at least one must also match. Only their
    /// filters are used; their `order` and `limit` are ignored.
    pub any_of: Vec<ItemQuery>,

    pub order: ItemOrder,

    /// Maximum number of items to return.
    pub limit: Option<usize>,
}

impl ItemQuery {
    /// Creates a new query matching every item.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name_contains(mut self, fragment: impl Into<String>) -> Self {
        self.name_contains = Some(fragment.into());
        self
    }

    /// Restricts to quantities in `min..=max`.
    pub fn quantity_between(mut self, min: i32, max: i32) -> Self {
        self.min_quantity = Some(min);
        self.max_quantity = Some(max);
        self
    }

    pub fn cheaper_than(mut self, amount: Money) -> Self {
        self.cheaper_than = Some(amount);
        self
    }

    /// Adds a disjunction: an item must also match one of `alternatives`.
    pub fn any_of(mut self, alternatives: impl IntoIterator<Item = ItemQuery>) -> Self {
        self.any_of.extend(alternatives);
        self
    }

    pub fn order(mut self, order: ItemOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks the filters (not ordering or limit) against an item.
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(ref name) = self.name
            && &item.name != name
        {
            return false;
        }
        if let Some(ref fragment) = self.name_contains
            && !item.name.contains(fragment.as_str())
        {
            return false;
        }
        if let Some(min) = self.min_quantity
            && item.quantity < min
        {
            return false;
        }
        if let Some(max) = self.max_quantity
            && item.quantity > max
        {
            return false;
        }
        if let Some(amount) = self.cheaper_than
            && item.unit_cost >= amount
        {
            return false;
        }
        self.any_of.is_empty() || self.any_of.iter().any(|alt| alt.matches(item))
    }
}

/// A customer's orders, optionally narrowed to shipped or unshipped ones
/// and optionally expanded to one row per line item.
#[derive(Debug, Clone, Default)]
pub struct CustomerOrdersQuery {
    pub username: String,
    pub shipped: Option<bool>,
    pub details: bool,
}

impl CustomerOrdersQuery {
    pub fn for_customer(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn shipped(mut self, shipped: bool) -> Self {
        self.shipped = Some(shipped);
        self
    }

    pub fn with_details(mut self) -> Self {
        self.details = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ItemId;

    fn item(name: &str, quantity: i32, unit_cost_cents: i64) -> Item {
        Item {
            id: ItemId::new(1),
            name: name.to_string(),
            recipe_url: None,
            sku: None,
            quantity,
            unit_cost: Money::from_cents(unit_cost_cents),
        }
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(ItemQuery::new().matches(&item("oatmeal raisin", 100, 100)));
    }

    #[test]
    fn name_filters() {
        let cc = item("chocolate chip", 12, 50);
        let dark = item("dark chocolate chip", 1, 75);

        let exact = ItemQuery::new().name("chocolate chip");
        assert!(exact.matches(&cc));
        assert!(!exact.matches(&dark));

        let like = ItemQuery::new().name_contains("chocolate");
        assert!(like.matches(&cc));
        assert!(like.matches(&dark));
    }

    #[test]
    fn quantity_between_is_inclusive() {
        let query = ItemQuery::new().quantity_between(10, 50);
        assert!(query.matches(&item("a", 10, 1)));
        assert!(query.matches(&item("b", 50, 1)));
        assert!(!query.matches(&item("c", 51, 1)));
        assert!(!query.matches(&item("d", 9, 1)));
    }

    #[test]
    fn cheaper_than_is_strict() {
        let query = ItemQuery::new().cheaper_than(Money::from_cents(40));
        assert!(query.matches(&item("peanut butter", 24, 25)));
        assert!(!query.matches(&item("x", 1, 40)));
    }

    #[test]
    fn any_of_is_a_disjunction_on_top_of_the_filters() {
        let between_or_chip = ItemQuery::new().any_of([
            ItemQuery::new().quantity_between(10, 50),
            ItemQuery::new().name_contains("chip"),
        ]);
        assert!(between_or_chip.matches(&item("dark chocolate chip", 1, 75)));
        assert!(between_or_chip.matches(&item("peanut butter", 24, 25)));
        assert!(!between_or_chip.matches(&item("oatmeal raisin", 100, 100)));

        let cheap_too = between_or_chip.cheaper_than(Money::from_cents(60));
        assert!(cheap_too.matches(&item("chocolate chip", 12, 50)));
        assert!(!cheap_too.matches(&item("dark chocolate chip", 1, 75)));
    }

    #[test]
    fn customer_query_builder() {
        let query = CustomerOrdersQuery::for_customer("cakeeater")
            .shipped(false)
            .with_details();
        assert_eq!(query.username, "cakeeater");
        assert_eq!(query.shipped, Some(false));
        assert!(query.details);
    }
}
