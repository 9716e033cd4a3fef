//! Integration tests for order fulfillment against the in-memory store.

use std::time::Duration;

use async_trait::async_trait;
use fulfillment::{FulfillmentError, FulfillmentService};
use inventory_store::{
    CustomerOrderRow, CustomerOrdersQuery, InMemoryInventoryStore, InventoryStore,
    InventorySummary, Item, ItemId, ItemQuery, LineItem, Money, NewItem, NewOrder, NewUser, Order,
    OrderId, Result, ShipOptions, Shipment, UserId, UserOrderCount,
};

struct TestHarness {
    service: FulfillmentService<InMemoryInventoryStore>,
    store: InMemoryInventoryStore,
    chocolate_chip: ItemId,
    dark_chocolate_chip: ItemId,
    customer: UserId,
}

impl TestHarness {
    async fn new() -> Self {
        let store = InMemoryInventoryStore::new();
        let ids = store
            .add_items(vec![
                NewItem::new("chocolate chip", 12, Money::from_cents(50)),
                NewItem::new("dark chocolate chip", 1, Money::from_cents(75)),
            ])
            .await
            .unwrap();
        let customer = store
            .add_user(NewUser::new("cookiemon", "mon@cookie.com", "111-111-1111"))
            .await
            .unwrap();

        Self {
            service: FulfillmentService::new(store.clone()),
            store,
            chocolate_chip: ids[0],
            dark_chocolate_chip: ids[1],
            customer,
        }
    }

    async fn order(&self, lines: &[(ItemId, i32)]) -> OrderId {
        let order = lines
            .iter()
            .fold(NewOrder::new(self.customer), |order, &(item, qty)| {
                order.line(item, qty, Money::from_cents(50 * i64::from(qty)))
            });
        self.store.create_order(order).await.unwrap()
    }

    async fn quantity(&self, item: ItemId) -> i32 {
        self.store.get_item(item).await.unwrap().unwrap().quantity
    }

    async fn shipped(&self, order: OrderId) -> bool {
        self.store.get_order(order).await.unwrap().unwrap().shipped
    }
}

#[tokio::test]
async fn test_first_order_ships_second_is_rejected_whole() {
    let h = TestHarness::new().await;
    let first = h.order(&[(h.chocolate_chip, 9)]).await;
    let second = h
        .order(&[(h.chocolate_chip, 4), (h.dark_chocolate_chip, 1)])
        .await;

    let shipment = h.service.fulfill(first).await.unwrap();
    assert_eq!(shipment.units(), 9);
    assert_eq!(h.quantity(h.chocolate_chip).await, 3);
    assert!(h.shipped(first).await);

    let err = h.service.fulfill(second).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::IntegrityViolation { .. }));

    // The dark chocolate line would have succeeded on its own.
    assert_eq!(h.quantity(h.chocolate_chip).await, 3);
    assert_eq!(h.quantity(h.dark_chocolate_chip).await, 1);
    assert!(!h.shipped(second).await);
}

#[tokio::test]
async fn test_failed_fulfillment_leaves_store_identical() {
    let h = TestHarness::new().await;
    let order = h
        .order(&[(h.dark_chocolate_chip, 1), (h.chocolate_chip, 13)])
        .await;

    let items_before = h.store.items().await;
    let orders_before = h.store.orders().await;

    h.service.fulfill(order).await.unwrap_err();

    assert_eq!(h.store.items().await, items_before);
    assert_eq!(h.store.orders().await, orders_before);
}

#[tokio::test]
async fn test_same_item_on_two_lines_is_summed() {
    let h = TestHarness::new().await;
    let order = h
        .order(&[(h.chocolate_chip, 5), (h.chocolate_chip, 7)])
        .await;

    let shipment = h.service.fulfill(order).await.unwrap();

    assert_eq!(shipment.lines.len(), 2);
    assert_eq!(h.quantity(h.chocolate_chip).await, 0);
}

#[tokio::test]
async fn test_order_without_lines_ships() {
    let h = TestHarness::new().await;
    let order = h.order(&[]).await;

    let shipment = h.service.fulfill(order).await.unwrap();

    assert!(shipment.lines.is_empty());
    assert!(h.shipped(order).await);
}

#[tokio::test]
async fn test_reship_is_refused_and_inventory_untouched() {
    let h = TestHarness::new().await;
    let order = h.order(&[(h.chocolate_chip, 2)]).await;

    h.service.fulfill(order).await.unwrap();
    let err = h.service.fulfill(order).await.unwrap_err();

    assert!(matches!(err, FulfillmentError::AlreadyShipped(id) if id == order));
    assert_eq!(h.quantity(h.chocolate_chip).await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_fulfillments_lose_no_updates() {
    let h = TestHarness::new().await;
    let mut orders = Vec::new();
    for _ in 0..6 {
        orders.push(h.order(&[(h.chocolate_chip, 2)]).await);
    }

    let handles: Vec<_> = orders
        .iter()
        .map(|&order| {
            let service = h.service.clone();
            tokio::spawn(async move { service.fulfill(order).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.quantity(h.chocolate_chip).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_fulfillments_never_oversell() {
    let h = TestHarness::new().await;
    let mut orders = Vec::new();
    for _ in 0..5 {
        orders.push(h.order(&[(h.chocolate_chip, 5)]).await);
    }

    let handles: Vec<_> = orders
        .iter()
        .map(|&order| {
            let service = h.service.clone();
            tokio::spawn(async move { service.fulfill(order).await })
        })
        .collect();

    let mut shipped = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => shipped += 1,
            Err(err) => assert!(matches!(err, FulfillmentError::IntegrityViolation { .. })),
        }
    }

    assert_eq!(shipped, 2);
    assert_eq!(h.quantity(h.chocolate_chip).await, 2);
}

/// Store that stalls before every shipment.
#[derive(Clone)]
struct SlowStore {
    inner: InMemoryInventoryStore,
    delay: Duration,
}

#[async_trait]
impl InventoryStore for SlowStore {
    async fn add_items(&self, items: Vec<NewItem>) -> Result<Vec<ItemId>> {
        self.inner.add_items(items).await
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        self.inner.get_item(id).await
    }

    async fn list_items(&self, query: ItemQuery) -> Result<Vec<Item>> {
        self.inner.list_items(query).await
    }

    async fn adjust_quantity(&self, id: ItemId, delta: i32) -> Result<Item> {
        self.inner.adjust_quantity(id, delta).await
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool> {
        self.inner.delete_item(id).await
    }

    async fn inventory_summary(&self) -> Result<InventorySummary> {
        self.inner.inventory_summary().await
    }

    async fn add_user(&self, user: NewUser) -> Result<UserId> {
        self.inner.add_user(user).await
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderId> {
        self.inner.create_order(order).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        self.inner.get_order(id).await
    }

    async fn line_items_for_order(&self, id: OrderId) -> Result<Vec<LineItem>> {
        self.inner.line_items_for_order(id).await
    }

    async fn orders_by_customer(
        &self,
        query: CustomerOrdersQuery,
    ) -> Result<Vec<CustomerOrderRow>> {
        self.inner.orders_by_customer(query).await
    }

    async fn order_counts(&self) -> Result<Vec<UserOrderCount>> {
        self.inner.order_counts().await
    }

    async fn ship_order(&self, order_id: OrderId, options: ShipOptions) -> Result<Shipment> {
        tokio::time::sleep(self.delay).await;
        self.inner.ship_order(order_id, options).await
    }
}

#[tokio::test]
async fn test_timeout_abandons_fulfillment_without_effect() {
    let h = TestHarness::new().await;
    let order = h.order(&[(h.chocolate_chip, 3)]).await;
    let slow = SlowStore {
        inner: h.store.clone(),
        delay: Duration::from_millis(500),
    };
    let service = FulfillmentService::new(slow).with_timeout(Duration::from_millis(20));

    let err = service.fulfill(order).await.unwrap_err();

    assert!(matches!(
        err,
        FulfillmentError::TimedOut { order_id, after }
            if order_id == order && after == Duration::from_millis(20)
    ));
    assert_eq!(err.reason(), "timed_out");
    assert_eq!(h.quantity(h.chocolate_chip).await, 12);
    assert!(!h.shipped(order).await);
}
