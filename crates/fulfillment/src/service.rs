//! Fulfillment service.

use std::time::{Duration, Instant};

use common::OrderId;
use inventory_store::{InventoryStore, ShipOptions, Shipment};

use crate::error::{FulfillmentError, Result};

/// Ships orders against an [`InventoryStore`].
///
/// Each call to [`fulfill`](Self::fulfill) runs as exactly one store
/// transaction. Calls for different orders may run concurrently; the store
/// serializes conflicting updates so no decrement is lost.
#[derive(Debug, Clone)]
pub struct FulfillmentService<S> {
    store: S,
    options: ShipOptions,
    timeout: Option<Duration>,
}

impl<S: InventoryStore> FulfillmentService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            options: ShipOptions::new(),
            timeout: None,
        }
    }

    /// Abandons a fulfillment that has not committed within `timeout`.
    ///
    /// An abandoned transaction is rolled back when its future is dropped.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_options(mut self, options: ShipOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Ships an order: decrements every referenced item by its line quantity
    /// and marks the order shipped, all or nothing.
    ///
    /// On success the returned [`Shipment`] lists the applied decrements. On
    /// failure the store is unchanged and the error says why.
    #[tracing::instrument(skip(self), fields(allow_reship = self.options.allow_reship))]
    pub async fn fulfill(&self, order_id: OrderId) -> Result<Shipment> {
        metrics::counter!("fulfillment_attempts_total").increment(1);
        let start = Instant::now();

        let result = self.ship(order_id).await;

        let duration = start.elapsed().as_secs_f64();
        metrics::histogram!("fulfillment_duration_seconds").record(duration);

        match &result {
            Ok(shipment) => {
                let units = shipment.units();
                metrics::counter!("fulfillment_shipped_total").increment(1);
                metrics::counter!("fulfillment_units_shipped_total")
                    .increment(u64::try_from(units).unwrap_or(0));
                tracing::info!(
                    %order_id,
                    lines = shipment.lines.len(),
                    units,
                    duration,
                    "order fulfilled"
                );
            }
            Err(err) => {
                metrics::counter!("fulfillment_failed_total", "reason" => err.reason())
                    .increment(1);
                tracing::warn!(%order_id, reason = err.reason(), error = %err, "fulfillment failed");
            }
        }

        result
    }

    async fn ship(&self, order_id: OrderId) -> Result<Shipment> {
        let shipping = self.store.ship_order(order_id, self.options);

        let outcome = match self.timeout {
            Some(after) => tokio::time::timeout(after, shipping)
                .await
                .map_err(|_| FulfillmentError::TimedOut { order_id, after })?,
            None => shipping.await,
        };

        outcome.map_err(|err| FulfillmentError::from_store(order_id, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_store::{
        InMemoryInventoryStore, ItemId, Money, NewItem, NewOrder, NewUser, schema,
    };

    async fn store_with_order(
        stock: i32,
        ordered: i32,
    ) -> (InMemoryInventoryStore, ItemId, OrderId) {
        let store = InMemoryInventoryStore::new();
        let ids = store
            .add_items(vec![NewItem::new("oatmeal", stock, Money::from_cents(40))])
            .await
            .unwrap();
        let user = store
            .add_user(NewUser::new("oatfan", "oat@fan.com", "222-222-2222"))
            .await
            .unwrap();
        let order_id = store
            .create_order(NewOrder::new(user).line(
                ids[0],
                ordered,
                Money::from_cents(40 * i64::from(ordered)),
            ))
            .await
            .unwrap();
        (store, ids[0], order_id)
    }

    #[tokio::test]
    async fn fulfill_returns_shipment() {
        let (store, item, order_id) = store_with_order(10, 3).await;
        let service = FulfillmentService::new(store);

        let shipment = service.fulfill(order_id).await.unwrap();

        assert_eq!(shipment.order_id, order_id);
        assert_eq!(shipment.units(), 3);
        let remaining = service.store().get_item(item).await.unwrap().unwrap();
        assert_eq!(remaining.quantity, 7);
    }

    #[tokio::test]
    async fn out_of_stock_is_integrity_violation() {
        let (store, item, order_id) = store_with_order(2, 3).await;
        let service = FulfillmentService::new(store);

        let err = service.fulfill(order_id).await.unwrap_err();

        assert!(matches!(err, FulfillmentError::IntegrityViolation { order_id: id, .. } if id == order_id));
        assert_eq!(err.constraint(), Some(schema::QUANTITY_NON_NEGATIVE));
        let item = service.store().get_item(item).await.unwrap().unwrap();
        assert_eq!(item.quantity, 2);
        let order = service.store().get_order(order_id).await.unwrap().unwrap();
        assert!(!order.shipped);
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let service = FulfillmentService::new(InMemoryInventoryStore::new());

        let err = service.fulfill(OrderId::new(404)).await.unwrap_err();

        assert!(matches!(err, FulfillmentError::NotFound(id) if id == OrderId::new(404)));
    }

    #[tokio::test]
    async fn second_fulfill_is_already_shipped() {
        let (store, item, order_id) = store_with_order(10, 4).await;
        let service = FulfillmentService::new(store);

        service.fulfill(order_id).await.unwrap();
        let err = service.fulfill(order_id).await.unwrap_err();

        assert_eq!(err.reason(), "already_shipped");
        let item = service.store().get_item(item).await.unwrap().unwrap();
        assert_eq!(item.quantity, 6);
    }

    #[tokio::test]
    async fn reship_option_decrements_again() {
        let (store, item, order_id) = store_with_order(10, 4).await;
        let service = FulfillmentService::new(store).with_options(ShipOptions::allow_reship());

        service.fulfill(order_id).await.unwrap();
        service.fulfill(order_id).await.unwrap();

        let item = service.store().get_item(item).await.unwrap().unwrap();
        assert_eq!(item.quantity, 2);
    }

    #[tokio::test]
    async fn generous_timeout_does_not_interfere() {
        let (store, _, order_id) = store_with_order(5, 5).await;
        let service = FulfillmentService::new(store).with_timeout(Duration::from_secs(5));

        assert_eq!(service.timeout(), Some(Duration::from_secs(5)));
        let shipment = service.fulfill(order_id).await.unwrap();
        assert_eq!(shipment.lines[0].remaining, 0);
    }
}
