use criterion::{Criterion, criterion_group, criterion_main};
use inventory_store::{
    InMemoryInventoryStore, InventoryStore, ItemId, Money, NewItem, NewOrder, NewUser, OrderId,
    ShipOptions,
};

/// Builds a store with `lines` items and one order touching each of them once.
async fn store_with_order(lines: usize) -> (InMemoryInventoryStore, OrderId) {
    let store = InMemoryInventoryStore::new();
    let items: Vec<NewItem> = (0..lines)
        .map(|n| NewItem::new(format!("item-{n}"), 1_000, Money::from_cents(50)))
        .collect();
    let ids: Vec<ItemId> = store.add_items(items).await.unwrap();
    let user = store
        .add_user(NewUser::new("bench", "bench@example.com", "000-000-0000"))
        .await
        .unwrap();

    let order = ids
        .into_iter()
        .fold(NewOrder::new(user), |order, id| {
            order.line(id, 1, Money::from_cents(50))
        });
    let order_id = store.create_order(order).await.unwrap();
    (store, order_id)
}

fn bench_ship_single_line(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("inventory_store/ship_single_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (store, order_id) = store_with_order(1).await;
                store
                    .ship_order(order_id, ShipOptions::new())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_ship_fifty_lines(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("inventory_store/ship_fifty_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (store, order_id) = store_with_order(50).await;
                store
                    .ship_order(order_id, ShipOptions::new())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_rejected_ship(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, order_id) = rt.block_on(store_with_order(10));
    rt.block_on(store.ship_order(order_id, ShipOptions::new()))
        .unwrap();

    c.bench_function("inventory_store/rejected_reship", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = store.ship_order(order_id, ShipOptions::new()).await;
                assert!(result.is_err());
            });
        });
    });
}

criterion_group!(
    benches,
    bench_ship_single_line,
    bench_ship_fifty_lines,
    bench_rejected_ship
);
criterion_main!(benches);
