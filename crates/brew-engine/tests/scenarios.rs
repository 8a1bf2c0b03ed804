//! End-to-end scenarios through the public engine surface.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};

use brew_core::{
    CoreError, InventoryItem, MenuItem, Order, OrderDraft, OrderItemDraft, OrderStatus,
    OrderStatusChange, Period, PopularItem, RecipeLine, ValidationError,
};
use brew_db::{
    Database, DateRange, DbConfig, DbError, DbResult, InMemoryInventoryStore, InMemoryMenuStore,
    InMemoryOrderStore, ItemCount, OrderStore,
};
use brew_engine::{Engine, EngineConfig, EngineError, ProcessedStatus, Stores};

// =============================================================================
// Fixtures
// =============================================================================

fn menu_item(id: &str, name: &str, price_cents: i64, recipe: &[(&str, i64)]) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("{name} from the bar"),
        price_cents,
        ingredients: recipe
            .iter()
            .map(|(ingredient, qty)| RecipeLine::new(*ingredient, *qty))
            .collect(),
    }
}

fn shop_menu() -> Vec<MenuItem> {
    vec![
        menu_item("latte", "Latte", 450, &[("espresso", 1), ("milk", 200)]),
        menu_item("mocha", "Mocha", 500, &[("espresso", 1), ("milk", 150), ("chocolate", 30)]),
        menu_item("espresso", "Espresso", 250, &[("espresso", 1)]),
    ]
}

fn pantry(milk: i64, espresso: i64) -> Vec<InventoryItem> {
    vec![
        InventoryItem::new("espresso", "Espresso shot", espresso, "shot"),
        InventoryItem::new("milk", "Whole milk", milk, "ml"),
        InventoryItem::new("chocolate", "Chocolate sauce", 1000, "g"),
    ]
}

fn engine_over(orders: Arc<dyn OrderStore>, milk: i64, espresso: i64) -> Engine {
    let stores = Stores::new(
        Arc::new(InMemoryMenuStore::with_items(shop_menu())),
        Arc::new(InMemoryInventoryStore::with_items(pantry(milk, espresso))),
        orders,
    );
    Engine::new(stores, &EngineConfig::in_memory())
}

fn engine(milk: i64, espresso: i64) -> Engine {
    engine_over(Arc::new(InMemoryOrderStore::new()), milk, espresso)
}

fn order(customer: &str, menu_item_id: &str, quantity: i64) -> OrderDraft {
    OrderDraft::new(customer, vec![OrderItemDraft::new(menu_item_id, quantity)])
}

async fn on_hand(engine: &Engine, ingredient_id: &str) -> i64 {
    engine.ledger.stock_of(ingredient_id).await.unwrap().quantity
}

/// Order store that fails the Nth `create` call and delegates everything else.
struct FailingOrderStore {
    inner: InMemoryOrderStore,
    fail_on_create: usize,
    creates: AtomicUsize,
}

impl FailingOrderStore {
    fn new(fail_on_create: usize) -> Self {
        FailingOrderStore {
            inner: InMemoryOrderStore::new(),
            fail_on_create,
            creates: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl OrderStore for FailingOrderStore {
    async fn create(&self, order: &Order) -> DbResult<()> {
        let call = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on_create {
            return Err(DbError::QueryFailed("disk I/O error".to_string()));
        }
        self.inner.create(order).await
    }

    async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        self.inner.get_by_id(id).await
    }

    async fn list_all(&self) -> DbResult<Vec<Order>> {
        self.inner.list_all().await
    }

    async fn list_by_status(&self, status: OrderStatus) -> DbResult<Vec<Order>> {
        self.inner.list_by_status(status).await
    }

    async fn update_in_place(&self, order: &Order) -> DbResult<()> {
        self.inner.update_in_place(order).await
    }

    async fn remove(&self, id: &str) -> DbResult<()> {
        self.inner.remove(id).await
    }

    async fn exists_by_id(&self, id: &str) -> DbResult<bool> {
        self.inner.exists_by_id(id).await
    }

    async fn close(&self, change: &OrderStatusChange) -> DbResult<()> {
        self.inner.close(change).await
    }

    async fn status_history(&self, order_id: &str) -> DbResult<Vec<OrderStatusChange>> {
        self.inner.status_history(order_id).await
    }

    async fn ordered_item_counts(&self, range: DateRange) -> DbResult<Vec<ItemCount>> {
        self.inner.ordered_item_counts(range).await
    }

    async fn created_timestamps(&self, range: DateRange) -> DbResult<Vec<DateTime<Utc>>> {
        self.inner.created_timestamps(range).await
    }
}

// =============================================================================
// Order Lifecycle
// =============================================================================

#[tokio::test]
async fn latte_reserves_milk_until_it_runs_out() {
    let engine = engine(250, 10);

    let first = engine.lifecycle.create(order("Ada", "latte", 1)).await.unwrap();
    assert_eq!(first.total_cents, 450);
    assert_eq!(on_hand(&engine, "milk").await, 50);

    let err = engine
        .lifecycle
        .create(order("Grace", "latte", 1))
        .await
        .unwrap_err();
    assert!(err.is_insufficient_stock());
    assert_eq!(on_hand(&engine, "milk").await, 50);
    assert_eq!(on_hand(&engine, "espresso").await, 9);
}

#[tokio::test]
async fn closing_twice_fails_and_keeps_stock() {
    let engine = engine(1000, 10);
    let created = engine.lifecycle.create(order("Ada", "latte", 2)).await.unwrap();

    engine
        .lifecycle
        .close(&created.id, Some("picked up".to_string()))
        .await
        .unwrap();
    let err = engine.lifecycle.close(&created.id, None).await.unwrap_err();

    assert!(matches!(err, EngineError::Core(CoreError::AlreadyClosed(_))));
    assert_eq!(on_hand(&engine, "milk").await, 600);

    let history = engine.lifecycle.status_history(&created.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_status, OrderStatus::Active);
    assert_eq!(history[0].new_status, OrderStatus::Closed);
    assert_eq!(history[0].notes.as_deref(), Some("picked up"));
}

#[tokio::test]
async fn deleting_an_active_order_restores_stock() {
    let engine = engine(1000, 10);
    let created = engine.lifecycle.create(order("Ada", "mocha", 2)).await.unwrap();
    assert_eq!(on_hand(&engine, "chocolate").await, 940);

    engine.lifecycle.delete(&created.id).await.unwrap();

    assert_eq!(on_hand(&engine, "milk").await, 1000);
    assert_eq!(on_hand(&engine, "espresso").await, 10);
    assert_eq!(on_hand(&engine, "chocolate").await, 1000);
    assert!(engine.lifecycle.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_moves_only_the_difference() {
    let engine = engine(1000, 10);
    let created = engine.lifecycle.create(order("Ada", "latte", 2)).await.unwrap();
    assert_eq!(on_hand(&engine, "milk").await, 600);

    let updated = engine
        .lifecycle
        .update(
            &created.id,
            vec![OrderItemDraft::new("latte", 1), OrderItemDraft::new("mocha", 1)],
        )
        .await
        .unwrap();

    assert_eq!(updated.total_cents, 950);
    assert_eq!(on_hand(&engine, "milk").await, 650);
    assert_eq!(on_hand(&engine, "espresso").await, 8);
    assert_eq!(on_hand(&engine, "chocolate").await, 970);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_customers_race_for_the_last_shot() {
    let engine = engine(1000, 1);
    let a = engine.clone();
    let b = engine.clone();

    let (first, second) = tokio::join!(
        tokio::spawn(async move { a.lifecycle.create(order("Ada", "espresso", 1)).await }),
        tokio::spawn(async move { b.lifecycle.create(order("Grace", "espresso", 1)).await }),
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    let won = outcomes.iter().filter(|r| r.is_ok()).count();
    let short = outcomes
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_insufficient_stock()))
        .count();
    assert_eq!((won, short), (1, 1));
    assert_eq!(on_hand(&engine, "espresso").await, 0);
}

#[tokio::test]
async fn legacy_product_id_payload_is_accepted() {
    let engine = engine(1000, 10);
    let draft: OrderDraft = serde_json::from_str(
        r#"{"customer_name": "Ada",
            "items": [{"product_id": "latte", "quantity": 1,
                       "customization": {"milk": "oat"}}]}"#,
    )
    .unwrap();

    let created = engine.lifecycle.create(draft).await.unwrap();
    assert_eq!(created.items[0].menu_item_id, "latte");
    assert_eq!(created.items[0].customization.as_ref().unwrap()["milk"], "oat");
}

// =============================================================================
// Batch
// =============================================================================

#[tokio::test]
async fn batch_rejects_only_the_order_that_does_not_fit() {
    let engine = engine(500, 10);

    let result = engine
        .batch
        .process_batch(vec![
            order("Ada", "latte", 1),
            order("Grace", "latte", 2),
            order("Linus", "espresso", 1),
        ])
        .await
        .unwrap();

    let statuses: Vec<_> = result.processed_orders.iter().map(|p| p.status).collect();
    assert_eq!(
        statuses,
        vec![
            ProcessedStatus::Accepted,
            ProcessedStatus::Rejected,
            ProcessedStatus::Accepted
        ]
    );
    assert_eq!(
        result.processed_orders[1].reason.as_deref(),
        Some("insufficient_inventory")
    );
    assert!(result.processed_orders[1].order_id.is_none());

    let active = engine.lifecycle.list_by_status(OrderStatus::Active).await.unwrap();
    let active_customers: Vec<_> = active.iter().map(|o| o.customer_name.as_str()).collect();
    assert_eq!(active_customers, vec!["Ada", "Linus"]);

    let summary = &result.summary;
    assert_eq!((summary.total_orders, summary.accepted, summary.rejected), (3, 2, 1));
    assert_eq!(summary.total_revenue.cents(), 700);

    let milk = summary
        .inventory_updates
        .iter()
        .find(|u| u.ingredient_id == "milk")
        .unwrap();
    assert_eq!((milk.quantity_used, milk.remaining), (200, 300));
    let espresso = summary
        .inventory_updates
        .iter()
        .find(|u| u.ingredient_id == "espresso")
        .unwrap();
    assert_eq!((espresso.quantity_used, espresso.remaining), (2, 8));
}

#[tokio::test]
async fn batch_failure_rolls_back_accepted_orders() {
    let engine = engine_over(Arc::new(FailingOrderStore::new(3)), 1000, 10);

    let err = engine
        .batch
        .process_batch(vec![
            order("Ada", "latte", 1),
            order("Grace", "mocha", 1),
            order("Linus", "espresso", 1),
        ])
        .await
        .unwrap_err();

    match err {
        EngineError::BatchAborted { position, source } => {
            assert_eq!(position, 2);
            assert!(matches!(*source, EngineError::Storage(_)));
        }
        other => panic!("expected BatchAborted, got {other:?}"),
    }

    assert!(engine.lifecycle.list().await.unwrap().is_empty());
    assert_eq!(on_hand(&engine, "milk").await, 1000);
    assert_eq!(on_hand(&engine, "espresso").await, 10);
    assert_eq!(on_hand(&engine, "chocolate").await, 1000);
}

#[tokio::test]
async fn batch_with_unknown_item_aborts() {
    let engine = engine(1000, 10);

    let err = engine
        .batch
        .process_batch(vec![order("Ada", "latte", 1), order("Grace", "unicorn", 1)])
        .await
        .unwrap_err();

    match err {
        EngineError::BatchAborted { position, source } => {
            assert_eq!(position, 1);
            assert!(source.is_validation());
        }
        other => panic!("expected BatchAborted, got {other:?}"),
    }
    assert_eq!(on_hand(&engine, "milk").await, 1000);
}

#[tokio::test]
async fn oversize_batch_is_refused_up_front() {
    let mut config = EngineConfig::in_memory();
    config.batch.max_batch_size = 2;
    let stores = Stores::new(
        Arc::new(InMemoryMenuStore::with_items(shop_menu())),
        Arc::new(InMemoryInventoryStore::with_items(pantry(1000, 10))),
        Arc::new(InMemoryOrderStore::new()),
    );
    let engine = Engine::new(stores, &config);

    let err = engine
        .batch
        .process_batch(vec![order("A", "espresso", 1); 3])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
    ));
    assert_eq!(on_hand(&engine, "espresso").await, 10);
}

// =============================================================================
// Sales and Reports
// =============================================================================

#[tokio::test]
async fn popular_items_count_closed_orders_only() {
    let engine = engine(5000, 20);

    let mixed = engine
        .lifecycle
        .create(OrderDraft::new(
            "Ada",
            vec![OrderItemDraft::new("latte", 3), OrderItemDraft::new("mocha", 1)],
        ))
        .await
        .unwrap();
    let lattes = engine.lifecycle.create(order("Grace", "latte", 2)).await.unwrap();
    engine.lifecycle.create(order("Linus", "espresso", 3)).await.unwrap();
    engine.lifecycle.close(&mixed.id, None).await.unwrap();
    engine.lifecycle.close(&lattes.id, None).await.unwrap();

    let popular = engine.sales.popular_items().await.unwrap();
    assert_eq!(
        popular,
        vec![
            PopularItem {
                menu_item_id: "latte".to_string(),
                quantity: 5
            },
            PopularItem {
                menu_item_id: "mocha".to_string(),
                quantity: 1
            },
        ]
    );
    assert_eq!(engine.sales.total_sales().await.unwrap().cents(), 2750);
}

#[tokio::test]
async fn total_sales_fails_when_a_sold_item_left_the_menu() {
    let engine = engine(1000, 10);
    let sold = engine.lifecycle.create(order("Ada", "mocha", 1)).await.unwrap();
    engine.lifecycle.close(&sold.id, None).await.unwrap();

    engine.catalog.remove("mocha").await.unwrap();

    let err = engine.sales.total_sales().await.unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::MenuItemNotFound(ref id)) if id == "mocha"));
}

#[tokio::test]
async fn total_sales_follow_a_menu_price_change() {
    let engine = engine(1000, 10);
    let sold = engine.lifecycle.create(order("Ada", "latte", 2)).await.unwrap();
    engine.lifecycle.close(&sold.id, None).await.unwrap();
    assert_eq!(engine.sales.total_sales().await.unwrap().cents(), 900);

    let mut dearer = engine.catalog.get("latte").await.unwrap();
    dearer.price_cents = 500;
    engine.catalog.update(&dearer).await.unwrap();

    assert_eq!(engine.sales.total_sales().await.unwrap().cents(), 1000);
    // The closed order itself keeps its snapshot
    assert_eq!(engine.lifecycle.get(&sold.id).await.unwrap().total_cents, 900);
}

#[tokio::test]
async fn reports_group_orders_by_day_and_month() {
    let engine = engine(1000, 10);
    engine.lifecycle.create(order("Ada", "latte", 2)).await.unwrap();
    let closed = engine.lifecycle.create(order("Grace", "espresso", 1)).await.unwrap();
    engine.lifecycle.close(&closed.id, None).await.unwrap();

    let now = Utc::now();

    let by_month = engine.reports.orders_by_month(now.year()).await.unwrap();
    assert_eq!(by_month.period, Period::Month);
    assert_eq!(by_month.counts.len(), 1);
    assert_eq!(by_month.counts[0].key, now.month());
    assert_eq!(by_month.counts[0].orders, 2);

    let by_day = engine
        .reports
        .orders_by_day(now.year(), now.month())
        .await
        .unwrap();
    assert_eq!(by_day.counts.iter().map(|c| c.orders).sum::<i64>(), 2);

    let counts = engine.reports.ordered_item_counts(None, None).await.unwrap();
    assert_eq!(counts[0].menu_item_id, "latte");
    assert_eq!(counts[0].name.as_deref(), Some("Latte"));
    assert_eq!(counts[0].quantity, 2);

    let err = engine.reports.orders_by_day(now.year(), 13).await.unwrap_err();
    assert!(err.is_validation());
}

// =============================================================================
// SQLite Backend
// =============================================================================

#[tokio::test]
async fn sqlite_backend_reserves_and_releases_like_memory() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let engine = Engine::new(Stores::sqlite(&db), &EngineConfig::default());

    for item in pantry(250, 10) {
        engine.ledger.register(&item).await.unwrap();
    }
    for item in shop_menu() {
        engine.catalog.add(&item).await.unwrap();
    }

    let first = engine.lifecycle.create(order("Ada", "latte", 1)).await.unwrap();
    assert_eq!(on_hand(&engine, "milk").await, 50);

    let err = engine
        .lifecycle
        .create(order("Grace", "latte", 1))
        .await
        .unwrap_err();
    assert!(err.is_insufficient_stock());
    assert_eq!(on_hand(&engine, "espresso").await, 9);

    engine.lifecycle.delete(&first.id).await.unwrap();
    assert_eq!(on_hand(&engine, "milk").await, 250);

    let again = engine.lifecycle.create(order("Grace", "latte", 1)).await.unwrap();
    let closed = engine.lifecycle.close(&again.id, None).await.unwrap();
    assert_eq!(closed.status, OrderStatus::Closed);
    assert_eq!(
        engine.lifecycle.get(&again.id).await.unwrap().status,
        OrderStatus::Closed
    );
    assert_eq!(engine.sales.total_sales().await.unwrap().cents(), 450);

    db.close().await;
}

#[tokio::test]
async fn sqlite_delete_releases_what_was_reserved_after_menu_change() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let engine = Engine::new(Stores::sqlite(&db), &EngineConfig::default());

    for item in pantry(250, 10) {
        engine.ledger.register(&item).await.unwrap();
    }
    for item in shop_menu() {
        engine.catalog.add(&item).await.unwrap();
    }

    let held = engine.lifecycle.create(order("Ada", "latte", 1)).await.unwrap();
    assert_eq!(on_hand(&engine, "milk").await, 50);
    assert_eq!(engine.lifecycle.get(&held.id).await.unwrap().reserved, held.reserved);

    engine.catalog.remove("latte").await.unwrap();
    engine.lifecycle.delete(&held.id).await.unwrap();

    assert_eq!(on_hand(&engine, "milk").await, 250);
    assert_eq!(on_hand(&engine, "espresso").await, 10);

    db.close().await;
}

/// A throwaway WAL database file, removed with its side files on drop.
struct ScratchDb(std::path::PathBuf);

impl ScratchDb {
    fn new() -> Self {
        ScratchDb(std::env::temp_dir().join(format!("brew-{}.db", uuid::Uuid::new_v4())))
    }
}

impl Drop for ScratchDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.0.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_file_backend_never_oversells_under_concurrent_creates() {
    let scratch = ScratchDb::new();
    let db = Database::new(DbConfig::new(&scratch.0).pool_size(4))
        .await
        .unwrap();
    let engine = Engine::new(Stores::sqlite(&db), &EngineConfig::default());

    for item in pantry(1000, 3) {
        engine.ledger.register(&item).await.unwrap();
    }
    for item in shop_menu() {
        engine.catalog.add(&item).await.unwrap();
    }

    let customers = ["Ada", "Grace", "Linus", "Barbara", "Ken", "Dennis", "Margaret", "Alan"];
    let handles: Vec<_> = customers
        .iter()
        .map(|customer| {
            let engine = engine.clone();
            let draft = order(customer, "espresso", 1);
            tokio::spawn(async move { engine.lifecycle.create(draft).await })
        })
        .collect();

    let mut won = 0;
    let mut short = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(e) if e.is_insufficient_stock() => short += 1,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    assert_eq!((won, short), (3, 5));
    assert_eq!(on_hand(&engine, "espresso").await, 0);
    assert_eq!(engine.lifecycle.list().await.unwrap().len(), 3);

    db.close().await;
}
