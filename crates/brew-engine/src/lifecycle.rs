//! # Order Lifecycle
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │   create ──► ACTIVE ──── close ────► CLOSED                            │
//! │    │          │  ▲                      │                               │
//! │    │          │  └── update             ├── close  → AlreadyClosed     │
//! │    │          │                         ├── update → OrderClosed       │
//! │    │          └── delete ──► (gone)     └── delete → OrderClosed       │
//! │    │                                                                    │
//! │    └── validate → snapshot price → reserve_if_available → persist      │
//! │                                                                         │
//! │  Stock moves on create (reserve), update (rebalance) and delete        │
//! │  (release). Close never touches stock. The order stores what it        │
//! │  reserved; update and delete move exactly that, whatever the menu      │
//! │  says by then.                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure After Reservation
//! If persisting fails after stock moved, the stock move is undone before the
//! error is returned. A failed undo is logged at `error!` and the original
//! error still wins. Delete removes the record first and releases after, so
//! a failed remove never leaves stock handed out twice.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use brew_core::pricing::price_items;
use brew_core::recipe::requirements_for;
use brew_core::validation::{validate_order, validate_order_update};
use brew_core::{
    CoreError, Order, OrderDraft, OrderItemDraft, OrderLimits, OrderStatus, OrderStatusChange,
};
use brew_db::OrderStore;

use crate::catalog::MenuCatalog;
use crate::error::EngineResult;
use crate::ledger::InventoryLedger;
use crate::locks::OrderLocks;

/// Drives orders through create, update, close and delete.
#[derive(Clone)]
pub struct OrderLifecycle {
    catalog: MenuCatalog,
    ledger: InventoryLedger,
    orders: Arc<dyn OrderStore>,
    limits: OrderLimits,
    locks: Arc<OrderLocks>,
}

impl OrderLifecycle {
    pub fn new(
        catalog: MenuCatalog,
        ledger: InventoryLedger,
        orders: Arc<dyn OrderStore>,
        limits: OrderLimits,
    ) -> Self {
        OrderLifecycle {
            catalog,
            ledger,
            orders,
            limits,
            locks: Arc::new(OrderLocks::new()),
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Validates, prices, reserves stock for and persists a new order.
    ///
    /// The returned order carries exactly what was reserved in `reserved`.
    ///
    /// ## Errors
    /// - `Validation` for a malformed draft (nothing reserved)
    /// - `InsufficientStock` / `UnknownIngredient` from the reservation
    ///   (nothing reserved)
    /// - `Storage` if persisting failed (reservation released)
    pub async fn create(&self, draft: OrderDraft) -> EngineResult<Order> {
        let snapshot = self.catalog.snapshot_for(&menu_item_ids(&draft.items)).await?;

        validate_order(&draft, &snapshot, &self.limits)?;
        let requirements = requirements_for(&draft.items, &snapshot)?;
        let priced = price_items(&draft.items, &snapshot)?;

        self.ledger.reserve_if_available(&requirements).await?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            customer_name: draft.customer_name.trim().to_string(),
            items: priced.items,
            status: OrderStatus::Active,
            total_cents: priced.total.cents(),
            created_at: now,
            updated_at: now,
            last_status_change: now,
            reserved: requirements,
        };

        if let Err(e) = self.orders.create(&order).await {
            if let Err(undo) = self.ledger.release(&order.reserved).await {
                error!(order_id = %order.id, error = %undo, "Failed to release stock after failed create");
            }
            return Err(e.into());
        }

        info!(
            order_id = %order.id,
            customer = %order.customer_name,
            total = %order.total(),
            "Order created"
        );
        Ok(order)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// ## Errors
    /// `OrderNotFound` if no order has this id.
    pub async fn get(&self, id: &str) -> EngineResult<Order> {
        self.orders
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()).into())
    }

    /// All orders, oldest first.
    pub async fn list(&self) -> EngineResult<Vec<Order>> {
        Ok(self.orders.list_all().await?)
    }

    pub async fn list_by_status(&self, status: OrderStatus) -> EngineResult<Vec<Order>> {
        Ok(self.orders.list_by_status(status).await?)
    }

    /// Recorded status changes of an order, oldest first.
    pub async fn status_history(&self, id: &str) -> EngineResult<Vec<OrderStatusChange>> {
        if !self.orders.exists_by_id(id).await? {
            return Err(CoreError::OrderNotFound(id.to_string()).into());
        }
        Ok(self.orders.status_history(id).await?)
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Replaces an active order's lines.
    ///
    /// All lines are re-priced at current menu prices. Stock moves by the
    /// difference between what the order holds and what the new lines need.
    pub async fn update(&self, id: &str, items: Vec<OrderItemDraft>) -> EngineResult<Order> {
        let _guard = self.locks.acquire(id).await;

        let current = self.get(id).await?;
        if current.is_closed() {
            return Err(CoreError::OrderClosed(id.to_string()).into());
        }

        let snapshot = self.catalog.snapshot_for(&menu_item_ids(&items)).await?;

        validate_order_update(&current.customer_name, &items, &snapshot, &self.limits)?;
        let next = requirements_for(&items, &snapshot)?;
        let priced = price_items(&items, &snapshot)?;

        self.ledger.rebalance(&current.reserved, &next).await?;

        let previous = current.reserved.clone();
        let updated = Order {
            items: priced.items,
            total_cents: priced.total.cents(),
            updated_at: Utc::now(),
            reserved: next,
            ..current
        };

        if let Err(e) = self.orders.update_in_place(&updated).await {
            if let Err(undo) = self.ledger.rebalance(&updated.reserved, &previous).await {
                error!(order_id = %id, error = %undo, "Failed to revert stock after failed update");
            }
            return Err(e.into());
        }

        info!(order_id = %id, total = %updated.total(), "Order updated");
        Ok(updated)
    }

    // =========================================================================
    // Close
    // =========================================================================

    /// Finalizes an active order. Stock is not touched.
    ///
    /// ## Errors
    /// - `OrderNotFound`
    /// - `AlreadyClosed` if the order was closed before
    pub async fn close(&self, id: &str, notes: Option<String>) -> EngineResult<Order> {
        let _guard = self.locks.acquire(id).await;

        let current = self.get(id).await?;
        if current.is_closed() {
            return Err(CoreError::AlreadyClosed(id.to_string()).into());
        }

        let now = Utc::now();
        let change = OrderStatusChange {
            id: Uuid::new_v4().to_string(),
            order_id: id.to_string(),
            old_status: current.status,
            new_status: OrderStatus::Closed,
            notes,
            changed_at: now,
        };
        self.orders.close(&change).await?;

        info!(order_id = %id, total = %current.total(), "Order closed");
        Ok(Order {
            status: OrderStatus::Closed,
            updated_at: now,
            last_status_change: now,
            ..current
        })
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Removes an active order, then gives back exactly the stock it held.
    ///
    /// ## Errors
    /// - `OrderNotFound`
    /// - `OrderClosed` if the order is closed
    /// - the release error if the order is gone but its stock could not be
    ///   returned (logged at `error!`)
    pub async fn delete(&self, id: &str) -> EngineResult<()> {
        let _guard = self.locks.acquire(id).await;

        let current = self.get(id).await?;
        if current.is_closed() {
            return Err(CoreError::OrderClosed(id.to_string()).into());
        }

        self.remove_and_release(&current).await?;
        info!(order_id = %id, "Order deleted");
        Ok(())
    }

    /// Removes an order created moments ago and gives its reservation back.
    /// Batch rollback only.
    pub(crate) async fn discard(&self, order: &Order) -> EngineResult<()> {
        let _guard = self.locks.acquire(&order.id).await;

        // A concurrent update may have moved the reservation since create
        let current = self.get(&order.id).await?;
        self.remove_and_release(&current).await?;
        warn!(order_id = %order.id, "Order rolled back");
        Ok(())
    }

    async fn remove_and_release(&self, order: &Order) -> EngineResult<()> {
        self.orders.remove(&order.id).await?;

        if let Err(e) = self.ledger.release(&order.reserved).await {
            error!(
                order_id = %order.id,
                error = %e,
                reserved = ?order.reserved,
                "Order removed but its stock could not be released"
            );
            return Err(e);
        }
        Ok(())
    }
}

fn menu_item_ids(items: &[OrderItemDraft]) -> Vec<String> {
    items.iter().map(|i| i.menu_item_id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use brew_core::{IngredientLine, InventoryItem, MenuItem, RecipeLine};
    use brew_db::{
        DateRange, DbError, DbResult, InMemoryInventoryStore, InMemoryMenuStore,
        InMemoryOrderStore, ItemCount,
    };
    use chrono::{DateTime, Utc};
    use std::time::Duration;

    struct Fixture {
        lifecycle: OrderLifecycle,
        catalog: MenuCatalog,
        ledger: InventoryLedger,
    }

    fn fixture(milk: i64) -> Fixture {
        fixture_with_orders(milk, Arc::new(InMemoryOrderStore::new()))
    }

    fn fixture_with_orders(milk: i64, orders: Arc<dyn OrderStore>) -> Fixture {
        let menu = Arc::new(InMemoryMenuStore::with_items([
            MenuItem {
                id: "latte".to_string(),
                name: "Latte".to_string(),
                description: "Espresso and steamed milk".to_string(),
                price_cents: 450,
                ingredients: vec![RecipeLine::new("espresso", 1), RecipeLine::new("milk", 200)],
            },
            MenuItem {
                id: "espresso".to_string(),
                name: "Espresso".to_string(),
                description: "A single shot".to_string(),
                price_cents: 250,
                ingredients: vec![RecipeLine::new("espresso", 1)],
            },
        ]));
        let inventory = Arc::new(InMemoryInventoryStore::with_items([
            InventoryItem::new("espresso", "Espresso shot", 20, "shot"),
            InventoryItem::new("milk", "Whole milk", milk, "ml"),
        ]));
        let ledger = InventoryLedger::new(inventory);
        let catalog = MenuCatalog::new(menu);
        let lifecycle = OrderLifecycle::new(
            catalog.clone(),
            ledger.clone(),
            orders,
            OrderLimits::default(),
        );
        Fixture {
            lifecycle,
            catalog,
            ledger,
        }
    }

    /// Order store whose `remove` always fails.
    struct StuckOrderStore(InMemoryOrderStore);

    #[async_trait]
    impl OrderStore for StuckOrderStore {
        async fn create(&self, order: &Order) -> DbResult<()> {
            self.0.create(order).await
        }
        async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
            self.0.get_by_id(id).await
        }
        async fn list_all(&self) -> DbResult<Vec<Order>> {
            self.0.list_all().await
        }
        async fn list_by_status(&self, status: OrderStatus) -> DbResult<Vec<Order>> {
            self.0.list_by_status(status).await
        }
        async fn update_in_place(&self, order: &Order) -> DbResult<()> {
            self.0.update_in_place(order).await
        }
        async fn remove(&self, _id: &str) -> DbResult<()> {
            Err(DbError::QueryFailed("database is locked".to_string()))
        }
        async fn exists_by_id(&self, id: &str) -> DbResult<bool> {
            self.0.exists_by_id(id).await
        }
        async fn close(&self, change: &OrderStatusChange) -> DbResult<()> {
            self.0.close(change).await
        }
        async fn status_history(&self, order_id: &str) -> DbResult<Vec<OrderStatusChange>> {
            self.0.status_history(order_id).await
        }
        async fn ordered_item_counts(&self, range: DateRange) -> DbResult<Vec<ItemCount>> {
            self.0.ordered_item_counts(range).await
        }
        async fn created_timestamps(&self, range: DateRange) -> DbResult<Vec<DateTime<Utc>>> {
            self.0.created_timestamps(range).await
        }
    }

    async fn milk(f: &Fixture) -> i64 {
        f.ledger.stock_of("milk").await.unwrap().quantity
    }

    fn lattes(n: i64) -> OrderDraft {
        OrderDraft::new("Ada", vec![OrderItemDraft::new("latte", n)])
    }

    #[tokio::test]
    async fn test_create_prices_and_reserves() {
        let f = fixture(1000);
        let order = f.lifecycle.create(lattes(2)).await.unwrap();

        assert_eq!(order.status, OrderStatus::Active);
        assert_eq!(order.total_cents, 900);
        assert_eq!(order.items[0].price_cents, 450);
        assert_eq!(
            order.reserved,
            vec![IngredientLine::new("espresso", 2), IngredientLine::new("milk", 400)]
        );
        assert_eq!(milk(&f).await, 600);
    }

    #[tokio::test]
    async fn test_invalid_draft_reserves_nothing() {
        let f = fixture(1000);
        let err = f
            .lifecycle
            .create(OrderDraft::new("  ", vec![OrderItemDraft::new("latte", 1)]))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(milk(&f).await, 1000);
    }

    #[tokio::test]
    async fn test_preset_closed_status_is_refused() {
        let f = fixture(1000);
        let mut draft = lattes(1);
        draft.status = Some(OrderStatus::Closed);
        assert!(f.lifecycle.create(draft).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_update_reserves_only_the_delta() {
        let f = fixture(1000);
        let order = f.lifecycle.create(lattes(1)).await.unwrap();
        assert_eq!(milk(&f).await, 800);

        let updated = f
            .lifecycle
            .update(&order.id, vec![OrderItemDraft::new("latte", 3)])
            .await
            .unwrap();
        assert_eq!(updated.total_cents, 1350);
        assert_eq!(milk(&f).await, 400);

        f.lifecycle
            .update(&order.id, vec![OrderItemDraft::new("espresso", 1)])
            .await
            .unwrap();
        assert_eq!(milk(&f).await, 1000);
    }

    #[tokio::test]
    async fn test_update_beyond_stock_leaves_order_and_stock() {
        let f = fixture(500);
        let order = f.lifecycle.create(lattes(1)).await.unwrap();

        let err = f
            .lifecycle
            .update(&order.id, vec![OrderItemDraft::new("latte", 5)])
            .await
            .unwrap_err();
        assert!(err.is_insufficient_stock());
        assert_eq!(milk(&f).await, 300);
        assert_eq!(f.lifecycle.get(&order.id).await.unwrap().items[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_close_twice_and_closed_transitions() {
        let f = fixture(1000);
        let order = f.lifecycle.create(lattes(1)).await.unwrap();

        let closed = f.lifecycle.close(&order.id, None).await.unwrap();
        assert_eq!(closed.status, OrderStatus::Closed);
        assert_eq!(closed.snapshot_total(), closed.total());

        let err = f.lifecycle.close(&order.id, None).await.unwrap_err();
        assert!(matches!(err, crate::EngineError::Core(CoreError::AlreadyClosed(_))));

        let err = f.lifecycle.delete(&order.id).await.unwrap_err();
        assert!(matches!(err, crate::EngineError::Core(CoreError::OrderClosed(_))));

        let err = f
            .lifecycle
            .update(&order.id, vec![OrderItemDraft::new("latte", 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, crate::EngineError::Core(CoreError::OrderClosed(_))));

        // Reserved at create, never touched again
        assert_eq!(milk(&f).await, 800);
        assert_eq!(f.lifecycle.status_history(&order.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_restores_stock() {
        let f = fixture(1000);
        let order = f.lifecycle.create(lattes(2)).await.unwrap();
        f.lifecycle.delete(&order.id).await.unwrap();

        assert_eq!(milk(&f).await, 1000);
        let err = f.lifecycle.get(&order.id).await.unwrap_err();
        assert!(matches!(err, crate::EngineError::Core(CoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_after_menu_item_removed_restores_stock() {
        let f = fixture(250);
        let order = f.lifecycle.create(lattes(1)).await.unwrap();
        assert_eq!(milk(&f).await, 50);

        f.catalog.remove("latte").await.unwrap();
        f.lifecycle.delete(&order.id).await.unwrap();

        assert_eq!(milk(&f).await, 250);
    }

    #[tokio::test]
    async fn test_recipe_change_does_not_skew_release() {
        let f = fixture(1000);
        let order = f.lifecycle.create(lattes(2)).await.unwrap();
        assert_eq!(milk(&f).await, 600);

        let mut lighter = f.catalog.get("latte").await.unwrap();
        lighter.ingredients = vec![RecipeLine::new("espresso", 1), RecipeLine::new("milk", 50)];
        f.catalog.update(&lighter).await.unwrap();

        // Rebalance starts from the 400 ml held, not today's 100
        let updated = f
            .lifecycle
            .update(&order.id, vec![OrderItemDraft::new("latte", 4)])
            .await
            .unwrap();
        assert_eq!(updated.reserved[1], IngredientLine::new("milk", 200));
        assert_eq!(milk(&f).await, 800);

        f.lifecycle.delete(&order.id).await.unwrap();
        assert_eq!(milk(&f).await, 1000);
    }

    #[tokio::test]
    async fn test_update_can_drop_a_removed_menu_item() {
        let f = fixture(1000);
        let order = f.lifecycle.create(lattes(1)).await.unwrap();
        f.catalog.remove("latte").await.unwrap();

        f.lifecycle
            .update(&order.id, vec![OrderItemDraft::new("espresso", 1)])
            .await
            .unwrap();
        assert_eq!(milk(&f).await, 1000);
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_stock_reserved() {
        let f = fixture_with_orders(1000, Arc::new(StuckOrderStore(InMemoryOrderStore::new())));
        let order = f.lifecycle.create(lattes(2)).await.unwrap();

        let err = f.lifecycle.delete(&order.id).await.unwrap_err();
        assert!(matches!(err, crate::EngineError::Storage(DbError::QueryFailed(_))));

        // Nothing was released, so nothing has to be taken back
        assert_eq!(milk(&f).await, 600);
        assert!(f.lifecycle.get(&order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_lock_entries_do_not_outlive_calls() {
        let f = fixture(1000);
        let order = f.lifecycle.create(lattes(1)).await.unwrap();
        let other = f.lifecycle.create(lattes(1)).await.unwrap();

        f.lifecycle
            .update(&order.id, vec![OrderItemDraft::new("latte", 2)])
            .await
            .unwrap();
        f.lifecycle.close(&order.id, None).await.unwrap();
        f.lifecycle.close(&order.id, None).await.unwrap_err();
        f.lifecycle.delete(&other.id).await.unwrap();
        f.lifecycle.close("nope", None).await.unwrap_err();

        assert_eq!(f.lifecycle.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_discard_waits_for_the_order_lock() {
        let f = fixture(1000);
        let order = f.lifecycle.create(lattes(2)).await.unwrap();
        f.lifecycle
            .update(&order.id, vec![OrderItemDraft::new("latte", 1)])
            .await
            .unwrap();
        assert_eq!(milk(&f).await, 800);

        let held = f.lifecycle.locks.acquire(&order.id).await;
        let discard = {
            let lifecycle = f.lifecycle.clone();
            let order = order.clone();
            tokio::spawn(async move { lifecycle.discard(&order).await })
        };
        tokio::task::yield_now().await;
        assert!(!discard.is_finished());
        drop(held);

        tokio::time::timeout(Duration::from_secs(1), discard)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        // The stale create-time reservation said 400 ml; the order held 200
        assert_eq!(milk(&f).await, 1000);
        assert!(f.lifecycle.get(&order.id).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let f = fixture(1000);
        for err in [
            f.lifecycle.close("nope", None).await.unwrap_err(),
            f.lifecycle.delete("nope").await.unwrap_err(),
            f.lifecycle.status_history("nope").await.unwrap_err(),
        ] {
            assert!(matches!(err, crate::EngineError::Core(CoreError::OrderNotFound(_))));
        }
    }
}
