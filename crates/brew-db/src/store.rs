//! # Store Traits
//!
//! The three storage collaborators the engine is written against.
//!
//! ## Backends
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 One capability set per store                            │
//! │                                                                         │
//! │               MenuStore      InventoryStore      OrderStore            │
//! │                   ▲                ▲                  ▲                 │
//! │        ┌──────────┴───┐   ┌────────┴─────┐   ┌────────┴──────┐          │
//! │        │              │   │              │   │               │          │
//! │  MenuRepository  InMemory  InventoryRepo  InMemory  OrderRepo  InMemory │
//! │    (SQLite)       Menu      (SQLite)      Inventory  (SQLite)   Order   │
//! │                                                                         │
//! │  The engine holds Arc<dyn ...Store>; the backend is picked once at     │
//! │  composition time.                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity Contract
//! [`InventoryStore::apply_adjustments`] is all-or-nothing across the whole
//! adjustment set, and every decrement is conditional on the quantity
//! available *at commit time*. No caller can split the check from the write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use brew_core::recipe::{to_adjustments, DeltaSign};
use brew_core::{
    IngredientLine, InventoryItem, MenuItem, Money, Order, OrderStatus, OrderStatusChange,
    StockAdjustment,
};

use crate::error::DbResult;

// =============================================================================
// Shared Query Types
// =============================================================================

/// Inclusive creation-time window. `None` on either side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        DateRange { start, end }
    }

    /// Every timestamp.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| *ts >= start) && self.end.map_or(true, |end| *ts <= end)
    }
}

/// Units ordered of one menu item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCount {
    pub menu_item_id: String,
    pub quantity: i64,
}

// =============================================================================
// Menu Store
// =============================================================================

/// Menu items and their recipes. Read path only as far as orders go.
#[async_trait]
pub trait MenuStore: Send + Sync {
    async fn get_by_id(&self, id: &str) -> DbResult<Option<MenuItem>>;

    async fn list_all(&self) -> DbResult<Vec<MenuItem>>;

    /// Current price of a menu item.
    async fn price_of(&self, id: &str) -> DbResult<Option<Money>> {
        Ok(self.get_by_id(id).await?.map(|item| item.price()))
    }

    /// Adds a menu item with its recipe. Fails with `UniqueViolation` on a
    /// duplicate id.
    async fn insert(&self, item: &MenuItem) -> DbResult<()>;

    /// Replaces name, description, price and recipe of an existing item.
    /// `NotFound` if no item has `item.id`.
    async fn update(&self, item: &MenuItem) -> DbResult<()>;

    /// Removes a menu item. Orders keep their lines; the reference goes weak.
    async fn delete(&self, id: &str) -> DbResult<()>;
}

// =============================================================================
// Inventory Store
// =============================================================================

/// Ingredient stock.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn list_all(&self) -> DbResult<Vec<InventoryItem>>;

    async fn get_by_id(&self, ingredient_id: &str) -> DbResult<Option<InventoryItem>>;

    /// Registers a new ingredient.
    async fn insert(&self, item: &InventoryItem) -> DbResult<()>;

    /// Renames an ingredient or changes its unit. Quantity only moves
    /// through [`apply_adjustments`](Self::apply_adjustments).
    /// `NotFound` if the ingredient isn't tracked.
    async fn update_details(&self, ingredient_id: &str, name: &str, unit: &str) -> DbResult<()>;

    /// Stops tracking an ingredient. `NotFound` if it isn't tracked.
    async fn delete(&self, ingredient_id: &str) -> DbResult<()>;

    /// True iff every ingredient exists with at least the required quantity.
    ///
    /// A point-in-time answer; it reserves nothing.
    async fn check_sufficiency(&self, lines: &[IngredientLine]) -> DbResult<bool>;

    /// Applies signed stock changes as one atomic unit.
    ///
    /// ## Errors
    /// - `DbError::InsufficientStock` if any decrement exceeds the quantity
    ///   on hand at commit time
    /// - `DbError::UnknownIngredient` if any ingredient has no row
    ///
    /// On error nothing from this call is applied.
    async fn apply_adjustments(&self, adjustments: &[StockAdjustment]) -> DbResult<()>;

    /// Applies requirement lines in one direction.
    async fn apply_delta(&self, lines: &[IngredientLine], sign: DeltaSign) -> DbResult<()> {
        self.apply_adjustments(&to_adjustments(lines, sign)).await
    }
}

// =============================================================================
// Order Store
// =============================================================================

/// Orders, their lines and their status history.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order with its lines.
    async fn create(&self, order: &Order) -> DbResult<()>;

    async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>>;

    /// All orders, oldest first.
    async fn list_all(&self) -> DbResult<Vec<Order>>;

    /// Orders in one status, oldest first.
    async fn list_by_status(&self, status: OrderStatus) -> DbResult<Vec<Order>>;

    /// Replaces customer name, lines, total, reservation and `updated_at`
    /// of an active order. `NotFound` if no active order has this id.
    async fn update_in_place(&self, order: &Order) -> DbResult<()>;

    /// Deletes an active order and its lines.
    async fn remove(&self, id: &str) -> DbResult<()>;

    async fn exists_by_id(&self, id: &str) -> DbResult<bool>;

    /// Marks an active order closed and records `change`, atomically.
    async fn close(&self, change: &OrderStatusChange) -> DbResult<()>;

    /// Status changes of one order, oldest first.
    async fn status_history(&self, order_id: &str) -> DbResult<Vec<OrderStatusChange>>;

    /// Units ordered per menu item over orders created within `range`,
    /// highest first. All statuses count.
    async fn ordered_item_counts(&self, range: DateRange) -> DbResult<Vec<ItemCount>>;

    /// Creation timestamps of orders within `range`, for period grouping.
    async fn created_timestamps(&self, range: DateRange) -> DbResult<Vec<DateTime<Utc>>>;
}

// =============================================================================
// Helpers shared by backends
// =============================================================================

/// Serializes a customization payload for a TEXT column.
pub(crate) fn encode_customization(value: &Option<Value>) -> DbResult<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(Into::into)
}

/// Reads a customization payload back from a TEXT column.
pub(crate) fn decode_customization(raw: Option<String>) -> DbResult<Option<Value>> {
    raw.as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(Into::into)
}

/// Sorts item counts highest first, then by id for a stable order.
pub(crate) fn rank_counts(counts: &mut [ItemCount]) {
    counts.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.menu_item_id.cmp(&b.menu_item_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_range_contains() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 31, 23, 59, 59).unwrap();
        let range = DateRange::new(Some(start), Some(end));

        assert!(range.contains(&start));
        assert!(range.contains(&end));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()));
        assert!(DateRange::unbounded().contains(&Utc::now()));
    }

    #[test]
    fn test_customization_round_trip_through_text() {
        let value = Some(serde_json::json!({"syrup": "vanilla"}));
        let text = encode_customization(&value).unwrap();
        assert_eq!(decode_customization(text).unwrap(), value);
        assert_eq!(encode_customization(&None).unwrap(), None);
    }

    #[test]
    fn test_rank_counts() {
        let mut counts = vec![
            ItemCount {
                menu_item_id: "mocha".into(),
                quantity: 1,
            },
            ItemCount {
                menu_item_id: "latte".into(),
                quantity: 5,
            },
            ItemCount {
                menu_item_id: "americano".into(),
                quantity: 1,
            },
        ];
        rank_counts(&mut counts);
        let ids: Vec<_> = counts.iter().map(|c| c.menu_item_id.as_str()).collect();
        assert_eq!(ids, vec!["latte", "americano", "mocha"]);
    }
}
