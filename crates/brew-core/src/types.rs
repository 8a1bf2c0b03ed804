//! # Domain Types
//!
//! Core domain types for the coffee shop engine.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    MenuItem     │   │  InventoryItem  │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  ingredient_id  │   │  id (UUID)      │       │
//! │  │  price_cents    │   │  quantity ≥ 0   │   │  status         │       │
//! │  │  ingredients ───┼──►│  unit           │   │  total_cents    │       │
//! │  └────────▲────────┘   └─────────────────┘   │  items ─┐       │       │
//! │           │  weak ref                        └─────────┼───────┘       │
//! │           │                                            ▼               │
//! │           │                                  ┌─────────────────┐       │
//! │           └──────────────────────────────────┤   OrderItem     │       │
//! │                                              │  menu_item_id   │       │
//! │                                              │  price_cents    │       │
//! │                                              │  (snapshot)     │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `OrderItem.price_cents` freezes the unit price at pricing time. Closed
//! order totals never move when the menu changes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::recipe::IngredientLine;

// =============================================================================
// Menu
// =============================================================================

/// One line of a recipe: how much of an ingredient a single unit consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub ingredient_id: String,
    /// Amount per unit sold, in the ingredient's base unit.
    pub quantity: i64,
}

impl RecipeLine {
    pub fn new(ingredient_id: impl Into<String>, quantity: i64) -> Self {
        RecipeLine {
            ingredient_id: ingredient_id.into(),
            quantity,
        }
    }
}

/// A drink or food item on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Current price in cents.
    pub price_cents: i64,
    /// Ordered recipe.
    #[serde(default)]
    pub ingredients: Vec<RecipeLine>,
}

impl MenuItem {
    /// Returns the current price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// A consistent read of (part of) the catalog keyed by menu item id.
///
/// Validation, pricing and requirement math all run against the same
/// snapshot so a concurrent menu edit can't make them disagree.
#[derive(Debug, Clone, Default)]
pub struct MenuSnapshot {
    items: HashMap<String, MenuItem>,
}

impl MenuSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: MenuItem) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn get(&self, menu_item_id: &str) -> Option<&MenuItem> {
        self.items.get(menu_item_id)
    }

    pub fn contains(&self, menu_item_id: &str) -> bool {
        self.items.contains_key(menu_item_id)
    }

    /// Current catalog price, if the item exists.
    pub fn price_of(&self, menu_item_id: &str) -> Option<Money> {
        self.items.get(menu_item_id).map(MenuItem::price)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<MenuItem> for MenuSnapshot {
    fn from_iter<I: IntoIterator<Item = MenuItem>>(iter: I) -> Self {
        let mut snapshot = MenuSnapshot::new();
        for item in iter {
            snapshot.insert(item);
        }
        snapshot
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Stock of one ingredient.
///
/// `quantity` is never negative; only the inventory ledger changes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryItem {
    pub ingredient_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Builds a freshly registered ingredient with both timestamps set to now.
    pub fn new(
        ingredient_id: impl Into<String>,
        name: impl Into<String>,
        quantity: i64,
        unit: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        InventoryItem {
            ingredient_id: ingredient_id.into(),
            name: name.into(),
            quantity,
            unit: unit.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Order state. Deletion removes the record instead of adding a third state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted, stock reserved, still editable.
    #[default]
    Active,
    /// Finalized and immutable.
    Closed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Active => "active",
            OrderStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order Drafts (input)
// =============================================================================

/// An order line as submitted by a caller, before pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemDraft {
    /// Older payloads call this `product_id`; it is read but never written.
    #[serde(alias = "product_id")]
    pub menu_item_id: String,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization: Option<serde_json::Value>,
}

impl OrderItemDraft {
    pub fn new(menu_item_id: impl Into<String>, quantity: i64) -> Self {
        OrderItemDraft {
            menu_item_id: menu_item_id.into(),
            quantity,
            customization: None,
        }
    }
}

/// An order as submitted for creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer_name: String,
    pub items: Vec<OrderItemDraft>,
    /// Callers may echo a status; anything but `active` is refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

impl OrderDraft {
    pub fn new(customer_name: impl Into<String>, items: Vec<OrderItemDraft>) -> Self {
        OrderDraft {
            customer_name: customer_name.into(),
            items,
            status: None,
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A priced order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(alias = "product_id")]
    pub menu_item_id: String,
    pub quantity: i64,
    /// Unit price in cents at pricing time (frozen).
    pub price_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization: Option<serde_json::Value>,
}

impl OrderItem {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price().multiply_quantity(self.quantity)
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    /// Σ price × quantity, snapshotted at create/update time.
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_status_change: DateTime<Utc>,
    /// Stock this order holds, exactly as reserved at its last create or
    /// update. Released as-is on delete, whatever the recipes say by then.
    #[serde(default)]
    pub reserved: Vec<IngredientLine>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.status == OrderStatus::Closed
    }

    /// Recomputes the total from the snapshotted line prices.
    pub fn snapshot_total(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

/// One recorded status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderStatusChange {
    pub id: String,
    pub order_id: String,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub changed_at: DateTime<Utc>,
}

// =============================================================================
// Aggregates
// =============================================================================

/// A menu item and how many units of it were sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularItem {
    pub menu_item_id: String,
    pub quantity: i64,
}

/// Granularity of a period report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Day,
    Month,
}

/// Order count for one day-of-month or one month-of-year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCount {
    /// Day of month (1-31) or month of year (1-12).
    pub key: u32,
    pub orders: i64,
}

/// Orders grouped by day within a month or by month within a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub period: Period,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    pub counts: Vec<PeriodCount>,
}

// =============================================================================
// Unit Tests
// =============================================================================
