//! # Repository Module
//!
//! SQLite implementations of the store traits.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  brew-engine                                                           │
//! │       │                                                                 │
//! │       │  stores.inventory.apply_adjustments(&adjustments)              │
//! │       ▼                                                                 │
//! │  InventoryRepository (impl InventoryStore)                             │
//! │  ├── list_all / get_by_id / insert                                     │
//! │  ├── check_sufficiency                                                 │
//! │  └── apply_adjustments  ← one transaction, conditional decrements      │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`MenuRepository`](menu::MenuRepository) - Menu items and recipes
//! - [`InventoryRepository`](inventory::InventoryRepository) - Ingredient stock
//! - [`OrderRepository`](order::OrderRepository) - Orders, lines, status history

pub mod inventory;
pub mod menu;
pub mod order;
