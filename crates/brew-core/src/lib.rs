//! # brew-core: Pure Business Logic for the Coffee Shop Engine
//!
//! Everything in this crate is a deterministic function over in-memory data.
//! Storage, locking and async orchestration live in `brew-db` and
//! `brew-engine`; this crate only answers questions like "is this order
//! well-formed?", "what does it cost?" and "how much milk does it need?".
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Brew Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  brew-engine (orchestration)                    │   │
//! │  │   OrderLifecycle ─ InventoryLedger ─ BatchProcessor ─ Sales    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ MenuSnapshot + drafts                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ brew-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  types   │ │validation│ │ pricing  │ │ recipe / aggreg. │  │   │
//! │  │   │ MenuItem │ │  order   │ │ snapshot │ │ requirements     │  │   │
//! │  │   │  Order   │ │  rules   │ │  prices  │ │ popularity       │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO LOCKS • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              brew-db (store traits + backends)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (MenuItem, InventoryItem, Order, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Order, menu and inventory validation
//! - [`pricing`] - Snapshot pricing of order lines
//! - [`recipe`] - Ingredient requirement math
//! - [`aggregation`] - Sales totals and popularity ranking
//!
//! ## Example Usage
//!
//! ```rust
//! use brew_core::money::Money;
//!
//! let latte = Money::from_cents(450);
//! assert_eq!((latte * 2i64).to_string(), "$9.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregation;
pub mod error;
pub mod money;
pub mod pricing;
pub mod recipe;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::PricedOrder;
pub use recipe::{DeltaSign, IngredientLine, StockAdjustment};
pub use types::*;
pub use validation::OrderLimits;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines in a single order.
///
/// ## Business Reason
/// Keeps a single reservation transaction small. Overridable through
/// [`OrderLimits`].
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single order line.
///
/// ## Business Reason
/// Catches typing 1000 instead of 10 at the register.
pub const MAX_ITEM_QUANTITY: i64 = 999;
