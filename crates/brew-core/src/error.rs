//! # Business Errors
//!
//! What the pure layer can refuse, and where those refusals end up.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who raises what                                     │
//! │                                                                         │
//! │  brew-core errors (this file)                                          │
//! │  ├── CoreError        - Business outcomes and illegal transitions      │
//! │  └── ValidationError  - Bad order / menu / inventory shape             │
//! │                                                                         │
//! │  brew-db errors                                                        │
//! │  └── DbError          - Storage failures + ledger outcomes             │
//! │                                                                         │
//! │  brew-engine errors                                                    │
//! │  └── EngineError      - What callers of the engine see                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                         DbError ────┴→ EngineError → caller            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Outcomes of order and stock rules.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough stock to reserve an order's requirements.
    ///
    /// ## When This Occurs
    /// - A reservation's requirement exceeds the ingredient's current quantity
    ///   at commit time
    ///
    /// This is a business outcome, not a fault: the batch processor records
    /// it as a rejection and keeps going.
    ///
    /// ## Example
    /// ```text
    /// Order: 1 × latte (200 ml milk)
    ///      │
    ///      ▼
    /// reserve_if_available: milk=50
    ///      │
    ///      ▼
    /// InsufficientStock { ingredient_id: "milk", available: 50, requested: 200 }
    /// ```
    #[error("Insufficient stock for {ingredient_id}: available {available}, requested {requested}")]
    InsufficientStock {
        ingredient_id: String,
        available: i64,
        requested: i64,
    },

    /// A recipe references an ingredient the ledger does not track.
    ///
    /// ## When This Occurs
    /// - Menu was edited to use an ingredient that was never registered
    /// - Inventory row was deleted while recipes still reference it
    #[error("Unknown ingredient: {0}")]
    UnknownIngredient(String),

    /// A menu item referenced by an order is no longer in the catalog.
    #[error("Menu item not found: {0}")]
    MenuItemNotFound(String),

    /// No order has this id (never created, or deleted).
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Update or delete on a closed order.
    #[error("Order {0} is closed")]
    OrderClosed(String),

    /// Close on an order that is already closed.
    #[error("Order {0} is already closed")]
    AlreadyClosed(String),

    /// The input was malformed; see [`ValidationError`].
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Shape problems in a draft order, menu item, ingredient or report query.
///
/// Returned to the caller as-is and never retried.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Blank after trimming (`customer_name`, `items`, `unit`, ...).
    #[error("{field} is required")]
    Required { field: String },

    /// `customer_name` longer than the column allows.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Quantity, line count, batch size, month or year outside its bounds.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Zero or negative price, recipe amount or ordered quantity.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Well-typed but unusable, e.g. a report range that ends before it starts.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A draft asked for a status other than `active`.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Order line references a menu item the catalog doesn't know.
    #[error("Unknown menu item: {menu_item_id}")]
    UnknownMenuItem { menu_item_id: String },
}

impl ValidationError {
    /// A product or sum that no longer fits in an `i64`.
    pub fn overflow(field: impl Into<String>) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min: 0,
            max: i64::MAX,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            ingredient_id: "milk".to_string(),
            available: 50,
            requested: 200,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for milk: available 50, requested 200"
        );

        let err = CoreError::AlreadyClosed("abc".to_string());
        assert_eq!(err.to_string(), "Order abc is already closed");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customer_name".to_string(),
        };
        assert_eq!(err.to_string(), "customer_name is required");

        let err = ValidationError::UnknownMenuItem {
            menu_item_id: "unicorn-frappe".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown menu item: unicorn-frappe");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
