//! # Validation Module
//!
//! Structural and referential checks for orders, menu items and inventory
//! items.
//!
//! ## Order Validation Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate_order(draft, snapshot, limits)                                │
//! │                                                                         │
//! │  1. customer_name non-empty ───────────── Required                     │
//! │  2. items non-empty ───────────────────── Required                     │
//! │  3. every quantity > 0 ────────────────── MustBePositive               │
//! │  4. every menu_item_id in snapshot ────── UnknownMenuItem              │
//! │  5. status not preset to closed ───────── NotAllowed                   │
//! │  6. item count / quantity within limits ─ OutOfRange                   │
//! │                                                                         │
//! │  First failure wins. Stock is NOT checked here; the ledger does that.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{InventoryItem, MenuItem, MenuSnapshot, OrderDraft, OrderItemDraft, OrderStatus};
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum customer name length.
const MAX_CUSTOMER_NAME_LEN: usize = 200;

// =============================================================================
// Limits
// =============================================================================

/// Size limits applied after the ordered checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLimits {
    pub max_items: usize,
    pub max_item_quantity: i64,
}

impl Default for OrderLimits {
    fn default() -> Self {
        OrderLimits {
            max_items: MAX_ORDER_ITEMS,
            max_item_quantity: MAX_ITEM_QUANTITY,
        }
    }
}

// =============================================================================
// Order Validators
// =============================================================================

/// Validates a draft order for creation.
///
/// `snapshot` must contain every menu item the draft references that still
/// exists; anything missing is reported as [`ValidationError::UnknownMenuItem`].
pub fn validate_order(
    draft: &OrderDraft,
    snapshot: &MenuSnapshot,
    limits: &OrderLimits,
) -> ValidationResult<()> {
    validate_customer_name(&draft.customer_name)?;
    validate_order_items(&draft.items, snapshot)?;

    if let Some(status) = draft.status {
        if status != OrderStatus::Active {
            return Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec![OrderStatus::Active.to_string()],
            });
        }
    }

    validate_limits(&draft.items, limits)
}

/// Validates a replacement item set for an existing order.
///
/// Same rules as [`validate_order`] minus the status check; the customer
/// name is the order's current one.
pub fn validate_order_update(
    customer_name: &str,
    items: &[OrderItemDraft],
    snapshot: &MenuSnapshot,
    limits: &OrderLimits,
) -> ValidationResult<()> {
    validate_customer_name(customer_name)?;
    validate_order_items(items, snapshot)?;
    validate_limits(items, limits)
}

/// Validates a customer name.
///
/// ## Example
/// ```rust
/// use brew_core::validation::validate_customer_name;
///
/// assert!(validate_customer_name("Ada").is_ok());
/// assert!(validate_customer_name("   ").is_err());
/// ```
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "customer_name".to_string(),
        });
    }

    if name.len() > MAX_CUSTOMER_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "customer_name".to_string(),
            max: MAX_CUSTOMER_NAME_LEN,
        });
    }

    Ok(())
}

fn validate_order_items(items: &[OrderItemDraft], snapshot: &MenuSnapshot) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    // Quantities are checked across all lines before any lookup
    if items.iter().any(|item| item.quantity <= 0) {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if let Some(missing) = items.iter().find(|item| !snapshot.contains(&item.menu_item_id)) {
        return Err(ValidationError::UnknownMenuItem {
            menu_item_id: missing.menu_item_id.clone(),
        });
    }

    Ok(())
}

fn validate_limits(items: &[OrderItemDraft], limits: &OrderLimits) -> ValidationResult<()> {
    if items.len() > limits.max_items {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: limits.max_items as i64,
        });
    }

    if items.iter().any(|item| item.quantity > limits.max_item_quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: limits.max_item_quantity,
        });
    }

    Ok(())
}

// =============================================================================
// Menu / Inventory Validators
// =============================================================================

/// Validates a menu item before it is written to the menu store.
///
/// ## Rules
/// - id, name, description non-empty
/// - price > 0
/// - every recipe line names an ingredient and consumes a positive amount
pub fn validate_menu_item(item: &MenuItem) -> ValidationResult<()> {
    require_non_empty("id", &item.id)?;
    require_non_empty("name", &item.name)?;
    require_non_empty("description", &item.description)?;

    if item.price_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    for line in &item.ingredients {
        require_non_empty("ingredient_id", &line.ingredient_id)?;
        if line.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: format!("quantity of {}", line.ingredient_id),
            });
        }
    }

    Ok(())
}

/// Validates an inventory item before registration.
///
/// ## Example
/// ```rust
/// use brew_core::types::InventoryItem;
/// use brew_core::validation::validate_inventory_item;
///
/// assert!(validate_inventory_item(&InventoryItem::new("milk", "Whole milk", 0, "ml")).is_ok());
/// assert!(validate_inventory_item(&InventoryItem::new("milk", "Whole milk", -1, "ml")).is_err());
/// ```
pub fn validate_inventory_item(item: &InventoryItem) -> ValidationResult<()> {
    require_non_empty("ingredient_id", &item.ingredient_id)?;
    require_non_empty("name", &item.name)?;
    require_non_empty("unit", &item.unit)?;

    if item.quantity < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a calendar month number.
pub fn validate_month(month: u32) -> ValidationResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        });
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
