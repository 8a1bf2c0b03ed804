//! # Inventory Ledger
//!
//! The only writer of ingredient quantities.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Ledger Operations                                 │
//! │                                                                         │
//! │  check_availability(lines)      read-only, advisory                    │
//! │  reserve_if_available(lines)    atomic compare-and-decrement           │
//! │  release(lines)                 atomic increment                       │
//! │  rebalance(previous, next)      signed difference, one atomic unit     │
//! │  restock(lines)                 release under another name             │
//! │  update_details(id, name, unit) never touches quantity                 │
//! │                                                                         │
//! │  Every write goes through InventoryStore::apply_adjustments, which     │
//! │  is all-or-nothing and checks availability at commit time.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use brew_core::recipe::net_adjustments;
use brew_core::validation::validate_inventory_item;
use brew_core::{CoreError, DeltaSign, IngredientLine, InventoryItem, ValidationError};
use brew_db::{DbError, InventoryStore};

use crate::error::{EngineError, EngineResult};

/// Ingredient stock bookkeeping.
#[derive(Clone)]
pub struct InventoryLedger {
    inventory: Arc<dyn InventoryStore>,
}

impl InventoryLedger {
    pub fn new(inventory: Arc<dyn InventoryStore>) -> Self {
        InventoryLedger { inventory }
    }

    /// True iff every ingredient exists with at least the required quantity.
    ///
    /// Nothing is held: a reservation made right after may still fail.
    pub async fn check_availability(&self, lines: &[IngredientLine]) -> EngineResult<bool> {
        Ok(self.inventory.check_sufficiency(lines).await?)
    }

    /// Decrements every line, or nothing.
    ///
    /// ## Errors
    /// - `InsufficientStock` naming the first ingredient that fell short
    /// - `UnknownIngredient` if a line names an untracked ingredient
    pub async fn reserve_if_available(&self, lines: &[IngredientLine]) -> EngineResult<()> {
        self.inventory
            .apply_delta(lines, DeltaSign::Decrement)
            .await?;
        debug!(lines = lines.len(), "Stock reserved");
        Ok(())
    }

    /// Returns stock. No upper bound is enforced.
    pub async fn release(&self, lines: &[IngredientLine]) -> EngineResult<()> {
        self.inventory
            .apply_delta(lines, DeltaSign::Increment)
            .await?;
        debug!(lines = lines.len(), "Stock released");
        Ok(())
    }

    /// Moves a reservation from `previous` to `next` requirements.
    ///
    /// Only the per-ingredient difference touches stock, so an update that
    /// adds one latte to an order reserves one latte's worth of milk.
    pub async fn rebalance(
        &self,
        previous: &[IngredientLine],
        next: &[IngredientLine],
    ) -> EngineResult<()> {
        let adjustments = net_adjustments(previous, next);
        if adjustments.is_empty() {
            return Ok(());
        }
        self.inventory.apply_adjustments(&adjustments).await?;
        debug!(adjustments = adjustments.len(), "Stock rebalanced");
        Ok(())
    }

    /// All tracked ingredients.
    pub async fn list(&self) -> EngineResult<Vec<InventoryItem>> {
        Ok(self.inventory.list_all().await?)
    }

    /// ## Errors
    /// `UnknownIngredient` if the ingredient isn't tracked.
    pub async fn stock_of(&self, ingredient_id: &str) -> EngineResult<InventoryItem> {
        self.inventory
            .get_by_id(ingredient_id)
            .await?
            .ok_or_else(|| CoreError::UnknownIngredient(ingredient_id.to_string()).into())
    }

    /// Starts tracking a new ingredient.
    pub async fn register(&self, item: &InventoryItem) -> EngineResult<()> {
        validate_inventory_item(item)?;
        self.inventory.insert(item).await?;
        info!(
            ingredient_id = %item.ingredient_id,
            quantity = item.quantity,
            unit = %item.unit,
            "Ingredient registered"
        );
        Ok(())
    }

    /// Renames an ingredient or changes its unit. Quantity is untouched.
    ///
    /// ## Errors
    /// - `Validation` if `name` or `unit` is blank
    /// - `UnknownIngredient` if the ingredient isn't tracked
    pub async fn update_details(&self, ingredient_id: &str, name: &str, unit: &str) -> EngineResult<()> {
        for (field, value) in [("name", name), ("unit", unit)] {
            if value.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: field.to_string(),
                }
                .into());
            }
        }

        self.inventory
            .update_details(ingredient_id, name.trim(), unit.trim())
            .await
            .map_err(|e| untracked(e, ingredient_id))?;
        info!(ingredient_id = %ingredient_id, name = %name.trim(), unit = %unit.trim(), "Ingredient details updated");
        Ok(())
    }

    /// Stops tracking an ingredient.
    ///
    /// Recipes naming it start failing reservations with `UnknownIngredient`,
    /// and active orders holding it can no longer give it back.
    pub async fn remove(&self, ingredient_id: &str) -> EngineResult<()> {
        self.inventory
            .delete(ingredient_id)
            .await
            .map_err(|e| untracked(e, ingredient_id))?;
        info!(ingredient_id = %ingredient_id, "Ingredient removed");
        Ok(())
    }

    /// Adds delivered stock.
    pub async fn restock(&self, lines: &[IngredientLine]) -> EngineResult<()> {
        self.release(lines).await?;
        info!(lines = lines.len(), "Restocked");
        Ok(())
    }
}

fn untracked(err: DbError, ingredient_id: &str) -> EngineError {
    match err {
        DbError::NotFound { .. } => CoreError::UnknownIngredient(ingredient_id.to_string()).into(),
        other => other.into(),
    }
}
