//! # Inventory Repository
//!
//! Ingredient stock in SQLite.
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              apply_adjustments (one transaction)                        │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    for each merged adjustment:                                          │
//! │      delta < 0:  UPDATE inventory SET quantity = quantity - n           │
//! │                  WHERE ingredient_id = ? AND quantity >= n              │
//! │                  └── 0 rows → look up quantity → ROLLBACK               │
//! │                        ├── row exists → InsufficientStock               │
//! │                        └── no row     → UnknownIngredient               │
//! │      delta > 0:  UPDATE inventory SET quantity = quantity + n           │
//! │                  └── 0 rows → ROLLBACK → UnknownIngredient              │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  The availability check and the write are the same statement, so two   │
//! │  writers can never both pass the check on the last unit.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use brew_core::recipe::merge_adjustments;
use brew_core::{IngredientLine, InventoryItem, StockAdjustment};

use crate::error::{DbError, DbResult};
use crate::store::InventoryStore;

/// Repository for ingredient stock.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Counts registered ingredients.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl InventoryStore for InventoryRepository {
    async fn list_all(&self) -> DbResult<Vec<InventoryItem>> {
        let items: Vec<InventoryItem> = sqlx::query_as(
            r#"
            SELECT ingredient_id, name, quantity, unit, created_at, updated_at
            FROM inventory
            ORDER BY name, ingredient_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn get_by_id(&self, ingredient_id: &str) -> DbResult<Option<InventoryItem>> {
        let item: Option<InventoryItem> = sqlx::query_as(
            r#"
            SELECT ingredient_id, name, quantity, unit, created_at, updated_at
            FROM inventory
            WHERE ingredient_id = ?1
            "#,
        )
        .bind(ingredient_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn insert(&self, item: &InventoryItem) -> DbResult<()> {
        debug!(ingredient_id = %item.ingredient_id, quantity = item.quantity, "Registering ingredient");

        sqlx::query(
            r#"
            INSERT INTO inventory (ingredient_id, name, quantity, unit, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.ingredient_id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(&item.unit)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, item.ingredient_id.as_str())
            }
            other => other,
        })?;

        Ok(())
    }

    async fn update_details(&self, ingredient_id: &str, name: &str, unit: &str) -> DbResult<()> {
        debug!(ingredient_id = %ingredient_id, "Updating ingredient details");

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET name = ?2, unit = ?3, updated_at = ?4
            WHERE ingredient_id = ?1
            "#,
        )
        .bind(ingredient_id)
        .bind(name)
        .bind(unit)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ingredient", ingredient_id));
        }

        Ok(())
    }

    async fn delete(&self, ingredient_id: &str) -> DbResult<()> {
        debug!(ingredient_id = %ingredient_id, "Deleting ingredient");

        let result = sqlx::query("DELETE FROM inventory WHERE ingredient_id = ?1")
            .bind(ingredient_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ingredient", ingredient_id));
        }

        Ok(())
    }

    async fn check_sufficiency(&self, lines: &[IngredientLine]) -> DbResult<bool> {
        let mut needed: HashMap<&str, i64> = HashMap::new();
        for line in lines {
            *needed.entry(line.ingredient_id.as_str()).or_insert(0) += line.quantity;
        }

        for (ingredient_id, quantity) in needed {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT quantity FROM inventory WHERE ingredient_id = ?1")
                    .bind(ingredient_id)
                    .fetch_optional(&self.pool)
                    .await?;

            match available {
                Some(available) if available >= quantity => {}
                _ => return Ok(false),
            }
        }

        Ok(true)
    }

    async fn apply_adjustments(&self, adjustments: &[StockAdjustment]) -> DbResult<()> {
        let merged = merge_adjustments(adjustments);
        if merged.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for adj in &merged {
            let failure = if adj.is_decrement() {
                let requested = -adj.delta;
                let result = sqlx::query(
                    r#"
                    UPDATE inventory
                    SET quantity = quantity - ?2, updated_at = ?3
                    WHERE ingredient_id = ?1 AND quantity >= ?2
                    "#,
                )
                .bind(&adj.ingredient_id)
                .bind(requested)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() > 0 {
                    continue;
                }

                let available: Option<i64> =
                    sqlx::query_scalar("SELECT quantity FROM inventory WHERE ingredient_id = ?1")
                        .bind(&adj.ingredient_id)
                        .fetch_optional(&mut *tx)
                        .await?;

                match available {
                    Some(available) => DbError::InsufficientStock {
                        ingredient_id: adj.ingredient_id.clone(),
                        available,
                        requested,
                    },
                    None => DbError::UnknownIngredient(adj.ingredient_id.clone()),
                }
            } else {
                let result = sqlx::query(
                    r#"
                    UPDATE inventory
                    SET quantity = quantity + ?2, updated_at = ?3
                    WHERE ingredient_id = ?1
                    "#,
                )
                .bind(&adj.ingredient_id)
                .bind(adj.delta)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() > 0 {
                    continue;
                }

                DbError::UnknownIngredient(adj.ingredient_id.clone())
            };

            warn!(error = %failure, "Stock adjustment refused, rolling back");
            tx.rollback()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            return Err(failure);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(adjustments = merged.len(), "Stock adjusted");
        Ok(())
    }
}
