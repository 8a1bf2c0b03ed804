//! # Menu Repository
//!
//! Menu items live in `menu_items`; each recipe line is a row in
//! `menu_item_ingredients` keyed by `(menu_item_id, position)` so the recipe
//! reads back in the order it was written.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use brew_core::{MenuItem, RecipeLine};

use crate::error::{DbError, DbResult};
use crate::store::MenuStore;

#[derive(Debug, sqlx::FromRow)]
struct MenuItemRow {
    id: String,
    name: String,
    description: String,
    price_cents: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct RecipeRow {
    menu_item_id: String,
    ingredient_id: String,
    quantity: i64,
}

impl MenuItemRow {
    fn into_item(self, ingredients: Vec<RecipeLine>) -> MenuItem {
        MenuItem {
            id: self.id,
            name: self.name,
            description: self.description,
            price_cents: self.price_cents,
            ingredients,
        }
    }
}

/// Repository for menu database operations.
#[derive(Debug, Clone)]
pub struct MenuRepository {
    pool: SqlitePool,
}

impl MenuRepository {
    /// Creates a new MenuRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MenuRepository { pool }
    }

    /// Counts menu items (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM menu_items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn recipe_of(&self, menu_item_id: &str) -> DbResult<Vec<RecipeLine>> {
        let rows: Vec<RecipeRow> = sqlx::query_as(
            r#"
            SELECT menu_item_id, ingredient_id, quantity
            FROM menu_item_ingredients
            WHERE menu_item_id = ?1
            ORDER BY position
            "#,
        )
        .bind(menu_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RecipeLine::new(row.ingredient_id, row.quantity))
            .collect())
    }

    async fn insert_recipe(
        tx: &mut Transaction<'_, Sqlite>,
        menu_item_id: &str,
        recipe: &[RecipeLine],
    ) -> DbResult<()> {
        for (position, line) in recipe.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO menu_item_ingredients (menu_item_id, position, ingredient_id, quantity)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(menu_item_id)
            .bind(position as i64)
            .bind(&line.ingredient_id)
            .bind(line.quantity)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MenuStore for MenuRepository {
    async fn get_by_id(&self, id: &str) -> DbResult<Option<MenuItem>> {
        let row: Option<MenuItemRow> = sqlx::query_as(
            "SELECT id, name, description, price_cents FROM menu_items WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let recipe = self.recipe_of(&row.id).await?;
                Ok(Some(row.into_item(recipe)))
            }
            None => Ok(None),
        }
    }

    /// All menu items sorted by name.
    async fn list_all(&self) -> DbResult<Vec<MenuItem>> {
        let rows: Vec<MenuItemRow> = sqlx::query_as(
            "SELECT id, name, description, price_cents FROM menu_items ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let recipe_rows: Vec<RecipeRow> = sqlx::query_as(
            r#"
            SELECT menu_item_id, ingredient_id, quantity
            FROM menu_item_ingredients
            ORDER BY menu_item_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut recipes: HashMap<String, Vec<RecipeLine>> = HashMap::new();
        for row in recipe_rows {
            recipes
                .entry(row.menu_item_id)
                .or_default()
                .push(RecipeLine::new(row.ingredient_id, row.quantity));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let recipe = recipes.remove(&row.id).unwrap_or_default();
                row.into_item(recipe)
            })
            .collect())
    }

    async fn insert(&self, item: &MenuItem) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, "Inserting menu item");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            "INSERT INTO menu_items (id, name, description, price_cents) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price_cents)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, item.id.as_str()),
            other => other,
        })?;

        Self::insert_recipe(&mut tx, &item.id, &item.ingredients).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Recipe rows are replaced wholesale.
    async fn update(&self, item: &MenuItem) -> DbResult<()> {
        debug!(id = %item.id, price_cents = item.price_cents, "Updating menu item");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE menu_items SET name = ?2, description = ?3, price_cents = ?4 WHERE id = ?1",
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price_cents)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MenuItem", item.id.as_str()));
        }

        sqlx::query("DELETE FROM menu_item_ingredients WHERE menu_item_id = ?1")
            .bind(&item.id)
            .execute(&mut *tx)
            .await?;

        Self::insert_recipe(&mut tx, &item.id, &item.ingredients).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Recipe rows go with it (ON DELETE CASCADE); order lines do not.
    async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting menu item");

        let result = sqlx::query("DELETE FROM menu_items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MenuItem", id));
        }

        Ok(())
    }
}
