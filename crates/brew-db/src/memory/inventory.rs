use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use brew_core::recipe::merge_adjustments;
use brew_core::{IngredientLine, InventoryItem, StockAdjustment};

use crate::error::{DbError, DbResult};
use crate::store::InventoryStore;

/// Ingredient stock behind a single mutex.
///
/// `apply_adjustments` validates every adjustment before touching any
/// quantity, so a refused call leaves the map as it found it.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    items: Mutex<HashMap<String, InventoryItem>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = InventoryItem>) -> Self {
        let items = items
            .into_iter()
            .map(|item| (item.ingredient_id.clone(), item))
            .collect();
        InMemoryInventoryStore {
            items: Mutex::new(items),
        }
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn list_all(&self) -> DbResult<Vec<InventoryItem>> {
        let mut items: Vec<InventoryItem> = self.items.lock().await.values().cloned().collect();
        items.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.ingredient_id.cmp(&b.ingredient_id))
        });
        Ok(items)
    }

    async fn get_by_id(&self, ingredient_id: &str) -> DbResult<Option<InventoryItem>> {
        Ok(self.items.lock().await.get(ingredient_id).cloned())
    }

    async fn insert(&self, item: &InventoryItem) -> DbResult<()> {
        let mut items = self.items.lock().await;
        if items.contains_key(&item.ingredient_id) {
            return Err(DbError::duplicate(
                "inventory.ingredient_id",
                item.ingredient_id.as_str(),
            ));
        }
        items.insert(item.ingredient_id.clone(), item.clone());
        Ok(())
    }

    async fn update_details(&self, ingredient_id: &str, name: &str, unit: &str) -> DbResult<()> {
        let mut items = self.items.lock().await;
        let item = items
            .get_mut(ingredient_id)
            .ok_or_else(|| DbError::not_found("Ingredient", ingredient_id))?;
        item.name = name.to_string();
        item.unit = unit.to_string();
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, ingredient_id: &str) -> DbResult<()> {
        match self.items.lock().await.remove(ingredient_id) {
            Some(_) => Ok(()),
            None => Err(DbError::not_found("Ingredient", ingredient_id)),
        }
    }

    async fn check_sufficiency(&self, lines: &[IngredientLine]) -> DbResult<bool> {
        let mut needed: HashMap<&str, i64> = HashMap::new();
        for line in lines {
            *needed.entry(line.ingredient_id.as_str()).or_insert(0) += line.quantity;
        }

        let items = self.items.lock().await;
        Ok(needed.into_iter().all(|(id, quantity)| {
            items
                .get(id)
                .map_or(false, |item| item.quantity >= quantity)
        }))
    }

    async fn apply_adjustments(&self, adjustments: &[StockAdjustment]) -> DbResult<()> {
        let merged = merge_adjustments(adjustments);
        if merged.is_empty() {
            return Ok(());
        }

        let mut items = self.items.lock().await;

        for adj in &merged {
            let item = items
                .get(&adj.ingredient_id)
                .ok_or_else(|| DbError::UnknownIngredient(adj.ingredient_id.clone()))?;

            if adj.is_decrement() && item.quantity < -adj.delta {
                return Err(DbError::InsufficientStock {
                    ingredient_id: adj.ingredient_id.clone(),
                    available: item.quantity,
                    requested: -adj.delta,
                });
            }
        }

        let now = Utc::now();
        for adj in &merged {
            if let Some(item) = items.get_mut(&adj.ingredient_id) {
                item.quantity += adj.delta;
                item.updated_at = now;
            }
        }

        debug!(adjustments = merged.len(), "Stock adjusted");
        Ok(())
    }
}
