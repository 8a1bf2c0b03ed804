//! # Menu Catalog
//!
//! Read-mostly access to menu items and their recipes.
//!
//! ## Snapshots
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  draft: [latte × 2, mocha × 1]                                         │
//! │       │                                                                 │
//! │       ▼  snapshot_for(["latte", "mocha"])                              │
//! │  MenuSnapshot { latte → MenuItem, mocha → MenuItem }                   │
//! │       │                                                                 │
//! │       ├──► validate_order    (ids resolve?)                            │
//! │       ├──► requirements_for  (how much milk?)                          │
//! │       └──► price_items       (what does it cost?)                      │
//! │                                                                         │
//! │  One read per item, then every rule sees the same menu.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use brew_core::validation::validate_menu_item;
use brew_core::{CoreError, MenuItem, MenuSnapshot, RecipeLine};
use brew_db::{DbError, MenuStore};

use crate::error::EngineResult;

/// Menu lookups and management.
#[derive(Clone)]
pub struct MenuCatalog {
    menu: Arc<dyn MenuStore>,
}

impl MenuCatalog {
    pub fn new(menu: Arc<dyn MenuStore>) -> Self {
        MenuCatalog { menu }
    }

    /// ## Errors
    /// `MenuItemNotFound` if no item has this id.
    pub async fn get(&self, id: &str) -> EngineResult<MenuItem> {
        self.menu
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::MenuItemNotFound(id.to_string()).into())
    }

    pub async fn all(&self) -> EngineResult<Vec<MenuItem>> {
        Ok(self.menu.list_all().await?)
    }

    /// The item's recipe, in recipe order.
    pub async fn recipe_of(&self, id: &str) -> EngineResult<Vec<RecipeLine>> {
        Ok(self.get(id).await?.ingredients)
    }

    /// Snapshot of the named items. Ids with no menu item are left out, so
    /// callers report them through their own rules.
    pub async fn snapshot_for(&self, ids: &[String]) -> EngineResult<MenuSnapshot> {
        let mut snapshot = MenuSnapshot::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            if let Some(item) = self.menu.get_by_id(id).await? {
                snapshot.insert(item);
            }
        }

        debug!(items = snapshot.len(), "Menu snapshot taken");
        Ok(snapshot)
    }

    /// Snapshot of the whole menu.
    pub async fn snapshot_all(&self) -> EngineResult<MenuSnapshot> {
        Ok(self.menu.list_all().await?.into_iter().collect())
    }

    /// Validates and adds a menu item.
    pub async fn add(&self, item: &MenuItem) -> EngineResult<()> {
        validate_menu_item(item)?;
        self.menu.insert(item).await?;
        info!(id = %item.id, price = %item.price(), "Menu item added");
        Ok(())
    }

    /// Validates and replaces a menu item's details, price and recipe.
    ///
    /// Active orders keep their line prices and their reservation until
    /// they are next updated. Sales totals follow the new price at once.
    ///
    /// ## Errors
    /// - `Validation` for a malformed item
    /// - `MenuItemNotFound` if no item has this id
    pub async fn update(&self, item: &MenuItem) -> EngineResult<()> {
        validate_menu_item(item)?;
        self.menu
            .update(item)
            .await
            .map_err(|e| missing_item(e, &item.id))?;
        info!(id = %item.id, price = %item.price(), "Menu item updated");
        Ok(())
    }

    /// Removes a menu item. Existing orders keep their snapshot prices.
    pub async fn remove(&self, id: &str) -> EngineResult<()> {
        self.menu.delete(id).await.map_err(|e| missing_item(e, id))?;
        info!(id = %id, "Menu item removed");
        Ok(())
    }
}

fn missing_item(err: DbError, id: &str) -> crate::EngineError {
    match err {
        DbError::NotFound { .. } => CoreError::MenuItemNotFound(id.to_string()).into(),
        other => other.into(),
    }
}
