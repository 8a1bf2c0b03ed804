use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use brew_core::MenuItem;

use crate::error::{DbError, DbResult};
use crate::store::MenuStore;

/// Menu kept in a map behind a read-write lock.
#[derive(Debug, Default)]
pub struct InMemoryMenuStore {
    items: RwLock<HashMap<String, MenuItem>>,
}

impl InMemoryMenuStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-loaded with `items`.
    pub fn with_items(items: impl IntoIterator<Item = MenuItem>) -> Self {
        let items = items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        InMemoryMenuStore {
            items: RwLock::new(items),
        }
    }
}

#[async_trait]
impl MenuStore for InMemoryMenuStore {
    async fn get_by_id(&self, id: &str) -> DbResult<Option<MenuItem>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn list_all(&self) -> DbResult<Vec<MenuItem>> {
        let mut items: Vec<MenuItem> = self.items.read().await.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn insert(&self, item: &MenuItem) -> DbResult<()> {
        let mut items = self.items.write().await;
        if items.contains_key(&item.id) {
            return Err(DbError::duplicate("menu_items.id", item.id.as_str()));
        }
        items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn update(&self, item: &MenuItem) -> DbResult<()> {
        match self.items.write().await.get_mut(&item.id) {
            Some(stored) => {
                *stored = item.clone();
                Ok(())
            }
            None => Err(DbError::not_found("MenuItem", item.id.as_str())),
        }
    }

    async fn delete(&self, id: &str) -> DbResult<()> {
        match self.items.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(DbError::not_found("MenuItem", id)),
        }
    }
}
