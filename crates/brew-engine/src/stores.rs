//! Store composition.
//!
//! The backend is picked once here; every service takes the trait objects
//! it needs at construction and never learns which backend it got.

use std::sync::Arc;

use brew_db::{
    Database, InMemoryInventoryStore, InMemoryMenuStore, InMemoryOrderStore, InventoryStore,
    MenuStore, OrderStore,
};

/// The three stores an engine is built from.
#[derive(Clone)]
pub struct Stores {
    pub menu: Arc<dyn MenuStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    pub fn new(
        menu: Arc<dyn MenuStore>,
        inventory: Arc<dyn InventoryStore>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Stores {
            menu,
            inventory,
            orders,
        }
    }

    /// Empty in-memory stores.
    pub fn in_memory() -> Self {
        Stores {
            menu: Arc::new(InMemoryMenuStore::new()),
            inventory: Arc::new(InMemoryInventoryStore::new()),
            orders: Arc::new(InMemoryOrderStore::new()),
        }
    }

    /// Repositories over a shared SQLite pool.
    pub fn sqlite(db: &Database) -> Self {
        Stores {
            menu: Arc::new(db.menu()),
            inventory: Arc::new(db.inventory()),
            orders: Arc::new(db.orders()),
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
