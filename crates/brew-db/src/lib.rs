//! # brew-db: Storage Layer
//!
//! Store traits for menu, inventory and orders, with a SQLite backend (sqlx)
//! and an in-memory backend (tokio locks).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Brew Data Flow                                   │
//! │                                                                         │
//! │  brew-engine (OrderLifecycle, InventoryLedger, ...)                    │
//! │       │  Arc<dyn MenuStore / InventoryStore / OrderStore>              │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     brew-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │   memory     │  │   │
//! │  │   │   (pool.rs)   │    │   (SQLite)    │    │  (tokio      │  │   │
//! │  │   │               │    │               │    │   locks)     │  │   │
//! │  │   │ SqlitePool    │◄───│ MenuRepo      │    │ InMemory*    │  │   │
//! │  │   │ Migrations    │    │ InventoryRepo │    │   Store      │  │   │
//! │  │   │               │    │ OrderRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The three store traits and shared query types
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - SQLite implementations
//! - [`memory`] - In-memory implementations
//! - [`error`] - Storage error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use brew_db::{Database, DbConfig, InventoryStore};
//!
//! let db = Database::new(DbConfig::new("brew.db")).await?;
//! let stock = db.inventory().list_all().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use store::{DateRange, InventoryStore, ItemCount, MenuStore, OrderStore};

pub use memory::{InMemoryInventoryStore, InMemoryMenuStore, InMemoryOrderStore};
pub use repository::inventory::InventoryRepository;
pub use repository::menu::MenuRepository;
pub use repository::order::OrderRepository;
