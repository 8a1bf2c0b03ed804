//! # brew-engine: Order Fulfillment and Inventory Consistency
//!
//! Services over the brew stores: menu lookups, the inventory ledger, the
//! order state machine, batch intake and sales/volume aggregates.
//!
//! ## Control Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Order Create                                    │
//! │                                                                         │
//! │  OrderDraft                                                            │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  MenuCatalog::snapshot_for ──► validate_order ──► price_items          │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │                          InventoryLedger::reserve_if_available         │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │                              OrderStore::create (status active)        │
//! │                                                                         │
//! │  BatchProcessor fans the same pipeline over many drafts.               │
//! │  SalesAggregator and ReportService only read.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use brew_engine::{Engine, EngineConfig};
//!
//! let engine = Engine::open(&EngineConfig::load_or_default(None)).await?;
//! let order = engine.lifecycle.create(draft).await?;
//! engine.lifecycle.close(&order.id, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod locks;
pub mod reports;
pub mod sales;
pub mod stores;

// =============================================================================
// Re-exports
// =============================================================================

pub use batch::{
    BatchProcessor, BatchResult, BatchSummary, InventoryUsage, ProcessedOrder, ProcessedStatus,
};
pub use catalog::MenuCatalog;
pub use config::{EngineConfig, StorageBackend};
pub use error::{EngineError, EngineResult};
pub use ledger::InventoryLedger;
pub use lifecycle::OrderLifecycle;
pub use reports::{OrderedItemCount, ReportService};
pub use sales::SalesAggregator;
pub use stores::Stores;

use tracing::info;
use tracing_subscriber::EnvFilter;

use brew_db::{Database, DbConfig};

// =============================================================================
// Engine
// =============================================================================

/// Every service wired to one set of stores.
#[derive(Clone)]
pub struct Engine {
    pub catalog: MenuCatalog,
    pub ledger: InventoryLedger,
    pub lifecycle: OrderLifecycle,
    pub batch: BatchProcessor,
    pub sales: SalesAggregator,
    pub reports: ReportService,
}

impl Engine {
    /// Builds the services over existing stores.
    pub fn new(stores: Stores, config: &EngineConfig) -> Self {
        let catalog = MenuCatalog::new(stores.menu.clone());
        let ledger = InventoryLedger::new(stores.inventory.clone());
        let lifecycle = OrderLifecycle::new(
            catalog.clone(),
            ledger.clone(),
            stores.orders.clone(),
            config.orders.limits(),
        );
        let batch = BatchProcessor::new(
            lifecycle.clone(),
            ledger.clone(),
            config.batch.max_batch_size,
        );
        let sales = SalesAggregator::new(catalog.clone(), stores.orders.clone());
        let reports = ReportService::new(catalog.clone(), stores.orders);

        Engine {
            catalog,
            ledger,
            lifecycle,
            batch,
            sales,
            reports,
        }
    }

    /// Opens the configured backend and builds the services over it.
    pub async fn open(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let stores = match config.storage.backend {
            StorageBackend::Memory => Stores::in_memory(),
            StorageBackend::Sqlite => {
                let db_config = DbConfig::new(&config.storage.database_path)
                    .pool_size(config.storage.max_connections);
                let db = Database::new(db_config).await?;
                Stores::sqlite(&db)
            }
        };

        info!(backend = %config.storage.backend, "Engine ready");
        Ok(Self::new(stores, config))
    }
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - ERROR: failed compensation (stock could not be put back)
/// - WARN: rejected batch orders, config fallbacks
/// - INFO: order state transitions
/// - DEBUG: stock movements, snapshots
///
/// Override with `RUST_LOG`, e.g. `RUST_LOG=brew_engine=trace`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,brew=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
