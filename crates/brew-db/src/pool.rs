//! # SQLite Pool
//!
//! Opens the shop database and hands out repositories over one shared pool.
//!
//! ## Who Waits Where
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     SQLite under concurrent orders                      │
//! │                                                                         │
//! │  create / update / delete ──► pool.acquire()   waits ≤ acquire_timeout │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                          BEGIN; UPDATE inventory ...                    │
//! │                                   │  second writer?                     │
//! │                                   ▼                                     │
//! │                          SQLite busy handler   waits ≤ busy_timeout    │
//! │                                                                         │
//! │  Menu lookups and reports only read. Under WAL they never queue        │
//! │  behind a reservation transaction.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::inventory::InventoryRepository;
use crate::repository::menu::MenuRepository;
use crate::repository::order::OrderRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the shop database lives and how hard callers wait for it.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/brew/brew.db").pool_size(8);
/// let db = Database::new(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    /// Upper bound on pooled connections (5).
    pub pool_size: u32,
    /// Connections opened eagerly and kept (1).
    pub warm_connections: u32,
    /// Wait for a free pooled connection before `PoolExhausted` (30s).
    pub acquire_timeout: Duration,
    /// Wait on another writer's lock before SQLite reports busy (5s).
    pub busy_timeout: Duration,
    /// Close connections unused for this long (10 min).
    pub idle_timeout: Duration,
    /// Apply embedded migrations on open (true).
    pub migrate: bool,
}

impl DbConfig {
    /// File-backed database; the file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            pool_size: 5,
            warm_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            migrate: true,
        }
    }

    /// Private in-memory database for tests.
    ///
    /// Pinned to one connection that never idles out: each `:memory:`
    /// connection is its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            pool_size: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::MAX,
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    pub fn warm_connections(mut self, count: u32) -> Self {
        self.warm_connections = count;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Skip migrations, e.g. for a database managed elsewhere.
    pub fn without_migrations(mut self) -> Self {
        self.migrate = false;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = if self.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}", self.database_path.display())
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .synchronous(SqliteSynchronous::Normal)
            // order_items and order_status_history cascade on order delete
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true);

        // WAL needs a file
        Ok(if self.is_in_memory() {
            options
        } else {
            options.journal_mode(SqliteJournalMode::Wal)
        })
    }
}

// =============================================================================
// Database
// =============================================================================

/// Pool handle; clones share the same connections.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (and if needed creates and migrates) the database.
    ///
    /// ## Errors
    /// - `ConnectionFailed` for a bad path or unreadable file
    /// - `MigrationFailed` if the embedded schema can't be applied
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening shop database");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .min_connections(config.warm_connections.min(config.pool_size))
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout((config.idle_timeout != Duration::MAX).then_some(config.idle_timeout))
            .max_lifetime((!config.is_in_memory()).then_some(Duration::from_secs(30 * 60)))
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(pool_size = config.pool_size, "Pool ready");

        let db = Database { pool };
        if config.migrate {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Brings the schema up to date. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        info!("Schema up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn menu(&self) -> MenuRepository {
        MenuRepository::new(self.pool.clone())
    }

    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries, then closes every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Shop database closed");
    }

    /// True if a trivial query round-trips.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
