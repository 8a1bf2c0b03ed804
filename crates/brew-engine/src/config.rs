//! # Engine Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BREW_STORAGE_BACKEND=memory                                        │
//! │     BREW_DB_PATH=/var/lib/brew/brew.db                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/brew/brew.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.brew.cafe/brew.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     SQLite at ./brew.db, 100 items / 999 units per order, batches 500  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # brew.toml
//! [storage]
//! backend = "sqlite"   # sqlite | memory
//! database_path = "./brew.db"
//! max_connections = 5
//!
//! [orders]
//! max_items = 100
//! max_item_quantity = 999
//!
//! [batch]
//! max_batch_size = 500
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use brew_core::{OrderLimits, MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Storage
// =============================================================================

/// Which store implementation the engine is composed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// SQLite file through sqlx.
    #[default]
    Sqlite,

    /// Process-local maps; everything is lost on exit.
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Sqlite => write!(f, "sqlite"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "db" => Ok(StorageBackend::Sqlite),
            "memory" | "mem" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(EngineError::Config(format!(
                "Unknown storage backend: '{}'. Valid options: sqlite, memory",
                other
            ))),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,

    /// SQLite file. Ignored by the memory backend.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Pool size for the SQLite backend.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./brew.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Orders / Batch
// =============================================================================

/// Upper bounds applied during order validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSettings {
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    #[serde(default = "default_max_item_quantity")]
    pub max_item_quantity: i64,
}

fn default_max_items() -> usize {
    MAX_ORDER_ITEMS
}

fn default_max_item_quantity() -> i64 {
    MAX_ITEM_QUANTITY
}

impl Default for OrderSettings {
    fn default() -> Self {
        OrderSettings {
            max_items: default_max_items(),
            max_item_quantity: default_max_item_quantity(),
        }
    }
}

impl OrderSettings {
    pub fn limits(&self) -> OrderLimits {
        OrderLimits {
            max_items: self.max_items,
            max_item_quantity: self.max_item_quantity,
        }
    }
}

/// Batch processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Largest batch accepted; bigger batches are refused before any work.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_max_batch_size() -> usize {
    500
}

impl Default for BatchSettings {
    fn default() -> Self {
        BatchSettings {
            max_batch_size: default_max_batch_size(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub orders: OrderSettings,

    #[serde(default)]
    pub batch: BatchSettings,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with the memory backend, for tests and dry runs.
    pub fn in_memory() -> Self {
        let mut config = Self::default();
        config.storage.backend = StorageBackend::Memory;
        config
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (brew.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.storage.backend == StorageBackend::Sqlite
            && self.storage.database_path.as_os_str().is_empty()
        {
            return Err(EngineError::Config(
                "database_path is required for the sqlite backend".into(),
            ));
        }

        if self.storage.max_connections == 0 {
            return Err(EngineError::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.orders.max_items == 0 || self.orders.max_item_quantity <= 0 {
            return Err(EngineError::Config(
                "order limits must be greater than 0".into(),
            ));
        }

        if self.batch.max_batch_size == 0 {
            return Err(EngineError::Config(
                "max_batch_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var("BREW_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding storage backend from environment");
                    self.storage.backend = parsed;
                }
                Err(_) => warn!(backend = %backend, "Unknown storage backend in environment"),
            }
        }

        if let Ok(path) = std::env::var("BREW_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("BREW_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse::<u32>() {
                self.storage.max_connections = n;
            }
        }

        if let Ok(max) = std::env::var("BREW_MAX_ORDER_ITEMS") {
            if let Ok(n) = max.parse::<usize>() {
                self.orders.max_items = n;
            }
        }

        if let Ok(max) = std::env::var("BREW_MAX_ITEM_QUANTITY") {
            if let Ok(n) = max.parse::<i64>() {
                self.orders.max_item_quantity = n;
            }
        }

        if let Ok(max) = std::env::var("BREW_MAX_BATCH_SIZE") {
            if let Ok(n) = max.parse::<usize>() {
                debug!(max_batch_size = n, "Overriding batch size from environment");
                self.batch.max_batch_size = n;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "brew", "cafe")
            .map(|dirs| dirs.config_dir().join("brew.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("sqlite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert_eq!("Memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.orders.max_items, 100);
        assert_eq!(config.orders.max_item_quantity, 999);
        assert_eq!(config.batch.max_batch_size, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.batch.max_batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.storage.database_path = PathBuf::new();
        assert!(config.validate().is_err());

        // The memory backend doesn't need a path
        config.storage.backend = StorageBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [orders]
            max_items = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.orders.max_items, 10);
        assert_eq!(config.orders.max_item_quantity, 999);
        assert_eq!(config.batch.max_batch_size, 500);
    }

    #[test]
    fn test_toml_serialization() {
        let config = EngineConfig::in_memory();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[storage]"));
        assert!(toml_str.contains("backend = \"memory\""));
        assert!(toml_str.contains("[batch]"));
    }
}
