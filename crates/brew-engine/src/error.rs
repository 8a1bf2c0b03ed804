//! # Engine Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Engine Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │      Core       │  │    Storage      │  │     Batch               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  DbError        │  │  BatchAborted           │ │
//! │  │  InsufficientSt.│  │  (propagated    │  │  { position, source }   │ │
//! │  │  OrderClosed    │  │   untouched)    │  │                         │ │
//! │  │  ...            │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  DbError::InsufficientStock / UnknownIngredient are lifted into Core,  │
//! │  so a caller sees one InsufficientStock regardless of backend.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use brew_core::{CoreError, ValidationError};
use brew_db::DbError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by engine services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule refused the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The storage collaborator failed.
    ///
    /// ## When This Occurs
    /// - Connection, query or transaction failure
    /// - A guarded write found no active row
    #[error("Storage error: {0}")]
    Storage(DbError),

    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A batch hit a non-stock failure and every order it had accepted was
    /// rolled back.
    #[error("Batch aborted at order {position}: {source}")]
    BatchAborted {
        /// Zero-based index of the failing order.
        position: usize,
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// True for a stock shortfall: the one failure a batch records and skips.
    pub fn is_insufficient_stock(&self) -> bool {
        matches!(self, EngineError::Core(CoreError::InsufficientStock { .. }))
    }

    /// True if the caller's input was refused before any work was done.
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Core(CoreError::Validation(_)))
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InsufficientStock {
                ingredient_id,
                available,
                requested,
            } => EngineError::Core(CoreError::InsufficientStock {
                ingredient_id,
                available,
                requested,
            }),
            DbError::UnknownIngredient(id) => EngineError::Core(CoreError::UnknownIngredient(id)),
            other => EngineError::Storage(other),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}
