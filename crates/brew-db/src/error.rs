//! # Storage Error Types
//!
//! Error types for store operations, shared by both backends.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / serde_json::Error        in-memory backend               │
//! │       │                                       │                         │
//! │       ▼                                       ▼                         │
//! │  DbError (this module) ◄──────────────────────┘                         │
//! │       │                                                                 │
//! │       ├── InsufficientStock / UnknownIngredient                        │
//! │       │      └──► lifted into CoreError by brew-engine                 │
//! │       │                                                                 │
//! │       └── everything else                                              │
//! │              └──► EngineError::Storage (propagated untouched)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Result type for store operations.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row for this id, or none in the state a guarded write expects
    /// (e.g. updating an order that was closed meanwhile).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A menu item, ingredient or order id was inserted twice.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A schema CHECK refused the row (negative stock, zero price, ...).
    #[error("Constraint violation: {0}")]
    CheckViolation(String),

    /// A decrement asked for more than is on hand at commit time.
    /// Nothing from the same `apply_adjustments` call was applied.
    #[error("Insufficient stock for {ingredient_id}: available {available}, requested {requested}")]
    InsufficientStock {
        ingredient_id: String,
        available: i64,
        requested: i64,
    },

    /// An adjustment named an ingredient with no inventory row.
    #[error("Unknown ingredient: {0}")]
    UnknownIngredient(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A customization payload could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// No pooled connection freed up within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Constraint failures are classified by sqlx's [`ErrorKind`]. For a unique
/// violation SQLite names the column (`UNIQUE constraint failed: inventory.ingredient_id`);
/// the offending value is filled in by the repository that knows it.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => {
                        let field = message
                            .rsplit(": ")
                            .next()
                            .unwrap_or(message.as_str())
                            .to_string();
                        DbError::duplicate(field, "?")
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::CheckViolation(message)
                    }
                    _ => DbError::QueryFailed(message),
                }
            }
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}
