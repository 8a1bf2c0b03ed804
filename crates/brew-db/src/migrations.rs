//! Embedded schema for the SQLite backend.
//!
//! Files under `migrations/sqlite/` are compiled in and applied in name
//! order (`NNN_description.sql`). An applied file is never edited; schema
//! changes go in a new file.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies whatever the `_sqlx_migrations` table says is missing.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(known = MIGRATOR.iter().count(), "Applying pending migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}
