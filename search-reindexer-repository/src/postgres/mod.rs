//! PostgreSQL implementations of the lock and coverage stores.

mod coverage_store;
mod lock_store;

pub use coverage_store::PostgresCoverageStore;
pub use lock_store::PostgresReindexLockStore;

use crate::errors::StoreError;

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("src/postgres/migrations").run(pool).await?;
    Ok(())
}

pub(crate) fn to_db_count(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::invalid_row(format!("count {value} overflows BIGINT")))
}

pub(crate) fn from_db_count(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::invalid_row(format!("negative count {value}")))
}
