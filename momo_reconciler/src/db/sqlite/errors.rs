use thiserror::Error;

use crate::db_types::ConversionError;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Could not convert database row: {0}")]
    ConversionError(#[from] ConversionError),
    #[error("Could not migrate the database: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Buffer #{0} already has a matched notification")]
    BufferAlreadyMatched(i64),
}
