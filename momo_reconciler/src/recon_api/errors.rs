use thiserror::Error;

use crate::db_types::NotificationStatus;

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Notification log entry #{0} does not exist")]
    LogEntryNotFound(i64),
    #[error("Payment buffer #{0} does not exist")]
    BufferNotFound(i64),
    #[error("Notification log entry #{0} has already been resolved by an operator")]
    LogEntryAlreadyResolved(i64),
    #[error("Notification log entry #{0} is {1}. Only unmatched and ambiguous entries can be linked to a buffer")]
    LogEntryNotResolvable(i64, NotificationStatus),
    #[error("Payment buffer #{0} has already been verified")]
    BufferAlreadyVerified(i64),
    #[error("Payment buffer #{0} is no longer eligible for matching")]
    BufferIneligible(i64),
}

#[cfg(feature = "sqlite")]
impl From<crate::db::sqlite::SqliteDatabaseError> for ReconciliationError {
    fn from(e: crate::db::sqlite::SqliteDatabaseError) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}
