use crate::{
    db::traits::{InsertLogResult, LogQueryFilter, ReconciliationDatabase},
    db_types::{ManualResolution, NewNotificationLogEntry, NotificationLogEntry},
};

/// The append-only audit log of inbound notifications.
#[allow(async_fn_in_trait)]
pub trait NotificationLog: ReconciliationDatabase {
    /// Appends an entry. Entries are never updated or deleted. If the entry has a fingerprint that is already in the
    /// log, nothing is written and the existing entry is returned as [`InsertLogResult::Duplicate`].
    async fn insert_log_entry(&self, entry: NewNotificationLogEntry) -> Result<InsertLogResult, Self::Error>;

    async fn fetch_log_entry(&self, id: i64) -> Result<Option<NotificationLogEntry>, Self::Error>;

    async fn fetch_log_entry_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<NotificationLogEntry>, Self::Error>;

    /// Searches the log. Newest entries come first.
    async fn fetch_log_entries(&self, filter: LogQueryFilter) -> Result<Vec<NotificationLogEntry>, Self::Error>;

    /// `unmatched` and `ambiguous` entries that no operator has resolved yet, oldest first.
    async fn fetch_unresolved_entries(&self) -> Result<Vec<NotificationLogEntry>, Self::Error>;

    async fn fetch_manual_resolution(&self, log_entry_id: i64) -> Result<Option<ManualResolution>, Self::Error>;
}
