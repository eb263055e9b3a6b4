use crate::{
    db::traits::{ClaimResult, NewManualResolution, ResolveResult},
    db_types::{NewNotificationLogEntry, OrderId},
};

/// The highest level of behaviour for backends supporting the reconciliation engine.
///
/// Besides connection housekeeping, it offers the composite operations that must be atomic: a buffer mutation and
/// the record that explains it are always committed together, or not at all.
#[allow(async_fn_in_trait)]
pub trait ReconciliationDatabase: Clone {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The URL of the database
    fn url(&self) -> &str;

    /// In a single atomic transaction,
    /// * verifies the buffer with a conditional update guarded by `verified = false` (see
    ///   [`super::PaymentBufferStore::mark_verified`]), linking it to `order_id` and storing the notification text,
    /// * appends `entry` to the audit log with status `matched`.
    ///
    /// If the buffer cannot be claimed, nothing is written and [`ClaimResult::Lost`] is returned. If the entry carries
    /// a transaction id that an earlier `matched` entry already carries, the transaction is rolled back and
    /// [`ClaimResult::AlreadyPaid`] is returned. If the entry's fingerprint is already in the log, the transaction is
    /// rolled back and [`ClaimResult::Duplicate`] is returned.
    async fn claim_buffer(
        &self,
        buffer_id: i64,
        order_id: &OrderId,
        entry: NewNotificationLogEntry,
    ) -> Result<ClaimResult, Self::Error>;

    /// Links an unresolved audit entry to a buffer on an operator's say-so. In a single atomic transaction,
    /// * checks that the entry exists, is `unmatched` or `ambiguous`, and has not been resolved before,
    /// * verifies the buffer for the order it was created for,
    /// * records the [`crate::db_types::ManualResolution`].
    ///
    /// The audit entry itself is never modified.
    async fn resolve_manually(&self, resolution: NewManualResolution) -> Result<ResolveResult, Self::Error>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
