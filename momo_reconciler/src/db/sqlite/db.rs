use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;
use sqlx::{migrate, SqlitePool};

use super::{buffers, new_pool, notification_logs, resolutions, SqliteDatabaseError};
use crate::{
    db::traits::{
        ClaimResult,
        InsertLogResult,
        LogQueryFilter,
        NewManualResolution,
        NotificationLog,
        PaymentBufferStore,
        ReconciliationDatabase,
        ResolveResult,
        VerifyBufferResult,
    },
    db_types::{
        ManualResolution,
        MinorUnits,
        NewNotificationLogEntry,
        NewPaymentBuffer,
        NotificationLogEntry,
        NotificationStatus,
        OrderId,
        PaymentBuffer,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations are up to date");
        Ok(())
    }
}

impl ReconciliationDatabase for SqliteDatabase {
    type Error = SqliteDatabaseError;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn claim_buffer(
        &self,
        buffer_id: i64,
        order_id: &OrderId,
        entry: NewNotificationLogEntry,
    ) -> Result<ClaimResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        // The conditional update comes first so that this transaction takes the write lock before reading anything.
        let buffer =
            match buffers::mark_verified(buffer_id, order_id, Some(entry.message_content.as_str()), &mut tx).await? {
                VerifyBufferResult::Verified(buffer) => buffer,
                lost => {
                    tx.rollback().await?;
                    debug!("🗃️ Could not claim buffer #{buffer_id}: {lost:?}");
                    return Ok(ClaimResult::Lost(lost));
                },
            };
        if let Some(txid) = entry.transaction_id.as_deref() {
            if let Some(earlier) = notification_logs::fetch_matched_entry_by_transaction_id(txid, &mut tx).await? {
                tx.rollback().await?;
                debug!("🗃️ Claim on buffer #{buffer_id} rolled back. {txid} already paid via log entry #{}", earlier.id);
                return Ok(ClaimResult::AlreadyPaid(earlier));
            }
        }
        let mut entry = entry.with_status(NotificationStatus::Matched);
        entry.buffer_id = Some(buffer.id);
        entry.matched_order_id = Some(order_id.clone());
        match notification_logs::insert_entry(entry, &mut tx).await? {
            InsertLogResult::Inserted(log_entry) => {
                tx.commit().await?;
                debug!("🗃️ Buffer #{buffer_id} claimed for order {order_id} by log entry #{}", log_entry.id);
                Ok(ClaimResult::Claimed { buffer, log_entry })
            },
            InsertLogResult::Duplicate(existing) => {
                tx.rollback().await?;
                debug!("🗃️ Claim on buffer #{buffer_id} rolled back. Log entry #{} came first", existing.id);
                Ok(ClaimResult::Duplicate(existing))
            },
        }
    }

    async fn resolve_manually(&self, resolution: NewManualResolution) -> Result<ResolveResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let entry_id = resolution.log_entry_id;
        let entry = match notification_logs::fetch_entry(entry_id, &mut tx).await? {
            Some(entry) => entry,
            None => {
                tx.rollback().await?;
                return Ok(ResolveResult::EntryNotFound);
            },
        };
        if !entry.status.is_unresolved() {
            tx.rollback().await?;
            return Ok(ResolveResult::EntryNotResolvable(entry.status));
        }
        if let Some(existing) = resolutions::fetch_resolution_for_entry(entry_id, &mut tx).await? {
            tx.rollback().await?;
            return Ok(ResolveResult::AlreadyResolved(existing));
        }
        let order_id = match buffers::fetch_buffer(resolution.buffer_id, &mut tx).await? {
            Some(buffer) => buffer.order_id,
            None => {
                tx.rollback().await?;
                return Ok(ResolveResult::BufferUnavailable(VerifyBufferResult::NotFound));
            },
        };
        let verify =
            buffers::mark_verified(resolution.buffer_id, &order_id, Some(entry.message_content.as_str()), &mut tx)
                .await?;
        let buffer = match verify {
            VerifyBufferResult::Verified(buffer) => buffer,
            other => {
                tx.rollback().await?;
                return Ok(ResolveResult::BufferUnavailable(other));
            },
        };
        let operator = resolution.operator.clone();
        let resolution = resolutions::insert_resolution(resolution, &order_id, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ Log entry #{entry_id} linked to buffer #{} for order {order_id} by {operator}",
            buffer.id
        );
        Ok(ResolveResult::Resolved { resolution, buffer })
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl PaymentBufferStore for SqliteDatabase {
    async fn create_buffer(&self, buffer: NewPaymentBuffer) -> Result<PaymentBuffer, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let buffer = buffers::insert_buffer(buffer, &mut conn).await?;
        debug!("🗃️ Buffer #{} created for order {}, expecting {}", buffer.id, buffer.order_id, buffer.expected_amount);
        Ok(buffer)
    }

    async fn fetch_buffer(&self, buffer_id: i64) -> Result<Option<PaymentBuffer>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        buffers::fetch_buffer(buffer_id, &mut conn).await
    }

    async fn fetch_buffers_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentBuffer>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        buffers::fetch_buffers_for_order(order_id, &mut conn).await
    }

    async fn find_unverified_candidates(
        &self,
        amount: MinorUnits,
        window: Option<Duration>,
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<PaymentBuffer>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        buffers::fetch_unverified_candidates(amount, window, reference_time, &mut conn).await
    }

    async fn mark_verified(
        &self,
        buffer_id: i64,
        order_id: &OrderId,
        raw_notification_text: Option<&str>,
    ) -> Result<VerifyBufferResult, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        buffers::mark_verified(buffer_id, order_id, raw_notification_text, &mut conn).await
    }

    async fn mark_ineligible(&self, buffer_id: i64) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let changed = buffers::mark_ineligible(buffer_id, &mut conn).await?;
        if changed {
            debug!("🗃️ Buffer #{buffer_id} is no longer eligible for matching");
        }
        Ok(changed)
    }

    async fn annul_buffers_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentBuffer>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let annulled = buffers::annul_buffers_for_order(order_id, &mut conn).await?;
        debug!("🗃️ {} buffers for order {order_id} are no longer eligible for matching", annulled.len());
        Ok(annulled)
    }
}

impl NotificationLog for SqliteDatabase {
    async fn insert_log_entry(&self, entry: NewNotificationLogEntry) -> Result<InsertLogResult, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        notification_logs::insert_entry(entry, &mut conn).await
    }

    async fn fetch_log_entry(&self, id: i64) -> Result<Option<NotificationLogEntry>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        notification_logs::fetch_entry(id, &mut conn).await
    }

    async fn fetch_log_entry_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<NotificationLogEntry>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        notification_logs::fetch_entry_by_fingerprint(fingerprint, &mut conn).await
    }

    async fn fetch_log_entries(&self, filter: LogQueryFilter) -> Result<Vec<NotificationLogEntry>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        notification_logs::fetch_entries(filter, &mut conn).await
    }

    async fn fetch_unresolved_entries(&self) -> Result<Vec<NotificationLogEntry>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        notification_logs::fetch_unresolved_entries(&mut conn).await
    }

    async fn fetch_manual_resolution(&self, log_entry_id: i64) -> Result<Option<ManualResolution>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        resolutions::fetch_resolution_for_entry(log_entry_id, &mut conn).await
    }
}
