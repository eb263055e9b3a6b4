use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{
        LogQueryFilter,
        NewManualResolution,
        NotificationLog,
        PaymentBufferStore,
        ReconciliationDatabase,
        ResolveResult,
        VerifyBufferResult,
    },
    db_types::{ManualResolution, NotificationLogEntry, PaymentBuffer},
    events::{EventProducers, PaymentVerifiedEvent},
    recon_api::errors::ReconciliationError,
};

/// Support and audit access to the reconciliation engine.
///
/// Besides reading the audit log, operators can link an `unmatched` or `ambiguous` notification to the buffer it
/// actually paid for. The link is recorded as a [`ManualResolution`]; the log entry itself is never modified.
pub struct AdminApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for AdminApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AdminApi")
    }
}

impl<B> AdminApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> AdminApi<B>
where
    B: PaymentBufferStore + NotificationLog,
    ReconciliationError: From<<B as ReconciliationDatabase>::Error>,
{
    pub async fn fetch_log_entry(&self, id: i64) -> Result<NotificationLogEntry, ReconciliationError> {
        self.db.fetch_log_entry(id).await?.ok_or(ReconciliationError::LogEntryNotFound(id))
    }

    /// Searches the audit log, newest entries first.
    pub async fn fetch_log_entries(
        &self,
        filter: LogQueryFilter,
    ) -> Result<Vec<NotificationLogEntry>, ReconciliationError> {
        let entries = self.db.fetch_log_entries(filter).await?;
        Ok(entries)
    }

    /// Notifications that still need an operator, oldest first.
    pub async fn unresolved_entries(&self) -> Result<Vec<NotificationLogEntry>, ReconciliationError> {
        let entries = self.db.fetch_unresolved_entries().await?;
        Ok(entries)
    }

    pub async fn manual_resolution(&self, log_entry_id: i64) -> Result<Option<ManualResolution>, ReconciliationError> {
        let resolution = self.db.fetch_manual_resolution(log_entry_id).await?;
        Ok(resolution)
    }

    pub async fn fetch_buffer(&self, buffer_id: i64) -> Result<PaymentBuffer, ReconciliationError> {
        self.db.fetch_buffer(buffer_id).await?.ok_or(ReconciliationError::BufferNotFound(buffer_id))
    }

    /// Links an unresolved notification to a buffer and verifies the buffer, exactly as an automatic match would.
    /// On success, the order behind the buffer is signalled through the payment verified hooks.
    pub async fn link_entry_to_buffer(
        &self,
        log_entry_id: i64,
        buffer_id: i64,
        operator: &str,
        note: Option<String>,
    ) -> Result<(ManualResolution, PaymentBuffer), ReconciliationError> {
        let operator = operator.trim();
        if operator.is_empty() {
            return Err(ReconciliationError::InvalidRequest("Manual resolutions must name the operator".into()));
        }
        let request = NewManualResolution { log_entry_id, buffer_id, operator: operator.to_string(), note };
        match self.db.resolve_manually(request).await? {
            ResolveResult::Resolved { resolution, buffer } => {
                info!(
                    "🧑‍💼️ {operator} linked log entry #{log_entry_id} to buffer #{buffer_id}. Order {} is paid.",
                    buffer.order_id
                );
                let event =
                    PaymentVerifiedEvent::new(buffer.order_id.clone(), buffer.id, buffer.expected_amount, log_entry_id);
                self.producers.publish_payment_verified(event).await;
                Ok((resolution, buffer))
            },
            ResolveResult::EntryNotFound => Err(ReconciliationError::LogEntryNotFound(log_entry_id)),
            ResolveResult::EntryNotResolvable(status) => {
                Err(ReconciliationError::LogEntryNotResolvable(log_entry_id, status))
            },
            ResolveResult::AlreadyResolved(existing) => {
                warn!(
                    "🧑‍💼️ Log entry #{log_entry_id} was already linked to buffer #{} by {}",
                    existing.buffer_id, existing.operator
                );
                Err(ReconciliationError::LogEntryAlreadyResolved(log_entry_id))
            },
            ResolveResult::BufferUnavailable(result) => Err(match result {
                VerifyBufferResult::NotFound => ReconciliationError::BufferNotFound(buffer_id),
                VerifyBufferResult::AlreadyVerified(_) => ReconciliationError::BufferAlreadyVerified(buffer_id),
                VerifyBufferResult::Ineligible(_) => ReconciliationError::BufferIneligible(buffer_id),
                VerifyBufferResult::Verified(_) => ReconciliationError::DatabaseError(format!(
                    "Buffer #{buffer_id} was verified, but the resolution was not recorded"
                )),
            }),
        }
    }
}
