use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    config::ReconciliationConfig,
    db::traits::{ClaimResult, InsertLogResult, NotificationLog, PaymentBufferStore, ReconciliationDatabase},
    db_types::{
        NewNotificationLogEntry,
        NewPaymentBuffer,
        NotificationLogEntry,
        NotificationStatus,
        OrderId,
        PaymentBuffer,
    },
    events::{EventProducers, NotificationUnresolvedEvent, PaymentVerifiedEvent},
    helpers::{recent_fingerprints, NotificationCandidate, NotificationExtractor},
    matcher::{MatchResult, PaymentMatcher},
    recon_api::{
        errors::ReconciliationError,
        reconciliation_objects::{InboundNotification, ProcessingOutcome},
    },
};

/// `ReconciliationApi` turns inbound payment notifications into verified payment buffers.
///
/// Every notification ends in exactly one terminal state (see [`ProcessingOutcome`]) and, apart from replays, leaves
/// exactly one entry in the audit log. Buffers are only ever mutated through the store's compare-and-set, so
/// notifications can be processed concurrently.
pub struct ReconciliationApi<B> {
    db: B,
    extractor: NotificationExtractor,
    matcher: PaymentMatcher<B>,
    /// The dedup bucket size, if replays should be detected.
    dedup_bucket: Option<Duration>,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B: Clone> ReconciliationApi<B> {
    pub fn new(db: B, config: &ReconciliationConfig, producers: EventProducers) -> Result<Self, ReconciliationError> {
        let extractor = NotificationExtractor::new(config.grammar.clone())
            .map_err(|e| ReconciliationError::ConfigurationError(e.to_string()))?;
        let matcher = PaymentMatcher::new(db.clone(), config.match_window);
        let dedup_bucket = config.dedup_enabled.then_some(config.dedup_bucket);
        Ok(Self { db, extractor, matcher, dedup_bucket, producers })
    }

    pub fn extractor(&self) -> &NotificationExtractor {
        &self.extractor
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> ReconciliationApi<B>
where
    B: PaymentBufferStore + NotificationLog,
    ReconciliationError: From<<B as ReconciliationDatabase>::Error>,
{
    /// Registers a payment that an order is waiting for.
    pub async fn create_buffer(&self, buffer: NewPaymentBuffer) -> Result<PaymentBuffer, ReconciliationError> {
        if !buffer.expected_amount.is_positive() {
            return Err(ReconciliationError::InvalidRequest(format!(
                "Expected amount must be positive, but was {}",
                buffer.expected_amount
            )));
        }
        let buffer = self.db.create_buffer(buffer).await?;
        info!("🧾️ Order {} is waiting for {} (buffer #{})", buffer.order_id, buffer.expected_amount, buffer.id);
        Ok(buffer)
    }

    pub async fn buffers_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentBuffer>, ReconciliationError> {
        let buffers = self.db.fetch_buffers_for_order(order_id).await?;
        Ok(buffers)
    }

    /// The order system cancelled or expired the order. Its unverified buffers stop taking part in matching, but are
    /// kept for the audit trail. Returns the buffers that changed.
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Vec<PaymentBuffer>, ReconciliationError> {
        let annulled = self.db.annul_buffers_for_order(order_id).await?;
        info!("🧾️ Order {order_id} cancelled. {} buffers are no longer eligible for matching", annulled.len());
        Ok(annulled)
    }

    /// Processes a notification that arrived at `received_at`.
    pub async fn process_notification(
        &self,
        raw_text: &str,
        received_at: DateTime<Utc>,
    ) -> Result<ProcessingOutcome, ReconciliationError> {
        self.process_inbound(InboundNotification::new(raw_text, received_at)).await
    }

    /// Runs one notification through extraction, matching and, if a single buffer is found, the claim.
    ///
    /// Store failures are returned as errors. Nothing is partially written in that case, so the caller can safely
    /// retry the whole call.
    pub async fn process_inbound(
        &self,
        notification: InboundNotification,
    ) -> Result<ProcessingOutcome, ReconciliationError> {
        let fingerprints =
            self.dedup_bucket.map(|b| recent_fingerprints(&notification.raw_text, notification.received_at, b));
        for fp in fingerprints.iter().flatten() {
            if let Some(original) = self.db.fetch_log_entry_by_fingerprint(fp).await? {
                info!("📨️ Notification is a replay of log entry #{}. Ignoring it.", original.id);
                return Ok(ProcessingOutcome::Duplicate { original });
            }
        }
        let fingerprint = fingerprints.map(|[current, _]| current);
        let mut entry = NewNotificationLogEntry::new(
            notification.raw_text.clone(),
            NotificationStatus::Received,
            notification.received_at,
        );
        entry.sender = notification.sender;
        entry.fingerprint = fingerprint;

        let candidate = match self.extractor.extract(&notification.raw_text, notification.received_at) {
            Ok(candidate) => candidate,
            Err(e) => {
                let reason = e.to_string();
                info!("📨️ Notification could not be read: {reason}");
                return self
                    .log_unresolved(entry.with_status(NotificationStatus::Invalid), |log_entry| {
                        ProcessingOutcome::Invalid { log_entry, reason }
                    })
                    .await;
            },
        };
        entry.extracted_amount = Some(candidate.amount);
        entry.transaction_id = candidate.transaction_id.clone();
        entry.sender_name = candidate.sender_name.clone();

        let outcome = self.matcher.match_candidate(&candidate).await?;
        match outcome.result.clone() {
            MatchResult::Matched(buffer_id) => {
                let order_id = match outcome.matched_buffer() {
                    Some(buffer) => buffer.order_id.clone(),
                    None => return Err(ReconciliationError::BufferNotFound(buffer_id)),
                };
                self.claim(buffer_id, &order_id, &candidate, entry).await
            },
            MatchResult::Ambiguous(ids) => {
                info!("📨️ {} buffers expect {}. Leaving it for an operator.", ids.len(), candidate.amount);
                entry.candidate_buffer_ids = ids.clone();
                self.log_unresolved(entry.with_status(NotificationStatus::Ambiguous), |log_entry| {
                    ProcessingOutcome::Ambiguous { log_entry, candidate_buffer_ids: ids }
                })
                .await
            },
            MatchResult::Unmatched => {
                info!("📨️ No buffer is waiting for {}", candidate.amount);
                self.log_unresolved(entry.with_status(NotificationStatus::Unmatched), |log_entry| {
                    ProcessingOutcome::Unmatched { log_entry }
                })
                .await
            },
        }
    }

    async fn claim(
        &self,
        buffer_id: i64,
        order_id: &OrderId,
        candidate: &NotificationCandidate,
        entry: NewNotificationLogEntry,
    ) -> Result<ProcessingOutcome, ReconciliationError> {
        match self.db.claim_buffer(buffer_id, order_id, entry.clone()).await? {
            ClaimResult::Claimed { buffer, log_entry } => {
                info!(
                    "📨️ {} received for order {order_id}. Buffer #{buffer_id} verified by log entry #{}",
                    candidate.amount, log_entry.id
                );
                let event = PaymentVerifiedEvent::new(order_id.clone(), buffer.id, buffer.expected_amount, log_entry.id);
                self.producers.publish_payment_verified(event).await;
                Ok(ProcessingOutcome::Matched { log_entry, buffer })
            },
            ClaimResult::Lost(result) => {
                warn!("📨️ Buffer #{buffer_id} was claimed elsewhere first ({result:?}). Recording as unmatched.");
                self.log_unresolved(entry.with_status(NotificationStatus::Unmatched), |log_entry| {
                    ProcessingOutcome::Unmatched { log_entry }
                })
                .await
            },
            ClaimResult::AlreadyPaid(earlier) => {
                warn!(
                    "📨️ Transaction {} already paid for order {} (log entry #{}). Buffer #{buffer_id} left as it was.",
                    entry.transaction_id.as_deref().unwrap_or_default(),
                    earlier.matched_order_id.as_ref().map(|o| o.as_str()).unwrap_or_default(),
                    earlier.id
                );
                self.log_unresolved(entry.with_status(NotificationStatus::Unmatched), |log_entry| {
                    ProcessingOutcome::Unmatched { log_entry }
                })
                .await
            },
            ClaimResult::Duplicate(original) => {
                info!("📨️ Notification is a replay of log entry #{}. Buffer #{buffer_id} left as it was.", original.id);
                Ok(ProcessingOutcome::Duplicate { original })
            },
        }
    }

    /// Writes the audit entry for an outcome that did not touch any buffer, and alerts the unresolved hooks.
    async fn log_unresolved<F>(
        &self,
        entry: NewNotificationLogEntry,
        outcome: F,
    ) -> Result<ProcessingOutcome, ReconciliationError>
    where
        F: FnOnce(NotificationLogEntry) -> ProcessingOutcome,
    {
        match self.db.insert_log_entry(entry).await? {
            InsertLogResult::Inserted(log_entry) => {
                debug!("📨️ Log entry #{} recorded as {}", log_entry.id, log_entry.status);
                self.producers.publish_notification_unresolved(NotificationUnresolvedEvent::from(&log_entry)).await;
                Ok(outcome(log_entry))
            },
            InsertLogResult::Duplicate(original) => {
                info!("📨️ Notification is a replay of log entry #{}. Ignoring it.", original.id);
                Ok(ProcessingOutcome::Duplicate { original })
            },
        }
    }
}
