use chrono::{DateTime, Utc};

use crate::db_types::{ManualResolution, NotificationLogEntry, NotificationStatus, PaymentBuffer};

/// The outcome of the conditional "unverified → verified" update on a payment buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyBufferResult {
    /// This call performed the transition. Carries the buffer as it is after the update.
    Verified(PaymentBuffer),
    /// Another caller got there first. Carries the buffer, unchanged by this call.
    AlreadyVerified(PaymentBuffer),
    /// The order behind the buffer was cancelled or expired.
    Ineligible(PaymentBuffer),
    NotFound,
}

impl VerifyBufferResult {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertLogResult {
    Inserted(NotificationLogEntry),
    /// An entry with the same fingerprint already exists. Nothing was written.
    Duplicate(NotificationLogEntry),
}

/// The outcome of atomically claiming a buffer and recording the `matched` audit entry for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimResult {
    Claimed { buffer: PaymentBuffer, log_entry: NotificationLogEntry },
    /// The buffer could not be claimed. Nothing was written.
    Lost(VerifyBufferResult),
    /// The notification's transaction id already verified another buffer (the `matched` entry is returned). The
    /// transaction was rolled back and the buffer left as it was.
    AlreadyPaid(NotificationLogEntry),
    /// The notification was already logged. The transaction was rolled back and the buffer left as it was.
    Duplicate(NotificationLogEntry),
}

/// The outcome of an operator linking an unresolved notification to a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveResult {
    Resolved { resolution: ManualResolution, buffer: PaymentBuffer },
    EntryNotFound,
    /// Only `unmatched` and `ambiguous` entries can be linked by hand.
    EntryNotResolvable(NotificationStatus),
    AlreadyResolved(ManualResolution),
    /// The buffer could not be verified. Nothing was written.
    BufferUnavailable(VerifyBufferResult),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewManualResolution {
    pub log_entry_id: i64,
    pub buffer_id: i64,
    pub operator: String,
    pub note: Option<String>,
}

/// Criteria for searching the audit log. An empty filter matches everything. Results are returned newest first.
#[derive(Debug, Clone, Default)]
pub struct LogQueryFilter {
    pub statuses: Vec<NotificationStatus>,
    pub buffer_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl LogQueryFilter {
    pub fn with_status(mut self, status: NotificationStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_buffer_id(mut self, buffer_id: i64) -> Self {
        self.buffer_id = Some(buffer_id);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() && self.buffer_id.is_none() && self.since.is_none() && self.until.is_none()
    }
}
