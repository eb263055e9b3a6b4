use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{NotificationLogEntry, NotificationStatus, PaymentBuffer};

/// A notification as delivered by an ingestion channel (webhook, polling job, or a manual paste).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundNotification {
    pub raw_text: String,
    pub received_at: DateTime<Utc>,
    /// The originator of the message, such as the SMS short code, if the channel knows it.
    pub sender: Option<String>,
}

impl InboundNotification {
    pub fn new<S: Into<String>>(raw_text: S, received_at: DateTime<Utc>) -> Self {
        Self { raw_text: raw_text.into(), received_at, sender: None }
    }

    pub fn with_sender<S: Into<String>>(mut self, sender: S) -> Self {
        self.sender = Some(sender.into());
        self
    }
}

/// The terminal result of processing one notification. Every variant except `Duplicate` corresponds to exactly one
/// new audit log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// The notification verified `buffer`.
    Matched { log_entry: NotificationLogEntry, buffer: PaymentBuffer },
    /// Several buffers could have been the target. None of them were touched.
    Ambiguous { log_entry: NotificationLogEntry, candidate_buffer_ids: Vec<i64> },
    /// A valid amount, but no buffer to claim. This includes losing a race for a buffer to another notification.
    Unmatched { log_entry: NotificationLogEntry },
    /// No plausible amount could be found in the text.
    Invalid { log_entry: NotificationLogEntry, reason: String },
    /// The same notification was already processed. Carries the entry that was written the first time.
    Duplicate { original: NotificationLogEntry },
}

impl ProcessingOutcome {
    pub fn log_entry(&self) -> &NotificationLogEntry {
        match self {
            Self::Matched { log_entry, .. } |
            Self::Ambiguous { log_entry, .. } |
            Self::Unmatched { log_entry } |
            Self::Invalid { log_entry, .. } => log_entry,
            Self::Duplicate { original } => original,
        }
    }

    /// The status recorded in the audit log for this notification.
    pub fn status(&self) -> NotificationStatus {
        self.log_entry().status
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Matched { .. } => "Matched",
            Self::Ambiguous { .. } => "Ambiguous",
            Self::Unmatched { .. } => "Unmatched",
            Self::Invalid { .. } => "Invalid",
            Self::Duplicate { .. } => "Duplicate",
        }
    }
}
