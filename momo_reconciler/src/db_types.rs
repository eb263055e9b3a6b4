//! Data types shared between the reconciliation engine and its database backends.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use momo_common::MinorUnits;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------        OrderId        ---------------------------------------------------------
/// The identifier the external order system uses for an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("Order ids cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     PaymentBuffer      --------------------------------------------------------
/// An expected mobile-money payment for an order, waiting for a notification to confirm it.
///
/// A buffer is mutated at most once, from unverified to verified. Once `verified` is true, `verified_at` and
/// `linked_order_id` are always set. Buffers are never deleted; a cancelled or expired order makes its buffers
/// ineligible instead.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentBuffer {
    pub id: i64,
    /// The order this buffer was created for.
    pub order_id: OrderId,
    pub expected_amount: MinorUnits,
    pub transaction_id: Option<String>,
    pub sender_name: Option<String>,
    /// The text of the notification that verified this buffer, if any.
    pub raw_notification_text: Option<String>,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub linked_order_id: Option<OrderId>,
    /// False once the order system has cancelled or expired the order.
    pub eligible: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   NewPaymentBuffer     --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentBuffer {
    pub order_id: OrderId,
    pub expected_amount: MinorUnits,
    pub transaction_id: Option<String>,
    pub sender_name: Option<String>,
    /// Defaults to the time of insertion when not given.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewPaymentBuffer {
    pub fn new(order_id: OrderId, expected_amount: MinorUnits) -> Self {
        Self { order_id, expected_amount, transaction_id: None, sender_name: None, created_at: None }
    }

    pub fn with_transaction_id<S: Into<String>>(mut self, transaction_id: S) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn with_sender_name<S: Into<String>>(mut self, sender_name: S) -> Self {
        self.sender_name = Some(sender_name.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

//--------------------------------------  NotificationStatus    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// The notification has been received, but not processed. The coordinator never writes this status; it exists for
    /// ingestion channels that persist raw text ahead of processing.
    Received,
    /// The notification verified exactly one payment buffer.
    Matched,
    /// More than one buffer could have been the target, and nothing could tell them apart.
    Ambiguous,
    /// A valid amount was found, but no eligible buffer claimed it.
    Unmatched,
    /// No plausible amount could be extracted from the text.
    Invalid,
}

impl NotificationStatus {
    /// Statuses that need a human to resolve them.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unmatched | Self::Ambiguous)
    }
}

impl Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Matched => "matched",
            Self::Ambiguous => "ambiguous",
            Self::Unmatched => "unmatched",
            Self::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

impl FromStr for NotificationStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "received" => Ok(Self::Received),
            "matched" => Ok(Self::Matched),
            "ambiguous" => Ok(Self::Ambiguous),
            "unmatched" => Ok(Self::Unmatched),
            "invalid" => Ok(Self::Invalid),
            s => Err(ConversionError(format!("Invalid notification status: {s}"))),
        }
    }
}

//--------------------------------------  NotificationLogEntry  --------------------------------------------------------
/// An immutable audit record of one inbound notification and the outcome of processing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLogEntry {
    pub id: i64,
    /// The originator of the message (e.g. the SMS short code), when the ingestion channel knows it.
    pub sender: Option<String>,
    pub message_content: String,
    pub extracted_amount: Option<MinorUnits>,
    pub transaction_id: Option<String>,
    pub sender_name: Option<String>,
    pub status: NotificationStatus,
    pub matched_order_id: Option<OrderId>,
    pub buffer_id: Option<i64>,
    /// Every buffer that was considered for an `ambiguous` outcome, oldest first.
    pub candidate_buffer_ids: Vec<i64>,
    pub fingerprint: Option<String>,
    pub received_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

//-------------------------------------- NewNotificationLogEntry -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotificationLogEntry {
    pub sender: Option<String>,
    pub message_content: String,
    pub extracted_amount: Option<MinorUnits>,
    pub transaction_id: Option<String>,
    pub sender_name: Option<String>,
    pub status: NotificationStatus,
    pub matched_order_id: Option<OrderId>,
    pub buffer_id: Option<i64>,
    pub candidate_buffer_ids: Vec<i64>,
    pub fingerprint: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl NewNotificationLogEntry {
    pub fn new(message_content: String, status: NotificationStatus, received_at: DateTime<Utc>) -> Self {
        Self {
            sender: None,
            message_content,
            extracted_amount: None,
            transaction_id: None,
            sender_name: None,
            status,
            matched_order_id: None,
            buffer_id: None,
            candidate_buffer_ids: Vec::new(),
            fingerprint: None,
            received_at,
        }
    }

    /// Returns a copy of this entry with a different status. A `matched` status keeps the buffer and order links;
    /// any other status drops them.
    pub fn with_status(mut self, status: NotificationStatus) -> Self {
        self.status = status;
        if status != NotificationStatus::Matched {
            self.matched_order_id = None;
            self.buffer_id = None;
        }
        self
    }
}

//--------------------------------------   ManualResolution     --------------------------------------------------------
/// An operator's decision to link an unresolved notification to a payment buffer.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ManualResolution {
    pub id: i64,
    pub log_entry_id: i64,
    pub buffer_id: i64,
    pub order_id: OrderId,
    pub operator: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_strings() {
        for status in [
            NotificationStatus::Received,
            NotificationStatus::Matched,
            NotificationStatus::Ambiguous,
            NotificationStatus::Unmatched,
            NotificationStatus::Invalid,
        ] {
            assert_eq!(status.to_string().parse::<NotificationStatus>().unwrap(), status);
        }
        assert!("lost".parse::<NotificationStatus>().is_err());
        assert!(NotificationStatus::Ambiguous.is_unresolved());
        assert!(!NotificationStatus::Invalid.is_unresolved());
    }

    #[test]
    fn order_ids() {
        assert!("  ".parse::<OrderId>().is_err());
        let id = " T12-0042 ".parse::<OrderId>().unwrap();
        assert_eq!(id.as_str(), "T12-0042");
        assert_eq!(id.to_string(), "#T12-0042");
    }

    #[test]
    fn downgraded_entries_lose_their_links() {
        let mut entry = NewNotificationLogEntry::new("x".into(), NotificationStatus::Matched, Utc::now());
        entry.buffer_id = Some(1);
        entry.matched_order_id = Some("A1".into());
        let entry = entry.with_status(NotificationStatus::Unmatched);
        assert_eq!(entry.buffer_id, None);
        assert_eq!(entry.matched_order_id, None);
    }
}
