use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{MinorUnits, NotificationLogEntry, NotificationStatus, OrderId};

/// Fired once for every buffer that becomes verified, whether by a notification or by an operator. The order system
/// uses it to fulfil the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerifiedEvent {
    pub order_id: OrderId,
    pub buffer_id: i64,
    pub amount: MinorUnits,
    /// The audit entry of the notification that verified the buffer.
    pub log_entry_id: i64,
}

impl PaymentVerifiedEvent {
    pub fn new(order_id: OrderId, buffer_id: i64, amount: MinorUnits, log_entry_id: i64) -> Self {
        Self { order_id, buffer_id, amount, log_entry_id }
    }
}

/// Fired for every notification that was logged without verifying a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationUnresolvedEvent {
    pub log_entry_id: i64,
    pub status: NotificationStatus,
    pub amount: Option<MinorUnits>,
    pub candidate_buffer_ids: Vec<i64>,
    pub received_at: DateTime<Utc>,
}

impl From<&NotificationLogEntry> for NotificationUnresolvedEvent {
    fn from(entry: &NotificationLogEntry) -> Self {
        Self {
            log_entry_id: entry.id,
            status: entry.status,
            amount: entry.extracted_amount,
            candidate_buffer_ids: entry.candidate_buffer_ids.clone(),
            received_at: entry.received_at,
        }
    }
}

