//! Decides which payment buffer, if any, a notification pays for.
//!
//! The decision is a confidence cascade: amount, then transaction id, then sender name, then age. Stronger
//! identifiers override weaker ones. When nothing tells the remaining buffers apart, the matcher reports
//! [`MatchResult::Ambiguous`] instead of guessing.
use chrono::Duration;
use log::*;
use momo_common::helpers::normalize_whitespace_lowercase;

use crate::{db::traits::PaymentBufferStore, db_types::PaymentBuffer, helpers::NotificationCandidate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Matched(i64),
    /// The ids of every buffer that could still be the target, oldest first.
    Ambiguous(Vec<i64>),
    Unmatched,
}

/// A match decision along with the buffers that were considered to reach it.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub result: MatchResult,
    pub considered: Vec<PaymentBuffer>,
}

impl MatchOutcome {
    pub fn matched_buffer(&self) -> Option<&PaymentBuffer> {
        match self.result {
            MatchResult::Matched(id) => self.considered.iter().find(|b| b.id == id),
            _ => None,
        }
    }
}

/// Runs the cascade over `buffers`, which must already be restricted to unverified, eligible buffers expecting
/// exactly `candidate.amount`.
///
/// Each narrowing step keeps the buffers that agree with the notification, unless none do, in which case the step
/// is skipped. After transaction id and sender name, the survivors that were created at or before the notification
/// arrived are counted: exactly one such buffer is matched, anything else is ambiguous.
pub fn resolve(candidate: &NotificationCandidate, buffers: &[PaymentBuffer]) -> MatchResult {
    let mut remaining = buffers.iter().collect::<Vec<_>>();
    remaining.sort_by_key(|b| (b.created_at, b.id));
    match remaining.len() {
        0 => return MatchResult::Unmatched,
        1 => return MatchResult::Matched(remaining[0].id),
        _ => {},
    }

    if let Some(txid) = candidate.transaction_id.as_deref().map(str::trim) {
        remaining = narrow(remaining, |b| b.transaction_id.as_deref().map(str::trim) == Some(txid));
        if let [only] = remaining.as_slice() {
            trace!("🔍️ Transaction id {txid} singles out buffer #{}", only.id);
            return MatchResult::Matched(only.id);
        }
    }

    if let Some(name) = candidate.sender_name.as_deref().map(normalize_whitespace_lowercase) {
        remaining = narrow(remaining, |b| {
            b.sender_name.as_deref().map(normalize_whitespace_lowercase).as_deref() == Some(name.as_str())
        });
        if let [only] = remaining.as_slice() {
            trace!("🔍️ Sender name singles out buffer #{}", only.id);
            return MatchResult::Matched(only.id);
        }
    }

    let preceding = remaining.iter().filter(|b| b.created_at <= candidate.received_at).collect::<Vec<_>>();
    if let [only] = preceding.as_slice() {
        trace!("🔍️ Buffer #{} is the only one created before the notification arrived", only.id);
        return MatchResult::Matched(only.id);
    }
    MatchResult::Ambiguous(remaining.iter().map(|b| b.id).collect())
}

fn narrow<'a, F>(buffers: Vec<&'a PaymentBuffer>, predicate: F) -> Vec<&'a PaymentBuffer>
where F: Fn(&PaymentBuffer) -> bool {
    let subset = buffers.iter().copied().filter(|b| predicate(b)).collect::<Vec<_>>();
    if subset.is_empty() {
        buffers
    } else {
        subset
    }
}

/// Looks up the candidate buffers for a notification and resolves them.
#[derive(Debug, Clone)]
pub struct PaymentMatcher<B> {
    db: B,
    window: Option<Duration>,
}

impl<B> PaymentMatcher<B> {
    /// `window` limits how old a buffer may be, relative to the notification's arrival, to be considered at all.
    pub fn new(db: B, window: Option<Duration>) -> Self {
        Self { db, window }
    }

    pub fn window(&self) -> Option<Duration> {
        self.window
    }
}

impl<B> PaymentMatcher<B>
where B: PaymentBufferStore
{
    pub async fn match_candidate(&self, candidate: &NotificationCandidate) -> Result<MatchOutcome, B::Error> {
        let considered =
            self.db.find_unverified_candidates(candidate.amount, self.window, candidate.received_at).await?;
        let result = resolve(candidate, &considered);
        debug!("🔍️ {} buffers expect {}. Result: {result:?}", considered.len(), candidate.amount);
        Ok(MatchOutcome { result, considered })
    }
}

#[cfg(test)]
mod test {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::db_types::{MinorUnits, OrderId};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 9, minute, 0).unwrap()
    }

    fn buffer(id: i64, created_minute: u32) -> PaymentBuffer {
        PaymentBuffer {
            id,
            order_id: OrderId::from(format!("order-{id}")),
            expected_amount: MinorUnits::from(10_000),
            transaction_id: None,
            sender_name: None,
            raw_notification_text: None,
            verified: false,
            verified_at: None,
            linked_order_id: None,
            eligible: true,
            created_at: at(created_minute),
        }
    }

    fn candidate(received_minute: u32) -> NotificationCandidate {
        NotificationCandidate {
            amount: MinorUnits::from(10_000),
            transaction_id: None,
            sender_name: None,
            raw_text: "Received 10,000 Ks".into(),
            received_at: at(received_minute),
        }
    }

    #[test]
    fn no_buffers_is_unmatched() {
        assert_eq!(resolve(&candidate(30), &[]), MatchResult::Unmatched);
    }

    #[test]
    fn single_buffer_matches_on_amount() {
        assert_eq!(resolve(&candidate(30), &[buffer(1, 10)]), MatchResult::Matched(1));
        // Even if the buffer was created after the notification arrived
        assert_eq!(resolve(&candidate(5), &[buffer(1, 10)]), MatchResult::Matched(1));
    }

    #[test]
    fn indistinguishable_buffers_are_ambiguous() {
        let buffers = [buffer(2, 20), buffer(1, 10)];
        assert_eq!(resolve(&candidate(30), &buffers), MatchResult::Ambiguous(vec![1, 2]));
    }

    #[test]
    fn transaction_id_wins() {
        let mut b2 = buffer(2, 20);
        b2.transaction_id = Some("TXN882".into());
        let buffers = [buffer(1, 10), b2];
        let mut c = candidate(30);
        c.transaction_id = Some("TXN882".into());
        assert_eq!(resolve(&c, &buffers), MatchResult::Matched(2));
    }

    #[test]
    fn unknown_transaction_id_does_not_narrow() {
        let mut b2 = buffer(2, 20);
        b2.transaction_id = Some("TXN100".into());
        let buffers = [buffer(1, 10), b2];
        let mut c = candidate(30);
        c.transaction_id = Some("TXN882".into());
        assert_eq!(resolve(&c, &buffers), MatchResult::Ambiguous(vec![1, 2]));
    }

    #[test]
    fn conflicting_transaction_ids_fall_through_to_sender() {
        let mut b1 = buffer(1, 10);
        b1.transaction_id = Some("TXN882".into());
        b1.sender_name = Some("Daw Mya".into());
        let mut b2 = buffer(2, 20);
        b2.transaction_id = Some("TXN882".into());
        b2.sender_name = Some("Ko  Aung".into());
        let mut c = candidate(30);
        c.transaction_id = Some("TXN882".into());
        c.sender_name = Some("KO AUNG".into());
        assert_eq!(resolve(&c, &[b1, b2, buffer(3, 5)]), MatchResult::Matched(2));
    }

    #[test]
    fn sender_name_is_compared_loosely() {
        let mut b1 = buffer(1, 10);
        b1.sender_name = Some(" ko aung ".into());
        let mut c = candidate(30);
        c.sender_name = Some("KO AUNG".into());
        assert_eq!(resolve(&c, &[b1, buffer(2, 20)]), MatchResult::Matched(1));
    }

    #[test]
    fn only_preceding_buffer_wins_on_age() {
        // Buffer 2 was created after the payment notification arrived, so it cannot be what was paid for.
        let buffers = [buffer(1, 10), buffer(2, 40)];
        assert_eq!(resolve(&candidate(30), &buffers), MatchResult::Matched(1));
    }

    #[test]
    fn no_preceding_buffer_is_ambiguous() {
        let buffers = [buffer(1, 40), buffer(2, 50)];
        assert_eq!(resolve(&candidate(30), &buffers), MatchResult::Ambiguous(vec![1, 2]));
    }

    #[test]
    fn ties_on_creation_time_are_ordered_by_id() {
        let buffers = [buffer(3, 10), buffer(2, 10), buffer(1, 10)];
        assert_eq!(resolve(&candidate(30), &buffers), MatchResult::Ambiguous(vec![1, 2, 3]));
    }
}
