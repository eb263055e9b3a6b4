use chrono::{DateTime, Duration, Utc};

use crate::{
    db::traits::{ReconciliationDatabase, VerifyBufferResult},
    db_types::{MinorUnits, NewPaymentBuffer, OrderId, PaymentBuffer},
};

/// Storage for the payments that orders are waiting on.
#[allow(async_fn_in_trait)]
pub trait PaymentBufferStore: ReconciliationDatabase {
    /// Stores a new, unverified and eligible buffer and returns it.
    async fn create_buffer(&self, buffer: NewPaymentBuffer) -> Result<PaymentBuffer, Self::Error>;

    async fn fetch_buffer(&self, buffer_id: i64) -> Result<Option<PaymentBuffer>, Self::Error>;

    /// All buffers created for the given order, oldest first.
    async fn fetch_buffers_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentBuffer>, Self::Error>;

    /// Returns the buffers that a notification for `amount` could verify:
    /// * not verified, and still eligible,
    /// * `expected_amount` equal to `amount` exactly,
    /// * if `window` is given, created no earlier than `reference_time - window`.
    ///
    /// Results are ordered by `created_at`, oldest first, with ties broken by id.
    async fn find_unverified_candidates(
        &self,
        amount: MinorUnits,
        window: Option<Duration>,
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<PaymentBuffer>, Self::Error>;

    /// The single mutation point for buffers. Atomically transitions the buffer from unverified to verified, setting
    /// `verified_at`, `linked_order_id` and (if given) the notification text. This is a compare-and-set: of any
    /// number of concurrent callers, exactly one receives [`VerifyBufferResult::Verified`].
    async fn mark_verified(
        &self,
        buffer_id: i64,
        order_id: &OrderId,
        raw_notification_text: Option<&str>,
    ) -> Result<VerifyBufferResult, Self::Error>;

    /// Takes an unverified buffer out of matching, e.g. because its order was cancelled. Returns `true` if this call
    /// changed the buffer. Verified buffers are left alone.
    async fn mark_ineligible(&self, buffer_id: i64) -> Result<bool, Self::Error>;

    /// Marks every unverified buffer of the order as ineligible, returning the buffers that changed.
    async fn annul_buffers_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentBuffer>, Self::Error>;
}
