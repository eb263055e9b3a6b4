use chrono::{DateTime, Duration, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::{sqlite::SqliteDatabaseError, traits::VerifyBufferResult},
    db_types::{MinorUnits, NewPaymentBuffer, OrderId, PaymentBuffer},
};

const BUFFER_COLUMNS: &str = "id, order_id, expected_amount, transaction_id, sender_name, raw_notification_text, \
                              verified, verified_at, linked_order_id, eligible, created_at";

/// Inserts a new payment buffer using the given connection. This is not atomic on its own; embed the call in a
/// transaction and pass `&mut *tx` if it has to be.
pub async fn insert_buffer(
    buffer: NewPaymentBuffer,
    conn: &mut SqliteConnection,
) -> Result<PaymentBuffer, SqliteDatabaseError> {
    let created_at = buffer.created_at.unwrap_or_else(Utc::now);
    let sql = format!(
        "INSERT INTO payment_buffers (order_id, expected_amount, transaction_id, sender_name, created_at) VALUES ($1, \
         $2, $3, $4, $5) RETURNING {BUFFER_COLUMNS}"
    );
    let buffer = sqlx::query_as::<_, PaymentBuffer>(&sql)
        .bind(buffer.order_id)
        .bind(buffer.expected_amount)
        .bind(buffer.transaction_id)
        .bind(buffer.sender_name)
        .bind(created_at)
        .fetch_one(conn)
        .await?;
    Ok(buffer)
}

pub async fn fetch_buffer(buffer_id: i64, conn: &mut SqliteConnection) -> Result<Option<PaymentBuffer>, SqliteDatabaseError> {
    let sql = format!("SELECT {BUFFER_COLUMNS} FROM payment_buffers WHERE id = $1");
    let buffer = sqlx::query_as::<_, PaymentBuffer>(&sql).bind(buffer_id).fetch_optional(conn).await?;
    Ok(buffer)
}

pub async fn fetch_buffers_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentBuffer>, SqliteDatabaseError> {
    let sql = format!(
        "SELECT {BUFFER_COLUMNS} FROM payment_buffers WHERE order_id = $1 ORDER BY julianday(created_at) ASC, id ASC"
    );
    let buffers = sqlx::query_as::<_, PaymentBuffer>(&sql).bind(order_id.as_str()).fetch_all(conn).await?;
    Ok(buffers)
}

/// Fetches the unverified, eligible buffers expecting exactly `amount`, oldest first. When a `window` is given, only
/// buffers created within `window` of `reference_time` are returned.
pub async fn fetch_unverified_candidates(
    amount: MinorUnits,
    window: Option<Duration>,
    reference_time: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentBuffer>, SqliteDatabaseError> {
    let sql = format!(
        "SELECT {BUFFER_COLUMNS} FROM payment_buffers WHERE expected_amount = $1 AND verified = 0 AND eligible = 1 \
         ORDER BY julianday(created_at) ASC, id ASC"
    );
    let mut buffers = sqlx::query_as::<_, PaymentBuffer>(&sql).bind(amount).fetch_all(conn).await?;
    if let Some(window) = window {
        let cutoff = reference_time - window;
        buffers.retain(|b| b.created_at >= cutoff);
    }
    trace!("🗃️ {} unverified buffers expect {amount}", buffers.len());
    Ok(buffers)
}

/// The compare-and-set on a buffer's `verified` flag. The `UPDATE` only touches the row if it is still unverified
/// and eligible, so concurrent callers cannot both succeed. When nothing was updated, the buffer is re-read to
/// report why.
pub async fn mark_verified(
    buffer_id: i64,
    order_id: &OrderId,
    raw_notification_text: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<VerifyBufferResult, SqliteDatabaseError> {
    let sql = format!(
        "UPDATE payment_buffers SET verified = 1, verified_at = $1, linked_order_id = $2, raw_notification_text = \
         COALESCE($3, raw_notification_text) WHERE id = $4 AND verified = 0 AND eligible = 1 RETURNING \
         {BUFFER_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, PaymentBuffer>(&sql)
        .bind(Utc::now())
        .bind(order_id.as_str())
        .bind(raw_notification_text)
        .bind(buffer_id)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(buffer) = updated {
        trace!("🗃️ Buffer #{buffer_id} verified for order {order_id}");
        return Ok(VerifyBufferResult::Verified(buffer));
    }
    let result = match fetch_buffer(buffer_id, conn).await? {
        None => VerifyBufferResult::NotFound,
        Some(b) if b.verified => VerifyBufferResult::AlreadyVerified(b),
        Some(b) => VerifyBufferResult::Ineligible(b),
    };
    Ok(result)
}

pub async fn mark_ineligible(buffer_id: i64, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE payment_buffers SET eligible = 0 WHERE id = $1 AND verified = 0 AND eligible = 1")
        .bind(buffer_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn annul_buffers_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentBuffer>, SqliteDatabaseError> {
    let sql = format!(
        "UPDATE payment_buffers SET eligible = 0 WHERE order_id = $1 AND verified = 0 AND eligible = 1 RETURNING \
         {BUFFER_COLUMNS}"
    );
    let buffers = sqlx::query_as::<_, PaymentBuffer>(&sql).bind(order_id.as_str()).fetch_all(conn).await?;
    Ok(buffers)
}
