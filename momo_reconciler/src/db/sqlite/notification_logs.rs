use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::{
        sqlite::SqliteDatabaseError,
        traits::{InsertLogResult, LogQueryFilter},
    },
    db_types::{ConversionError, MinorUnits, NewNotificationLogEntry, NotificationLogEntry, OrderId},
};

const LOG_COLUMNS: &str = "id, sender, message_content, extracted_amount, transaction_id, sender_name, status, \
                           matched_order_id, buffer_id, candidate_buffer_ids, fingerprint, received_at, created_at";

/// The row as stored. Statuses are stored as text and the candidate list as a JSON array.
#[derive(Debug, Clone, FromRow)]
struct NotificationLogRow {
    id: i64,
    sender: Option<String>,
    message_content: String,
    extracted_amount: Option<MinorUnits>,
    transaction_id: Option<String>,
    sender_name: Option<String>,
    status: String,
    matched_order_id: Option<OrderId>,
    buffer_id: Option<i64>,
    candidate_buffer_ids: String,
    fingerprint: Option<String>,
    received_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationLogRow> for NotificationLogEntry {
    type Error = ConversionError;

    fn try_from(row: NotificationLogRow) -> Result<Self, Self::Error> {
        let status = row.status.parse()?;
        let candidate_buffer_ids = serde_json::from_str::<Vec<i64>>(&row.candidate_buffer_ids)
            .map_err(|e| ConversionError(format!("Invalid candidate list on log entry #{}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            sender: row.sender,
            message_content: row.message_content,
            extracted_amount: row.extracted_amount,
            transaction_id: row.transaction_id,
            sender_name: row.sender_name,
            status,
            matched_order_id: row.matched_order_id,
            buffer_id: row.buffer_id,
            candidate_buffer_ids,
            fingerprint: row.fingerprint,
            received_at: row.received_at,
            created_at: row.created_at,
        })
    }
}

fn into_entries(rows: Vec<NotificationLogRow>) -> Result<Vec<NotificationLogEntry>, SqliteDatabaseError> {
    let entries = rows.into_iter().map(NotificationLogEntry::try_from).collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Appends an entry to the log.
///
/// If the entry's fingerprint is already present, nothing is written and the original entry is returned as a
/// duplicate. Any other constraint violation (e.g. a second `matched` entry for the same buffer) is an error.
pub async fn insert_entry(
    entry: NewNotificationLogEntry,
    conn: &mut SqliteConnection,
) -> Result<InsertLogResult, SqliteDatabaseError> {
    let candidates = serde_json::to_string(&entry.candidate_buffer_ids)
        .map_err(|e| SqliteDatabaseError::QueryError(format!("Could not serialize candidate buffers: {e}")))?;
    let sql = format!(
        "INSERT INTO notification_logs (sender, message_content, extracted_amount, transaction_id, sender_name, \
         status, matched_order_id, buffer_id, candidate_buffer_ids, fingerprint, received_at, created_at) VALUES ($1, \
         $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {LOG_COLUMNS}"
    );
    let result = sqlx::query_as::<_, NotificationLogRow>(&sql)
        .bind(entry.sender)
        .bind(entry.message_content)
        .bind(entry.extracted_amount)
        .bind(entry.transaction_id)
        .bind(entry.sender_name)
        .bind(entry.status.to_string())
        .bind(entry.matched_order_id)
        .bind(entry.buffer_id)
        .bind(candidates)
        .bind(entry.fingerprint.as_deref())
        .bind(entry.received_at)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await;
    match result {
        Ok(row) => {
            let entry = NotificationLogEntry::try_from(row)?;
            trace!("🗃️ Log entry #{} saved with status {}", entry.id, entry.status);
            Ok(InsertLogResult::Inserted(entry))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            if let Some(fingerprint) = entry.fingerprint.as_deref() {
                if let Some(existing) = fetch_entry_by_fingerprint(fingerprint, conn).await? {
                    debug!("🗃️ Notification is a duplicate of log entry #{}", existing.id);
                    return Ok(InsertLogResult::Duplicate(existing));
                }
            }
            match entry.buffer_id {
                Some(id) => Err(SqliteDatabaseError::BufferAlreadyMatched(id)),
                None => Err(SqliteDatabaseError::QueryError(e.to_string())),
            }
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_entry(id: i64, conn: &mut SqliteConnection) -> Result<Option<NotificationLogEntry>, SqliteDatabaseError> {
    let sql = format!("SELECT {LOG_COLUMNS} FROM notification_logs WHERE id = $1");
    let row = sqlx::query_as::<_, NotificationLogRow>(&sql).bind(id).fetch_optional(conn).await?;
    let entry = row.map(NotificationLogEntry::try_from).transpose()?;
    Ok(entry)
}

pub async fn fetch_entry_by_fingerprint(
    fingerprint: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<NotificationLogEntry>, SqliteDatabaseError> {
    let sql = format!("SELECT {LOG_COLUMNS} FROM notification_logs WHERE fingerprint = $1");
    let row = sqlx::query_as::<_, NotificationLogRow>(&sql).bind(fingerprint).fetch_optional(conn).await?;
    let entry = row.map(NotificationLogEntry::try_from).transpose()?;
    Ok(entry)
}

/// The `matched` entry that already paid for the provider's transaction `transaction_id`, if there is one.
pub async fn fetch_matched_entry_by_transaction_id(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<NotificationLogEntry>, SqliteDatabaseError> {
    let sql =
        format!("SELECT {LOG_COLUMNS} FROM notification_logs WHERE status = 'matched' AND transaction_id = $1 LIMIT 1");
    let row = sqlx::query_as::<_, NotificationLogRow>(&sql).bind(transaction_id).fetch_optional(conn).await?;
    let entry = row.map(NotificationLogEntry::try_from).transpose()?;
    Ok(entry)
}

pub async fn fetch_entries(
    filter: LogQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<NotificationLogEntry>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {LOG_COLUMNS} FROM notification_logs"));
    if !filter.is_empty() {
        builder.push(" WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if !filter.statuses.is_empty() {
        let statuses = filter.statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(buffer_id) = filter.buffer_id {
        where_clause.push("buffer_id = ");
        where_clause.push_bind_unseparated(buffer_id);
    }
    if let Some(since) = filter.since {
        where_clause.push("julianday(received_at) >= julianday(");
        where_clause.push_bind_unseparated(since);
        where_clause.push_unseparated(")");
    }
    if let Some(until) = filter.until {
        where_clause.push("julianday(received_at) <= julianday(");
        where_clause.push_bind_unseparated(until);
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY julianday(received_at) DESC, id DESC");
    if let Some(limit) = filter.limit {
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(limit));
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    let rows = builder.build_query_as::<NotificationLogRow>().fetch_all(conn).await?;
    into_entries(rows)
}

/// `unmatched` and `ambiguous` entries without a manual resolution, oldest first.
pub async fn fetch_unresolved_entries(
    conn: &mut SqliteConnection,
) -> Result<Vec<NotificationLogEntry>, SqliteDatabaseError> {
    let sql = format!(
        "SELECT {LOG_COLUMNS} FROM notification_logs WHERE status IN ('unmatched', 'ambiguous') AND id NOT IN (SELECT \
         log_entry_id FROM manual_resolutions) ORDER BY julianday(received_at) ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, NotificationLogRow>(&sql).fetch_all(conn).await?;
    into_entries(rows)
}
