use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db::{sqlite::SqliteDatabaseError, traits::NewManualResolution},
    db_types::{ManualResolution, OrderId},
};

pub async fn insert_resolution(
    resolution: NewManualResolution,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<ManualResolution, SqliteDatabaseError> {
    let resolution = sqlx::query_as::<_, ManualResolution>(
        "INSERT INTO manual_resolutions (log_entry_id, buffer_id, order_id, operator, note, created_at) VALUES ($1, \
         $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(resolution.log_entry_id)
    .bind(resolution.buffer_id)
    .bind(order_id.as_str())
    .bind(resolution.operator)
    .bind(resolution.note)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(resolution)
}

pub async fn fetch_resolution_for_entry(
    log_entry_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<ManualResolution>, SqliteDatabaseError> {
    let resolution = sqlx::query_as::<_, ManualResolution>("SELECT * FROM manual_resolutions WHERE log_entry_id = $1")
        .bind(log_entry_id)
        .fetch_optional(conn)
        .await?;
    Ok(resolution)
}
