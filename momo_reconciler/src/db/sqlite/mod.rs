pub mod buffers;
pub mod db;
mod errors;
pub mod notification_logs;
pub mod resolutions;

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
