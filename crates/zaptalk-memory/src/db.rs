use sqlx::PgPool;

use crate::error::StoreError;

/// One row per user; the whole conversation lives in a single text blob
/// because every access reads the full history, appends, and writes it back.
const CREATE_USER_MEMORY_SQL: &str = "CREATE TABLE IF NOT EXISTS user_memory (
    user_id      BIGINT PRIMARY KEY,
    conversation TEXT NOT NULL
)";

/// Initialise the conversation table. Safe to call on every startup (idempotent).
pub async fn init_db(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(CREATE_USER_MEMORY_SQL).execute(pool).await?;
    Ok(())
}
