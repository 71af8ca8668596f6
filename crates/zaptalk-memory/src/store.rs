//! Per-user conversation persistence.
//!
//! The transcript is one opaque blob per user. Concurrent turns from the
//! same user race read-modify-write and resolve last-write-wins; Telegram
//! delivers a user's messages in order, so this is acceptable rather than
//! something to mask with locking.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use zaptalk_core::config::DatabaseConfig;

use crate::error::StoreError;

/// Durable mapping from Telegram user id to that user's transcript.
///
/// `get` never fails for a missing user; it returns the empty string.
/// Errors are storage unavailability only.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Stored transcript for `user_id`, or `""` when no row exists.
    async fn get(&self, user_id: i64) -> Result<String, StoreError>;

    /// Upsert the full transcript for `user_id` in a single round-trip.
    async fn save(&self, user_id: i64, transcript: &str) -> Result<(), StoreError>;

    /// Clear the transcript. The row survives — reset, not delete.
    async fn reset(&self, user_id: i64) -> Result<(), StoreError> {
        self.save(user_id, "").await
    }
}

/// Postgres-backed store over a bounded connection pool.
///
/// Pool exhaustion surfaces as `StoreError::Database(PoolTimedOut)` after the
/// configured acquire timeout instead of queuing without limit.
#[derive(Clone)]
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    /// Open the bounded pool. Fails fast if the database is unreachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the pool. Call once at shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn get(&self, user_id: i64) -> Result<String, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT conversation FROM user_memory WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(conversation,)| conversation).unwrap_or_default())
    }

    async fn save(&self, user_id: i64, transcript: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_memory (user_id, conversation) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET conversation = EXCLUDED.conversation",
        )
        .bind(user_id)
        .bind(transcript)
        .execute(&self.pool)
        .await?;
        debug!(user_id, chars = transcript.len(), "conversation saved");
        Ok(())
    }
}

/// In-memory store for tests and local development. Never fails.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<HashMap<i64, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn get(&self, user_id: i64) -> Result<String, StoreError> {
        let map = self.inner.lock().unwrap();
        Ok(map.get(&user_id).cloned().unwrap_or_default())
    }

    async fn save(&self, user_id: i64, transcript: &str) -> Result<(), StoreError> {
        let mut map = self.inner.lock().unwrap();
        map.insert(user_id, transcript.to_string());
        Ok(())
    }
}
