//! PostgreSQL LISTEN/NOTIFY change feed.
//!
//! Consumes notifications emitted by the trigger installed by
//! `PostgresDefinitionStore::migrate`. LISTEN delivers from the moment the
//! listener attaches, so subscription is inherently tail-positioned; `tail`
//! reports the current WAL position so the subscribe-from-tail contract is
//! observable in logs and other feed implementations can carry a real cursor.

use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::{PgPool, Row};
use tracing::debug;

use super::{ChangeEvent, ChangeFeed, FeedError, FeedPosition, Result};

/// PostgreSQL implementation of ChangeFeed.
pub struct PgChangeFeed {
    pool: PgPool,
    channel: String,
    listener: Option<PgListener>,
}

impl PgChangeFeed {
    /// Create a feed over the given pool, listening on `channel`.
    pub fn new(pool: PgPool, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
            listener: None,
        }
    }
}

#[async_trait]
impl ChangeFeed for PgChangeFeed {
    async fn tail(&mut self) -> Result<FeedPosition> {
        let row = sqlx::query("SELECT pg_current_wal_lsn()::text AS lsn")
            .fetch_one(&self.pool)
            .await?;
        Ok(FeedPosition(row.get("lsn")))
    }

    async fn subscribe(&mut self, from: FeedPosition) -> Result<()> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(&self.channel).await?;
        debug!(channel = %self.channel, position = %from, "subscribed to change feed");
        self.listener = Some(listener);
        Ok(())
    }

    async fn recv(&mut self) -> Result<ChangeEvent> {
        let listener = self.listener.as_mut().ok_or(FeedError::Closed)?;
        let notification = listener.recv().await?;
        let event = serde_json::from_str(notification.payload())?;
        Ok(event)
    }
}
