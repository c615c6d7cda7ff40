//! Change feed.
//!
//! Row-level change notifications for the definitions table. The watcher
//! subscribes at the feed's current tail and triggers a full reload for every
//! mutating event that targets the watched table.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

pub mod mock;
pub mod postgres;

pub use mock::MockChangeFeed;
pub use postgres::PgChangeFeed;

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Errors that can occur consuming the change feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Change feed closed")]
    Closed,
}

/// Row-level mutation kind.
///
/// The set is closed; every delivered action is a mutation of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

/// One row-level change notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeEvent {
    /// Schema of the mutated table.
    pub schema: String,
    /// Name of the mutated table.
    pub table: String,
    /// Mutation kind.
    pub action: ChangeAction,
}

/// Opaque feed tail position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPosition(pub String);

impl fmt::Display for FeedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interface for consuming row-level change notifications.
///
/// Implementations:
/// - `PgChangeFeed`: PostgreSQL LISTEN/NOTIFY
/// - `MockChangeFeed`: in-memory channel for testing
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Current tail position of the feed.
    async fn tail(&mut self) -> Result<FeedPosition>;

    /// Start delivery from the given position.
    async fn subscribe(&mut self, from: FeedPosition) -> Result<()>;

    /// Await the next notification. Blocks until one arrives or the feed
    /// fails.
    async fn recv(&mut self) -> Result<ChangeEvent>;
}
