//! Definition storage.
//!
//! The loader consumes this boundary through [`DefinitionStore`]: fetch the
//! complete current definition set, nothing else. No pagination or filtering;
//! the set is small and every reload is a full-snapshot replace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tonic::Code;

pub(crate) mod schema;

pub mod mock;
pub mod postgres;

pub use mock::MockDefinitionStore;
pub use postgres::PostgresDefinitionStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Definition store unavailable: {0}")]
    Unavailable(String),
}

/// One stored definition row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionRecord {
    /// Numeric error code, unique in the table.
    pub code: i32,
    /// Symbolic name, unique in the table.
    pub name: String,
    /// gRPC status as its wire integer; the loader maps it to `tonic::Code`.
    pub status: i32,
    /// Human-readable message.
    pub message: String,
    /// Row creation time, when the store tracks it.
    pub created_at: Option<DateTime<Utc>>,
    /// Row update time, when the store tracks it.
    pub updated_at: Option<DateTime<Utc>>,
}

impl DefinitionRecord {
    /// Record with the given identity and no timestamps.
    pub fn new(code: i32, name: impl Into<String>, status: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            status: status as i32,
            message: message.into(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Interface for fetching the authoritative definition set.
///
/// Implementations:
/// - `PostgresDefinitionStore`: PostgreSQL storage
/// - `MockDefinitionStore`: in-memory mock for testing
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// Fetch all current definitions, ordered by code.
    async fn fetch_all(&self) -> Result<Vec<DefinitionRecord>>;
}
