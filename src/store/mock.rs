//! Mock definition store for testing.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DefinitionRecord, DefinitionStore, Result, StoreError};

/// Mock store holding records in memory, with failure injection.
#[derive(Default)]
pub struct MockDefinitionStore {
    records: RwLock<Vec<DefinitionRecord>>,
    fail_on_fetch: RwLock<bool>,
}

impl MockDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with the given records.
    pub fn with_records(records: Vec<DefinitionRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            fail_on_fetch: RwLock::new(false),
        }
    }

    /// Replace the stored record set.
    pub async fn set_records(&self, records: Vec<DefinitionRecord>) {
        *self.records.write().await = records;
    }

    /// Make subsequent fetches fail.
    pub async fn set_fail_on_fetch(&self, fail: bool) {
        *self.fail_on_fetch.write().await = fail;
    }
}

#[async_trait]
impl DefinitionStore for MockDefinitionStore {
    async fn fetch_all(&self) -> Result<Vec<DefinitionRecord>> {
        if *self.fail_on_fetch.read().await {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(self.records.read().await.clone())
    }
}
