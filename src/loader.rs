//! Full-snapshot reload.
//!
//! Fetches the complete definition set, synthesizes the mandatory sentinels
//! when the store lacks them, builds both indices with uniqueness enforced,
//! and publishes the snapshot atomically. Cold start and hot reload share
//! this path. Fetch and build run entirely outside the registry's write
//! lock; publish is the only step that touches it.

use std::collections::HashMap;
use std::sync::Arc;

use tonic::Code;
use tracing::info;

use crate::definition::{ErrorDefinition, CONNECTION_ERROR_NAME, UNKNOWN_NAME};
use crate::registry::{Registry, Snapshot};
use crate::store::{DefinitionStore, StoreError};

/// Errors that can fail a reload.
///
/// Duplicate codes or names are a data error in the authoritative store and
/// are surfaced, never silently dropped. On any failure the registry keeps
/// serving its previous snapshot.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Definition store error: {0}")]
    Store(#[from] StoreError),

    #[error("Duplicate definition code: {0}")]
    DuplicateCode(i32),

    #[error("Duplicate definition name: {0}")]
    DuplicateName(String),
}

/// Fetches definitions and publishes registry snapshots.
pub struct Loader {
    store: Arc<dyn DefinitionStore>,
    registry: Arc<Registry>,
}

impl Loader {
    /// Create a loader publishing into `registry`.
    pub fn new(store: Arc<dyn DefinitionStore>, registry: Arc<Registry>) -> Self {
        Self { store, registry }
    }

    /// The registry this loader publishes into.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Fetch all definitions and publish a fresh snapshot.
    pub async fn reload(&self) -> Result<(), LoadError> {
        let records = self.store.fetch_all().await?;

        let mut definitions = Vec::with_capacity(records.len() + 2);
        for record in &records {
            definitions.push(ErrorDefinition::new(
                record.code,
                record.name.clone(),
                Code::from(record.status),
                record.message.clone(),
            ));
        }
        if !definitions.iter().any(|def| def.name == UNKNOWN_NAME) {
            definitions.push(ErrorDefinition::unknown());
        }
        if !definitions.iter().any(|def| def.name == CONNECTION_ERROR_NAME) {
            definitions.push(ErrorDefinition::connection_error());
        }

        let mut by_code = HashMap::with_capacity(definitions.len());
        let mut by_name = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            if by_code.contains_key(&definition.code) {
                return Err(LoadError::DuplicateCode(definition.code));
            }
            if by_name.contains_key(&definition.name) {
                return Err(LoadError::DuplicateName(definition.name));
            }
            by_code.insert(definition.code, definition.clone());
            by_name.insert(definition.name.clone(), definition);
        }

        let count = by_code.len();
        self.registry.publish(Snapshot::new(by_code, by_name));
        info!(definitions = count, "published registry snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{CONNECTION_ERROR_CODE, UNKNOWN_CODE};
    use crate::store::{DefinitionRecord, MockDefinitionStore};

    fn loader_with(records: Vec<DefinitionRecord>) -> (Loader, Arc<Registry>) {
        let registry = Arc::new(Registry::new());
        let store = Arc::new(MockDefinitionStore::with_records(records));
        (Loader::new(store, registry.clone()), registry)
    }

    #[tokio::test]
    async fn test_reload_synthesizes_sentinels() {
        let (loader, registry) = loader_with(Vec::new());
        loader.reload().await.expect("reload");

        let unknown = registry.lookup_by_name(UNKNOWN_NAME);
        assert_eq!(unknown.code, UNKNOWN_CODE);
        assert_eq!(unknown.status, Code::Unknown);

        let connection = registry.lookup_by_name(CONNECTION_ERROR_NAME);
        assert_eq!(connection.code, CONNECTION_ERROR_CODE);
        assert_eq!(connection.status, Code::Unavailable);
    }

    #[tokio::test]
    async fn test_reload_preserves_store_sentinels() {
        let (loader, registry) = loader_with(vec![DefinitionRecord::new(
            UNKNOWN_CODE,
            UNKNOWN_NAME,
            Code::Unknown,
            "store-provided message",
        )]);
        loader.reload().await.expect("reload");

        let unknown = registry.lookup_by_name(UNKNOWN_NAME);
        assert_eq!(unknown.message, "store-provided message");
    }

    #[tokio::test]
    async fn test_reload_maps_status_to_http() {
        let (loader, registry) = loader_with(vec![DefinitionRecord::new(
            40999,
            "Err_Quota",
            Code::ResourceExhausted,
            "quota exceeded",
        )]);
        loader.reload().await.expect("reload");

        let def = registry.lookup_by_code(40999);
        assert_eq!(def.status, Code::ResourceExhausted);
        assert_eq!(def.http_status, 429);
    }

    #[tokio::test]
    async fn test_reload_rejects_duplicate_code() {
        let (loader, _) = loader_with(vec![
            DefinitionRecord::new(40401, "Err_A", Code::NotFound, ""),
            DefinitionRecord::new(40401, "Err_B", Code::NotFound, ""),
        ]);
        let err = loader.reload().await.expect_err("duplicate code");
        assert!(matches!(err, LoadError::DuplicateCode(40401)));
    }

    #[tokio::test]
    async fn test_reload_rejects_duplicate_name() {
        let (loader, _) = loader_with(vec![
            DefinitionRecord::new(40401, "Err_A", Code::NotFound, ""),
            DefinitionRecord::new(40402, "Err_A", Code::NotFound, ""),
        ]);
        let err = loader.reload().await.expect_err("duplicate name");
        assert!(matches!(err, LoadError::DuplicateName(name) if name == "Err_A"));
    }

    #[tokio::test]
    async fn test_sentinel_code_collision_is_surfaced() {
        // A store row squatting on a sentinel code without its name makes
        // synthesis collide; that is a data error, not something to hide.
        let (loader, _) = loader_with(vec![DefinitionRecord::new(
            UNKNOWN_CODE,
            "Err_Squatter",
            Code::Internal,
            "",
        )]);
        let err = loader.reload().await.expect_err("collision");
        assert!(matches!(err, LoadError::DuplicateCode(UNKNOWN_CODE)));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let registry = Arc::new(Registry::new());
        let store = Arc::new(MockDefinitionStore::with_records(vec![
            DefinitionRecord::new(40401, "Err_NotFound", Code::NotFound, ""),
        ]));
        let loader = Loader::new(store.clone(), registry.clone());
        loader.reload().await.expect("initial reload");

        store.set_fail_on_fetch(true).await;
        loader.reload().await.expect_err("fetch failure");

        // Previous snapshot still serves.
        assert_eq!(registry.lookup_by_code(40401).name, "Err_NotFound");
    }
}
