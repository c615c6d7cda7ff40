//! Concurrent, dual-indexed registry of error definitions.
//!
//! The registry holds one immutable [`Snapshot`] at a time. Lookups take the
//! read lock only long enough to clone the snapshot handle, and
//! [`Registry::publish`] takes the write lock only for the pointer swap, so a
//! slow reload never blocks readers. Readers observe either the old pair of
//! indices or the new pair, never a mix.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::definition::{ErrorDefinition, UNKNOWN_NAME};

/// One complete, internally consistent set of definitions with both indices
/// built together.
///
/// Built once per reload by the loader, never mutated in place.
#[derive(Debug, Default)]
pub struct Snapshot {
    by_code: HashMap<i32, ErrorDefinition>,
    by_name: HashMap<String, ErrorDefinition>,
}

impl Snapshot {
    /// Build a snapshot from prebuilt indices.
    ///
    /// Both maps must index the same definition set; the loader is the only
    /// producer and enforces uniqueness before calling this.
    pub(crate) fn new(
        by_code: HashMap<i32, ErrorDefinition>,
        by_name: HashMap<String, ErrorDefinition>,
    ) -> Self {
        Self { by_code, by_name }
    }

    /// Number of definitions in this snapshot.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    /// Whether this snapshot holds no definitions.
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    pub(crate) fn get_by_code(&self, code: i32) -> Option<&ErrorDefinition> {
        self.by_code.get(&code)
    }

    pub(crate) fn get_by_name(&self, name: &str) -> Option<&ErrorDefinition> {
        self.by_name.get(name)
    }
}

/// Shared lookup table of error definitions with atomic whole-snapshot
/// replacement.
#[derive(Debug, Default)]
pub struct Registry {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl Registry {
    /// Create a registry with an empty snapshot.
    ///
    /// Until the first [`publish`](Self::publish), lookups answer with a
    /// synthesized `Unknown` sentinel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a definition by symbolic name.
    ///
    /// Total: unregistered names fall back to the `Unknown` sentinel.
    pub fn lookup_by_name(&self, name: &str) -> ErrorDefinition {
        let snapshot = self.current();
        snapshot
            .get_by_name(name)
            .or_else(|| snapshot.get_by_name(UNKNOWN_NAME))
            .cloned()
            .unwrap_or_else(ErrorDefinition::unknown)
    }

    /// Look up a definition by numeric code.
    ///
    /// Total: unregistered codes fall back to the `Unknown` sentinel.
    pub fn lookup_by_code(&self, code: i32) -> ErrorDefinition {
        let snapshot = self.current();
        snapshot
            .get_by_code(code)
            .or_else(|| snapshot.get_by_name(UNKNOWN_NAME))
            .cloned()
            .unwrap_or_else(ErrorDefinition::unknown)
    }

    /// Number of definitions in the current snapshot.
    pub fn len(&self) -> usize {
        self.current().len()
    }

    /// Whether the current snapshot holds no definitions.
    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    /// Atomically replace both indices as a single unit.
    ///
    /// The write lock is held only for the pointer swap; building the
    /// snapshot happens entirely at the caller.
    pub fn publish(&self, snapshot: Snapshot) {
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(snapshot);
    }

    /// Handle to the snapshot visible at this instant.
    pub(crate) fn current(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
