//! In-memory [`SearchIndex`] for tests and dry local runs.
//!
//! Documents are kept in a map keyed by `id`, so repeated upserts of the same
//! id overwrite rather than duplicate, matching the idempotent semantics
//! expected of a real index.
//!
//! A poisoned lock is recovered rather than reported: every write is a
//! single map insert, so the map is never left half-updated.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{IndexDocument, UpsertOutcome};
use crate::traits::SearchIndex;

#[derive(Default)]
pub struct MemoryIndex {
    docs: RwLock<BTreeMap<String, IndexDocument>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, IndexDocument>> {
        self.docs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, IndexDocument>> {
        self.docs.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<IndexDocument> {
        self.read().get(id).cloned()
    }

    /// All stored documents whose `parent_id` is `parent_id`, in id order.
    pub fn by_parent(&self, parent_id: &str) -> Vec<IndexDocument> {
        self.read()
            .values()
            .filter(|d| d.parent_id == parent_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    fn kind(&self) -> &str {
        "memory"
    }

    async fn upsert_batch(&self, docs: &[IndexDocument]) -> Result<UpsertOutcome> {
        let mut map = self.write();
        for doc in docs {
            map.insert(doc.id.clone(), doc.clone());
        }
        Ok(UpsertOutcome {
            processed: docs.len(),
            success: true,
        })
    }
}
