//! Re-index pipeline orchestration.
//!
//! Coordinates the flow for one source object:
//!
//! ```text
//! fetch(name) → decode → chunk_text → assemble_documents → upsert_batch
//! ```
//!
//! The middle three stages are pure functions ([`prepare_documents`]). The
//! outer two are the [`ObjectStore`] and [`SearchIndex`] collaborators.
//! [`Reindexer::reindex`] never returns an error: every failure is converted
//! into [`ReindexOutcome::Failed`] with a stable error code. Nothing is
//! retried here; retry policy belongs to the caller.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::assemble::assemble_documents;
use crate::chunk::chunk_text;
use crate::config::Config;
use crate::decode::decode;
use crate::error::ReindexError;
use crate::index::build_index;
use crate::models::{IndexDocument, PrefixReport, ReindexOutcome};
use crate::store::build_store;
use crate::traits::{ObjectStore, SearchIndex};

/// Index documents prepared from one object's bytes.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub documents: Vec<IndexDocument>,
    /// The bytes were not valid UTF-8 and were decoded with the single-byte
    /// fallback.
    pub lossy: bool,
    /// Decoded length in characters.
    pub text_chars: usize,
}

/// Decode, chunk, and assemble one object. Pure; no I/O.
pub fn prepare_documents(name: &str, raw: &[u8], max_chars: usize, url: &str) -> Prepared {
    let decoded = decode(raw);
    let chunks = chunk_text(&decoded.text, max_chars);
    Prepared {
        documents: assemble_documents(name, &chunks, url),
        lossy: decoded.lossy,
        text_chars: decoded.text.chars().count(),
    }
}

/// Runs the pipeline against a store and an index.
///
/// Holds no mutable state, so one instance can serve concurrent calls.
#[derive(Clone)]
pub struct Reindexer {
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn SearchIndex>,
    max_chars: usize,
}

impl Reindexer {
    pub fn new(store: Arc<dyn ObjectStore>, index: Arc<dyn SearchIndex>, max_chars: usize) -> Self {
        Self {
            store,
            index,
            max_chars,
        }
    }

    /// Build the configured store and index.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            build_store(&config.store)?,
            build_index(&config.index)?,
            config.chunking.max_chars,
        ))
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Re-index a single object by name.
    ///
    /// # Outcomes
    ///
    /// - [`ReindexOutcome::Indexed`] — chunks were upserted; carries the
    ///   index's processed count and success flag.
    /// - [`ReindexOutcome::Empty`] — the object decoded to empty text; the
    ///   index is not called.
    /// - [`ReindexOutcome::Failed`] — empty `name` (checked before any
    ///   fetch), fetch failure, or upsert failure.
    pub async fn reindex(&self, name: &str) -> ReindexOutcome {
        match self.try_reindex(name).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(name, code = err.code(), error = %err, "reindex failed");
                ReindexOutcome::Failed(err)
            }
        }
    }

    async fn try_reindex(&self, name: &str) -> Result<ReindexOutcome, ReindexError> {
        let prepared = self.fetch_and_prepare(name).await?;
        let documents = prepared.documents;

        if documents.is_empty() {
            info!(name, "empty document, nothing to index");
            return Ok(ReindexOutcome::Empty {
                name: name.to_string(),
                parent_id: name.to_string(),
            });
        }

        info!(name, documents = documents.len(), index = self.index.kind(), "upserting");
        let result = self
            .index
            .upsert_batch(&documents)
            .await
            .map_err(|source| ReindexError::Upsert {
                name: name.to_string(),
                count: documents.len(),
                source,
            })?;

        Ok(ReindexOutcome::Indexed {
            name: name.to_string(),
            parent_id: name.to_string(),
            chunk_count: documents.len(),
            upserted_count: result.processed,
            success: result.success,
        })
    }

    /// Run fetch → decode → chunk → assemble without touching the index.
    pub async fn preview(&self, name: &str) -> Result<Prepared, ReindexError> {
        self.fetch_and_prepare(name).await
    }

    async fn fetch_and_prepare(&self, name: &str) -> Result<Prepared, ReindexError> {
        if name.is_empty() {
            return Err(ReindexError::InvalidInput(
                "'name' must be a non-empty object name".to_string(),
            ));
        }

        info!(name, store = self.store.kind(), "fetching");
        let raw = self
            .store
            .fetch(name)
            .await
            .map_err(|source| ReindexError::Fetch {
                name: name.to_string(),
                source,
            })?;

        let url = self.store.public_url(name);
        let prepared = prepare_documents(name, &raw, self.max_chars, &url);
        if prepared.lossy {
            warn!(name, "content is not valid UTF-8; decoded with single-byte fallback");
        }
        info!(
            name,
            bytes = raw.len(),
            chars = prepared.text_chars,
            chunks = prepared.documents.len(),
            "chunked"
        );
        Ok(prepared)
    }

    /// Re-index every object listed under `prefix`, in name order.
    ///
    /// A failure on one object is recorded in the report and does not stop
    /// the rest. Only a failure to list is returned as an error.
    pub async fn reindex_prefix(&self, prefix: &str) -> Result<PrefixReport> {
        let names = self.store.list(prefix).await?;
        info!(prefix, objects = names.len(), "reindexing prefix");

        let mut report = PrefixReport {
            prefix: prefix.to_string(),
            documents: 0,
            chunks: 0,
            failures: 0,
            results: Vec::with_capacity(names.len()),
        };

        for name in &names {
            let outcome = self.reindex(name).await;
            report.documents += 1;
            report.chunks += outcome.chunk_count();
            if !outcome.is_ok() {
                report.failures += 1;
            }
            report.results.push(outcome.to_envelope());
        }

        info!(
            prefix,
            documents = report.documents,
            chunks = report.chunks,
            failures = report.failures,
            "prefix done"
        );
        Ok(report)
    }
}
