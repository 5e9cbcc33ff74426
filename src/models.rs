//! Core data models used throughout the re-indexer.
//!
//! These types represent the chunks, index documents, and outcomes that flow
//! through the fetch → decode → chunk → assemble → upsert pipeline. All of
//! them are constructed per invocation and never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::error::ReindexError;

/// Route label carried on every wire envelope.
pub const ROUTE: &str = "reindex_blob";

/// A contiguous slice of a document's decoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position within the document.
    pub index: usize,
    /// Raw character content; not trimmed or re-encoded.
    pub text: String,
}

/// A search-index document built from one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// `"{parent_hash}_{index:04}"`.
    pub id: String,
    pub content: String,
    /// `"<basename> (part i/N)"`, 1-based.
    pub title: String,
    pub parent_id: String,
    pub filepath: String,
    /// Source locator without any access token or query string.
    pub url: String,
}

/// Response of a [`SearchIndex::upsert_batch`](crate::traits::SearchIndex::upsert_batch) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub processed: usize,
    pub success: bool,
}

/// Result of re-indexing a single source object.
#[derive(Debug)]
pub enum ReindexOutcome {
    /// Chunks were produced and handed to the index.
    Indexed {
        name: String,
        parent_id: String,
        chunk_count: usize,
        upserted_count: usize,
        success: bool,
    },
    /// The object decoded to empty text; nothing was upserted.
    Empty { name: String, parent_id: String },
    /// Any failure in the pipeline.
    Failed(ReindexError),
}

impl ReindexOutcome {
    pub fn is_ok(&self) -> bool {
        !matches!(self, ReindexOutcome::Failed(_))
    }

    pub fn chunk_count(&self) -> usize {
        match self {
            ReindexOutcome::Indexed { chunk_count, .. } => *chunk_count,
            _ => 0,
        }
    }

    /// Convert into the JSON envelope returned to callers.
    pub fn to_envelope(&self) -> Envelope {
        match self {
            ReindexOutcome::Indexed {
                name,
                parent_id,
                chunk_count,
                upserted_count,
                success,
            } => Envelope {
                ok: true,
                route: ROUTE.to_string(),
                ingest: Some(IngestBody {
                    chunks: *chunk_count,
                    parent_id: parent_id.clone(),
                    name: name.clone(),
                    upserted: Some(*upserted_count),
                    success: Some(*success),
                    message: None,
                }),
                error: None,
            },
            ReindexOutcome::Empty { name, parent_id } => Envelope {
                ok: true,
                route: ROUTE.to_string(),
                ingest: Some(IngestBody {
                    chunks: 0,
                    parent_id: parent_id.clone(),
                    name: name.clone(),
                    upserted: None,
                    success: None,
                    message: Some("empty".to_string()),
                }),
                error: None,
            },
            ReindexOutcome::Failed(err) => Envelope {
                ok: false,
                route: ROUTE.to_string(),
                ingest: None,
                error: Some(ErrorBody {
                    code: err.code().to_string(),
                    message: err.to_string(),
                }),
            },
        }
    }
}

/// Wire form of a [`ReindexOutcome`].
///
/// ```json
/// { "ok": true, "route": "reindex_blob",
///   "ingest": { "chunks": 5, "parent_id": "a/b.txt", "name": "a/b.txt", "upserted": 5, "success": true } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub ok: bool,
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestBody {
    pub chunks: usize,
    pub parent_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upserted: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Summary of a prefix-wide re-index run.
#[derive(Debug, Clone, Serialize)]
pub struct PrefixReport {
    pub prefix: String,
    pub documents: usize,
    pub chunks: usize,
    pub failures: usize,
    pub results: Vec<Envelope>,
}
