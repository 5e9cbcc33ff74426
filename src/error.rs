//! Error taxonomy for the re-index pipeline.
//!
//! Collaborators (object stores, search indexes) return `anyhow` errors; the
//! orchestration layer wraps them into [`ReindexError`] so every failure
//! reaching the caller carries a stable machine-readable code.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReindexError {
    /// Missing or malformed caller input; raised before any fetch.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The object store could not produce the document bytes.
    #[error("Failed to fetch '{name}': {source:#}")]
    Fetch {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The search index rejected or failed the batch.
    #[error("Failed to upsert {count} documents for '{name}': {source:#}")]
    Upsert {
        name: String,
        count: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl ReindexError {
    /// Stable error code used in wire envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            ReindexError::InvalidInput(_) => "invalid_input",
            ReindexError::Fetch { .. } => "fetch_error",
            ReindexError::Upsert { .. } => "upsert_error",
        }
    }
}
