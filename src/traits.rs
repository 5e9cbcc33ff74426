//! Collaborator seams for the re-index pipeline.
//!
//! The pipeline itself is pure (decode → chunk → assemble). Everything that
//! touches the outside world goes through one of two traits:
//!
//! ```text
//!  ┌──────────────┐  fetch(name)   ┌──────────────┐  upsert_batch(docs)  ┌─────────────┐
//!  │ ObjectStore  │──────────────▶│   pipeline   │─────────────────────▶│ SearchIndex │
//!  │ Azure/S3/FS  │   raw bytes    │ dec+chunk+asm│   IndexDocument[]    │ Azure/Memory│
//!  └──────────────┘                └──────────────┘                      └─────────────┘
//! ```
//!
//! Implement these traits to plug in a different blob store or search
//! backend. Neither trait is expected to retry; timeouts and backpressure
//! belong inside the implementation.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{IndexDocument, UpsertOutcome};

/// A blob-style object store that documents are fetched from.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use blob_reindex::traits::ObjectStore;
///
/// struct Fixed;
///
/// #[async_trait]
/// impl ObjectStore for Fixed {
///     fn kind(&self) -> &str { "fixed" }
///     async fn fetch(&self, _name: &str) -> Result<Vec<u8>> { Ok(b"hello\n".to_vec()) }
///     async fn list(&self, _prefix: &str) -> Result<Vec<String>> { Ok(vec!["a.txt".into()]) }
///     fn public_url(&self, name: &str) -> String { format!("fixed://{name}") }
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend identifier (`"azure_blob"`, `"s3"`, `"filesystem"`).
    fn kind(&self) -> &str;

    /// Download the raw bytes of `name`.
    ///
    /// Fails on transport, authorization, or not-found problems.
    async fn fetch(&self, name: &str) -> Result<Vec<u8>>;

    /// List object names under `prefix`, sorted lexically, after the store's
    /// include/exclude filters are applied.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Publicly dereferenceable locator for `name`, with any access token or
    /// query component removed.
    fn public_url(&self, name: &str) -> String;
}

/// A search index that accepts batches of documents keyed by id.
///
/// Delivery is at-least-once: implementations must treat a repeated `id` as
/// an overwrite.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Short backend identifier (`"azure_search"`, `"memory"`).
    fn kind(&self) -> &str;

    /// Insert or update every document in `docs`.
    ///
    /// A partial failure reported by the backend is returned as an
    /// [`UpsertOutcome`] with `success == false`; only transport-level or
    /// whole-request failures are errors.
    async fn upsert_batch(&self, docs: &[IndexDocument]) -> Result<UpsertOutcome>;
}
