//! Chunk-to-index-document assembly.
//!
//! Every chunk of a source object becomes one [`IndexDocument`] whose `id` is
//! `"{parent_hash}_{index:04}"`. The parent hash is a digest of the object's
//! name only, so re-indexing the same name overwrites the same ids instead of
//! adding duplicates, and the zero-padded suffix keeps lexical id order equal
//! to chunk order for the first 9999 chunks.

use crate::models::{Chunk, IndexDocument};

/// Deterministic namespace prefix for every chunk of `name`.
///
/// Lowercase hex MD5 of the UTF-8 name. Kept as MD5 so ids line up with
/// indexes built by earlier ingestion runs.
pub fn parent_hash(name: &str) -> String {
    format!("{:x}", md5::compute(name.as_bytes()))
}

/// Last `/`-separated segment of `name`, or `name` itself when that segment
/// is empty.
pub fn base_title(name: &str) -> &str {
    match name.rsplit('/').next() {
        Some(last) if !last.is_empty() => last,
        _ => name,
    }
}

/// Stable chunk id: parent hash plus a zero-padded index.
pub fn chunk_id(parent_hash: &str, index: usize) -> String {
    format!("{}_{:04}", parent_hash, index)
}

/// Build the index documents for `name` from its ordered chunks.
///
/// `url` is the public locator for the source object; it is copied onto
/// every document unchanged. An empty `chunks` slice yields an empty vector,
/// which callers report as an empty document rather than a failure.
///
/// # Example
///
/// ```rust
/// use blob_reindex::assemble::{assemble_documents, parent_hash};
/// use blob_reindex::chunk::chunk_text;
///
/// let chunks = chunk_text("one\ntwo\n", 4);
/// let docs = assemble_documents("a/b/doc.txt", &chunks, "https://store/a/b/doc.txt");
/// assert_eq!(docs.len(), 2);
/// assert_eq!(docs[0].id, format!("{}_0000", parent_hash("a/b/doc.txt")));
/// assert_eq!(docs[1].title, "doc.txt (part 2/2)");
/// ```
pub fn assemble_documents(name: &str, chunks: &[Chunk], url: &str) -> Vec<IndexDocument> {
    if chunks.is_empty() {
        return Vec::new();
    }

    let hash = parent_hash(name);
    let title = base_title(name);
    let total = chunks.len();

    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| IndexDocument {
            id: chunk_id(&hash, i),
            content: chunk.text.clone(),
            title: format!("{} (part {}/{})", title, i + 1, total),
            parent_id: name.to_string(),
            filepath: name.to_string(),
            url: url.to_string(),
        })
        .collect()
}
