//! [`ObjectStore`] backends.
//!
//! | Kind | Type | Auth |
//! |------|------|------|
//! | `azure_blob` | [`AzureBlobStore`] | SAS token appended to each request |
//! | `s3` | [`S3Store`] | AWS Signature V4 |
//! | `filesystem` | [`FileSystemStore`] | none |
//!
//! All backends share the include/exclude glob filtering applied by
//! [`ObjectStore::list`](crate::traits::ObjectStore::list) and the RFC 3986
//! path encoding used to build object URLs.

mod azure_blob;
mod fs;
mod s3;

pub use azure_blob::AzureBlobStore;
pub use fs::FileSystemStore;
pub use s3::{AwsCredentials, S3Store};

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::sync::Arc;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::traits::ObjectStore;

/// Build the configured object store.
///
/// Reads backend credentials from the environment (see [`crate::config`]).
pub fn build_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.kind.as_str() {
        "azure_blob" => Arc::new(AzureBlobStore::from_config(config)?),
        "s3" => Arc::new(S3Store::from_config(config)?),
        "filesystem" => Arc::new(FileSystemStore::from_config(config)?),
        other => bail!(
            "Unknown store kind: '{}'. Available: azure_blob, s3, filesystem",
            other
        ),
    };
    Ok(store)
}

/// Include/exclude filter applied to listed object names.
#[derive(Debug, Clone)]
pub struct NameFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl NameFilter {
    pub fn new(include_globs: &[String], exclude_globs: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_globset(include_globs)?,
            exclude: build_globset(exclude_globs)?,
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::new(&config.include_globs, &config.exclude_globs)
    }

    /// Accept everything.
    pub fn allow_all() -> Result<Self> {
        Self::new(&["**/*".to_string()], &[])
    }

    pub fn is_match(&self, name: &str) -> bool {
        !self.exclude.is_match(name) && self.include.is_match(name)
    }
}

/// Build a [`GlobSet`] from a list of glob pattern strings.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// URI-encode a string per RFC 3986.
///
/// Encodes all characters except unreserved characters:
/// `A-Z a-z 0-9 - _ . ~`
pub(crate) fn uri_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

/// Encode an object name for use as a URL path, keeping `/` separators and
/// dropping any leading `/`.
pub(crate) fn encode_object_path(name: &str) -> String {
    name.trim_start_matches('/')
        .split('/')
        .map(uri_encode)
        .collect::<Vec<_>>()
        .join("/")
}

// ============ XML Parsing (minimal, no extra deps) ============

/// Extract the text content of an XML tag (simple, non-nested).
pub(crate) fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(xml_unescape(&xml[start..start + end]))
}

/// Return the inner text of every `<tag>…</tag>` block, in document order.
pub(crate) fn extract_xml_blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut blocks = Vec::new();
    let mut remaining = xml;
    while let Some(start) = remaining.find(&open) {
        let block_start = start + open.len();
        match remaining[block_start..].find(&close) {
            Some(end) => {
                blocks.push(&remaining[block_start..block_start + end]);
                remaining = &remaining[block_start + end + close.len()..];
            }
            None => break,
        }
    }
    blocks
}

fn xml_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
