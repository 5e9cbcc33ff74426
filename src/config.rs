//! TOML configuration parsing and validation.
//!
//! Credentials are never read from the file. Each backend pulls its secrets
//! from environment variables at construction time:
//!
//! | Backend | Variables |
//! |---------|-----------|
//! | `azure_blob` | `AZURE_STORAGE_SAS_TOKEN` (optional for public containers) |
//! | `s3` | `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN` (optional) |
//! | `azure_search` | `AZURE_SEARCH_API_KEY` |

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chunk::DEFAULT_MAX_CHARS;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Character budget per chunk. Not a model-token count.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_kind")]
    pub kind: String,
    /// Azure Blob container URL, e.g. `https://acct.blob.core.windows.net/docs`.
    #[serde(default)]
    pub container_url: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            container_url: None,
            bucket: None,
            region: default_region(),
            endpoint_url: None,
            root: Some(PathBuf::from(".")),
            timeout_secs: default_timeout_secs(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_store_kind() -> String {
    "filesystem".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_kind")]
    pub kind: String,
    /// Search service URL, e.g. `https://svc.search.windows.net`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub index_name: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            kind: default_index_kind(),
            endpoint: None,
            index_name: None,
            api_version: default_api_version(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_index_kind() -> String {
    "memory".to_string()
}
fn default_api_version() -> String {
    "2023-11-01".to_string()
}
fn default_batch_size() -> usize {
    1000
}

/// Maximum documents per indexing request accepted by Azure AI Search.
pub const MAX_INDEX_BATCH: usize = 1000;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_chars == 0 {
        bail!("chunking.max_chars must be > 0");
    }

    match config.store.kind.as_str() {
        "azure_blob" => {
            if config.store.container_url.as_deref().unwrap_or("").is_empty() {
                bail!("store.container_url must be set when store.kind is 'azure_blob'");
            }
        }
        "s3" => {
            if config.store.bucket.as_deref().unwrap_or("").is_empty() {
                bail!("store.bucket must be set when store.kind is 's3'");
            }
        }
        "filesystem" => {
            if config.store.root.is_none() {
                bail!("store.root must be set when store.kind is 'filesystem'");
            }
        }
        other => bail!(
            "Unknown store kind: '{}'. Must be azure_blob, s3, or filesystem.",
            other
        ),
    }

    match config.index.kind.as_str() {
        "azure_search" => {
            if config.index.endpoint.as_deref().unwrap_or("").is_empty() {
                bail!("index.endpoint must be set when index.kind is 'azure_search'");
            }
            if config.index.index_name.as_deref().unwrap_or("").is_empty() {
                bail!("index.index_name must be set when index.kind is 'azure_search'");
            }
        }
        "memory" => {}
        other => bail!(
            "Unknown index kind: '{}'. Must be azure_search or memory.",
            other
        ),
    }

    if config.index.batch_size == 0 || config.index.batch_size > MAX_INDEX_BATCH {
        bail!("index.batch_size must be in [1, {}]", MAX_INDEX_BATCH);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = parse_config("").unwrap();
        assert_eq!(config.chunking.max_chars, 1800);
        assert_eq!(config.store.kind, "filesystem");
        assert_eq!(config.index.kind, "memory");
        assert_eq!(config.index.batch_size, 1000);
        assert_eq!(config.server.bind, "127.0.0.1:7340");
    }

    #[test]
    fn test_full_azure_config() {
        let config = parse_config(
            r#"
[chunking]
max_chars = 900

[store]
kind = "azure_blob"
container_url = "https://acct.blob.core.windows.net/docs"
timeout_secs = 30

[index]
kind = "azure_search"
endpoint = "https://svc.search.windows.net"
index_name = "docs"
batch_size = 500
"#,
        )
        .unwrap();
        assert_eq!(config.chunking.max_chars, 900);
        assert_eq!(config.store.timeout_secs, 30);
        assert_eq!(config.index.index_name.as_deref(), Some("docs"));
        assert_eq!(config.index.api_version, "2023-11-01");
    }

    #[test]
    fn test_rejects_zero_max_chars() {
        let err = parse_config("[chunking]\nmax_chars = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_chars"));
    }

    #[test]
    fn test_rejects_unknown_store_kind() {
        let err = parse_config("[store]\nkind = \"ftp\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown store kind"));
    }

    #[test]
    fn test_azure_blob_requires_container_url() {
        let err = parse_config("[store]\nkind = \"azure_blob\"\n").unwrap_err();
        assert!(err.to_string().contains("container_url"));
    }

    #[test]
    fn test_s3_requires_bucket() {
        let err = parse_config("[store]\nkind = \"s3\"\n").unwrap_err();
        assert!(err.to_string().contains("bucket"));
    }

    #[test]
    fn test_filesystem_from_file_requires_root() {
        // `root` has no serde default, so a file-configured filesystem store
        // must name it explicitly.
        let err = parse_config("[store]\nkind = \"filesystem\"\n").unwrap_err();
        assert!(err.to_string().contains("store.root"));
    }

    #[test]
    fn test_azure_search_requires_endpoint_and_index() {
        let err = parse_config(
            "[store]\nroot = \".\"\n[index]\nkind = \"azure_search\"\nendpoint = \"https://s\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("index_name"));
    }

    #[test]
    fn test_batch_size_bounds() {
        let err = parse_config("[store]\nroot = \".\"\n[index]\nbatch_size = 1001\n").unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }
}
