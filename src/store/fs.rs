//! Local filesystem backend.
//!
//! Treats a directory as a bucket: object names are `/`-separated paths
//! relative to `root`. Useful for local runs and tests; names containing
//! `..` segments are rejected so a caller cannot escape the root.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use super::NameFilter;
use crate::config::StoreConfig;
use crate::traits::ObjectStore;

pub struct FileSystemStore {
    root: PathBuf,
    filter: NameFilter,
}

impl FileSystemStore {
    pub fn new(root: impl Into<PathBuf>, filter: NameFilter) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let root = config
            .root
            .clone()
            .context("store.root is required for filesystem")?;
        Ok(Self::new(root, NameFilter::from_config(config)?))
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let rel = Path::new(name.trim_start_matches('/'));
        for component in rel.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => bail!("Object name escapes store root: '{}'", name),
            }
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ObjectStore for FileSystemStore {
    fn kind(&self) -> &str {
        "filesystem"
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        if !self.root.exists() {
            bail!("Filesystem store root does not exist: {}", self.root.display());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if name.starts_with(prefix) && self.filter.is_match(&name) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    fn public_url(&self, name: &str) -> String {
        let path = self.root.join(name.trim_start_matches('/'));
        let abs = std::path::absolute(&path).unwrap_or(path);
        format!("file://{}", abs.display())
    }
}
