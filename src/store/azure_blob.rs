//! Azure Blob Storage backend.
//!
//! Objects are addressed as `{container_url}/{encoded name}` and authorized
//! with a shared access signature (SAS) appended as the query string. The
//! public URL written onto index documents is the same address with the
//! query removed, so the token never reaches the index.
//!
//! # Configuration
//!
//! ```toml
//! [store]
//! kind = "azure_blob"
//! container_url = "https://acct.blob.core.windows.net/docs"
//! include_globs = ["**/*.md", "**/*.txt"]
//! ```
//!
//! The SAS token is read from `AZURE_STORAGE_SAS_TOKEN`, with or without its
//! leading `?`. Without it, requests are anonymous (public containers).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{encode_object_path, extract_xml_blocks, extract_xml_value, http_client, uri_encode};
use super::NameFilter;
use crate::config::StoreConfig;
use crate::traits::ObjectStore;

pub struct AzureBlobStore {
    container_url: String,
    sas: Option<String>,
    filter: NameFilter,
    client: reqwest::Client,
}

impl AzureBlobStore {
    pub fn new(
        container_url: &str,
        sas: Option<String>,
        filter: NameFilter,
        timeout_secs: u64,
    ) -> Result<Self> {
        let sas = sas
            .map(|s| s.trim_start_matches('?').to_string())
            .filter(|s| !s.is_empty());
        Ok(Self {
            container_url: container_url.trim_end_matches('/').to_string(),
            sas,
            filter,
            client: http_client(timeout_secs)?,
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let container_url = config
            .container_url
            .as_deref()
            .context("store.container_url is required for azure_blob")?;
        let sas = std::env::var("AZURE_STORAGE_SAS_TOKEN").ok();
        Self::new(
            container_url,
            sas,
            NameFilter::from_config(config)?,
            config.timeout_secs,
        )
    }

    /// Signed URL for `name`; includes the SAS query when configured.
    pub fn signed_url(&self, name: &str) -> String {
        let base = self.object_url(name);
        match &self.sas {
            Some(sas) => format!("{}?{}", base, sas),
            None => base,
        }
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/{}", self.container_url, encode_object_path(name))
    }

    fn list_url(&self, prefix: &str, marker: Option<&str>) -> String {
        let mut url = format!("{}?restype=container&comp=list", self.container_url);
        if !prefix.is_empty() {
            url.push_str(&format!("&prefix={}", uri_encode(prefix)));
        }
        if let Some(m) = marker {
            url.push_str(&format!("&marker={}", uri_encode(m)));
        }
        if let Some(sas) = &self.sas {
            url.push('&');
            url.push_str(sas);
        }
        url
    }
}

#[async_trait]
impl ObjectStore for AzureBlobStore {
    fn kind(&self) -> &str {
        "azure_blob"
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.signed_url(name);
        debug!(url = %self.object_url(name), "GET blob");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to GET blob '{}'", name))?;

        if !resp.status().is_success() {
            bail!("Azure Blob GET failed (HTTP {}) for '{}'", resp.status(), name);
        }

        Ok(resp.bytes().await?.to_vec())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let resp = self
                .client
                .get(self.list_url(prefix, marker.as_deref()))
                .send()
                .await
                .with_context(|| format!("Failed to list blobs under '{}'", prefix))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                bail!(
                    "Azure Blob List failed (HTTP {}): {}",
                    status,
                    body.chars().take(500).collect::<String>()
                );
            }

            let xml = resp.text().await?;
            let (batch, next) = parse_list_blobs_response(&xml);
            names.extend(batch.into_iter().filter(|n| self.filter.is_match(n)));

            match next {
                Some(m) => marker = Some(m),
                None => break,
            }
        }

        names.sort();
        Ok(names)
    }

    fn public_url(&self, name: &str) -> String {
        self.object_url(name)
    }
}

/// Parse a `List Blobs` XML response into blob names and the next marker.
fn parse_list_blobs_response(xml: &str) -> (Vec<String>, Option<String>) {
    let names = extract_xml_blocks(xml, "Blob")
        .into_iter()
        .filter_map(|block| extract_xml_value(block, "Name"))
        .filter(|n| !n.is_empty() && !n.ends_with('/'))
        .collect();
    let next = extract_xml_value(xml, "NextMarker").filter(|m| !m.is_empty());
    (names, next)
}
