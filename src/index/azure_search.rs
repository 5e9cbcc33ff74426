//! Azure AI Search backend.
//!
//! Sends documents to the index's `docs/index` endpoint with the
//! `mergeOrUpload` action, which makes every call an idempotent upsert keyed
//! by `id`. Batches larger than `batch_size` are split into sequential
//! requests; the per-document results are summed into one [`UpsertOutcome`].
//!
//! # Configuration
//!
//! ```toml
//! [index]
//! kind = "azure_search"
//! endpoint = "https://svc.search.windows.net"
//! index_name = "docs"
//! api_version = "2023-11-01"
//! batch_size = 1000
//! ```
//!
//! The admin key is read from `AZURE_SEARCH_API_KEY`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{IndexConfig, MAX_INDEX_BATCH};
use crate::models::{IndexDocument, UpsertOutcome};
use crate::store::http_client;
use crate::traits::SearchIndex;

pub struct AzureSearchIndex {
    endpoint: String,
    index_name: String,
    api_version: String,
    api_key: String,
    batch_size: usize,
    client: reqwest::Client,
}

impl AzureSearchIndex {
    pub fn new(
        endpoint: &str,
        index_name: &str,
        api_version: &str,
        api_key: String,
        batch_size: usize,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            index_name: index_name.to_string(),
            api_version: api_version.to_string(),
            api_key,
            batch_size: batch_size.clamp(1, MAX_INDEX_BATCH),
            client: http_client(timeout_secs)?,
        })
    }

    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .context("index.endpoint is required for azure_search")?;
        let index_name = config
            .index_name
            .as_deref()
            .context("index.index_name is required for azure_search")?;
        let api_key = std::env::var("AZURE_SEARCH_API_KEY")
            .context("AZURE_SEARCH_API_KEY environment variable not set")?;
        Self::new(
            endpoint,
            index_name,
            &config.api_version,
            api_key,
            config.batch_size,
            config.timeout_secs,
        )
    }

    fn index_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/index?api-version={}",
            self.endpoint, self.index_name, self.api_version
        )
    }

    async fn send_batch(&self, docs: &[IndexDocument]) -> Result<UpsertOutcome> {
        let body = IndexBatch {
            value: docs.iter().map(IndexAction::merge_or_upload).collect(),
        };

        let resp = self
            .client
            .post(self.index_url())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach search index '{}'", self.index_name))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        // 207 Multi-Status carries per-document failures in the body.
        if !status.is_success() {
            bail!(
                "Search index request failed (HTTP {}): {}",
                status,
                text.chars().take(500).collect::<String>()
            );
        }

        parse_index_response(&text, docs.len())
    }
}

#[async_trait]
impl SearchIndex for AzureSearchIndex {
    fn kind(&self) -> &str {
        "azure_search"
    }

    async fn upsert_batch(&self, docs: &[IndexDocument]) -> Result<UpsertOutcome> {
        let mut total = UpsertOutcome {
            processed: 0,
            success: true,
        };

        for batch in docs.chunks(self.batch_size) {
            debug!(index = %self.index_name, docs = batch.len(), "POST docs/index");
            let outcome = self.send_batch(batch).await?;
            total.processed += outcome.processed;
            total.success &= outcome.success;
        }

        if !total.success {
            warn!(
                index = %self.index_name,
                processed = total.processed,
                submitted = docs.len(),
                "search index reported partial failure"
            );
        }

        Ok(total)
    }
}

#[derive(Serialize)]
struct IndexBatch<'a> {
    value: Vec<IndexAction<'a>>,
}

#[derive(Serialize)]
struct IndexAction<'a> {
    #[serde(rename = "@search.action")]
    action: &'static str,
    #[serde(flatten)]
    doc: &'a IndexDocument,
}

impl<'a> IndexAction<'a> {
    fn merge_or_upload(doc: &'a IndexDocument) -> Self {
        Self {
            action: "mergeOrUpload",
            doc,
        }
    }
}

#[derive(Deserialize)]
struct IndexResponse {
    #[serde(default)]
    value: Vec<IndexResult>,
}

#[derive(Deserialize)]
struct IndexResult {
    key: String,
    status: bool,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

/// Count succeeded documents in a `docs/index` response body.
fn parse_index_response(body: &str, submitted: usize) -> Result<UpsertOutcome> {
    let parsed: IndexResponse =
        serde_json::from_str(body).context("Malformed search index response")?;

    for failed in parsed.value.iter().filter(|r| !r.status) {
        warn!(
            key = %failed.key,
            error = failed.error_message.as_deref().unwrap_or(""),
            "document rejected by search index"
        );
    }

    let processed = parsed.value.iter().filter(|r| r.status).count();
    Ok(UpsertOutcome {
        processed,
        success: processed == submitted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    fn doc(id: &str) -> IndexDocument {
        IndexDocument {
            id: id.into(),
            content: "c".into(),
            title: "t (part 1/1)".into(),
            parent_id: "p".into(),
            filepath: "p".into(),
            url: "https://x/p".into(),
        }
    }

    #[test]
    fn test_index_url() {
        let idx = AzureSearchIndex::new("https://svc.search.windows.net/", "docs", "2023-11-01", "k".into(), 1000, 5)
            .unwrap();
        assert_eq!(
            idx.index_url(),
            "https://svc.search.windows.net/indexes/docs/docs/index?api-version=2023-11-01"
        );
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let idx = AzureSearchIndex::new("https://s", "i", "v", "k".into(), 5000, 5).unwrap();
        assert_eq!(idx.batch_size, MAX_INDEX_BATCH);
    }

    #[test]
    fn test_action_payload_shape() {
        let d = doc("h_0000");
        let batch = IndexBatch {
            value: vec![IndexAction::merge_or_upload(&d)],
        };
        let v = serde_json::to_value(&batch).unwrap();
        let first = &v["value"][0];
        assert_eq!(first["@search.action"], "mergeOrUpload");
        assert_eq!(first["id"], "h_0000");
        assert_eq!(first["parent_id"], "p");
        assert_eq!(first["url"], "https://x/p");
    }

    #[test]
    fn test_parse_all_succeeded() {
        let body = r#"{"value":[{"key":"a","status":true,"statusCode":201},{"key":"b","status":true,"statusCode":200}]}"#;
        let out = parse_index_response(body, 2).unwrap();
        assert_eq!(out, UpsertOutcome { processed: 2, success: true });
    }

    #[test]
    fn test_parse_partial_failure() {
        let body = r#"{"value":[{"key":"a","status":true,"statusCode":201},{"key":"b","status":false,"errorMessage":"too big","statusCode":400}]}"#;
        let out = parse_index_response(body, 2).unwrap();
        assert_eq!(out, UpsertOutcome { processed: 1, success: false });
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(parse_index_response("<html>", 1).is_err());
    }

    const INDEX_PATH: &str = "/indexes/docs/docs/index";

    /// Reports every submitted document as stored.
    struct AcceptAll;

    impl Respond for AcceptAll {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let results: Vec<Value> = body["value"]
                .as_array()
                .unwrap()
                .iter()
                .map(|d| json!({ "key": d["id"], "status": true, "statusCode": 201 }))
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({ "value": results }))
        }
    }

    fn index_at(server: &MockServer, batch_size: usize) -> AzureSearchIndex {
        AzureSearchIndex::new(&server.uri(), "docs", "2023-11-01", "test-key".into(), batch_size, 5)
            .unwrap()
    }

    #[tokio::test]
    async fn test_upsert_splits_into_sub_batches() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INDEX_PATH))
            .and(header("api-key", "test-key"))
            .respond_with(AcceptAll)
            .expect(3)
            .mount(&mock_server)
            .await;

        let docs: Vec<IndexDocument> = (0..2500).map(|i| doc(&format!("h_{:04}", i))).collect();
        let out = index_at(&mock_server, 1000).upsert_batch(&docs).await.unwrap();
        assert_eq!(out, UpsertOutcome { processed: 2500, success: true });

        let sizes: Vec<usize> = mock_server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| {
                let v: Value = serde_json::from_slice(&r.body).unwrap();
                v["value"].as_array().unwrap().len()
            })
            .collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
    }

    #[tokio::test]
    async fn test_upsert_multi_status_is_partial_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INDEX_PATH))
            .respond_with(ResponseTemplate::new(207).set_body_json(json!({
                "value": [
                    { "key": "a", "status": true, "statusCode": 200 },
                    { "key": "b", "status": false, "statusCode": 400, "errorMessage": "bad field" }
                ]
            })))
            .mount(&mock_server)
            .await;

        let out = index_at(&mock_server, 1000)
            .upsert_batch(&[doc("a"), doc("b")])
            .await
            .unwrap();
        assert_eq!(out, UpsertOutcome { processed: 1, success: false });
    }

    #[tokio::test]
    async fn test_upsert_server_error_is_err() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INDEX_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let err = index_at(&mock_server, 1000)
            .upsert_batch(&[doc("a")])
            .await
            .unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("500"), "{}", msg);
        assert!(msg.contains("boom"), "{}", msg);
    }
}
