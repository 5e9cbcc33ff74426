//! HTTP surface tests, driving the router in-process.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use blob_reindex::index::MemoryIndex;
use blob_reindex::ingest::Reindexer;
use blob_reindex::server::router;
use blob_reindex::store::{FileSystemStore, NameFilter};

fn setup() -> (TempDir, Arc<MemoryIndex>, axum::Router) {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("kb")).unwrap();
    std::fs::write(tmp.path().join("kb/faq.txt"), "Q: hours?\nA: 9-5.\n").unwrap();
    std::fs::write(tmp.path().join("kb/blank.txt"), "").unwrap();

    let store = Arc::new(FileSystemStore::new(tmp.path(), NameFilter::allow_all().unwrap()));
    let index = Arc::new(MemoryIndex::new());
    let app = router(Reindexer::new(store, index.clone(), 1800));
    (tmp, index, app)
}

async fn post(app: axum::Router, path: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, path, Some("application/json"), body.to_string()).await
}

async fn post_raw(
    app: axum::Router,
    path: &str,
    content_type: Option<&str>,
    body: String,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("POST").uri(path);
    if let Some(ct) = content_type {
        builder = builder.header("content-type", ct);
    }
    let resp = app
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v = serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("non-JSON response ({}): {:?}", e, bytes));
    (status, v)
}

fn assert_invalid_input_envelope(status: StatusCode, v: &Value) {
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["ok"], false);
    assert_eq!(v["route"], "reindex_blob");
    assert_eq!(v["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn test_health() {
    let (_tmp, _index, app) = setup();
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["status"], "ok");
}

#[tokio::test]
async fn test_reindex_success() {
    let (_tmp, index, app) = setup();
    let (status, v) = post(app, "/reindex", json!({ "name": "kb/faq.txt" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["ok"], true);
    assert_eq!(v["route"], "reindex_blob");
    assert_eq!(v["ingest"]["chunks"], 1);
    assert_eq!(v["ingest"]["upserted"], 1);
    assert_eq!(v["ingest"]["success"], true);
    assert_eq!(v["ingest"]["parent_id"], "kb/faq.txt");
    assert_eq!(index.len(), 1);
}

#[tokio::test]
async fn test_reindex_empty_document() {
    let (_tmp, index, app) = setup();
    let (status, v) = post(app, "/reindex", json!({ "name": "kb/blank.txt" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["ok"], true);
    assert_eq!(v["ingest"]["chunks"], 0);
    assert_eq!(v["ingest"]["message"], "empty");
    assert!(index.is_empty());
}

#[tokio::test]
async fn test_reindex_missing_name_is_bad_request() {
    let (_tmp, _index, app) = setup();
    let (status, v) = post(app, "/reindex", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["ok"], false);
    assert_eq!(v["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn test_reindex_empty_body_is_invalid_input() {
    let (_tmp, index, app) = setup();
    let (status, v) = post_raw(app, "/reindex", None, String::new()).await;
    assert_invalid_input_envelope(status, &v);
    assert!(index.is_empty());
}

#[tokio::test]
async fn test_reindex_non_string_name_is_invalid_input() {
    let (_tmp, _index, app) = setup();
    let (status, v) = post(app, "/reindex", json!({ "name": 5 })).await;
    assert_invalid_input_envelope(status, &v);
}

#[tokio::test]
async fn test_reindex_malformed_json_is_invalid_input() {
    let (_tmp, _index, app) = setup();
    let (status, v) =
        post_raw(app, "/reindex", Some("application/json"), "not json".into()).await;
    assert_invalid_input_envelope(status, &v);
}

#[tokio::test]
async fn test_reindex_prefix_bad_body_is_invalid_input() {
    let (_tmp, _index, app) = setup();
    let (status, v) = post(app, "/reindex/prefix", json!({ "prefix": [1] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn test_reindex_missing_object_is_bad_gateway() {
    let (_tmp, _index, app) = setup();
    let (status, v) = post(app, "/reindex", json!({ "name": "kb/nope.txt" })).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(v["error"]["code"], "fetch_error");
}

#[tokio::test]
async fn test_reindex_prefix() {
    let (_tmp, index, app) = setup();
    let (status, v) = post(app, "/reindex/prefix", json!({ "prefix": "kb/" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["documents"], 2);
    assert_eq!(v["chunks"], 1);
    assert_eq!(v["failures"], 0);
    assert_eq!(v["results"].as_array().unwrap().len(), 2);
    assert_eq!(index.len(), 1);
}
