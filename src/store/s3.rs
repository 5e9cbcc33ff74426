//! Amazon S3 backend.
//!
//! Fetches and lists objects through the S3 REST API with AWS Signature V4
//! authentication, using only pure-Rust dependencies (`hmac`, `sha2`, `hex`).
//! Custom endpoints (MinIO, LocalStack) are addressed path-style.
//!
//! # Configuration
//!
//! ```toml
//! [store]
//! kind = "s3"
//! bucket = "acme-docs"
//! region = "us-east-1"
//! # endpoint_url = "http://localhost:9000"
//! ```
//!
//! Credentials come from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, and
//! optionally `AWS_SESSION_TOKEN`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{encode_object_path, extract_xml_blocks, extract_xml_value, http_client, uri_encode};
use super::NameFilter;
use crate::config::StoreConfig;
use crate::traits::ObjectStore;

type HmacSha256 = Hmac<Sha256>;

/// AWS credentials loaded from environment variables.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .context("AWS_ACCESS_KEY_ID environment variable not set")?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

pub struct S3Store {
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
    creds: AwsCredentials,
    filter: NameFilter,
    client: reqwest::Client,
}

impl S3Store {
    pub fn new(
        bucket: &str,
        region: &str,
        endpoint_url: Option<String>,
        creds: AwsCredentials,
        filter: NameFilter,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            bucket: bucket.to_string(),
            region: region.to_string(),
            endpoint_url: endpoint_url.map(|e| e.trim_end_matches('/').to_string()),
            creds,
            filter,
            client: http_client(timeout_secs)?,
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let bucket = config
            .bucket
            .as_deref()
            .context("store.bucket is required for s3")?;
        Self::new(
            bucket,
            &config.region,
            config.endpoint_url.clone(),
            AwsCredentials::from_env()?,
            NameFilter::from_config(config)?,
            config.timeout_secs,
        )
    }

    /// `(scheme, host, path prefix)` for requests against this bucket.
    ///
    /// A path on a custom endpoint (`http://host:9000/minio`) belongs to the
    /// canonical URI, never to the signed `host` header.
    fn target(&self) -> (&str, String, String) {
        match &self.endpoint_url {
            Some(endpoint) => {
                let (scheme, rest) = match endpoint.split_once("://") {
                    Some((s, r)) => (if s == "http" { "http" } else { "https" }, r),
                    None => ("https", endpoint.as_str()),
                };
                let (host, base_path) = match rest.split_once('/') {
                    Some((h, p)) => (h, p.trim_matches('/')),
                    None => (rest, ""),
                };
                let prefix = if base_path.is_empty() {
                    format!("/{}", self.bucket)
                } else {
                    format!("/{}/{}", base_path, self.bucket)
                };
                (scheme, host.to_string(), prefix)
            }
            None => (
                "https",
                format!("{}.s3.{}.amazonaws.com", self.bucket, self.region),
                String::new(),
            ),
        }
    }

    fn object_path(&self, key: &str) -> String {
        let (_, _, prefix) = self.target();
        format!("{}/{}", prefix, encode_object_path(key))
    }

    /// Send a signed GET request for `canonical_uri` with `query` parameters.
    async fn signed_get(
        &self,
        canonical_uri: &str,
        query: &[(String, String)],
    ) -> Result<reqwest::Response> {
        let (scheme, host, _) = self.target();
        let signed = sign_get_request(
            &self.creds,
            &self.region,
            &host,
            canonical_uri,
            query,
            Utc::now(),
        );

        let url = if signed.canonical_querystring.is_empty() {
            format!("{}://{}{}", scheme, host, canonical_uri)
        } else {
            format!(
                "{}://{}{}?{}",
                scheme, host, canonical_uri, signed.canonical_querystring
            )
        };

        let mut req = self
            .client
            .get(&url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("x-amz-date", &signed.amz_date);
        if let Some(ref token) = self.creds.session_token {
            req = req.header("x-amz-security-token", token);
        }

        Ok(req.send().await?)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn kind(&self) -> &str {
        "s3"
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.object_path(name);
        debug!(bucket = %self.bucket, key = %name, "S3 GetObject");

        let resp = self
            .signed_get(&path, &[])
            .await
            .with_context(|| format!("Failed to get s3://{}/{}", self.bucket, name))?;

        if !resp.status().is_success() {
            bail!("S3 GetObject failed (HTTP {}) for key '{}'", resp.status(), name);
        }

        Ok(resp.bytes().await?.to_vec())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let (_, _, path_prefix) = self.target();
        let canonical_uri = format!("{}/", path_prefix);
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("list-type".to_string(), "2".to_string()),
                ("max-keys".to_string(), "1000".to_string()),
            ];
            if !prefix.is_empty() {
                query.push(("prefix".to_string(), prefix.to_string()));
            }
            if let Some(ref token) = continuation_token {
                query.push(("continuation-token".to_string(), token.clone()));
            }

            let resp = self.signed_get(&canonical_uri, &query).await.with_context(|| {
                format!("Failed to list S3 objects in s3://{}/{}", self.bucket, prefix)
            })?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                bail!(
                    "S3 ListObjectsV2 failed (HTTP {}): {}",
                    status,
                    body.chars().take(500).collect::<String>()
                );
            }

            let xml = resp.text().await?;
            let (batch, next) = parse_list_objects_response(&xml);
            keys.extend(batch.into_iter().filter(|k| self.filter.is_match(k)));

            match next {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn public_url(&self, name: &str) -> String {
        let (scheme, host, _) = self.target();
        format!("{}://{}{}", scheme, host, self.object_path(name))
    }
}

// ============ AWS SigV4 ============

/// Headers and query string produced by signing one request.
#[derive(Debug)]
struct SignedRequest {
    authorization: String,
    amz_date: String,
    payload_hash: String,
    canonical_querystring: String,
}

fn sign_get_request(
    creds: &AwsCredentials,
    region: &str,
    host: &str,
    canonical_uri: &str,
    query: &[(String, String)],
    now: DateTime<Utc>,
) -> SignedRequest {
    let date_stamp = now.format("%Y%m%d").to_string();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

    // Canonical query string must be sorted by key.
    let mut sorted = query.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    let canonical_querystring = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let payload_hash = hex_sha256(b"");

    let mut headers = vec![
        ("host".to_string(), host.to_string()),
        ("x-amz-content-sha256".to_string(), payload_hash.clone()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if let Some(ref token) = creds.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    let canonical_request = format!(
        "GET\n{}\n{}\n{}\n{}\n{}",
        canonical_uri, canonical_querystring, canonical_headers, signed_headers, payload_hash
    );

    let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(&creds.secret_access_key, &date_stamp, region, "s3");
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    SignedRequest {
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            creds.access_key_id, credential_scope, signed_headers, signature
        ),
        amz_date,
        payload_hash,
        canonical_querystring,
    }
}

fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the AWS SigV4 signing key for a given date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Parse a `ListObjectsV2` XML response into keys and the next continuation
/// token (present only while the listing is truncated).
fn parse_list_objects_response(xml: &str) -> (Vec<String>, Option<String>) {
    let keys = extract_xml_blocks(xml, "Contents")
        .into_iter()
        .filter_map(|block| extract_xml_value(block, "Key"))
        .filter(|k| !k.is_empty() && !k.ends_with('/'))
        .collect();

    let is_truncated = extract_xml_value(xml, "IsTruncated")
        .map(|v| v == "true")
        .unwrap_or(false);
    let next = if is_truncated {
        extract_xml_value(xml, "NextContinuationToken")
    } else {
        None
    };

    (keys, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn creds() -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
            session_token: None,
        }
    }

    fn store(endpoint: Option<&str>) -> S3Store {
        S3Store::new(
            "acme-docs",
            "us-east-1",
            endpoint.map(String::from),
            creds(),
            NameFilter::allow_all().unwrap(),
            5,
        )
        .unwrap()
    }

    #[test]
    fn test_public_url_virtual_host_style() {
        let s = store(None);
        assert_eq!(
            s.public_url("runbooks/On Call.md"),
            "https://acme-docs.s3.us-east-1.amazonaws.com/runbooks/On%20Call.md"
        );
    }

    #[test]
    fn test_public_url_custom_endpoint_path_style() {
        let s = store(Some("http://localhost:9000/"));
        assert_eq!(
            s.public_url("a.txt"),
            "http://localhost:9000/acme-docs/a.txt"
        );
    }

    #[test]
    fn test_endpoint_path_stays_out_of_host() {
        let s = store(Some("http://localhost:9000/minio/"));
        let (scheme, host, prefix) = s.target();
        assert_eq!(scheme, "http");
        assert_eq!(host, "localhost:9000");
        assert_eq!(prefix, "/minio/acme-docs");
        assert_eq!(s.object_path("a b.txt"), "/minio/acme-docs/a%20b.txt");
        assert_eq!(
            s.public_url("a.txt"),
            "http://localhost:9000/minio/acme-docs/a.txt"
        );
    }

    #[test]
    fn test_signing_key_known_vector() {
        // From the AWS SigV4 documentation example.
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20150830",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn test_signed_request_is_deterministic_and_sorted() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let query = vec![
            ("prefix".to_string(), "a b/".to_string()),
            ("list-type".to_string(), "2".to_string()),
        ];
        let a = sign_get_request(&creds(), "us-east-1", "h", "/", &query, now);
        let b = sign_get_request(&creds(), "us-east-1", "h", "/", &query, now);
        assert_eq!(a.authorization, b.authorization);
        assert_eq!(a.canonical_querystring, "list-type=2&prefix=a%20b%2F");
        assert_eq!(a.amz_date, "20240102T030405Z");
        assert!(a
            .authorization
            .starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240102/us-east-1/s3/aws4_request"));
        assert!(a
            .authorization
            .contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
    }

    #[test]
    fn test_parse_list_objects_response() {
        let xml = r#"<ListBucketResult>
  <IsTruncated>true</IsTruncated>
  <Contents><Key>docs/a.md</Key><Size>10</Size></Contents>
  <Contents><Key>docs/</Key></Contents>
  <Contents><Key>docs/b.md</Key></Contents>
  <NextContinuationToken>tok==</NextContinuationToken>
</ListBucketResult>"#;
        let (keys, next) = parse_list_objects_response(xml);
        assert_eq!(keys, vec!["docs/a.md", "docs/b.md"]);
        assert_eq!(next.as_deref(), Some("tok=="));

        let done = "<ListBucketResult><IsTruncated>false</IsTruncated></ListBucketResult>";
        assert_eq!(parse_list_objects_response(done).1, None);
    }
}
