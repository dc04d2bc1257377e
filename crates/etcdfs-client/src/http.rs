//! HTTP client for the etcd v2 keys API.
//!
//! Requests go to a pinned endpoint. When it fails at the transport level
//! (or answers with a 5xx that is not an etcd error body) the remaining
//! endpoints are tried in order and the first one that answers becomes the
//! new pin. Errors reported by etcd itself are returned as-is.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::client::KeysApi;
use crate::error::{ApiError, Result, StoreError};
use crate::node::{GetOptions, Response};

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4001";

/// Configuration of [`HttpKeysClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Cluster endpoints, `host:port` or full URLs.
    pub endpoints: Vec<String>,
    /// Upper bound on a single request, response body included.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![DEFAULT_ENDPOINT.to_string()],
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Parse one endpoint, defaulting the scheme to `http`.
pub fn parse_endpoint(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&with_scheme).map_err(|e| StoreError::InvalidEndpoint {
        endpoint: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(StoreError::InvalidEndpoint {
                endpoint: raw.to_string(),
                reason: format!("unsupported scheme {}", other),
            })
        }
    }

    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(StoreError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// Parse an endpoint list, skipping blank entries.
pub fn parse_endpoints<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Url>> {
    let endpoints = raw
        .iter()
        .map(AsRef::as_ref)
        .filter(|ep| !ep.trim().is_empty())
        .map(parse_endpoint)
        .collect::<Result<Vec<_>>>()?;

    if endpoints.is_empty() {
        return Err(StoreError::NoEndpoints);
    }
    Ok(endpoints)
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Build the keys API URL of `key` on `endpoint`.
pub fn keys_url(endpoint: &Url, key: &str, opts: &GetOptions) -> Result<Url> {
    let mut url = endpoint.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| StoreError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "endpoint cannot carry a path".to_string(),
            })?;
        segments.pop_if_empty().extend(["v2", "keys"]);

        let mut parts = key.split('/').filter(|p| !p.is_empty()).peekable();
        if parts.peek().is_none() {
            // the root is addressed as /v2/keys/
            segments.push("");
        } else {
            segments.extend(parts);
        }
    }

    url.query_pairs_mut()
        .append_pair("recursive", flag(opts.recursive))
        .append_pair("sorted", flag(opts.sort))
        .append_pair("quorum", flag(opts.quorum));
    Ok(url)
}

/// Turn a raw HTTP exchange into a keys API result.
pub fn decode_response(endpoint: &str, status: u16, body: &[u8]) -> Result<Response> {
    if (200..300).contains(&status) {
        return serde_json::from_slice(body).map_err(|e| StoreError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        });
    }

    match serde_json::from_slice::<ApiError>(body) {
        Ok(api) => Err(api.into()),
        Err(_) => Err(StoreError::Status {
            endpoint: endpoint.to_string(),
            status,
        }),
    }
}

/// Keys API client over HTTP with endpoint failover.
#[derive(Debug)]
pub struct HttpKeysClient {
    client: reqwest::Client,
    endpoints: Vec<Url>,
    pinned: AtomicUsize,
}

impl HttpKeysClient {
    /// Create a client for the configured endpoints.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let endpoints = parse_endpoints(&config.endpoints)?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(StoreError::Client)?;

        Ok(Self {
            client,
            endpoints,
            pinned: AtomicUsize::new(0),
        })
    }

    /// Endpoints in failover order.
    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    /// Index of the endpoint tried first.
    pub fn pinned(&self) -> usize {
        self.pinned.load(Ordering::Relaxed)
    }

    async fn get_from(&self, endpoint: &Url, key: &str, opts: &GetOptions) -> Result<Response> {
        let url = keys_url(endpoint, key, opts)?;
        debug!("GET {}", url);

        let transport = |source| StoreError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport)?;

        decode_response(endpoint.as_str(), status, &body)
    }
}

#[async_trait]
impl KeysApi for HttpKeysClient {
    async fn get(&self, key: &str, opts: &GetOptions) -> Result<Response> {
        let count = self.endpoints.len();
        let start = self.pinned();
        let mut last = None;

        for attempt in 0..count {
            let idx = (start + attempt) % count;
            let endpoint = &self.endpoints[idx];

            match self.get_from(endpoint, key, opts).await {
                Ok(response) => {
                    if idx != start {
                        info!("Switching to etcd endpoint {}", endpoint);
                        self.pinned.store(idx, Ordering::Relaxed);
                    }
                    return Ok(response);
                }
                Err(err) if err.is_retryable() => {
                    warn!("etcd endpoint {} failed: {}", endpoint, err);
                    last = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        match last {
            Some(last) => Err(StoreError::Unavailable {
                attempts: count,
                last: Box::new(last),
            }),
            None => Err(StoreError::NoEndpoints),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    const QUORUM: GetOptions = GetOptions {
        recursive: false,
        sort: true,
        quorum: true,
    };

    #[test]
    fn test_parse_endpoint_adds_http_scheme() {
        let url = parse_endpoint("localhost:4001").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(4001));
    }

    #[test]
    fn test_parse_endpoint_keeps_https() {
        let url = parse_endpoint(" https://etcd.example:2379 ").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.port(), Some(2379));
    }

    #[test]
    fn test_parse_endpoint_rejects_other_schemes() {
        let result = parse_endpoint("unix:///var/run/etcd.sock");
        assert!(matches!(result, Err(StoreError::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_parse_endpoints_skips_blanks() {
        let urls = parse_endpoints(&["10.0.0.1:2379", "", " 10.0.0.2:2379"]).unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1].host_str(), Some("10.0.0.2"));
    }

    #[test]
    fn test_parse_endpoints_empty_is_error() {
        let empty: [&str; 0] = [];
        assert!(matches!(parse_endpoints(&empty), Err(StoreError::NoEndpoints)));
        assert!(matches!(parse_endpoints(&[" "]), Err(StoreError::NoEndpoints)));
    }

    #[test]
    fn test_keys_url_for_nested_key() {
        let endpoint = parse_endpoint("localhost:4001").unwrap();
        let url = keys_url(&endpoint, "/root/a b", &QUORUM).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:4001/v2/keys/root/a%20b?recursive=false&sorted=true&quorum=true"
        );
    }

    #[test]
    fn test_keys_url_for_root() {
        let endpoint = parse_endpoint("localhost:4001").unwrap();
        let url = keys_url(&endpoint, "/", &GetOptions::default()).unwrap();
        assert_eq!(url.path(), "/v2/keys/");
        assert_eq!(url.query(), Some("recursive=false&sorted=false&quorum=false"));
    }

    #[test]
    fn test_keys_url_keeps_endpoint_prefix() {
        let endpoint = parse_endpoint("http://proxy:8080/etcd").unwrap();
        let url = keys_url(&endpoint, "/a", &QUORUM).unwrap();
        assert_eq!(url.path(), "/etcd/v2/keys/a");
    }

    #[test]
    fn test_decode_success() {
        let body = br#"{"action":"get","node":{"key":"/a","value":"1"}}"#;
        let resp = decode_response("http://a", 200, body).unwrap();
        assert_eq!(resp.node.value.as_deref(), Some("1"));
    }

    #[test]
    fn test_decode_etcd_error() {
        let body = br#"{"errorCode":100,"message":"Key not found","cause":"/missing","index":9}"#;
        let err = decode_response("http://a", 404, body).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::KeyNotFound));
    }

    #[test]
    fn test_decode_plain_error_keeps_status() {
        let err = decode_response("http://a", 502, b"Bad Gateway").unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 502, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_decode_garbage_success_body() {
        let err = decode_response("http://a", 200, b"<html>").unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn test_new_without_endpoints_fails() {
        let config = ClientConfig {
            endpoints: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            HttpKeysClient::new(config),
            Err(StoreError::NoEndpoints)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoints_report_unavailable() {
        let config = ClientConfig {
            endpoints: vec!["127.0.0.1:1".to_string(), "127.0.0.1:2".to_string()],
            request_timeout: Duration::from_secs(2),
        };
        let client = HttpKeysClient::new(config).unwrap();
        let err = client.get("/", &QUORUM).await.unwrap_err();
        match err {
            StoreError::Unavailable { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, StoreError::Transport { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.pinned(), 0);
    }

    /// Serve one canned HTTP reply on a local port and return its address.
    async fn canned(status: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request).await;
                let reply = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        addr.to_string()
    }

    fn client_for(endpoints: Vec<String>) -> HttpKeysClient {
        HttpKeysClient::new(ClientConfig {
            endpoints,
            request_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    const LEAF: &str =
        r#"{"action":"get","node":{"key":"/a","value":"1","modifiedIndex":4,"createdIndex":4}}"#;

    #[tokio::test]
    async fn test_failover_pins_first_endpoint_that_answers() {
        let healthy = canned("200 OK", LEAF).await;
        let client = client_for(vec!["127.0.0.1:1".to_string(), healthy]);

        let resp = client.get("/a", &QUORUM).await.unwrap();
        assert_eq!(resp.node.value.as_deref(), Some("1"));
        assert_eq!(client.pinned(), 1);
    }

    #[tokio::test]
    async fn test_etcd_errors_are_not_retried_elsewhere() {
        let not_found = canned(
            "404 Not Found",
            r#"{"errorCode":100,"message":"Key not found","cause":"/missing","index":7}"#,
        )
        .await;
        let spare = canned("200 OK", LEAF).await;
        let client = client_for(vec![not_found, spare]);

        let err = client.get("/missing", &QUORUM).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::KeyNotFound));
        assert_eq!(client.pinned(), 0);
    }

    #[tokio::test]
    async fn test_server_error_without_etcd_body_fails_over() {
        let broken = canned("503 Service Unavailable", "upstream down").await;
        let healthy = canned("200 OK", LEAF).await;
        let client = client_for(vec![broken, healthy]);

        let resp = client.get("/a", &QUORUM).await.unwrap();
        assert_eq!(resp.node.key, "/a");
        assert_eq!(client.pinned(), 1);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn keys_url_stays_under_keys_prefix(
                segments in proptest::collection::vec("[a-zA-Z0-9][a-zA-Z0-9 ?#%._-]{0,7}", 0..5)
            ) {
                let endpoint = parse_endpoint("localhost:4001").unwrap();
                let key = format!("/{}", segments.join("/"));
                let url = keys_url(&endpoint, &key, &QUORUM).unwrap();
                prop_assert!(url.path().starts_with("/v2/keys/"));
                prop_assert_eq!(url.host_str(), Some("localhost"));
                prop_assert_eq!(url.query(), Some("recursive=false&sorted=true&quorum=true"));
            }
        }
    }
}
