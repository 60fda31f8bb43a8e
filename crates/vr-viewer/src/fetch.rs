//! VR data fetching through the local proxy.
//!
//! Successful results are cached per resource code for the lifetime of
//! the process. Nothing is refetched on focus and failures are never
//! retried automatically: an error goes straight to the error boundary and
//! only a user retry starts a new request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info};
use vr_models::{ErrorBody, GatewayEnvelope, ResourceCode, RESOURCE_CODE_PARAM, VR_INFO_PATH};

use crate::error::ViewerError;

const DEFAULT_SERVER_ERROR: &str = "Failed to fetch VR data from server.";
const DEFAULT_GATEWAY_ERROR: &str = "Gateway returned an error.";

/// Client of the proxy's `GET /api/vr/info`.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    base_url: String,
    http: reqwest::Client,
}

impl PartialEq for ProxyClient {
    fn eq(&self, other: &Self) -> bool {
        self.base_url == other.base_url
    }
}

impl ProxyClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetch the scene payload (`data`) of a work.
    pub async fn fetch_work(&self, code: &ResourceCode) -> Result<Value, ViewerError> {
        let res = self
            .http
            .get(format!("{}{VR_INFO_PATH}", self.base_url))
            .query(&[(RESOURCE_CODE_PARAM, code.as_str())])
            .send()
            .await?;
        let status = res.status();
        let body = res.bytes().await?;
        interpret_response(status, &body)
    }
}

/// Translate a proxy response into the scene payload or a fetch error.
pub fn interpret_response(status: StatusCode, body: &[u8]) -> Result<Value, ViewerError> {
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .map(|b| b.error)
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_ERROR.to_string());
        return Err(ViewerError::Fetch(message));
    }

    let envelope: GatewayEnvelope<Value> = serde_json::from_slice(body)
        .map_err(|e| ViewerError::Fetch(format!("Invalid response from server: {e}")))?;
    if !envelope.is_success() {
        let message = if envelope.message.is_empty() {
            DEFAULT_GATEWAY_ERROR.to_string()
        } else {
            envelope.message
        };
        return Err(ViewerError::Fetch(message));
    }

    envelope
        .data
        .ok_or_else(|| ViewerError::Fetch("Gateway response did not contain scene data.".into()))
}

/// A successfully fetched payload. `revision` is unique per fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedWork {
    pub revision: u64,
    pub data: Arc<Value>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<ResourceCode, FetchedWork>,
    next_revision: u64,
}

/// Process-wide cache of fetched works, keyed by resource code.
#[derive(Clone, Default)]
pub struct WorkCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl PartialEq for WorkCache {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl WorkCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, code: &ResourceCode) -> Option<FetchedWork> {
        self.lock().entries.get(code).cloned()
    }

    pub fn insert(&self, code: &ResourceCode, data: Value) -> FetchedWork {
        let mut inner = self.lock();
        inner.next_revision += 1;
        let work = FetchedWork {
            revision: inner.next_revision,
            data: Arc::new(data),
        };
        inner.entries.insert(code.clone(), work.clone());
        work
    }

    pub fn invalidate(&self, code: &ResourceCode) {
        self.lock().entries.remove(code);
    }

    /// Return the cached work or fetch it. Errors are not cached.
    pub async fn fetch_cached(
        &self,
        client: &ProxyClient,
        code: &ResourceCode,
    ) -> Result<FetchedWork, ViewerError> {
        if let Some(hit) = self.get(code) {
            debug!(resource_code = %code, revision = hit.revision, "work cache hit");
            return Ok(hit);
        }
        let data = client.fetch_work(code).await?;
        let work = self.insert(code, data);
        info!(resource_code = %code, revision = work.revision, "work fetched");
        Ok(work)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn code(s: &str) -> ResourceCode {
        ResourceCode::new(s).unwrap()
    }

    #[test]
    fn success_yields_data() {
        let body = json!({ "code": 0, "message": "success", "data": { "work": 1 } }).to_string();
        let data = interpret_response(StatusCode::OK, body.as_bytes()).unwrap();
        assert_eq!(data, json!({ "work": 1 }));
    }

    #[test]
    fn proxy_error_body_is_surfaced() {
        let body = json!({ "error": "Gateway Error: not found (Code: 5)" }).to_string();
        let err = interpret_response(StatusCode::BAD_REQUEST, body.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            ViewerError::Fetch("Gateway Error: not found (Code: 5)".into())
        );
    }

    #[test]
    fn unparseable_error_falls_back_to_default() {
        let err = interpret_response(StatusCode::BAD_GATEWAY, b"<html>").unwrap_err();
        assert_eq!(err.to_string(), DEFAULT_SERVER_ERROR);
    }

    #[test]
    fn nonzero_code_in_success_body() {
        let body = json!({ "code": 7, "message": "expired" }).to_string();
        let err = interpret_response(StatusCode::OK, body.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "expired");

        let body = json!({ "code": 7 }).to_string();
        let err = interpret_response(StatusCode::OK, body.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), DEFAULT_GATEWAY_ERROR);
    }

    #[test]
    fn cache_assigns_new_revision_per_insert() {
        let cache = WorkCache::new();
        let a = cache.insert(&code("a"), json!(1));
        let b = cache.insert(&code("a"), json!(2));
        assert_ne!(a.revision, b.revision);
        assert_eq!(cache.get(&code("a")), Some(b));
        cache.invalidate(&code("a"));
        assert!(cache.get(&code("a")).is_none());
    }

    #[tokio::test]
    async fn fetch_cached_hits_proxy_once_per_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/vr/info"))
            .and(query_param("resourceCode", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "message": "success", "data": { "scene": "abc" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ProxyClient::new(&server.uri());
        let cache = WorkCache::new();
        let first = cache.fetch_cached(&client, &code("abc")).await.unwrap();
        let second = cache.fetch_cached(&client, &code("abc")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(*first.data, json!({ "scene": "abc" }));
    }

    #[tokio::test]
    async fn fetch_errors_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/vr/info"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({ "error": "Missing environment variables." })),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = ProxyClient::new(&server.uri());
        let cache = WorkCache::new();
        for _ in 0..2 {
            let err = cache.fetch_cached(&client, &code("abc")).await.unwrap_err();
            assert_eq!(err, ViewerError::Fetch("Missing environment variables.".into()));
        }
    }
}
