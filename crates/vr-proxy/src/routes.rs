//! HTTP surface of the proxy.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tracing::info;
use vr_models::{MISSING_RESOURCE_CODE, ResourceCode, VR_INFO_PATH, VrInfoQuery};

use crate::config::GatewayConfig;
use crate::error::ProxyError;
use crate::gateway::{Gateway, parse_vr_info};
use crate::token::TokenCache;

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// State shared across all Axum handlers.
pub struct AppState<G> {
    /// Gateway settings, validated per request.
    pub config: GatewayConfig,
    /// Upstream client.
    pub gateway: Arc<G>,
    /// Process-wide access-token cache.
    pub tokens: TokenCache<G>,
}

pub fn router<G: Gateway>(state: Arc<AppState<G>>) -> Router {
    Router::new()
        .route(VR_INFO_PATH, get(get_vr_info::<G>))
        .route("/healthz", get(healthz))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /healthz`: liveness probe.
async fn healthz() -> &'static str {
    "ok"
}

/// `GET /api/vr/info?resourceCode={code}`: proxy the gateway metadata call.
///
/// The upstream body is forwarded byte for byte on success.
async fn get_vr_info<G: Gateway>(
    State(state): State<Arc<AppState<G>>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ProxyError> {
    // 1. Validate input before touching the gateway
    let Query(pairs) = query.map_err(|rejection| ProxyError::BadRequest(rejection.body_text()))?;
    let query = VrInfoQuery::from_pairs(pairs);
    let resource_code = query
        .resource_code
        .as_deref()
        .and_then(|code| ResourceCode::new(code).ok())
        .ok_or_else(|| ProxyError::BadRequest(MISSING_RESOURCE_CODE.to_string()))?;

    // 2. Obtain a valid access token
    let token = state.tokens.access_token().await?;
    let endpoint = state.config.credentials()?.endpoint;

    // 3. Fetch VR info from the gateway
    let response = state
        .gateway
        .get_vr_info(&endpoint, &token, &resource_code)
        .await?;
    let body = parse_vr_info(response)?;

    info!(resource_code = %resource_code, bytes = body.len(), "VR info proxied");
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use super::*;
    use crate::gateway::UpstreamResponse;
    use crate::gateway::fake::{FakeGateway, json_response};
    use crate::token::RefreshPolicy;

    fn complete_config() -> GatewayConfig {
        GatewayConfig {
            endpoint: Some("https://gw.example.com".into()),
            app_key: Some("key".into()),
            app_secret: Some("secret".into()),
        }
    }

    fn server_with(gateway: Arc<FakeGateway>, config: GatewayConfig) -> TestServer {
        let state = Arc::new(AppState {
            config: config.clone(),
            gateway: gateway.clone(),
            tokens: TokenCache::new(gateway, config, RefreshPolicy::Redundant),
        });
        TestServer::new(router(state)).unwrap()
    }

    #[tokio::test]
    async fn missing_resource_code_is_bad_request() {
        let gateway = Arc::new(FakeGateway::new());
        let server = server_with(gateway.clone(), complete_config());

        let res = server.get("/api/vr/info").await;
        res.assert_status(StatusCode::BAD_REQUEST);
        res.assert_json(&json!({ "error": "Missing \"resourceCode\" query parameter." }));

        assert_eq!(gateway.auth_calls(), 0);
        assert_eq!(gateway.info_calls(), 0);
    }

    #[tokio::test]
    async fn empty_resource_code_is_bad_request() {
        let gateway = Arc::new(FakeGateway::new());
        let server = server_with(gateway.clone(), complete_config());

        let res = server
            .get("/api/vr/info")
            .add_query_param("resourceCode", "")
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(gateway.auth_calls(), 0);
    }

    #[tokio::test]
    async fn repeated_resource_code_uses_first_value() {
        let gateway = Arc::new(FakeGateway::new());
        let server = server_with(gateway.clone(), complete_config());

        let res = server
            .get("/api/vr/info?resourceCode=a&resourceCode=b")
            .await;
        res.assert_status_ok();
        let requests = gateway.info_requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].2, "a");
    }

    #[tokio::test]
    async fn success_returns_upstream_body_unchanged() {
        let raw = r#"{"code":0,"message":"success","data":{"work":{"panorama":{"list":[]}},"b":1}}"#;
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_info(UpstreamResponse {
            status: StatusCode::OK,
            body: Bytes::from_static(raw.as_bytes()),
        });
        let server = server_with(gateway.clone(), complete_config());

        let res = server
            .get("/api/vr/info")
            .add_query_param("resourceCode", "kv4Y7rB2")
            .await;
        res.assert_status_ok();
        res.assert_text(raw);
        assert_eq!(
            res.header(header::CONTENT_TYPE).to_str().unwrap(),
            "application/json"
        );

        let requests = gateway.info_requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![(
                "https://gw.example.com".to_string(),
                "tok-1".to_string(),
                "kv4Y7rB2".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn application_error_becomes_bad_request() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_info(json_response(
            StatusCode::OK,
            &json!({ "code": 5, "message": "not found" }),
        ));
        let server = server_with(gateway, complete_config());

        let res = server
            .get("/api/vr/info")
            .add_query_param("resourceCode", "missing")
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);
        let error = res.json::<Value>()["error"].as_str().unwrap().to_string();
        assert!(error.contains('5'));
        assert!(error.contains("not found"));
    }

    #[tokio::test]
    async fn null_message_still_becomes_bad_request() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_info(json_response(
            StatusCode::OK,
            &json!({ "code": 5, "message": null }),
        ));
        let server = server_with(gateway, complete_config());

        let res = server
            .get("/api/vr/info")
            .add_query_param("resourceCode", "abc")
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);
        res.assert_json(&json!({ "error": "Gateway Error:  (Code: 5)" }));
    }

    #[tokio::test]
    async fn string_code_still_becomes_bad_request() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_info(json_response(
            StatusCode::OK,
            &json!({ "code": "E42", "message": "quota exceeded" }),
        ));
        let server = server_with(gateway, complete_config());

        let res = server
            .get("/api/vr/info")
            .add_query_param("resourceCode", "abc")
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);
        res.assert_json(&json!({ "error": "Gateway Error: quota exceeded (Code: E42)" }));
    }

    #[tokio::test]
    async fn transport_error_forwards_upstream_status() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_info(UpstreamResponse {
            status: StatusCode::NOT_FOUND,
            body: Bytes::from_static(b"no route"),
        });
        let server = server_with(gateway, complete_config());

        let res = server
            .get("/api/vr/info")
            .add_query_param("resourceCode", "abc")
            .await;
        res.assert_status(StatusCode::NOT_FOUND);
        res.assert_json(&json!({ "error": "Failed to fetch VR info from Gateway: Not Found" }));
    }

    #[tokio::test]
    async fn missing_configuration_is_internal_error() {
        let gateway = Arc::new(FakeGateway::new());
        let server = server_with(gateway.clone(), GatewayConfig::default());

        let res = server
            .get("/api/vr/info")
            .add_query_param("resourceCode", "abc")
            .await;
        res.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let error = res.json::<Value>()["error"].as_str().unwrap().to_string();
        assert!(error.contains("REALSEE_GATEWAY_ENDPOINT"));
        assert_eq!(gateway.auth_calls(), 0);
        assert_eq!(gateway.info_calls(), 0);
    }

    #[tokio::test]
    async fn auth_failure_is_internal_error_without_metadata_call() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_auth(json_response(
            StatusCode::OK,
            &json!({ "code": 10002, "message": "invalid app_secret" }),
        ));
        let server = server_with(gateway.clone(), complete_config());

        let res = server
            .get("/api/vr/info")
            .add_query_param("resourceCode", "abc")
            .await;
        res.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let error = res.json::<Value>()["error"].as_str().unwrap().to_string();
        assert!(error.contains("invalid app_secret"));
        assert_eq!(gateway.info_calls(), 0);
    }

    #[tokio::test]
    async fn huge_token_lifetime_is_served_normally() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.set_auth(FakeGateway::token_response("tok", i64::MAX / 100));
        let server = server_with(gateway.clone(), complete_config());

        server
            .get("/api/vr/info")
            .add_query_param("resourceCode", "x")
            .await
            .assert_status_ok();
        assert_eq!(gateway.info_calls(), 1);
    }

    #[tokio::test]
    async fn token_is_reused_across_requests() {
        let gateway = Arc::new(FakeGateway::new());
        let server = server_with(gateway.clone(), complete_config());

        for code in ["a", "b", "c"] {
            server
                .get("/api/vr/info")
                .add_query_param("resourceCode", code)
                .await
                .assert_status_ok();
        }
        assert_eq!(gateway.auth_calls(), 1);
        assert_eq!(gateway.info_calls(), 3);
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let server = server_with(Arc::new(FakeGateway::new()), GatewayConfig::default());
        let res = server.get("/healthz").await;
        res.assert_status_ok();
        res.assert_text("ok");
    }
}
