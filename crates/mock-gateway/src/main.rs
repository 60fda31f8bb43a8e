//! Local stand-in for the VR gateway.
//!
//! Implements the two endpoints the proxy relies on:
//!
//! * `POST /auth/access_token`: issues random tokens for the configured
//!   application key/secret.
//! * `GET /open/v3/vr/info`: returns a demo work for any resource code,
//!   except `missing` which yields an application-level error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use vr_models::{
    AccessTokenData, AccessTokenRequest, GatewayEnvelope, ACCESS_TOKEN_PATH,
    VR_INFO_UPSTREAM_PATH,
};

/// Resource code that always resolves to "not found".
const MISSING_RESOURCE: &str = "missing";

#[derive(Parser, Debug, Clone)]
#[command(name = "mock-gateway")]
#[command(about = "Mock VR gateway for local development")]
struct Args {
    #[arg(long, default_value_t = 4000)]
    port: u16,

    #[arg(long, default_value = "demo-key")]
    app_key: String,

    #[arg(long, default_value = "demo-secret")]
    app_secret: String,

    /// Lifetime of issued tokens.
    #[arg(long, default_value_t = 7200)]
    ttl_seconds: i64,
}

struct GatewayState {
    app_key: String,
    app_secret: String,
    ttl_seconds: i64,
    /// Issued token → expiry.
    tokens: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl GatewayState {
    fn token_valid(&self, token: &str) -> bool {
        let now = Utc::now();
        let mut tokens = self
            .tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tokens.retain(|_, exp| *exp > now);
        tokens.contains_key(token)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let state = Arc::new(GatewayState {
        app_key: args.app_key,
        app_secret: args.app_secret,
        ttl_seconds: args.ttl_seconds,
        tokens: Mutex::new(HashMap::new()),
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port))
        .await
        .expect("failed to bind listener");
    info!(port = args.port, "mock gateway listening");
    axum::serve(listener, app(state)).await.expect("server error");
}

fn app(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route(ACCESS_TOKEN_PATH, post(access_token))
        .route(VR_INFO_UPSTREAM_PATH, get(vr_info))
        .with_state(state)
}

// --- Endpoints ---

async fn access_token(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<AccessTokenRequest>,
) -> Json<Value> {
    if req.app_key != state.app_key || req.app_secret != state.app_secret {
        info!(app_key = %req.app_key, "rejected credentials");
        return Json(json!(GatewayEnvelope::<()>::failure(
            10002,
            "invalid app_key or app_secret"
        )));
    }

    let access_token = format!("mock_{}", uuid::Uuid::new_v4().simple());
    let expiry = Utc::now() + Duration::seconds(state.ttl_seconds);
    state
        .tokens
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .insert(access_token.clone(), expiry);

    info!(ttl_seconds = state.ttl_seconds, "access token issued");
    Json(json!(GatewayEnvelope::success(AccessTokenData {
        access_token,
        expires_in: state.ttl_seconds,
    })))
}

#[derive(Deserialize)]
struct VrInfoParams {
    resource_code: Option<String>,
}

async fn vr_info(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Query(params): Query<VrInfoParams>,
) -> impl IntoResponse {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !state.token_valid(token) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!(GatewayEnvelope::<()>::failure(401, "invalid access token"))),
        );
    }

    let envelope = match params.resource_code.as_deref() {
        None | Some("") => GatewayEnvelope::failure(400_001, "resource_code is required"),
        Some(MISSING_RESOURCE) => GatewayEnvelope::failure(404_001, "resource not found"),
        Some(code) => GatewayEnvelope::success(demo_work(code)),
    };
    info!(resource_code = ?params.resource_code, code = ?envelope.code, "VR info served");
    (StatusCode::OK, Json(json!(envelope)))
}

/// Minimal scene payload shaped like a panorama work.
fn demo_work(resource_code: &str) -> Value {
    json!({
        "resource_code": resource_code,
        "work": {
            "base_url": "https://vr-public.example.com/",
            "picture_url": "https://vr-public.example.com/cover.jpg",
            "title": format!("Demo work {resource_code}"),
            "initial": { "pano_index": 0, "heading": 0, "longitude": 0, "latitude": 0, "fov": 90 },
            "panorama": {
                "count": 1,
                "list": [{
                    "index": 0,
                    "derived_id": 0,
                    "up": "pano/0/up.jpg",
                    "down": "pano/0/down.jpg",
                    "left": "pano/0/left.jpg",
                    "right": "pano/0/right.jpg",
                    "front": "pano/0/front.jpg",
                    "back": "pano/0/back.jpg"
                }]
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;

    use super::*;

    fn server() -> TestServer {
        let state = Arc::new(GatewayState {
            app_key: "k".into(),
            app_secret: "s".into(),
            ttl_seconds: 60,
            tokens: Mutex::new(HashMap::new()),
        });
        TestServer::new(app(state)).unwrap()
    }

    async fn issue_token(server: &TestServer) -> String {
        let res = server
            .post("/auth/access_token")
            .json(&json!({ "app_key": "k", "app_secret": "s" }))
            .await;
        res.assert_status_ok();
        let body: Value = res.json();
        assert_eq!(body["code"], 0);
        assert_eq!(body["data"]["expires_in"], 60);
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn wrong_credentials_get_application_error() {
        let server = server();
        let res = server
            .post("/auth/access_token")
            .json(&json!({ "app_key": "k", "app_secret": "nope" }))
            .await;
        res.assert_status_ok();
        let body: Value = res.json();
        assert_eq!(body["code"], 10002);
    }

    #[tokio::test]
    async fn vr_info_requires_issued_token() {
        let server = server();
        let res = server
            .get("/open/v3/vr/info")
            .add_query_param("resource_code", "abc")
            .add_header("authorization", "forged")
            .await;
        res.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn vr_info_serves_demo_and_missing() {
        let server = server();
        let token = issue_token(&server).await;

        let ok: Value = server
            .get("/open/v3/vr/info")
            .add_query_param("resource_code", "abc")
            .add_header("authorization", token.clone())
            .await
            .json();
        assert_eq!(ok["code"], 0);
        assert_eq!(ok["data"]["resource_code"], "abc");

        let missing: Value = server
            .get("/open/v3/vr/info")
            .add_query_param("resource_code", MISSING_RESOURCE)
            .add_header("authorization", token)
            .await
            .json();
        assert_eq!(missing["code"], 404_001);
        assert_eq!(missing["message"], "resource not found");
    }
}
