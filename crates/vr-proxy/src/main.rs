//! VR proxy: serves gateway VR metadata to the viewer.
//!
//! On each `GET /api/vr/info` request the service:
//!
//! 1. Validates the `resourceCode` query parameter.
//! 2. Obtains a gateway access token, reusing the cached one while valid.
//! 3. Forwards the metadata call and returns the gateway body unchanged,
//!    or a `{ "error": … }` body with a status matching the failing layer.

mod config;
mod error;
mod gateway;
mod routes;
mod token;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::gateway::HttpGateway;
use crate::routes::AppState;
use crate::token::TokenCache;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env();

    match &config.gateway.endpoint {
        Some(endpoint) if config.gateway.is_complete() => {
            info!(endpoint = %endpoint, "gateway configured");
        }
        _ => warn!("gateway credentials incomplete; requests will fail until they are set"),
    }
    info!(policy = ?config.refresh_policy, "token refresh policy");

    let listen_port = config.listen_port;
    let gateway = Arc::new(HttpGateway::new());

    let state = Arc::new(AppState {
        config: config.gateway.clone(),
        gateway: gateway.clone(),
        tokens: TokenCache::new(gateway, config.gateway, config.refresh_policy),
    });

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{listen_port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");

    info!(address = %addr, "VR proxy listening");
    axum::serve(listener, app).await.expect("server error");
}
