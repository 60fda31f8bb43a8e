//! Error types for the VR proxy.
//!
//! [`ProxyError`] unifies all failure modes and implements [`axum::response::IntoResponse`]
//! so handlers can return `Result<…, ProxyError>` directly. Every variant is
//! rendered as `{ "error": "<message>" }`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vr_models::ErrorBody;

/// Errors that can occur while serving a proxied request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The caller sent missing or invalid input.
    #[error("{0}")]
    BadRequest(String),

    /// Required gateway configuration is absent.
    #[error("{0}")]
    Configuration(String),

    /// The access-token exchange with the gateway failed.
    #[error("{0}")]
    UpstreamAuth(String),

    /// The gateway answered the metadata call with a non-zero status code.
    #[error("Gateway Error: {message} (Code: {code})")]
    UpstreamMetadata { code: String, message: String },

    /// The gateway answered the metadata call with a non-success HTTP status.
    #[error("{message}")]
    Transport { status: StatusCode, message: String },

    /// The HTTP call to the gateway failed before a status was received.
    #[error("failed to reach gateway: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway returned a body that is not a valid envelope.
    #[error("invalid gateway response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::UpstreamMetadata { .. } => StatusCode::BAD_REQUEST,
            Self::Transport { status, .. } => *status,
            Self::Configuration(_)
            | Self::UpstreamAuth(_)
            | Self::Http(_)
            | Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if let Self::BadRequest(_) = self {
            tracing::warn!(%status, error = %message, "rejected request");
        } else {
            tracing::error!(%status, error = %message, "request failed");
        }
        (status, Json(ErrorBody::new(message))).into_response()
    }
}
