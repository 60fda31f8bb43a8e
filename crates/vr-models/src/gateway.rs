//! Upstream gateway wire format.
//!
//! Every gateway response is wrapped in the same envelope:
//!
//! ```json
//! { "code": 0, "message": "success", "data": { ... } }
//! ```
//!
//! A `code` of `0` means success; any other value is an application-level
//! failure even when the HTTP status is `200`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Application status code signalling success.
pub const GATEWAY_SUCCESS_CODE: i64 = 0;

/// Path of the authentication endpoint, relative to the gateway base URL.
pub const ACCESS_TOKEN_PATH: &str = "/auth/access_token";

/// Path of the VR metadata endpoint, relative to the gateway base URL.
pub const VR_INFO_UPSTREAM_PATH: &str = "/open/v3/vr/info";

/// Response envelope returned by every gateway endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GatewayEnvelope<T> {
    /// Application status code (`0` on success). Kept as raw JSON: only
    /// the integer `0` is success, and anything else (absent, `null`, a
    /// string) is an application-level failure.
    #[serde(default)]
    pub code: Option<Value>,
    /// Human-readable status message. `null` reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    /// Endpoint-specific payload.
    pub data: Option<T>,
}

impl<T> GatewayEnvelope<T> {
    /// Build a successful envelope around `data`.
    pub fn success(data: T) -> Self {
        Self {
            code: Some(Value::from(GATEWAY_SUCCESS_CODE)),
            message: "success".to_string(),
            data: Some(data),
        }
    }

    /// Build a failure envelope with no payload.
    pub fn failure(code: i64, message: &str) -> Self {
        Self {
            code: Some(Value::from(code)),
            message: message.to_string(),
            data: None,
        }
    }

    /// Whether the envelope carries the success status code.
    pub fn is_success(&self) -> bool {
        self.code.as_ref().and_then(Value::as_i64) == Some(GATEWAY_SUCCESS_CODE)
    }

    /// Status code rendered for diagnostics (`"unknown"` when absent).
    pub fn code_label(&self) -> String {
        match &self.code {
            None | Some(Value::Null) => "unknown".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Status fields of an envelope, ignoring the payload.
///
/// Used where the payload must be passed through without interpretation.
pub type GatewayStatus = GatewayEnvelope<serde::de::IgnoredAny>;

/// Body of `POST /auth/access_token`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenRequest {
    /// Application key issued by the gateway.
    pub app_key: String,
    /// Application secret issued by the gateway.
    pub app_secret: String,
}

/// `data` payload of a successful `POST /auth/access_token`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenData {
    /// Opaque bearer token sent verbatim in the `Authorization` header.
    pub access_token: String,
    /// Token lifetime in seconds, relative to the time of issue.
    pub expires_in: i64,
}
