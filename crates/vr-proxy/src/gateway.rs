//! Upstream gateway access.
//!
//! [`Gateway`] is the seam between the proxy and the remote service: it
//! performs the raw HTTP exchanges and hands back status + body. The
//! envelope interpretation (`parse_*`) lives next to it so that any
//! implementation, including test doubles, goes through the same error
//! translation.

use std::future::Future;

use axum::body::Bytes;
use axum::http::StatusCode;
use vr_models::{
    ACCESS_TOKEN_PATH, AccessTokenData, AccessTokenRequest, GatewayEnvelope, GatewayStatus,
    ResourceCode, VR_INFO_UPSTREAM_PATH,
};

use crate::error::ProxyError;

/// Raw answer of a gateway call.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl UpstreamResponse {
    async fn read(res: reqwest::Response) -> Result<Self, ProxyError> {
        let status = res.status();
        let body = res.bytes().await?;
        Ok(Self { status, body })
    }
}

/// Token issued by the gateway, with its lifetime relative to now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub token: String,
    pub expires_in_secs: i64,
}

/// Remote gateway operations used by the proxy.
pub trait Gateway: Send + Sync + 'static {
    /// `POST {endpoint}/auth/access_token`.
    fn post_access_token(
        &self,
        endpoint: &str,
        request: &AccessTokenRequest,
    ) -> impl Future<Output = Result<UpstreamResponse, ProxyError>> + Send;

    /// `GET {endpoint}/open/v3/vr/info?resource_code={code}` with
    /// `Authorization: {token}`.
    fn get_vr_info(
        &self,
        endpoint: &str,
        token: &str,
        resource_code: &ResourceCode,
    ) -> impl Future<Output = Result<UpstreamResponse, ProxyError>> + Send;
}

/// [`Gateway`] backed by `reqwest`.
///
/// No explicit timeout is configured; calls rely on the client defaults.
#[derive(Debug, Clone, Default)]
pub struct HttpGateway {
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Gateway for HttpGateway {
    async fn post_access_token(
        &self,
        endpoint: &str,
        request: &AccessTokenRequest,
    ) -> Result<UpstreamResponse, ProxyError> {
        let res = self
            .client
            .post(format!("{endpoint}{ACCESS_TOKEN_PATH}"))
            .json(request)
            .send()
            .await?;
        UpstreamResponse::read(res).await
    }

    async fn get_vr_info(
        &self,
        endpoint: &str,
        token: &str,
        resource_code: &ResourceCode,
    ) -> Result<UpstreamResponse, ProxyError> {
        let res = self
            .client
            .get(format!("{endpoint}{VR_INFO_UPSTREAM_PATH}"))
            .query(&[("resource_code", resource_code.as_str())])
            .header(reqwest::header::AUTHORIZATION, token)
            .send()
            .await?;
        UpstreamResponse::read(res).await
    }
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}

/// Interpret the answer of the authentication endpoint.
pub fn parse_access_grant(response: &UpstreamResponse) -> Result<AccessGrant, ProxyError> {
    if !response.status.is_success() {
        return Err(ProxyError::UpstreamAuth(format!(
            "Failed to get access token from Gateway. Status: {} {}. Response: {}",
            response.status.as_u16(),
            reason(response.status),
            String::from_utf8_lossy(&response.body),
        )));
    }

    let envelope: GatewayEnvelope<AccessTokenData> = serde_json::from_slice(&response.body)?;
    if !envelope.is_success() {
        return Err(ProxyError::UpstreamAuth(format!(
            "Gateway returned error when fetching access token: {} (Code: {})",
            envelope.message,
            envelope.code_label(),
        )));
    }

    let data = envelope.data.ok_or_else(|| {
        ProxyError::UpstreamAuth("Gateway returned no access token data.".to_string())
    })?;

    Ok(AccessGrant {
        token: data.access_token,
        expires_in_secs: data.expires_in,
    })
}

/// Interpret the answer of the metadata endpoint, returning the body
/// untouched on success.
pub fn parse_vr_info(response: UpstreamResponse) -> Result<Bytes, ProxyError> {
    if !response.status.is_success() {
        return Err(ProxyError::Transport {
            status: response.status,
            message: format!(
                "Failed to fetch VR info from Gateway: {}",
                reason(response.status)
            ),
        });
    }

    let status: GatewayStatus = serde_json::from_slice(&response.body)?;
    if !status.is_success() {
        return Err(ProxyError::UpstreamMetadata {
            code: status.code_label(),
            message: status.message,
        });
    }

    Ok(response.body)
}
