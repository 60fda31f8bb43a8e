//! Proxy configuration.
//!
//! Gateway credentials are read once from the environment at startup but
//! only validated when a request needs them: a missing value is reported
//! per request as a configuration error instead of aborting the process.

use crate::error::ProxyError;
use crate::token::RefreshPolicy;

const ENDPOINT_VAR: &str = "REALSEE_GATEWAY_ENDPOINT";
const APP_KEY_VAR: &str = "REALSEE_GATEWAY_APP_KEY";
const APP_SECRET_VAR: &str = "REALSEE_GATEWAY_APP_SECRET";

/// Gateway settings as found in the environment. Any of them may be absent.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Base URL of the gateway, without trailing slash.
    pub endpoint: Option<String>,
    /// Application key.
    pub app_key: Option<String>,
    /// Application secret.
    pub app_secret: Option<String>,
}

/// Complete credential pair, guaranteed present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub endpoint: String,
    pub app_key: String,
    pub app_secret: String,
}

impl GatewayConfig {
    /// Return the credential pair, or a [`ProxyError::Configuration`]
    /// naming every required variable if any of them is missing.
    pub fn credentials(&self) -> Result<Credentials, ProxyError> {
        match (&self.endpoint, &self.app_key, &self.app_secret) {
            (Some(endpoint), Some(app_key), Some(app_secret)) => Ok(Credentials {
                endpoint: endpoint.clone(),
                app_key: app_key.clone(),
                app_secret: app_secret.clone(),
            }),
            _ => Err(ProxyError::Configuration(format!(
                "Missing environment variables. Please ensure {ENDPOINT_VAR}, \
                 {APP_KEY_VAR}, and {APP_SECRET_VAR} are set."
            ))),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.credentials().is_ok()
    }
}

/// Global configuration shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    /// Port to listen on (default `3000`).
    pub listen_port: u16,
    /// How concurrent token refreshes are coordinated.
    pub refresh_policy: RefreshPolicy,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable                     | Default | Description                        |
    /// |------------------------------|---------|------------------------------------|
    /// | `REALSEE_GATEWAY_ENDPOINT`   | none    | Gateway base URL                   |
    /// | `REALSEE_GATEWAY_APP_KEY`    | none    | Application key                    |
    /// | `REALSEE_GATEWAY_APP_SECRET` | none    | Application secret                 |
    /// | `VR_PROXY_PORT`              | `3000`  | HTTP listen port                   |
    /// | `VR_TOKEN_SINGLE_FLIGHT`     | `false` | Serialize concurrent token refresh |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen_port = get("VR_PROXY_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let refresh_policy = match get("VR_TOKEN_SINGLE_FLIGHT").as_deref() {
            Some("1" | "true" | "yes" | "on") => RefreshPolicy::SingleFlight,
            _ => RefreshPolicy::Redundant,
        };

        Self {
            gateway: GatewayConfig {
                endpoint: get(ENDPOINT_VAR).map(|e| e.trim_end_matches('/').to_string()),
                app_key: get(APP_KEY_VAR),
                app_secret: get(APP_SECRET_VAR),
            },
            listen_port,
            refresh_policy,
        }
    }
}
