//! Access-token cache.
//!
//! [`TokenCache`] hands out a gateway bearer token, reusing the cached one
//! while it is more than [`SAFETY_MARGIN_MS`] away from expiry and
//! re-authenticating otherwise.
//!
//! The cached value is replaced wholesale under a short-lived lock that is
//! never held across an `.await`. With [`RefreshPolicy::Redundant`]
//! concurrent misses may each call the gateway; the last writer wins.
//! [`RefreshPolicy::SingleFlight`] funnels refreshes through an async lock
//! and re-checks the cache once it is acquired.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};
use vr_models::AccessTokenRequest;

use crate::config::GatewayConfig;
use crate::error::ProxyError;
use crate::gateway::{Gateway, parse_access_grant};

/// Tokens expiring within this window are treated as already expired.
pub const SAFETY_MARGIN_MS: i64 = 60_000;

/// Source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + 'static {
    fn now_ms(&self) -> i64;
}

/// [`Clock`] reading the system UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A token together with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub expires_at_ms: i64,
}

impl CachedToken {
    /// Whether the token can still be handed out at `now_ms`.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms.saturating_sub(SAFETY_MARGIN_MS)
    }
}

/// Coordination of concurrent refreshes on a cache miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Every caller that misses refreshes on its own.
    #[default]
    Redundant,
    /// At most one refresh runs at a time; waiters reuse its result.
    SingleFlight,
}

pub struct TokenCache<G> {
    gateway: Arc<G>,
    config: GatewayConfig,
    clock: Arc<dyn Clock>,
    policy: RefreshPolicy,
    cached: Mutex<Option<CachedToken>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl<G: Gateway> TokenCache<G> {
    pub fn new(gateway: Arc<G>, config: GatewayConfig, policy: RefreshPolicy) -> Self {
        Self::with_clock(gateway, config, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(
        gateway: Arc<G>,
        config: GatewayConfig,
        policy: RefreshPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            config,
            clock,
            policy,
            cached: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Snapshot of the cached token, fresh or not.
    pub fn cached(&self) -> Option<CachedToken> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn fresh_token(&self) -> Option<String> {
        let now = self.clock.now_ms();
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|t| t.is_fresh(now))
            .map(|t| t.value.clone())
    }

    /// Return a currently valid token, authenticating if needed.
    ///
    /// Fails with [`ProxyError::Configuration`] before any network call if
    /// credentials are missing.
    pub async fn access_token(&self) -> Result<String, ProxyError> {
        let credentials = self.config.credentials()?;

        if let Some(token) = self.fresh_token() {
            debug!("access token cache hit");
            return Ok(token);
        }

        let request = AccessTokenRequest {
            app_key: credentials.app_key,
            app_secret: credentials.app_secret,
        };

        match self.policy {
            RefreshPolicy::Redundant => self.refresh(&credentials.endpoint, &request).await,
            RefreshPolicy::SingleFlight => {
                let _guard = self.refresh_lock.lock().await;
                if let Some(token) = self.fresh_token() {
                    debug!("access token refreshed by concurrent request");
                    return Ok(token);
                }
                self.refresh(&credentials.endpoint, &request).await
            }
        }
    }

    async fn refresh(
        &self,
        endpoint: &str,
        request: &AccessTokenRequest,
    ) -> Result<String, ProxyError> {
        let response = self
            .gateway
            .post_access_token(endpoint, request)
            .await
            .map_err(|e| match e {
                ProxyError::Http(err) => ProxyError::UpstreamAuth(format!(
                    "Failed to get access token from Gateway: {err}"
                )),
                other => other,
            })?;
        let grant = parse_access_grant(&response)?;

        // Upstream-controlled; negative lifetimes count as already expired.
        let ttl_ms = grant.expires_in_secs.max(0).saturating_mul(1000);
        let expires_at_ms = self.clock.now_ms().saturating_add(ttl_ms);
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(CachedToken {
            value: grant.token.clone(),
            expires_at_ms,
        });

        info!(
            expires_in_secs = grant.expires_in_secs,
            expires_at_ms, "gateway access token refreshed"
        );
        Ok(grant.token)
    }
}
