use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{PipeScanError, Result};

/// Tokens are refreshed once they are older than this. Concourse tokens live
/// for 24 hours; the one-hour margin keeps in-flight requests ahead of the
/// server-side expiry.
pub const TOKEN_REFRESH_WINDOW: Duration = Duration::from_secs(23 * 60 * 60);

/// Time source for the token cache. Injected so refresh-boundary behavior is
/// deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time, used everywhere outside of tests.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Body of the Concourse token endpoint response.
#[derive(Deserialize)]
struct AuthResponse {
    #[serde(rename = "type")]
    token_type: String,
    value: String,
}

struct CachedToken {
    header: String,
    obtained_at: Instant,
}

/// Exchanges username/password for a bearer token and caches the resulting
/// authorization header value.
///
/// The cache is guarded by an async mutex held across the exchange, so
/// concurrent callers observing a stale token await the single in-flight
/// refresh instead of each triggering their own.
pub struct TokenProvider {
    token_url: String,
    username: String,
    password: String,
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(
        host: &str,
        team: &str,
        username: String,
        password: String,
        client: reqwest::Client,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let host = host.trim_end_matches('/');

        Self {
            token_url: format!("{host}/api/v1/teams/{team}/auth/token"),
            username,
            password,
            client,
            clock,
            cached: Mutex::new(None),
        }
    }

    /// Returns the cached `"<type> <value>"` authorization header value,
    /// performing a credential exchange first if no token is cached or the
    /// cached one has outlived [`TOKEN_REFRESH_WINDOW`].
    pub async fn get_authorization_header(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = self.clock.now();

        // A token aged exactly TOKEN_REFRESH_WINDOW is still fresh.
        if let Some(token) = cached.as_ref() {
            if now.duration_since(token.obtained_at) <= TOKEN_REFRESH_WINDOW {
                return Ok(token.header.clone());
            }
        }

        let header = self.exchange_credentials().await?;
        *cached = Some(CachedToken {
            header: header.clone(),
            obtained_at: now,
        });

        Ok(header)
    }

    async fn exchange_credentials(&self) -> Result<String> {
        debug!("Exchanging credentials at {}", self.token_url);

        let response = self
            .client
            .get(&self.token_url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipeScanError::Auth(format!(
                "token endpoint returned {status}"
            )));
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| PipeScanError::Auth(format!("malformed token response: {e}")))?;

        Ok(format!("{} {}", auth.token_type, auth.value))
    }
}
