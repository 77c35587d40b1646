//! Client-credentials access token for the order backend.
//!
//! [`TokenCache`] is the only cross-request mutable state in the service. Reads of a fresh token
//! share an `RwLock`; refreshes are serialized behind a separate mutex so that any number of
//! callers arriving while a token is stale trigger a single exchange and then all read its
//! result.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use storechat_core::config::StoreConfig;
use storechat_core::errors::AuthError;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;
/// Upper bound applied to any advertised lifetime, margin or cooldown.
pub const MAX_EXPIRES_IN_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Serialize)]
struct ClientCredentialsRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self) -> Result<TokenGrant, AuthError>;
}

pub struct ClientCredentialsExchanger {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
}

impl ClientCredentialsExchanger {
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        Self { client, token_url: token_url.into(), client_id: client_id.into(), client_secret }
    }

    pub fn from_config(client: Client, config: &StoreConfig) -> Self {
        Self::new(
            client,
            config.token_url.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
        )
    }
}

#[async_trait]
impl TokenExchanger for ClientCredentialsExchanger {
    async fn exchange(&self) -> Result<TokenGrant, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .json(&ClientCredentialsRequest {
                grant_type: "client_credentials",
                client_id: &self.client_id,
                client_secret: self.client_secret.expose_secret(),
            })
            .send()
            .await
            .map_err(|error| AuthError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Status(response.status().as_u16()));
        }

        let grant: TokenGrant =
            response.json().await.map_err(|error| AuthError::Decode(error.to_string()))?;
        if grant.access_token.trim().is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(grant)
    }
}

#[async_trait]
impl<T> TokenExchanger for Arc<T>
where
    T: TokenExchanger + ?Sized,
{
    async fn exchange(&self) -> Result<TokenGrant, AuthError> {
        self.as_ref().exchange().await
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { value: value.into(), expires_at }
    }

    /// Lifetimes above [`MAX_EXPIRES_IN_SECS`] are clamped to it.
    pub fn from_grant(grant: TokenGrant, issued_at: DateTime<Utc>) -> Result<Self, AuthError> {
        let lifetime = grant.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS).min(MAX_EXPIRES_IN_SECS);
        let expires_at = issued_at.checked_add_signed(chrono_secs(lifetime)).ok_or_else(|| {
            AuthError::Decode(format!("token lifetime of {lifetime}s overflows the clock"))
        })?;
        Ok(Self::new(grant.access_token, expires_at))
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once `now` is inside the safety margin before expiry. A lifetime shorter than the
    /// margin makes the token due immediately.
    pub fn refresh_due(&self, margin: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.expires_at.checked_sub_signed(margin).map_or(true, |deadline| now >= deadline)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug)]
struct ExchangeFailure {
    at: DateTime<Utc>,
    error: AuthError,
}

#[derive(Debug, Default)]
struct CacheState {
    token: Option<AccessToken>,
    last_failure: Option<ExchangeFailure>,
    /// Bumped each time an exchange finishes, successful or not.
    generation: u64,
}

impl CacheState {
    fn fresh(&self, margin: chrono::Duration, now: DateTime<Utc>) -> Option<String> {
        self.token
            .as_ref()
            .filter(|token| !token.refresh_due(margin, now))
            .map(|token| token.value.clone())
    }

    fn unexpired(&self, now: DateTime<Utc>) -> Option<&AccessToken> {
        self.token.as_ref().filter(|token| !token.is_expired(now))
    }
}

pub struct TokenCache<E> {
    exchanger: E,
    margin: chrono::Duration,
    cooldown: chrono::Duration,
    state: RwLock<CacheState>,
    refresh: Mutex<()>,
}

impl<E> TokenCache<E>
where
    E: TokenExchanger,
{
    pub fn new(exchanger: E, margin: Duration, cooldown: Duration) -> Self {
        Self {
            exchanger,
            margin: chrono_secs(margin.as_secs()),
            cooldown: chrono_secs(cooldown.as_secs()),
            state: RwLock::new(CacheState::default()),
            refresh: Mutex::new(()),
        }
    }

    pub fn from_config(exchanger: E, config: &StoreConfig) -> Self {
        Self::new(
            exchanger,
            Duration::from_secs(config.token_refresh_margin_secs),
            Duration::from_secs(config.auth_retry_cooldown_secs),
        )
    }

    pub fn with_token(self, token: AccessToken) -> Self {
        let state = CacheState { token: Some(token), ..CacheState::default() };
        Self { state: RwLock::new(state), ..self }
    }

    pub async fn get_token(&self) -> Result<String, AuthError> {
        let observed = {
            let state = self.state.read().await;
            if let Some(value) = state.fresh(self.margin, Utc::now()) {
                return Ok(value);
            }
            state.generation
        };

        let _refresh = self.refresh.lock().await;
        let now = Utc::now();

        let unexpired = {
            let state = self.state.read().await;
            if state.generation != observed {
                // An exchange finished while we waited for the lock; share its outcome even when
                // the new token is already inside the refresh margin.
                match (state.unexpired(now), &state.last_failure) {
                    (Some(token), _) => return Ok(token.value.clone()),
                    (None, Some(failure)) => return Err(failure.error.clone()),
                    (None, None) => {}
                }
            }
            if let Some(value) = state.fresh(self.margin, now) {
                return Ok(value);
            }
            if let Some(failure) = &state.last_failure {
                let retry_at = failure.at + self.cooldown;
                if now < retry_at {
                    return match state.unexpired(now) {
                        Some(token) => Ok(token.value.clone()),
                        None => Err(AuthError::CoolingDown {
                            retry_in_secs: (retry_at - now).num_seconds().max(1) as u64,
                        }),
                    };
                }
            }
            state.unexpired(now).cloned()
        };

        let minted = match self.exchanger.exchange().await {
            Ok(grant) => AccessToken::from_grant(grant, Utc::now()),
            Err(error) => Err(error),
        };

        let mut state = self.state.write().await;
        state.generation = state.generation.wrapping_add(1);
        match minted {
            Ok(token) => {
                info!(
                    event_name = "orders.token.refreshed",
                    correlation_id = "token_cache",
                    expires_at = %token.expires_at,
                    "order backend access token refreshed"
                );
                let value = token.value.clone();
                state.token = Some(token);
                state.last_failure = None;
                Ok(value)
            }
            Err(error) => {
                state.last_failure = Some(ExchangeFailure { at: Utc::now(), error: error.clone() });
                match unexpired {
                    Some(token) => {
                        warn!(
                            event_name = "orders.token.refresh_failed",
                            correlation_id = "token_cache",
                            error = %error,
                            "proactive token refresh failed; serving unexpired cached token"
                        );
                        Ok(token.value)
                    }
                    None => {
                        warn!(
                            event_name = "orders.token.exchange_failed",
                            correlation_id = "token_cache",
                            error = %error,
                            "order backend token exchange failed"
                        );
                        Err(error)
                    }
                }
            }
        }
    }

    /// Whether a call to [`Self::get_token`] would currently succeed without a network call.
    pub async fn has_fresh_token(&self) -> bool {
        self.state.read().await.fresh(self.margin, Utc::now()).is_some()
    }
}

fn chrono_secs(secs: u64) -> chrono::Duration {
    // Clamped well inside the range chrono accepts.
    chrono::Duration::seconds(secs.min(MAX_EXPIRES_IN_SECS) as i64)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use storechat_core::errors::AuthError;

    use super::{AccessToken, TokenCache, TokenExchanger, TokenGrant, MAX_EXPIRES_IN_SECS};

    struct CountingExchanger {
        calls: AtomicUsize,
        delay: Duration,
        outcome: Result<TokenGrant, AuthError>,
    }

    impl CountingExchanger {
        fn granting(access_token: &str, expires_in: u64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(50),
                outcome: Ok(TokenGrant {
                    access_token: access_token.to_string(),
                    expires_in: Some(expires_in),
                }),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(10),
                outcome: Err(AuthError::Status(401)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenExchanger for CountingExchanger {
        async fn exchange(&self) -> Result<TokenGrant, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.outcome.clone()
        }
    }

    fn cache(exchanger: Arc<CountingExchanger>) -> TokenCache<Arc<CountingExchanger>> {
        TokenCache::new(exchanger, Duration::from_secs(300), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn token_outside_margin_is_served_without_exchange() {
        let exchanger = Arc::new(CountingExchanger::granting("fresh", 3600));
        let cache = cache(exchanger.clone())
            .with_token(AccessToken::new("cached", Utc::now() + chrono::Duration::seconds(400)));

        assert_eq!(cache.get_token().await, Ok("cached".to_string()));
        assert_eq!(exchanger.calls(), 0);
        assert!(cache.has_fresh_token().await);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_exchange() {
        let exchanger = Arc::new(CountingExchanger::granting("fresh", 3600));
        let cache = Arc::new(
            cache(exchanger.clone())
                .with_token(AccessToken::new("old", Utc::now() - chrono::Duration::seconds(1))),
        );

        let handles = (0..10)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_token().await })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            let token = handle.await.expect("task should not panic");
            assert_eq!(token, Ok("fresh".to_string()));
        }
        assert_eq!(exchanger.calls(), 1);
    }

    #[tokio::test]
    async fn token_inside_margin_is_refreshed() {
        let exchanger = Arc::new(CountingExchanger::granting("fresh", 3600));
        let cache = cache(exchanger.clone())
            .with_token(AccessToken::new("aging", Utc::now() + chrono::Duration::seconds(200)));

        assert_eq!(cache.get_token().await, Ok("fresh".to_string()));
        assert_eq!(exchanger.calls(), 1);

        assert_eq!(cache.get_token().await, Ok("fresh".to_string()));
        assert_eq!(exchanger.calls(), 1);
    }

    #[tokio::test]
    async fn failed_proactive_refresh_keeps_unexpired_token() {
        let exchanger = Arc::new(CountingExchanger::failing());
        let cache = cache(exchanger.clone())
            .with_token(AccessToken::new("aging", Utc::now() + chrono::Duration::seconds(120)));

        assert_eq!(cache.get_token().await, Ok("aging".to_string()));
        assert_eq!(exchanger.calls(), 1);
    }

    #[tokio::test]
    async fn failure_without_token_propagates_then_cools_down() {
        let exchanger = Arc::new(CountingExchanger::failing());
        let cache = cache(exchanger.clone());

        assert_eq!(cache.get_token().await, Err(AuthError::Status(401)));
        assert!(matches!(cache.get_token().await, Err(AuthError::CoolingDown { .. })));
        assert_eq!(exchanger.calls(), 1);
        assert!(!cache.has_fresh_token().await);
    }

    #[tokio::test]
    async fn zero_cooldown_retries_on_next_call() {
        let exchanger = Arc::new(CountingExchanger::failing());
        let cache = TokenCache::new(exchanger.clone(), Duration::from_secs(300), Duration::ZERO);

        assert!(cache.get_token().await.is_err());
        assert!(cache.get_token().await.is_err());
        assert_eq!(exchanger.calls(), 2);
    }

    #[tokio::test]
    async fn short_lived_grant_is_shared_by_concurrent_callers() {
        // 100s is inside the 300s margin, so the minted token is due again immediately.
        let exchanger = Arc::new(CountingExchanger::granting("short", 100));
        let cache = Arc::new(cache(exchanger.clone()));

        let handles = (0..10)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_token().await })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            let token = handle.await.expect("task should not panic");
            assert_eq!(token, Ok("short".to_string()));
        }
        assert_eq!(exchanger.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_failure() {
        let exchanger = Arc::new(CountingExchanger::failing());
        let cache = Arc::new(TokenCache::new(
            exchanger.clone(),
            Duration::from_secs(300),
            Duration::ZERO,
        ));

        let handles = (0..10)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_token().await })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            let token = handle.await.expect("task should not panic");
            assert_eq!(token, Err(AuthError::Status(401)));
        }
        assert_eq!(exchanger.calls(), 1);
    }

    #[tokio::test]
    async fn huge_lifetime_is_clamped_instead_of_panicking() {
        let exchanger = Arc::new(CountingExchanger::granting("forever", u64::MAX));
        let cache = cache(exchanger.clone());

        assert_eq!(cache.get_token().await, Ok("forever".to_string()));
        assert!(cache.has_fresh_token().await);
    }

    #[test]
    fn grant_without_lifetime_defaults_to_an_hour() {
        let issued_at = Utc::now();
        let token = AccessToken::from_grant(
            TokenGrant { access_token: "t".to_string(), expires_in: None },
            issued_at,
        )
        .expect("default lifetime fits");
        assert_eq!(token.expires_at(), issued_at + chrono::Duration::seconds(3600));
    }

    #[test]
    fn max_lifetime_grant_is_clamped() {
        let issued_at = Utc::now();
        let token = AccessToken::from_grant(
            TokenGrant { access_token: "t".to_string(), expires_in: Some(u64::MAX) },
            issued_at,
        )
        .expect("clamped lifetime fits");
        assert_eq!(
            token.expires_at(),
            issued_at + chrono::Duration::seconds(MAX_EXPIRES_IN_SECS as i64)
        );
    }

    #[test]
    fn lifetime_past_the_end_of_the_clock_is_a_decode_error() {
        let grant = TokenGrant { access_token: "t".to_string(), expires_in: Some(60) };
        let result = AccessToken::from_grant(grant, DateTime::<Utc>::MAX_UTC);
        assert!(matches!(result, Err(AuthError::Decode(_))));
    }

    #[test]
    fn short_lifetime_is_due_immediately() {
        let now = Utc::now();
        let token = AccessToken::new("short", now + chrono::Duration::seconds(100));
        assert!(token.refresh_due(chrono::Duration::seconds(300), now));
        assert!(!token.is_expired(now));
    }

    #[test]
    fn debug_output_redacts_value() {
        let token = AccessToken::new("super-secret-token", Utc::now());
        assert!(!format!("{token:?}").contains("super-secret-token"));
    }
}
