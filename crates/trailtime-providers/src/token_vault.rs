// ABOUTME: Holds and refreshes provider OAuth tokens, one atomic refresh in flight per user
// ABOUTME: Reads are lock-free snapshots from the store; writes take a per-user refresh lock

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use trailtime_core::constants::{CROSS_SERVICE_HTTP_TIMEOUT_SECS, CROSS_SERVICE_TOKEN_CACHE_SECS, TOKEN_REFRESH_MARGIN_SECS};
use trailtime_core::model::Token;

use crate::error::ProviderError;

/// Where a `TokenVault` reads and writes tokens. The root crate's `ActivityStore`
/// is the production implementation; tests can substitute an in-memory one.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fetch the stored token for a user, if any.
    async fn get_token(&self, user_id: Uuid) -> Result<Option<Token>, ProviderError>;
    /// Replace the stored token for a user.
    async fn put_token(&self, token: &Token) -> Result<(), ProviderError>;
}

/// An optional sibling service that already holds a user's token, consulted
/// when no local token exists. A miss is never cached — only a hit is.
#[async_trait]
pub trait CrossServiceTokenResolver: Send + Sync {
    /// Ask the sibling service for a user's token.
    async fn resolve(&self, user_id: Uuid) -> Result<Option<Token>, ProviderError>;
}

#[derive(Deserialize)]
struct CrossServiceTokenResponse {
    access_token: String,
    scope: String,
}

/// Calls a sibling service's `GET /internal/token?user_id=<id>` endpoint,
/// authenticated with a shared `X-API-Key` header. A resolved token is
/// cached in memory for `CROSS_SERVICE_TOKEN_CACHE_SECS`; a miss (404) is
/// never cached, so the next call always asks again.
pub struct HttpCrossServiceResolver {
    http: Client,
    base_url: String,
    api_key: String,
    cache: AsyncMutex<HashMap<Uuid, (Token, Instant)>>,
}

impl HttpCrossServiceResolver {
    /// Build a resolver against `base_url`, authenticating with `api_key`.
    #[must_use]
    pub fn new(base_url: String, api_key: String) -> Self {
        let http = Client::builder().timeout(Duration::from_secs(CROSS_SERVICE_HTTP_TIMEOUT_SECS)).build().unwrap_or_default();
        Self { http, base_url, api_key, cache: AsyncMutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl CrossServiceTokenResolver for HttpCrossServiceResolver {
    async fn resolve(&self, user_id: Uuid) -> Result<Option<Token>, ProviderError> {
        {
            let cache = self.cache.lock().await;
            if let Some((token, fetched_at)) = cache.get(&user_id) {
                if fetched_at.elapsed() < Duration::from_secs(CROSS_SERVICE_TOKEN_CACHE_SECS) {
                    return Ok(Some(token.clone()));
                }
            }
        }

        let url = format!("{}/internal/token", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("user_id", user_id.to_string())])
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|source| ProviderError::Network { provider: "cross-service", source })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status_code = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { provider: "cross-service", status_code, message, retryable: false });
        }

        let body: CrossServiceTokenResponse = response.json().await.map_err(|source| ProviderError::Parse {
            provider: "cross-service",
            field: "body",
            source: serde::de::Error::custom(source.to_string()),
        })?;

        let token = Token {
            user_id,
            access_token: body.access_token,
            refresh_token: String::new(),
            expires_at: chrono::Utc::now().timestamp() + CROSS_SERVICE_TOKEN_CACHE_SECS as i64,
            scope: body.scope,
        };

        self.cache.lock().await.insert(user_id, (token.clone(), Instant::now()));
        Ok(Some(token))
    }
}

#[derive(Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
}

/// OAuth2 client credentials and endpoint for refreshing a provider token.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    /// OAuth2 client id.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Token endpoint URL.
    pub token_url: String,
}

/// Stores and refreshes one provider's OAuth tokens across all users.
pub struct TokenVault {
    http: Client,
    store: Arc<dyn TokenStore>,
    cross_service: Option<Arc<dyn CrossServiceTokenResolver>>,
    oauth: OAuthClientConfig,
    provider: &'static str,
    refresh_locks: StdMutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl TokenVault {
    /// Build a vault for `provider`, backed by `store` and able to refresh
    /// against `oauth`'s token endpoint.
    #[must_use]
    pub fn new(provider: &'static str, store: Arc<dyn TokenStore>, oauth: OAuthClientConfig, http: Client) -> Self {
        Self { http, store, cross_service: None, oauth, provider, refresh_locks: StdMutex::new(HashMap::new()) }
    }

    /// Attach a cross-service resolver consulted when no local token exists.
    #[must_use]
    pub fn with_cross_service_resolver(mut self, resolver: Arc<dyn CrossServiceTokenResolver>) -> Self {
        self.cross_service = Some(resolver);
        self
    }

    fn refresh_lock_for(&self, user_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self.refresh_locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        locks.entry(user_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Return a currently-valid access token for `user_id`, refreshing it
    /// first if it expires within `TOKEN_REFRESH_MARGIN_SECS`.
    ///
    /// Callers that receive a 401 using a token this returned must call
    /// [`Self::force_refresh`] and retry — a 401 means the token this method
    /// handed back has already gone stale server-side.
    pub async fn ensure_valid(&self, user_id: Uuid) -> Result<String, ProviderError> {
        let token = self.load_or_resolve(user_id).await?;
        let now = chrono::Utc::now().timestamp();

        if !token.needs_refresh(now, TOKEN_REFRESH_MARGIN_SECS) {
            return Ok(token.access_token);
        }

        self.refresh(user_id, &token).await
    }

    /// Force a refresh regardless of the stored expiry, used after an
    /// unexpected 401.
    pub async fn force_refresh(&self, user_id: Uuid) -> Result<String, ProviderError> {
        let token =
            self.store.get_token(user_id).await?.ok_or(ProviderError::NotAuthenticated { provider: self.provider, user_id })?;
        self.refresh(user_id, &token).await
    }

    async fn load_or_resolve(&self, user_id: Uuid) -> Result<Token, ProviderError> {
        if let Some(token) = self.store.get_token(user_id).await? {
            return Ok(token);
        }
        if let Some(resolver) = &self.cross_service {
            if let Some(token) = resolver.resolve(user_id).await? {
                self.store.put_token(&token).await?;
                return Ok(token);
            }
        }
        Err(ProviderError::NotAuthenticated { provider: self.provider, user_id })
    }

    async fn refresh(&self, user_id: Uuid, stale: &Token) -> Result<String, ProviderError> {
        let lock = self.refresh_lock_for(user_id);
        let _guard = lock.lock().await;

        // Another task may have refreshed while we waited for the lock.
        if let Some(fresh) = self.store.get_token(user_id).await? {
            let now = chrono::Utc::now().timestamp();
            if !fresh.needs_refresh(now, TOKEN_REFRESH_MARGIN_SECS) {
                return Ok(fresh.access_token);
            }
        }

        let response = self
            .http
            .post(&self.oauth.token_url)
            .form(&[
                ("client_id", self.oauth.client_id.as_str()),
                ("client_secret", self.oauth.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", stale.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|source| ProviderError::Network { provider: self.provider, source })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::RefreshFailed { provider: self.provider, message: format!("{status}: {message}") });
        }

        let body: TokenRefreshResponse = response
            .json()
            .await
            .map_err(|_| ProviderError::RefreshFailed { provider: self.provider, message: "malformed token response".to_owned() })?;

        let refreshed = Token {
            user_id,
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_at: body.expires_at,
            scope: stale.scope.clone(),
        };
        self.store.put_token(&refreshed).await?;
        Ok(refreshed.access_token)
    }
}
