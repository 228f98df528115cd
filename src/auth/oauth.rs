//! OAuth2 token sources and the bearer-token client
//!
//! A [`TokenSource`] owns the current token and refreshes it on demand.
//! Refreshes are single-flight: while one refresh is in progress, every
//! other caller that needs a token awaits the same shared outcome instead
//! of issuing its own token request.

use super::client::{clone_request, AuthenticatedClient, RawClient, SharedClient};
use super::types::{OAuth2Config, OAuthToken};
use crate::context::Context;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Callback invoked with the new token after every successful refresh
pub type TokenCallback = Arc<dyn Fn(&OAuthToken) + Send + Sync>;

type RefreshFuture = Shared<BoxFuture<'static, std::result::Result<OAuthToken, String>>>;

/// How a token source obtains new tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Exchange the refresh token (authorization code flow)
    RefreshToken,
    /// Request a token with the client credentials grant
    ClientCredentials,
}

struct TokenState {
    token: Option<OAuthToken>,
    inflight: Option<RefreshFuture>,
}

/// Current OAuth2 token plus the means to refresh it
pub struct TokenSource {
    grant: Grant,
    config: OAuth2Config,
    http_client: Client,
    state: Mutex<TokenState>,
    on_updated: Option<TokenCallback>,
}

impl TokenSource {
    /// Token source for the authorization code flow, seeded with the
    /// caller's current token
    pub fn auth_code(config: OAuth2Config, token: OAuthToken) -> Self {
        Self::new(Grant::RefreshToken, config, Some(token))
    }

    /// Token source for the client credentials flow
    pub fn client_credentials(config: OAuth2Config) -> Self {
        Self::new(Grant::ClientCredentials, config, None)
    }

    fn new(grant: Grant, config: OAuth2Config, token: Option<OAuthToken>) -> Self {
        Self {
            grant,
            config,
            http_client: Client::new(),
            state: Mutex::new(TokenState {
                token,
                inflight: None,
            }),
            on_updated: None,
        }
    }

    /// Use a specific HTTP client for token requests
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Invoke `callback` with every refreshed token
    #[must_use]
    pub fn on_token_updated(mut self, callback: impl Fn(&OAuthToken) + Send + Sync + 'static) -> Self {
        self.on_updated = Some(Arc::new(callback));
        self
    }

    /// Grant this source uses to refresh
    pub fn grant(&self) -> Grant {
        self.grant
    }

    /// Snapshot of the current token, if any
    pub fn current(&self) -> Option<OAuthToken> {
        self.lock().token.clone()
    }

    /// Get a valid token, refreshing if the current one is missing or expired
    pub async fn token(&self, ctx: &Context) -> Result<OAuthToken> {
        let refresh = {
            let mut state = self.lock();
            if let Some(token) = state.token.as_ref().filter(|t| !t.is_expired()) {
                return Ok(token.clone());
            }
            self.join_or_start(&mut state)
        };
        self.await_refresh(ctx, refresh).await
    }

    /// Refresh because the server rejected `stale`. When another caller has
    /// already replaced that token, the replacement is returned without a
    /// second refresh.
    pub async fn force_refresh(&self, ctx: &Context, stale: &str) -> Result<OAuthToken> {
        let refresh = {
            let mut state = self.lock();
            if let Some(token) = state
                .token
                .as_ref()
                .filter(|t| t.access_token != stale && !t.is_expired())
            {
                return Ok(token.clone());
            }
            self.join_or_start(&mut state)
        };
        self.await_refresh(ctx, refresh).await
    }

    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join_or_start(&self, state: &mut TokenState) -> RefreshFuture {
        if let Some(inflight) = &state.inflight {
            return inflight.clone();
        }

        debug!("refreshing OAuth2 token ({:?})", self.grant);
        let refresh = match self.grant {
            Grant::RefreshToken => {
                let refresh_token = state.token.as_ref().and_then(|t| t.refresh_token.clone());
                refresh_with_token(self.http_client.clone(), self.config.clone(), refresh_token)
                    .boxed()
            }
            Grant::ClientCredentials => {
                request_client_credentials(self.http_client.clone(), self.config.clone()).boxed()
            }
        }
        .shared();

        state.inflight = Some(refresh.clone());
        refresh
    }

    async fn await_refresh(&self, ctx: &Context, refresh: RefreshFuture) -> Result<OAuthToken> {
        let outcome = ctx.run(refresh.clone().map(Ok)).await?;

        let mut state = self.lock();
        let owner = state
            .inflight
            .as_ref()
            .is_some_and(|inflight| inflight.ptr_eq(&refresh));
        if owner {
            state.inflight = None;
            if let Ok(token) = &outcome {
                state.token = Some(token.clone());
            }
        }
        drop(state);

        match outcome {
            Ok(token) => {
                if owner {
                    if let Some(callback) = &self.on_updated {
                        callback(&token);
                    }
                }
                Ok(token)
            }
            Err(message) => Err(Error::AccessTokenInvalid { message }),
        }
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("grant", &self.grant)
            .field("token_url", &self.config.token_url)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Token endpoint
// ============================================================================

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<String>) -> OAuthToken {
        let mut token = match self.expires_in {
            Some(secs) => OAuthToken::expires_in(self.access_token, secs),
            None => OAuthToken::new(self.access_token, None),
        };
        token.refresh_token = self.refresh_token.or(previous_refresh);
        token.token_type = self.token_type;
        token
    }
}

async fn refresh_with_token(
    http_client: Client,
    config: OAuth2Config,
    refresh_token: Option<String>,
) -> std::result::Result<OAuthToken, String> {
    let refresh_token = refresh_token.ok_or_else(|| "no refresh token available".to_string())?;

    let mut form = vec![
        ("grant_type".to_string(), "refresh_token".to_string()),
        ("client_id".to_string(), config.client_id.clone()),
        ("client_secret".to_string(), config.client_secret.clone()),
        ("refresh_token".to_string(), refresh_token.clone()),
    ];
    form.extend(config.extra_params.clone());

    let response = post_form(&http_client, &config.token_url, &form).await?;
    Ok(response.into_token(Some(refresh_token)))
}

async fn request_client_credentials(
    http_client: Client,
    config: OAuth2Config,
) -> std::result::Result<OAuthToken, String> {
    let mut form = vec![
        ("grant_type".to_string(), "client_credentials".to_string()),
        ("client_id".to_string(), config.client_id.clone()),
        ("client_secret".to_string(), config.client_secret.clone()),
    ];
    if !config.scopes.is_empty() {
        form.push(("scope".to_string(), config.scopes.join(" ")));
    }
    if let Some(audience) = &config.audience {
        form.push(("audience".to_string(), audience.clone()));
    }
    form.extend(config.extra_params.clone());

    let response = post_form(&http_client, &config.token_url, &form).await?;
    Ok(response.into_token(None))
}

async fn post_form(
    http_client: &Client,
    token_url: &str,
    form: &[(String, String)],
) -> std::result::Result<TokenResponse, String> {
    let response = http_client
        .post(token_url)
        .form(form)
        .send()
        .await
        .map_err(|e| format!("token request failed: {e}"))?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        warn!("token endpoint returned {status}");
        return Err(format!("token request failed with status {status}: {body}"));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| format!("invalid token response: {e}"))
}

// ============================================================================
// OAuth2 client
// ============================================================================

/// Sends requests with `Authorization: Bearer <access token>` from a token
/// source. A 401 triggers one refresh and one retry.
pub struct OAuth2Client {
    inner: SharedClient,
    source: TokenSource,
    reauth_on_unauthorized: bool,
}

impl OAuth2Client {
    /// Authorization code flow client
    pub fn auth_code(config: OAuth2Config, token: OAuthToken) -> Self {
        Self::from_source(TokenSource::auth_code(config, token))
    }

    /// Client credentials flow client
    pub fn client_credentials(config: OAuth2Config) -> Self {
        Self::from_source(TokenSource::client_credentials(config))
    }

    /// Client over an existing token source
    pub fn from_source(source: TokenSource) -> Self {
        Self {
            inner: Arc::new(RawClient::new()),
            source,
            reauth_on_unauthorized: true,
        }
    }

    /// Send through an existing client
    #[must_use]
    pub fn with_inner(mut self, inner: SharedClient) -> Self {
        self.inner = inner;
        self
    }

    /// Invoke `callback` with every refreshed token
    #[must_use]
    pub fn on_token_updated(mut self, callback: impl Fn(&OAuthToken) + Send + Sync + 'static) -> Self {
        self.source = self.source.on_token_updated(callback);
        self
    }

    /// Enable or disable refresh-and-retry on 401
    #[must_use]
    pub fn reauth_on_unauthorized(mut self, enabled: bool) -> Self {
        self.reauth_on_unauthorized = enabled;
        self
    }

    /// Token source backing this client
    pub fn token_source(&self) -> &TokenSource {
        &self.source
    }

    async fn send(&self, ctx: &Context, request: &Request, access_token: &str) -> Result<Response> {
        let mut request = clone_request(request)?;
        let value = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|e| Error::auth(format!("invalid access token: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        self.inner.execute(ctx, &request).await
    }
}

#[async_trait]
impl AuthenticatedClient for OAuth2Client {
    async fn execute(&self, ctx: &Context, request: &Request) -> Result<Response> {
        let token = self.source.token(ctx).await?;
        let response = self.send(ctx, request, &token.access_token).await?;

        if self.reauth_on_unauthorized && response.status() == StatusCode::UNAUTHORIZED {
            debug!("access token rejected, refreshing and retrying once");
            let token = self.source.force_refresh(ctx, &token.access_token).await?;
            return self.send(ctx, request, &token.access_token).await;
        }

        Ok(response)
    }

    fn close_idle_connections(&self) {
        self.inner.close_idle_connections();
    }
}
