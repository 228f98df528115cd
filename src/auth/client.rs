//! Authenticated HTTP clients
//!
//! An [`AuthenticatedClient`] sends a request with the credentials its
//! strategy dictates. The caller's request is never mutated: every strategy
//! clones it before attaching headers, query parameters or signatures.

use super::types::{Header, Mode, QueryParam};
use crate::context::Context;
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Request, Response, StatusCode};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;
use url::Url;

/// Sends requests with credentials attached
#[async_trait]
pub trait AuthenticatedClient: Send + Sync {
    /// Send a request. The input request is left untouched.
    async fn execute(&self, ctx: &Context, request: &Request) -> Result<Response>;

    /// Release pooled connections that are not in use
    fn close_idle_connections(&self);
}

/// Shared handle to an authenticated client
pub type SharedClient = Arc<dyn AuthenticatedClient>;

/// Async handler invoked when a response signals the credentials were rejected.
/// Receives a clone of the original request and the rejecting response.
pub type UnauthorizedHandler =
    Arc<dyn Fn(Request, Response) -> BoxFuture<'static, Result<Response>> + Send + Sync>;

/// Decides whether a response means the credentials were rejected
pub type UnauthorizedPredicate = Arc<dyn Fn(&Response) -> bool + Send + Sync>;

/// Produces headers for a specific request
pub type DynamicHeaders = Arc<dyn Fn(&Request) -> Result<Vec<Header>> + Send + Sync>;

/// Produces query parameters for a specific request
pub type DynamicQueryParams = Arc<dyn Fn(&Request) -> Result<Vec<QueryParam>> + Send + Sync>;

/// Observes each request/response pair
pub type DebugHook = Arc<dyn Fn(&Request, &Response) + Send + Sync>;

// ============================================================================
// Request helpers
// ============================================================================

/// Clone a request so it can be augmented without touching the original
pub fn clone_request(request: &Request) -> Result<Request> {
    request
        .try_clone()
        .ok_or_else(|| Error::auth("request body is streaming and cannot be cloned"))
}

/// Merge headers into a header map according to each header's mode
pub fn apply_headers(target: &mut HeaderMap, headers: &[Header]) -> Result<()> {
    for header in headers {
        let name = HeaderName::from_bytes(header.key.as_bytes())
            .map_err(|e| Error::auth(format!("invalid header name '{}': {e}", header.key)))?;
        let value = HeaderValue::from_str(&header.value)
            .map_err(|e| Error::auth(format!("invalid value for header '{}': {e}", header.key)))?;

        match header.mode {
            Mode::Append => {
                target.append(name, value);
            }
            Mode::Overwrite => {
                target.insert(name, value);
            }
            Mode::SetIfMissing => {
                target.entry(name).or_insert(value);
            }
        }
    }
    Ok(())
}

/// Merge query parameters into a URL, preserving pre-existing parameters
pub fn apply_query_params(url: &mut Url, params: &[QueryParam]) {
    if params.is_empty() {
        return;
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    for param in params {
        match param.mode {
            Mode::Append => pairs.push((param.key.clone(), param.value.clone())),
            Mode::Overwrite => {
                pairs.retain(|(k, _)| k != &param.key);
                pairs.push((param.key.clone(), param.value.clone()));
            }
            Mode::SetIfMissing => {
                if !pairs.iter().any(|(k, _)| k == &param.key) {
                    pairs.push((param.key.clone(), param.value.clone()));
                }
            }
        }
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
}

fn is_unauthorized(response: &Response, predicate: Option<&UnauthorizedPredicate>) -> bool {
    match predicate {
        Some(predicate) => predicate(response),
        None => response.status() == StatusCode::UNAUTHORIZED,
    }
}

// ============================================================================
// Raw client
// ============================================================================

/// Unauthenticated client wrapping a pooled `reqwest::Client`
pub struct RawClient {
    client: RwLock<Client>,
    factory: Arc<dyn Fn() -> Client + Send + Sync>,
}

impl RawClient {
    /// Create a raw client with default settings
    pub fn new() -> Self {
        Self::with_factory(default_client)
    }

    /// Create a raw client whose underlying `reqwest::Client` is produced by
    /// `factory`. The factory runs again after [`close_idle_connections`].
    ///
    /// [`close_idle_connections`]: AuthenticatedClient::close_idle_connections
    pub fn with_factory(factory: impl Fn() -> Client + Send + Sync + 'static) -> Self {
        let client = factory();
        Self {
            client: RwLock::new(client),
            factory: Arc::new(factory),
        }
    }

    /// Current underlying client
    pub fn client(&self) -> Client {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn default_client() -> Client {
    Client::builder()
        .user_agent(format!("solidafy-connect/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

impl Default for RawClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RawClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthenticatedClient for RawClient {
    async fn execute(&self, ctx: &Context, request: &Request) -> Result<Response> {
        let request = clone_request(request)?;
        let client = self.client();
        let method = request.method().clone();
        let url = request.url().clone();

        let response = ctx
            .run(async { client.execute(request).await.map_err(Error::Http) })
            .await?;
        debug!("{} {} -> {}", method, url.path(), response.status().as_u16());
        Ok(response)
    }

    fn close_idle_connections(&self) {
        // Dropping the old client releases its pool once in-flight calls finish.
        let fresh = (self.factory)();
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = fresh;
    }
}

// ============================================================================
// Header auth (API key header, basic, bearer/JWT)
// ============================================================================

/// Attaches a fixed set of headers to every request
pub struct HeaderAuthClient {
    inner: SharedClient,
    headers: Vec<Header>,
}

impl HeaderAuthClient {
    /// Create a header auth client over a fresh raw client
    pub fn new(headers: Vec<Header>) -> Self {
        Self::with_inner(Arc::new(RawClient::new()), headers)
    }

    /// Create a header auth client over an existing client
    pub fn with_inner(inner: SharedClient, headers: Vec<Header>) -> Self {
        Self { inner, headers }
    }

    /// API key sent in a caller-named header
    pub fn api_key(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(vec![Header::new(header, value)])
    }

    /// `Authorization: Basic base64(user:pass)`
    pub fn basic(username: &str, password: &str) -> Self {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        Self::new(vec![
            Header::new("Authorization", format!("Basic {encoded}")).with_mode(Mode::Overwrite)
        ])
    }

    /// `Authorization: Bearer <token>` with a pre-generated token (JWT)
    pub fn bearer(token: &str) -> Self {
        Self::new(vec![
            Header::new("Authorization", format!("Bearer {token}")).with_mode(Mode::Overwrite)
        ])
    }

    /// Configured headers
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }
}

#[async_trait]
impl AuthenticatedClient for HeaderAuthClient {
    async fn execute(&self, ctx: &Context, request: &Request) -> Result<Response> {
        let mut request = clone_request(request)?;
        apply_headers(request.headers_mut(), &self.headers)?;
        self.inner.execute(ctx, &request).await
    }

    fn close_idle_connections(&self) {
        self.inner.close_idle_connections();
    }
}

// ============================================================================
// Query parameter auth
// ============================================================================

/// Merges a fixed set of query parameters into every request URL
pub struct QueryParamAuthClient {
    inner: SharedClient,
    params: Vec<QueryParam>,
    on_unauthorized: Option<UnauthorizedHandler>,
}

impl QueryParamAuthClient {
    /// Create a query param auth client over a fresh raw client
    pub fn new(params: Vec<QueryParam>) -> Self {
        Self::with_inner(Arc::new(RawClient::new()), params)
    }

    /// Create a query param auth client over an existing client
    pub fn with_inner(inner: SharedClient, params: Vec<QueryParam>) -> Self {
        Self {
            inner,
            params,
            on_unauthorized: None,
        }
    }

    /// API key sent in a caller-named query parameter
    pub fn api_key(param: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(vec![QueryParam::new(param, value)])
    }

    /// Invoke `handler` when the server answers 401
    #[must_use]
    pub fn on_unauthorized(mut self, handler: UnauthorizedHandler) -> Self {
        self.on_unauthorized = Some(handler);
        self
    }
}

#[async_trait]
impl AuthenticatedClient for QueryParamAuthClient {
    async fn execute(&self, ctx: &Context, request: &Request) -> Result<Response> {
        let mut augmented = clone_request(request)?;
        apply_query_params(augmented.url_mut(), &self.params);

        let response = self.inner.execute(ctx, &augmented).await?;
        match &self.on_unauthorized {
            Some(handler) if is_unauthorized(&response, None) => {
                debug!("query param auth rejected, invoking unauthorized handler");
                handler(clone_request(request)?, response).await
            }
            _ => Ok(response),
        }
    }

    fn close_idle_connections(&self) {
        self.inner.close_idle_connections();
    }
}

// ============================================================================
// Custom auth
// ============================================================================

/// Combination of static and per-request headers and query parameters
pub struct CustomAuthClient {
    inner: SharedClient,
    headers: Vec<Header>,
    query_params: Vec<QueryParam>,
    dynamic_headers: Option<DynamicHeaders>,
    dynamic_query_params: Option<DynamicQueryParams>,
    debug: Option<DebugHook>,
    on_unauthorized: Option<UnauthorizedHandler>,
    is_unauthorized: Option<UnauthorizedPredicate>,
}

impl CustomAuthClient {
    /// Start building a custom auth client
    pub fn builder() -> CustomAuthClientBuilder {
        CustomAuthClientBuilder::default()
    }
}

/// Builder for [`CustomAuthClient`]
#[derive(Default)]
pub struct CustomAuthClientBuilder {
    inner: Option<SharedClient>,
    headers: Vec<Header>,
    query_params: Vec<QueryParam>,
    dynamic_headers: Option<DynamicHeaders>,
    dynamic_query_params: Option<DynamicQueryParams>,
    debug: Option<DebugHook>,
    on_unauthorized: Option<UnauthorizedHandler>,
    is_unauthorized: Option<UnauthorizedPredicate>,
}

impl CustomAuthClientBuilder {
    /// Send through an existing client
    #[must_use]
    pub fn inner(mut self, inner: SharedClient) -> Self {
        self.inner = Some(inner);
        self
    }

    /// Add a static header
    #[must_use]
    pub fn header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    /// Add a static query parameter
    #[must_use]
    pub fn query_param(mut self, param: QueryParam) -> Self {
        self.query_params.push(param);
        self
    }

    /// Compute headers per request
    #[must_use]
    pub fn dynamic_headers(
        mut self,
        f: impl Fn(&Request) -> Result<Vec<Header>> + Send + Sync + 'static,
    ) -> Self {
        self.dynamic_headers = Some(Arc::new(f));
        self
    }

    /// Compute query parameters per request
    #[must_use]
    pub fn dynamic_query_params(
        mut self,
        f: impl Fn(&Request) -> Result<Vec<QueryParam>> + Send + Sync + 'static,
    ) -> Self {
        self.dynamic_query_params = Some(Arc::new(f));
        self
    }

    /// Observe each request/response pair
    #[must_use]
    pub fn debug(mut self, f: impl Fn(&Request, &Response) + Send + Sync + 'static) -> Self {
        self.debug = Some(Arc::new(f));
        self
    }

    /// Handle responses that reject the credentials
    #[must_use]
    pub fn on_unauthorized(mut self, handler: UnauthorizedHandler) -> Self {
        self.on_unauthorized = Some(handler);
        self
    }

    /// Decide which responses reject the credentials (default: status 401)
    #[must_use]
    pub fn is_unauthorized(mut self, f: impl Fn(&Response) -> bool + Send + Sync + 'static) -> Self {
        self.is_unauthorized = Some(Arc::new(f));
        self
    }

    /// Build the client
    pub fn build(self) -> CustomAuthClient {
        CustomAuthClient {
            inner: self.inner.unwrap_or_else(|| Arc::new(RawClient::new())),
            headers: self.headers,
            query_params: self.query_params,
            dynamic_headers: self.dynamic_headers,
            dynamic_query_params: self.dynamic_query_params,
            debug: self.debug,
            on_unauthorized: self.on_unauthorized,
            is_unauthorized: self.is_unauthorized,
        }
    }
}

#[async_trait]
impl AuthenticatedClient for CustomAuthClient {
    async fn execute(&self, ctx: &Context, request: &Request) -> Result<Response> {
        let mut augmented = clone_request(request)?;

        apply_headers(augmented.headers_mut(), &self.headers)?;
        apply_query_params(augmented.url_mut(), &self.query_params);

        if let Some(dynamic) = &self.dynamic_headers {
            let headers = dynamic(&augmented)?;
            apply_headers(augmented.headers_mut(), &headers)?;
        }
        if let Some(dynamic) = &self.dynamic_query_params {
            let params = dynamic(&augmented)?;
            apply_query_params(augmented.url_mut(), &params);
        }

        let response = self.inner.execute(ctx, &augmented).await?;

        if let Some(hook) = &self.debug {
            hook(&augmented, &response);
        }

        match &self.on_unauthorized {
            Some(handler) if is_unauthorized(&response, self.is_unauthorized.as_ref()) => {
                debug!("custom auth rejected, invoking unauthorized handler");
                handler(clone_request(request)?, response).await
            }
            _ => Ok(response),
        }
    }

    fn close_idle_connections(&self) {
        self.inner.close_idle_connections();
    }
}

// ============================================================================
// Construction from AuthConfig
// ============================================================================

impl super::types::AuthConfig {
    /// Build the authenticated client this configuration describes
    pub fn into_client(self) -> SharedClient {
        use super::aws::{AwsCredentials, AwsSigV4Client};
        use super::oauth::OAuth2Client;
        use super::types::{AuthConfig, Location};

        match self {
            AuthConfig::None => Arc::new(RawClient::new()),
            AuthConfig::ApiKey {
                location,
                name,
                prefix,
                value,
            } => {
                let value = format!("{}{}", prefix.as_deref().unwrap_or(""), value);
                match location {
                    Location::Header => Arc::new(HeaderAuthClient::api_key(name, value)),
                    Location::Query => Arc::new(QueryParamAuthClient::api_key(name, value)),
                }
            }
            AuthConfig::Basic { username, password } => {
                Arc::new(HeaderAuthClient::basic(&username, &password))
            }
            AuthConfig::Jwt { token } => Arc::new(HeaderAuthClient::bearer(&token)),
            AuthConfig::Oauth2AuthCode { config, token } => {
                Arc::new(OAuth2Client::auth_code(config, token))
            }
            AuthConfig::Oauth2ClientCredentials { config } => {
                Arc::new(OAuth2Client::client_credentials(config))
            }
            AuthConfig::Aws {
                access_key_id,
                secret_access_key,
                session_token,
                region,
            } => {
                let mut credentials = AwsCredentials::new(access_key_id, secret_access_key);
                credentials.session_token = session_token;
                Arc::new(AwsSigV4Client::new(Arc::new(credentials), region))
            }
            AuthConfig::Custom {
                headers,
                query_params,
            } => {
                let builder = headers
                    .into_iter()
                    .fold(CustomAuthClient::builder(), CustomAuthClientBuilder::header);
                Arc::new(
                    query_params
                        .into_iter()
                        .fold(builder, CustomAuthClientBuilder::query_param)
                        .build(),
                )
            }
        }
    }
}
