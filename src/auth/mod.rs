//! Authentication module
//!
//! Supports: API key (header or query), Basic, JWT bearer, OAuth2
//! authorization code, OAuth2 client credentials, AWS SigV4, Custom
//!
//! Every strategy implements [`AuthenticatedClient`]. Requests are cloned
//! before credentials are attached, so the caller's request is never
//! modified. OAuth2 clients share a single-flight [`TokenSource`].

mod aws;
mod client;
mod jwt;
mod oauth;
mod types;

pub use aws::{sign_request, signing_key, AwsCredentials, AwsCredentialsProvider, AwsSigV4Client};
pub use client::{
    apply_headers, apply_query_params, clone_request, AuthenticatedClient, CustomAuthClient,
    CustomAuthClientBuilder, DebugHook, DynamicHeaders, DynamicQueryParams, HeaderAuthClient,
    QueryParamAuthClient, RawClient, SharedClient, UnauthorizedHandler, UnauthorizedPredicate,
};
pub use jwt::{JwtAlgorithm, JwtSigner};
pub use oauth::{Grant, OAuth2Client, TokenCallback, TokenSource};
pub use types::{
    AuthConfig, Header, JwtClaimsConfig, Location, Mode, OAuth2Config, OAuthToken, QueryParam,
};
