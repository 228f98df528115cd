//! AWS Signature Version 4
//!
//! The service name is request-scoped and comes from the [`Context`]; a
//! request without one is refused before any network I/O.

use super::client::{clone_request, AuthenticatedClient, RawClient, SharedClient};
use crate::context::Context;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};
use sha2::{Digest, Sha256};
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Static AWS credentials
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("has_session_token", &self.session_token.is_some())
            .finish()
    }
}

/// Source of AWS credentials, consulted on every request
#[async_trait]
pub trait AwsCredentialsProvider: Send + Sync {
    async fn credentials(&self, ctx: &Context) -> Result<AwsCredentials>;
}

#[async_trait]
impl AwsCredentialsProvider for AwsCredentials {
    async fn credentials(&self, _ctx: &Context) -> Result<AwsCredentials> {
        Ok(self.clone())
    }
}

/// Signs every request with SigV4 before forwarding it
pub struct AwsSigV4Client {
    inner: SharedClient,
    provider: Arc<dyn AwsCredentialsProvider>,
    region: String,
}

impl AwsSigV4Client {
    pub fn new(provider: Arc<dyn AwsCredentialsProvider>, region: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RawClient::new()),
            provider,
            region: region.into(),
        }
    }

    /// Send through an existing client
    #[must_use]
    pub fn with_inner(mut self, inner: SharedClient) -> Self {
        self.inner = inner;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl AuthenticatedClient for AwsSigV4Client {
    async fn execute(&self, ctx: &Context, request: &Request) -> Result<Response> {
        let service = ctx.aws_service().ok_or(Error::AwsMissingService)?;
        let credentials = self.provider.credentials(ctx).await?;

        let mut request = clone_request(request)?;
        sign_request(&mut request, &credentials, &self.region, service, Utc::now())?;
        self.inner.execute(ctx, &request).await
    }

    fn close_idle_connections(&self) {
        self.inner.close_idle_connections();
    }
}

// ============================================================================
// Signing
// ============================================================================

/// Sign a request in place: sets `x-amz-date`, `x-amz-content-sha256`,
/// the session token when present, and `Authorization`.
pub fn sign_request(
    request: &mut Request,
    credentials: &AwsCredentials,
    region: &str,
    service: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    let payload_hash = {
        let body: &[u8] = match request.body() {
            Some(body) => body
                .as_bytes()
                .ok_or_else(|| Error::auth("cannot sign a streaming request body"))?,
            None => &[],
        };
        hex::encode(Sha256::digest(body))
    };

    set_header(request, "x-amz-date", &amz_date)?;
    set_header(request, "x-amz-content-sha256", &payload_hash)?;
    if let Some(token) = &credentials.session_token {
        set_header(request, "x-amz-security-token", token)?;
    }

    let host = host_header(request)?;
    let mut headers: Vec<(String, String)> = vec![("host".to_string(), host)];
    for (name, value) in request.headers() {
        let name = name.as_str().to_ascii_lowercase();
        if name.starts_with("x-amz-") || name == "content-type" {
            let value = value
                .to_str()
                .map_err(|e| Error::auth(format!("header '{name}' is not ASCII: {e}")))?;
            headers.push((name, value.trim().to_string()));
        }
    }
    headers.sort();

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method().as_str(),
        canonical_uri(request),
        canonical_query(request),
        canonical_headers,
        signed_headers,
        payload_hash
    );

    let scope = format!("{date}/{region}/{service}/aws4_request");
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(&credentials.secret_access_key, &date, region, service)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    let authorization = format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key_id
    );
    let value = HeaderValue::from_str(&authorization)
        .map_err(|e| Error::auth(format!("invalid authorization header: {e}")))?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

/// Derive the SigV4 signing key for a date, region and service
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::auth(format!("invalid HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn set_header(request: &mut Request, name: &'static str, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| Error::auth(format!("invalid value for '{name}': {e}")))?;
    request
        .headers_mut()
        .insert(HeaderName::from_static(name), value);
    Ok(())
}

fn host_header(request: &Request) -> Result<String> {
    let url = request.url();
    let host = url
        .host_str()
        .ok_or_else(|| Error::auth("cannot sign a request without a host"))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn canonical_uri(request: &Request) -> String {
    let path = request.url().path();
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

fn canonical_query(request: &Request) -> String {
    let mut pairs: Vec<(String, String)> = request
        .url()
        .query_pairs()
        .map(|(k, v)| {
            (
                urlencoding::encode(&k).into_owned(),
                urlencoding::encode(&v).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}
