//! Subscriptions and webhook verification
//!
//! Subscription management is provider specific; connectors that offer it
//! plug in a [`SubscribeStrategy`]. [`WebhookVerifier`] checks the
//! HMAC-SHA256 signatures most providers attach to webhook deliveries.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::Transport;
use async_trait::async_trait;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Parameters of a subscribe call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeParams {
    /// Objects whose changes are delivered
    pub objects: Vec<String>,
    /// Provider event names, e.g. `contact.created`
    #[serde(default)]
    pub events: Vec<String>,
    /// URL the provider delivers to
    pub target_url: String,
}

/// A registered subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscribeResult {
    pub id: String,
    pub objects: Vec<String>,
    #[serde(default)]
    pub raw: Value,
}

#[async_trait]
pub trait SubscribeStrategy: Send + Sync {
    async fn subscribe(
        &self,
        ctx: &Context,
        transport: &Transport,
        params: &SubscribeParams,
    ) -> Result<SubscribeResult>;

    async fn delete_subscription(
        &self,
        ctx: &Context,
        transport: &Transport,
        subscription: &SubscribeResult,
    ) -> Result<()>;

    /// Check that a delivery really came from the provider
    fn verify_webhook_message(&self, headers: &HeaderMap, body: &[u8]) -> Result<()>;
}

/// How a signature is written in its header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureEncoding {
    #[default]
    Hex,
    Base64,
}

/// HMAC-SHA256 webhook signature check
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
    header: String,
    prefix: String,
    encoding: SignatureEncoding,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("header", &self.header)
            .field("prefix", &self.prefix)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    /// Verifier reading a hex signature from `header`
    pub fn new(secret: impl Into<Vec<u8>>, header: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            header: header.into(),
            prefix: String::new(),
            encoding: SignatureEncoding::Hex,
        }
    }

    /// Prefix preceding the signature, e.g. `sha256=`
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: SignatureEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    fn mac(&self, body: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|e| invalid(e.to_string()))?;
        mac.update(body);
        Ok(mac)
    }

    /// Header value a provider would send for `body`
    pub fn sign(&self, body: &[u8]) -> Result<String> {
        let digest = self.mac(body)?.finalize().into_bytes();
        let encoded = match self.encoding {
            SignatureEncoding::Hex => hex::encode(digest),
            SignatureEncoding::Base64 => base64::engine::general_purpose::STANDARD.encode(digest),
        };
        Ok(format!("{}{encoded}", self.prefix))
    }

    /// Check the signature header against `body` in constant time
    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<()> {
        let value = headers
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| invalid(format!("missing {} header", self.header)))?;
        let signature = value
            .trim()
            .strip_prefix(self.prefix.as_str())
            .ok_or_else(|| invalid(format!("expected prefix '{}'", self.prefix)))?;

        let expected = match self.encoding {
            SignatureEncoding::Hex => hex::decode(signature).map_err(|e| invalid(e.to_string()))?,
            SignatureEncoding::Base64 => base64::engine::general_purpose::STANDARD
                .decode(signature)
                .map_err(|e| invalid(e.to_string()))?,
        };

        self.mac(body)?
            .verify_slice(&expected)
            .map_err(|_| invalid("signature mismatch"))
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidSignature {
        message: message.into(),
    }
}
