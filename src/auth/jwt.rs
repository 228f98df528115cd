//! JWT minting
//!
//! Providers that authenticate with a self-signed JWT get a bearer client
//! whose token is minted here from a [`JwtClaimsConfig`].

use super::client::HeaderAuthClient;
use super::types::JwtClaimsConfig;
use crate::error::{Error, Result};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// JWT signing algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JwtAlgorithm {
    HS256,
    HS384,
    HS512,
    #[default]
    RS256,
    RS384,
    RS512,
    ES256,
    ES384,
}

/// Key material an algorithm signs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Secret,
    RsaPem,
    EcPem,
}

impl JwtAlgorithm {
    fn key_kind(self) -> KeyKind {
        match self {
            Self::HS256 | Self::HS384 | Self::HS512 => KeyKind::Secret,
            Self::RS256 | Self::RS384 | Self::RS512 => KeyKind::RsaPem,
            Self::ES256 | Self::ES384 => KeyKind::EcPem,
        }
    }
}

impl From<JwtAlgorithm> for jsonwebtoken::Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        use jsonwebtoken::Algorithm as A;
        match alg {
            JwtAlgorithm::HS256 => A::HS256,
            JwtAlgorithm::HS384 => A::HS384,
            JwtAlgorithm::HS512 => A::HS512,
            JwtAlgorithm::RS256 => A::RS256,
            JwtAlgorithm::RS384 => A::RS384,
            JwtAlgorithm::RS512 => A::RS512,
            JwtAlgorithm::ES256 => A::ES256,
            JwtAlgorithm::ES384 => A::ES384,
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
    aud: &'a str,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    extra: &'a HashMap<String, String>,
}

/// Signs JWTs from a fixed claims configuration
#[derive(Debug, Clone)]
pub struct JwtSigner {
    config: JwtClaimsConfig,
}

impl JwtSigner {
    pub fn new(config: JwtClaimsConfig) -> Self {
        Self { config }
    }

    /// Mint a token valid from now for the configured lifetime
    pub fn sign(&self) -> Result<String> {
        let config = &self.config;
        let now = Utc::now().timestamp();
        #[allow(clippy::cast_possible_wrap)]
        let exp = now + config.lifetime_seconds as i64;

        let claims = JwtClaims {
            iss: &config.issuer,
            sub: config.subject.as_deref(),
            aud: &config.audience,
            iat: now,
            exp,
            extra: &config.claims,
        };

        let key = self.encoding_key()?;
        encode(&Header::new(config.algorithm.into()), &claims, &key).map_err(|e| {
            Error::JwtGeneration {
                message: format!("Failed to encode JWT: {e}"),
            }
        })
    }

    /// Bearer client carrying a freshly minted token
    pub fn bearer_client(&self) -> Result<HeaderAuthClient> {
        Ok(HeaderAuthClient::bearer(&self.sign()?))
    }

    fn encoding_key(&self) -> Result<EncodingKey> {
        let key = self.config.key.as_bytes();
        let parsed = match self.config.algorithm.key_kind() {
            KeyKind::Secret => Ok(EncodingKey::from_secret(key)),
            KeyKind::RsaPem => EncodingKey::from_rsa_pem(key),
            KeyKind::EcPem => EncodingKey::from_ec_pem(key),
        };
        parsed.map_err(|e| Error::JwtGeneration {
            message: format!("Invalid private key: {e}"),
        })
    }
}
