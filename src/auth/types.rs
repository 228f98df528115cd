//! Auth configuration types
//!
//! Headers and query parameters attached by authenticated clients, OAuth2
//! tokens, and the `AuthConfig` description from which a client is built.

use super::jwt::JwtAlgorithm;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a header or query parameter is merged into an outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Add the value alongside any existing values
    #[default]
    Append,
    /// Replace every existing value
    Overwrite,
    /// Only add when no value is present
    SetIfMissing,
}

/// A header attached to outgoing requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub mode: Mode,
}

impl Header {
    /// Create an appending header
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            mode: Mode::Append,
        }
    }

    /// Set the merge mode
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

/// A query parameter attached to outgoing requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub mode: Mode,
}

impl QueryParam {
    /// Create an appending query parameter
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            mode: Mode::Append,
        }
    }

    /// Set the merge mode
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

/// Location for API key placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Place in HTTP header
    #[default]
    Header,
    /// Place in query parameter
    Query,
}

/// OAuth2 token with expiration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    /// The access token
    pub access_token: String,
    /// Refresh token, when the grant issued one
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token type reported by the server
    #[serde(default)]
    pub token_type: Option<String>,
    /// When the access token expires
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuthToken {
    /// Create a token without a refresh token
    pub fn new(access_token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: None,
            expires_at,
        }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(access_token: impl Into<String>, seconds: i64) -> Self {
        Self::new(
            access_token,
            Some(Utc::now() + chrono::Duration::seconds(seconds)),
        )
    }

    /// Attach a refresh token
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false, // No expiration = never expires
        }
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// OAuth2 client registration and token endpoint
#[derive(Debug, Clone, Default)]
pub struct OAuth2Config {
    /// Token endpoint URL
    pub token_url: String,
    /// Client ID
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
    /// Requested scopes
    pub scopes: Vec<String>,
    /// Audience parameter (client credentials only)
    pub audience: Option<String>,
    /// Additional token request body parameters
    pub extra_params: HashMap<String, String>,
}

impl OAuth2Config {
    /// Create a config for a token endpoint and client registration
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Default::default()
        }
    }

    /// Set requested scopes
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the audience parameter
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// Raw authentication material from which an authenticated client is built
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// API Key authentication (header or query)
    ApiKey {
        /// Where to place the API key
        location: Location,
        /// Header or query parameter name
        name: String,
        /// Prefix to add before the value (e.g., "Bearer ")
        prefix: Option<String>,
        /// The API key value
        value: String,
    },

    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },

    /// Pre-generated bearer token (JWT)
    Jwt {
        /// The signed token
        token: String,
    },

    /// OAuth2 authorization code flow, refreshed with the refresh token
    Oauth2AuthCode {
        /// Client registration
        config: OAuth2Config,
        /// Current token (access + refresh)
        token: OAuthToken,
    },

    /// OAuth2 Client Credentials flow
    Oauth2ClientCredentials {
        /// Client registration, scopes and audience
        config: OAuth2Config,
    },

    /// AWS Signature Version 4
    Aws {
        /// Access key id
        access_key_id: String,
        /// Secret access key
        secret_access_key: String,
        /// Optional session token
        session_token: Option<String>,
        /// Signing region
        region: String,
    },

    /// Static custom headers and query parameters
    Custom {
        /// Headers to add to each request
        headers: Vec<Header>,
        /// Query parameters to add to each request
        query_params: Vec<QueryParam>,
    },
}

/// Claims used to mint a JWT
#[derive(Debug, Clone)]
pub struct JwtClaimsConfig {
    /// Token issuer (iss claim)
    pub issuer: String,
    /// Token subject (sub claim, optional)
    pub subject: Option<String>,
    /// Token audience (aud claim)
    pub audience: String,
    /// Signing key: PEM for RSA/ECDSA, raw secret for HMAC
    pub key: String,
    /// Signing algorithm
    pub algorithm: JwtAlgorithm,
    /// Token lifetime in seconds
    pub lifetime_seconds: u64,
    /// Additional claims
    pub claims: HashMap<String, String>,
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_token_not_expired() {
        let token = OAuthToken::expires_in("test", 3600);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_expired() {
        let token = OAuthToken::expires_in("test", -100);
        assert!(token.is_expired());
    }

    #[test]
    fn test_token_within_buffer_is_expired() {
        let token = OAuthToken::expires_in("test", 10);
        assert!(token.is_expired());
    }

    #[test]
    fn test_token_no_expiration() {
        let token = OAuthToken::new("test", None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_debug_redacts_secret() {
        let token = OAuthToken::new("super-secret", None).with_refresh_token("refresh");
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("refresh\""));
    }

    #[test]
    fn test_mode_default_is_append() {
        assert_eq!(Header::new("a", "b").mode, Mode::Append);
        assert_eq!(QueryParam::new("a", "b").mode, Mode::Append);
        let mode: Mode = serde_json::from_str("\"set-if-missing\"").unwrap();
        assert_eq!(mode, Mode::SetIfMissing);
    }

    #[test]
    fn test_auth_config_default() {
        assert!(matches!(AuthConfig::default(), AuthConfig::None));
    }
}
