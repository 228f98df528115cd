//! Decoder types and traits
//!
//! Response bodies arrive as JSON, XML or CSV. Every decoder turns raw bytes
//! into a JSON value so that the parse helpers work on a single tree type.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Format of a request or response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// XML format
    Xml,
    /// CSV format with a header row
    Csv,
}

impl BodyFormat {
    /// Value for the `Accept` header when requesting this format
    pub fn accept(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::Csv => "text/csv",
        }
    }

    /// Value for the `Content-Type` header when sending this format
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::Csv => "text/csv",
        }
    }

    /// Whether a response `Content-Type` header is acceptable for this format.
    /// Parameters such as `; charset=utf-8` are ignored.
    pub fn accepts_content_type(self, content_type: &str) -> bool {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match self {
            Self::Json => mime == "application/json" || mime == "application/vnd.api+json",
            Self::Xml => mime == "application/xml" || mime == "text/xml" || mime.ends_with("+xml"),
            Self::Csv => mime == "text/csv" || mime == "application/csv" || mime == "text/plain",
        }
    }
}

/// Decodes a response body into a JSON value
pub trait BodyDecoder: Send + Sync {
    /// Decode the body. An empty body decodes to `Value::Null`.
    fn decode(&self, body: &[u8]) -> Result<Value>;
}
