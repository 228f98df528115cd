//! Error interpretation
//!
//! Maps a non-2xx response onto the error taxonomy. The status picks the
//! default kind; registered payload parsers may refine the message (and
//! optionally the kind) from the provider's error body. The original status
//! and raw body are always preserved on the resulting error.

use crate::error::{Error, ErrorKind};
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Invoked by the transport on every non-2xx response
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, status: u16, headers: &HeaderMap, body: &[u8]) -> Error;
}

/// What a payload parser extracted from an error body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetails {
    /// Human readable message
    pub message: String,
    /// Kind override; `None` keeps the status-derived kind
    pub kind: Option<ErrorKind>,
}

impl ErrorDetails {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Extracts details from a provider-specific error payload
pub type PayloadParser = Arc<dyn Fn(u16, &Value) -> Option<ErrorDetails> + Send + Sync>;

/// Default error handler: status mapping plus optional payload parsers
#[derive(Clone)]
pub struct ErrorInterpreter {
    not_found_kind: ErrorKind,
    parsers: Vec<PayloadParser>,
}

impl Default for ErrorInterpreter {
    fn default() -> Self {
        Self {
            not_found_kind: ErrorKind::Retryable,
            parsers: vec![Arc::new(common_payload)],
        }
    }
}

impl fmt::Debug for ErrorInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorInterpreter")
            .field("not_found_kind", &self.not_found_kind)
            .field("parsers", &self.parsers.len())
            .finish()
    }
}

impl ErrorInterpreter {
    /// Interpreter with the default status mapping and the common payload
    /// parser (`error`, `message`, `error_description`, `errors[0].message`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpreter with no payload parsers
    pub fn bare() -> Self {
        Self {
            parsers: Vec::new(),
            ..Self::default()
        }
    }

    /// Kind used for 404 responses
    #[must_use]
    pub fn with_not_found_kind(mut self, kind: ErrorKind) -> Self {
        self.not_found_kind = kind;
        self
    }

    /// Register a payload parser. Parsers registered later take precedence.
    #[must_use]
    pub fn with_parser(
        mut self,
        parser: impl Fn(u16, &Value) -> Option<ErrorDetails> + Send + Sync + 'static,
    ) -> Self {
        self.parsers.insert(0, Arc::new(parser));
        self
    }

    /// Status to kind mapping
    pub fn kind_for_status(&self, status: u16) -> ErrorKind {
        match status {
            401 => ErrorKind::AccessTokenInvalid,
            403 => ErrorKind::Forbidden,
            404 => self.not_found_kind,
            429 => ErrorKind::Retryable,
            400..=499 => ErrorKind::Caller,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Unknown,
        }
    }

    /// Build the error for a response
    pub fn interpret(&self, status: u16, body: &[u8]) -> Error {
        let raw = String::from_utf8_lossy(body).to_string();
        let mut kind = self.kind_for_status(status);
        let mut message = default_message(status, &raw);

        if let Ok(payload) = serde_json::from_slice::<Value>(body) {
            if let Some(details) = self.parsers.iter().find_map(|parse| parse(status, &payload)) {
                message = details.message;
                kind = details.kind.unwrap_or(kind);
            }
        }

        Error::http_status(kind, status, message, raw)
    }
}

impl ErrorHandler for ErrorInterpreter {
    fn handle(&self, status: u16, _headers: &HeaderMap, body: &[u8]) -> Error {
        self.interpret(status, body)
    }
}

fn default_message(status: u16, raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parser for the payload shapes most providers share
pub fn common_payload(_status: u16, payload: &Value) -> Option<ErrorDetails> {
    let text = |value: &Value| value.as_str().filter(|s| !s.is_empty()).map(str::to_string);

    let message = payload
        .get("error_description")
        .and_then(text)
        .or_else(|| payload.get("message").and_then(text))
        .or_else(|| {
            payload.get("error").and_then(|error| {
                text(error).or_else(|| error.get("message").and_then(text))
            })
        })
        .or_else(|| {
            payload
                .get("errors")
                .and_then(Value::as_array)
                .and_then(|errors| errors.first())
                .and_then(|first| text(first).or_else(|| first.get("message").and_then(text)))
        })?;

    Some(ErrorDetails::message(message))
}
