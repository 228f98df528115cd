//! Error types for Solidafy Connect
//!
//! This module defines the error hierarchy for the entire runtime.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Every error maps onto a small, stable [`ErrorKind`] taxonomy via
//! [`Error::kind`], so callers can branch on the class of failure without
//! matching individual variants.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Kind
// ============================================================================

/// Stable classification of every error returned by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Credentials were rejected or could not be refreshed
    AccessTokenInvalid,
    /// The provider API is disabled for this account
    ApiDisabled,
    /// The caller may retry the same call later
    Retryable,
    /// The credentials lack permission for the resource
    Forbidden,
    /// The provider rejected the request as malformed
    Caller,
    /// The provider failed internally
    Server,
    /// Unclassified failure
    Unknown,
    /// A JSON response was expected but something else arrived
    NotJson,
    /// The request could not be constructed
    BadRequest,
    /// The object does not support the requested operation
    OperationNotSupported,
    /// No object name was supplied
    MissingObjects,
    /// No fields were supplied where fields are required
    MissingFields,
    /// A write had no record data
    MissingRecordData,
    /// An update or delete had no record id
    MissingRecordId,
    /// Caller parameters failed validation
    ValidationFailed,
    /// A body was required but the response was empty
    EmptyResponse,
    /// Proxying is not available for this connector
    ProxyNotApplicable,
    /// The connector does not implement the operation
    NotImplemented,
}

impl ErrorKind {
    /// Kebab-case name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessTokenInvalid => "access-token-invalid",
            Self::ApiDisabled => "api-disabled",
            Self::Retryable => "retryable",
            Self::Forbidden => "forbidden",
            Self::Caller => "caller",
            Self::Server => "server",
            Self::Unknown => "unknown",
            Self::NotJson => "not-json",
            Self::BadRequest => "bad-request",
            Self::OperationNotSupported => "operation-not-supported",
            Self::MissingObjects => "missing-objects",
            Self::MissingFields => "missing-fields",
            Self::MissingRecordData => "missing-record-data",
            Self::MissingRecordId => "missing-record-id",
            Self::ValidationFailed => "validation-failed",
            Self::EmptyResponse => "empty-response",
            Self::ProxyNotApplicable => "proxy-not-applicable",
            Self::NotImplemented => "not-implemented",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Error
// ============================================================================

/// The main error type for Solidafy Connect
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Caller Defects
    // ============================================================================
    #[error("missing object name")]
    MissingObjects,

    #[error("missing fields for object '{object}'")]
    MissingFields { object: String },

    #[error("missing record data")]
    MissingRecordData,

    #[error("missing record id")]
    MissingRecordId,

    #[error("missing required parameter: {field}")]
    MissingParameter { field: String },

    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    #[error("{operation} is not supported for object '{object}'")]
    OperationNotSupported { operation: String, object: String },

    #[error("{operation} is not implemented")]
    NotImplemented { operation: String },

    #[error("proxy is not applicable for provider '{provider}'")]
    ProxyNotApplicable { provider: String },

    #[error("{}", join_messages(.0))]
    Multiple(Vec<Error>),

    // ============================================================================
    // Catalog Errors
    // ============================================================================
    #[error("unknown provider: {provider}")]
    UnknownProvider { provider: String },

    #[error("unknown module '{module}' for provider '{provider}'")]
    UnknownModule { provider: String, module: String },

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("access token invalid: {message}")]
    AccessTokenInvalid { message: String },

    #[error("JWT generation failed: {message}")]
    JwtGeneration { message: String },

    #[error("AWS request is missing Service name")]
    AwsMissingService,

    #[error("invalid webhook signature: {message}")]
    InvalidSignature { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    HttpStatus {
        kind: ErrorKind,
        status: u16,
        message: String,
        body: String,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("response is not JSON (content type '{content_type}')")]
    NotJson { content_type: String },

    #[error("empty response body")]
    EmptyResponse,

    #[error("key not found: {path}")]
    KeyNotFound { path: String },

    #[error("value at '{path}' is not-{expected}")]
    WrongType { path: String, expected: &'static str },

    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("XML parsing error: {message}")]
    XmlParse { message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    // ============================================================================
    // I/O and Generic Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a missing parameter error
    pub fn missing_parameter(field: impl Into<String>) -> Self {
        Self::MissingParameter {
            field: field.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(
        kind: ErrorKind,
        status: u16,
        message: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::HttpStatus {
            kind,
            status,
            message: message.into(),
            body: body.into(),
        }
    }

    /// Create an operation-not-supported error
    pub fn not_supported(operation: impl Into<String>, object: impl Into<String>) -> Self {
        Self::OperationNotSupported {
            operation: operation.into(),
            object: object.into(),
        }
    }

    /// Create a not-implemented error
    pub fn not_implemented(operation: impl Into<String>) -> Self {
        Self::NotImplemented {
            operation: operation.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Join several errors into one, reporting every member.
    ///
    /// Returns `Ok(())` when the list is empty and the sole error unchanged
    /// when there is only one.
    pub fn join(mut errors: Vec<Error>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingObjects => ErrorKind::MissingObjects,
            Error::MissingFields { .. } => ErrorKind::MissingFields,
            Error::MissingRecordData => ErrorKind::MissingRecordData,
            Error::MissingRecordId => ErrorKind::MissingRecordId,
            Error::MissingParameter { .. }
            | Error::Validation { .. }
            | Error::UndefinedVariable { .. }
            | Error::UnknownProvider { .. }
            | Error::UnknownModule { .. }
            | Error::InvalidSignature { .. } => ErrorKind::ValidationFailed,
            Error::OperationNotSupported { .. } => ErrorKind::OperationNotSupported,
            Error::NotImplemented { .. } => ErrorKind::NotImplemented,
            Error::ProxyNotApplicable { .. } => ErrorKind::ProxyNotApplicable,
            Error::Multiple(errors) => errors.first().map_or(ErrorKind::Unknown, Error::kind),
            Error::Auth { .. } | Error::JwtGeneration { .. } | Error::AwsMissingService => {
                ErrorKind::Caller
            }
            Error::AccessTokenInvalid { .. } => ErrorKind::AccessTokenInvalid,
            Error::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    ErrorKind::Retryable
                } else if e.is_builder() {
                    ErrorKind::BadRequest
                } else {
                    ErrorKind::Unknown
                }
            }
            Error::HttpStatus { kind, .. } => *kind,
            Error::InvalidUrl(_) => ErrorKind::BadRequest,
            Error::Cancelled | Error::DeadlineExceeded => ErrorKind::Retryable,
            Error::NotJson { .. } | Error::JsonParse(_) => ErrorKind::NotJson,
            Error::EmptyResponse => ErrorKind::EmptyResponse,
            Error::KeyNotFound { .. }
            | Error::WrongType { .. }
            | Error::JsonPath { .. }
            | Error::YamlParse(_)
            | Error::XmlParse { .. }
            | Error::Decode { .. }
            | Error::Io(_)
            | Error::Other(_) => ErrorKind::Unknown,
            Error::Context { source, .. } => source.kind(),
        }
    }

    /// HTTP status associated with this error, when one is known
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            Error::Context { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }
}

/// Result type alias for Solidafy Connect
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Context {
            message: message.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::Context {
            message: f(),
            source: Box::new(e.into()),
        })
    }
}
