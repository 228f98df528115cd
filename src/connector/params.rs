//! Connector inputs and results
//!
//! Parameters are validated before any request is built; every defect found
//! is reported in one joined error.

use crate::auth::SharedClient;
use crate::catalog::ROOT_MODULE;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{JsonObject, StringMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

pub use crate::schema::{FieldMetadata, ObjectMetadata, ValueType};

// ============================================================================
// Connector Params
// ============================================================================

/// Caller input used to build a connector
#[derive(Clone, Default)]
pub struct ConnectorParams {
    /// Module id; empty means `root`
    pub module: String,
    /// Client that attaches credentials
    pub authenticated_client: Option<SharedClient>,
    /// Workspace substituted into URL templates
    pub workspace: String,
    /// Additional substitution variables, keys compared case-insensitively
    pub metadata: StringMap,
}

impl std::fmt::Debug for ConnectorParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorParams")
            .field("module", &self.module)
            .field("authenticated_client", &self.authenticated_client.is_some())
            .field("workspace", &self.workspace)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl ConnectorParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: SharedClient) -> Self {
        self.authenticated_client = Some(client);
        self
    }

    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = workspace.into();
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Module id with the `root` default applied
    pub fn module_id(&self) -> &str {
        if self.module.is_empty() {
            ROOT_MODULE
        } else {
            &self.module
        }
    }

    /// Metadata value by case-insensitive key; empty values count as absent
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

// ============================================================================
// Read
// ============================================================================

/// Parameters of a read call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadParams {
    /// Object to read, e.g. `contacts`
    pub object_name: String,
    /// Fields to project into each row
    #[serde(default)]
    pub fields: BTreeSet<String>,
    /// Opaque continuation from a previous result
    #[serde(default)]
    pub next_page: String,
    /// Only records updated at or after this instant
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Only records updated before this instant
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    /// Requested page size
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl ReadParams {
    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_next_page(mut self, next_page: impl Into<String>) -> Self {
        self.next_page = next_page.into();
        self
    }

    #[must_use]
    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    #[must_use]
    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Check the parameters. `fields_optional` allows an empty field set.
    pub fn validate(&self, fields_optional: bool) -> Result<()> {
        let mut errors = Vec::new();
        if self.object_name.is_empty() {
            errors.push(Error::MissingObjects);
        }
        if self.fields.is_empty() && !fields_optional {
            errors.push(Error::MissingFields {
                object: self.object_name.clone(),
            });
        }
        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                errors.push(Error::validation(format!(
                    "since ({since}) is after until ({until})"
                )));
            }
        }
        Error::join(errors)
    }
}

/// One record of a read result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResultRow {
    /// Requested fields, keys lower-cased
    pub fields: JsonObject,
    /// The record as returned by the provider
    pub raw: Value,
}

/// One page of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    pub rows: usize,
    pub data: Vec<ReadResultRow>,
    /// Opaque continuation; empty when done
    pub next_page: String,
    pub done: bool,
}

impl ReadResult {
    /// Build a page; `done` follows from an empty continuation
    pub fn new(data: Vec<ReadResultRow>, next_page: String) -> Self {
        Self {
            rows: data.len(),
            done: next_page.is_empty(),
            data,
            next_page,
        }
    }
}

// ============================================================================
// Write
// ============================================================================

/// Parameters of a write call. An empty `record_id` creates a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteParams {
    pub object_name: String,
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub record_data: Value,
}

impl WriteParams {
    pub fn new(object_name: impl Into<String>, record_data: Value) -> Self {
        Self {
            object_name: object_name.into(),
            record_id: String::new(),
            record_data,
        }
    }

    #[must_use]
    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = record_id.into();
        self
    }

    /// Whether this write updates an existing record
    pub fn is_update(&self) -> bool {
        !self.record_id.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.object_name.is_empty() {
            errors.push(Error::MissingObjects);
        }
        if self.record_data.is_null() {
            errors.push(Error::MissingRecordData);
        }
        Error::join(errors)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteResult {
    pub success: bool,
    pub record_id: String,
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default)]
    pub data: JsonObject,
}

// ============================================================================
// Delete
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteParams {
    pub object_name: String,
    pub record_id: String,
}

impl DeleteParams {
    pub fn new(object_name: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            record_id: record_id.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.object_name.is_empty() {
            errors.push(Error::MissingObjects);
        }
        if self.record_id.is_empty() {
            errors.push(Error::MissingRecordId);
        }
        Error::join(errors)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub success: bool,
}

// ============================================================================
// Metadata
// ============================================================================

/// Metadata for several objects; each object carries either its metadata
/// or the error that prevented fetching it
#[derive(Debug, Default, Serialize)]
pub struct ListObjectMetadataResult {
    pub result: BTreeMap<String, ObjectMetadata>,
    #[serde(serialize_with = "serialize_errors")]
    pub errors: BTreeMap<String, Error>,
}

impl ListObjectMetadataResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_metadata(&mut self, object: impl Into<String>, metadata: ObjectMetadata) {
        self.result.insert(object.into(), metadata);
    }

    pub fn add_error(&mut self, object: impl Into<String>, error: Error) {
        self.errors.insert(object.into(), error);
    }
}

/// Serializable summary of an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

impl From<&Error> for ErrorSummary {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            status: error.status(),
            message: error.to_string(),
        }
    }
}

fn serialize_errors<S: Serializer>(
    errors: &BTreeMap<String, Error>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(errors.iter().map(|(k, e)| (k, ErrorSummary::from(e))))
}
