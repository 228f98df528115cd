//! Generic REST connector
//!
//! A catalog provider driven purely by the default strategies and a
//! declarative [`RestConfig`]:
//!
//! ```yaml
//! records_path: data
//! pagination:
//!   type: cursor
//!   cursor_param: cursor
//!   cursor_path: meta.next_cursor
//! since_param: updated_since
//! update_method: PATCH
//! objects:
//!   - pattern: "contacts"
//!     capabilities: [read, write, delete]
//!   - pattern: "*"
//!     capabilities: [read]
//! ```

use super::base::{initialize, Connector};
use super::params::ConnectorParams;
use super::strategy::{RestDelete, RestMetadata, RestRead, RestWrite, UpdateMethod};
use crate::catalog::Catalog;
use crate::error::{Error, ErrorKind, Result};
use crate::http::ErrorInterpreter;
use crate::pagination::PaginationConfig;
use crate::schema::StaticSchema;
use crate::support::{CapabilitySet, EndpointSupport};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::path::Path;

/// Objects matching `pattern` and what they support
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSupport {
    pub pattern: String,
    pub capabilities: CapabilitySet,
}

impl ObjectSupport {
    pub fn new(pattern: impl Into<String>, capabilities: CapabilitySet) -> Self {
        Self {
            pattern: pattern.into(),
            capabilities,
        }
    }
}

fn default_objects() -> Vec<ObjectSupport> {
    vec![ObjectSupport::new("*", CapabilitySet::crud())]
}

fn default_id_path() -> String {
    "id".to_string()
}

/// Declarative settings of a generic REST connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestConfig {
    /// Path of the record list in read responses
    #[serde(default)]
    pub records_path: Option<String>,
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Query parameter for the lower time bound
    #[serde(default)]
    pub since_param: Option<String>,
    /// Query parameter for the upper time bound
    #[serde(default)]
    pub until_param: Option<String>,
    #[serde(default)]
    pub update_method: UpdateMethod,
    /// Path of the record id in write responses
    #[serde(default = "default_id_path")]
    pub id_path: String,
    /// Support rows for the selected module; everything is read/write/delete
    /// when omitted
    #[serde(default = "default_objects")]
    pub objects: Vec<ObjectSupport>,
    /// Allow reads without a field selection
    #[serde(default)]
    pub fields_optional: bool,
    /// Kind reported for 404 responses
    #[serde(default)]
    pub not_found: Option<ErrorKind>,
    /// Embedded schemas preferred over sampling
    #[serde(default)]
    pub schema: Option<StaticSchema>,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            records_path: None,
            pagination: PaginationConfig::None,
            since_param: None,
            until_param: None,
            update_method: UpdateMethod::Put,
            id_path: default_id_path(),
            objects: default_objects(),
            fields_optional: false,
            not_found: None,
            schema: None,
        }
    }
}

impl RestConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::Context {
            message: format!("reading connector config {}", path.display()),
            source: Box::new(Error::Io(e)),
        })?;
        Self::from_yaml(&content)
    }

    /// Compose the default strategies onto a base connector
    pub fn apply(&self, base: Connector) -> Connector {
        let module = base.module().to_string();
        let support = self
            .objects
            .iter()
            .fold(EndpointSupport::new(), |support, row| {
                support.with(&module, &row.pattern, row.capabilities.clone())
            });

        let mut read = RestRead::from_config(&self.pagination);
        let mut metadata = RestMetadata::new().with_pagination(&self.pagination);
        if let Some(path) = &self.records_path {
            read = read.with_records_path(path);
            metadata = metadata.with_records_path(path);
        }
        if let Some(param) = &self.since_param {
            read = read.with_since_param(param);
        }
        if let Some(param) = &self.until_param {
            read = read.with_until_param(param);
        }
        if let Some(schema) = &self.schema {
            metadata = metadata.with_schema(schema.clone());
        }

        let mut connector = base
            .with_support(support)
            .with_read(read)
            .with_write(
                RestWrite::new()
                    .with_update_method(self.update_method)
                    .with_id_path(&self.id_path),
            )
            .with_delete(RestDelete)
            .with_metadata(metadata)
            .with_fields_optional(self.fields_optional);

        if let Some(kind) = self.not_found {
            connector
                .transport_mut()
                .set_error_handler(ErrorInterpreter::new().with_not_found_kind(kind));
        }
        connector
    }
}

/// A catalog provider served by the default REST strategies
#[derive(Debug, Clone)]
pub struct GenericConnector {
    inner: Connector,
}

impl GenericConnector {
    pub fn new(
        catalog: &Catalog,
        provider: &str,
        params: ConnectorParams,
        config: &RestConfig,
    ) -> Result<Self> {
        initialize(catalog, provider, params, |base| {
            Ok(Self {
                inner: config.apply(base),
            })
        })
    }

    /// Connector for a provider of the built-in catalog
    pub fn builtin(provider: &str, params: ConnectorParams, config: &RestConfig) -> Result<Self> {
        Self::new(Catalog::builtin()?, provider, params, config)
    }
}

impl AsRef<Connector> for GenericConnector {
    fn as_ref(&self) -> &Connector {
        &self.inner
    }
}

impl Deref for GenericConnector {
    type Target = Connector;

    fn deref(&self) -> &Connector {
        &self.inner
    }
}
