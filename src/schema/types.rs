//! Schema types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Normalised type of a field value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    String,
    Boolean,
    Int,
    Float,
    Date,
    Datetime,
    SingleSelect,
    MultiSelect,
    #[default]
    Other,
}

impl ValueType {
    /// Merge two observed types into the more general one
    pub fn merge_with(self, other: ValueType) -> ValueType {
        match (self, other) {
            (a, b) if a == b => a,
            (ValueType::Int, ValueType::Float) | (ValueType::Float, ValueType::Int) => {
                ValueType::Float
            }
            (ValueType::Date, ValueType::Datetime) | (ValueType::Datetime, ValueType::Date) => {
                ValueType::Datetime
            }
            (ValueType::String, ValueType::Date | ValueType::Datetime)
            | (ValueType::Date | ValueType::Datetime, ValueType::String) => ValueType::String,
            _ => ValueType::Other,
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Date => "date",
            ValueType::Datetime => "datetime",
            ValueType::SingleSelect => "single-select",
            ValueType::MultiSelect => "multi-select",
            ValueType::Other => "other",
        };
        f.write_str(name)
    }
}

/// Description of one field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FieldMetadata {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub value_type: ValueType,
    /// Type name as the provider reports it
    #[serde(default)]
    pub provider_type: String,
    #[serde(default)]
    pub read_only: bool,
    /// Allowed values of select fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl FieldMetadata {
    pub fn new(display_name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            display_name: display_name.into(),
            value_type,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_provider_type(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_type = provider_type.into();
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[must_use]
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Description of one object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ObjectMetadata {
    #[serde(default)]
    pub display_name: String,
    /// Field name to display name
    #[serde(default)]
    pub fields_map: BTreeMap<String, String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldMetadata>,
}

impl ObjectMetadata {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    /// Add a field, keeping `fields_map` in step
    pub fn add_field(&mut self, name: impl Into<String>, field: FieldMetadata) {
        let name = name.into();
        let display = if field.display_name.is_empty() {
            name.clone()
        } else {
            field.display_name.clone()
        };
        self.fields_map.insert(name.clone(), display);
        self.fields.insert(name, field);
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, field: FieldMetadata) -> Self {
        self.add_field(name, field);
        self
    }

    /// Fill `fields_map` for fields loaded without it
    fn sync_fields_map(&mut self) {
        for (name, field) in &self.fields {
            self.fields_map.entry(name.clone()).or_insert_with(|| {
                if field.display_name.is_empty() {
                    name.clone()
                } else {
                    field.display_name.clone()
                }
            });
        }
    }
}

/// Embedded object schemas, keyed by module then object name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticSchema {
    #[serde(default)]
    modules: BTreeMap<String, BTreeMap<String, ObjectMetadata>>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a schema document (YAML or JSON)
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut schema: StaticSchema = serde_yaml::from_str(yaml)?;
        for objects in schema.modules.values_mut() {
            objects.values_mut().for_each(ObjectMetadata::sync_fields_map);
        }
        Ok(schema)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::Context {
            message: format!("reading schema {}", path.display()),
            source: Box::new(Error::Io(e)),
        })?;
        Self::from_yaml(&content)
    }

    /// Register an object
    #[must_use]
    pub fn with_object(mut self, module: &str, object: &str, metadata: ObjectMetadata) -> Self {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(object.to_string(), metadata);
        self
    }

    /// Metadata for an object, matched case-insensitively
    pub fn lookup(&self, module: &str, object: &str) -> Option<&ObjectMetadata> {
        let objects = self.modules.get(module)?;
        objects.get(object).or_else(|| {
            objects
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(object))
                .map(|(_, metadata)| metadata)
        })
    }

    /// Object names known for a module
    pub fn objects(&self, module: &str) -> Vec<&str> {
        self.modules
            .get(module)
            .map(|objects| objects.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
