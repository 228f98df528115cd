//! Field metadata inference from sampled records

use super::types::{FieldMetadata, ObjectMetadata, ValueType};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static DATETIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}").unwrap()
});

static DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Infers object metadata from sample records
#[derive(Debug, Clone)]
pub struct SchemaInferrer {
    /// Detect ISO 8601 dates and date-times in strings
    detect_dates: bool,
}

impl Default for SchemaInferrer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaInferrer {
    pub fn new() -> Self {
        Self { detect_dates: true }
    }

    /// Enable/disable date detection
    #[must_use]
    pub fn with_date_detection(mut self, enabled: bool) -> Self {
        self.detect_dates = enabled;
        self
    }

    /// Type of a single value; `None` for null
    pub fn infer_value(&self, value: &Value) -> Option<ValueType> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ValueType::Boolean),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(ValueType::Int),
            Value::Number(_) => Some(ValueType::Float),
            Value::String(s) if self.detect_dates && DATETIME_REGEX.is_match(s) => {
                Some(ValueType::Datetime)
            }
            Value::String(s) if self.detect_dates && DATE_REGEX.is_match(s) => Some(ValueType::Date),
            Value::String(_) => Some(ValueType::String),
            Value::Array(_) | Value::Object(_) => Some(ValueType::Other),
        }
    }

    /// Metadata for an object from sample records. Field names are the
    /// union of record keys; a field seen only as null is typed `other`.
    pub fn infer(&self, display_name: &str, records: &[Value]) -> ObjectMetadata {
        let mut types: BTreeMap<String, Option<ValueType>> = BTreeMap::new();

        for record in records {
            let Value::Object(map) = record else {
                continue;
            };
            for (key, value) in map {
                let observed = self.infer_value(value);
                let entry = types.entry(key.clone()).or_insert(None);
                *entry = match (*entry, observed) {
                    (Some(a), Some(b)) => Some(a.merge_with(b)),
                    (a, b) => a.or(b),
                };
            }
        }

        let mut metadata = ObjectMetadata::new(display_name);
        for (name, value_type) in types {
            let value_type = value_type.unwrap_or_default();
            let field = FieldMetadata::new(name.clone(), value_type)
                .with_provider_type(json_type_name(value_type));
            metadata.add_field(name, field);
        }
        metadata
    }
}

fn json_type_name(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Boolean => "boolean",
        ValueType::Int | ValueType::Float => "number",
        ValueType::String | ValueType::Date | ValueType::Datetime => "string",
        ValueType::SingleSelect | ValueType::MultiSelect | ValueType::Other => "json",
    }
}

/// Infer metadata with default settings
pub fn infer_metadata(display_name: &str, records: &[Value]) -> ObjectMetadata {
    SchemaInferrer::new().infer(display_name, records)
}
