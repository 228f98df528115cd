//! Record extraction, projection and id coercion

use super::query::value_at;
use crate::connector::{ReadResult, ReadResultRow};
use crate::error::{Error, Result};
use crate::types::JsonObject;
use serde_json::Value;
use std::collections::BTreeSet;

/// Extract the records of a response body.
///
/// Without a path the body itself is the record list (or a single record).
/// Paths containing `*` are evaluated as JSONPath; others are simple dot
/// paths. A missing path yields no records.
pub fn extract_records(body: &Value, path: Option<&str>) -> Result<Vec<Value>> {
    let Some(path) = path.filter(|p| !p.is_empty()) else {
        return Ok(match body {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        });
    };

    if path.contains('*') {
        return extract_with_jsonpath(body, path);
    }

    Ok(match value_at(body, path) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.clone()],
    })
}

fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let path = if path.starts_with('$') {
        path.to_string()
    } else {
        format!("$.{path}")
    };
    let jp = JsonPath::try_from(path.as_str()).map_err(|e| Error::JsonPath {
        message: format!("Invalid JSONPath: {e}"),
    })?;

    match jp.find(value) {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

/// Records locator for a fixed path
pub fn records_at(path: impl Into<String>) -> impl Fn(&Value) -> Result<Vec<Value>> {
    let path = path.into();
    move |body| extract_records(body, Some(&path))
}

/// Copy of a record with every key lower-cased
pub fn lower_keys(record: &JsonObject) -> JsonObject {
    record
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.clone()))
        .collect()
}

/// Project a record onto the requested fields, case-insensitively.
/// Output keys are lower-cased; fields absent from the record are omitted.
pub fn project(record: &Value, fields: &BTreeSet<String>) -> JsonObject {
    let Value::Object(record) = record else {
        return JsonObject::new();
    };
    let lowered = lower_keys(record);
    fields
        .iter()
        .map(|field| field.to_lowercase())
        .filter_map(|field| lowered.get(&field).cloned().map(|v| (field, v)))
        .collect()
}

/// Render a record id. Strings pass through and numbers render the way
/// `serde_json` prints them, so integers carry no decimal point and floats
/// use their shortest round-trip form. Anything else is empty.
pub fn record_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Record id found at `path` in `body`, or empty
pub fn record_id_at(body: &Value, path: &str) -> String {
    value_at(body, path).map(record_id).unwrap_or_default()
}

/// Scalar at `path` rendered as a string; `None` when missing, null or
/// not a scalar
pub fn string_at(body: &Value, path: &str) -> Option<String> {
    match value_at(body, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Build a read result from a response body.
///
/// `records` locates the record list, `next_page` produces the opaque
/// continuation (empty when done), and every row is projected onto
/// `fields`.
pub fn parse_result<R, N>(
    body: &Value,
    records: R,
    next_page: N,
    fields: &BTreeSet<String>,
) -> Result<ReadResult>
where
    R: Fn(&Value) -> Result<Vec<Value>>,
    N: Fn(&Value) -> Result<String>,
{
    let records = records(body)?;
    let next_page = next_page(body)?;
    Ok(read_result(records, next_page, fields))
}

/// Assemble a page from located records and a continuation token
pub fn read_result(records: Vec<Value>, next_page: String, fields: &BTreeSet<String>) -> ReadResult {
    let data: Vec<ReadResultRow> = records
        .into_iter()
        .map(|raw| ReadResultRow {
            fields: project(&raw, fields),
            raw,
        })
        .collect();

    ReadResult::new(data, next_page)
}
