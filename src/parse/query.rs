//! Typed JSON path walker
//!
//! Paths are dot-separated keys with optional `[index]` suffixes, e.g.
//! `data.items[0].id`. A leading `$.` is accepted and ignored. Negative
//! indices count from the end. An explicit JSON `null` counts as missing.

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Outcome of a typed lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Missing,
    WrongType,
}

impl<T> Lookup<T> {
    /// Convert to a result: missing is an error unless `optional`
    pub fn into_result(self, path: &str, expected: &'static str, optional: bool) -> Result<Option<T>> {
        match self {
            Self::Found(value) => Ok(Some(value)),
            Self::Missing if optional => Ok(None),
            Self::Missing => Err(Error::KeyNotFound {
                path: path.to_string(),
            }),
            Self::WrongType => Err(Error::WrongType {
                path: path.to_string(),
                expected,
            }),
        }
    }
}

/// Walk `path` from `value`. The empty path is `value` itself.
pub fn value_at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let path = if path == "$" { "" } else { path };
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        let (name, indices) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !name.is_empty() {
            current = current.get(name)?;
        }
        for index in indices
            .split(']')
            .filter_map(|s| s.strip_prefix('['))
        {
            let index: i64 = index.parse().ok()?;
            let items = current.as_array()?;
            #[allow(clippy::cast_possible_wrap)]
            let idx = if index < 0 {
                items.len() as i64 + index
            } else {
                index
            };
            current = items.get(usize::try_from(idx).ok()?)?;
        }
    }
    Some(current)
}

/// Typed queries over a parsed JSON tree
#[derive(Debug, Clone, Copy)]
pub struct JsonQuery<'a> {
    root: &'a Value,
}

impl<'a> JsonQuery<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self { root }
    }

    /// Typed lookup with a caller-supplied extractor
    pub fn lookup<T>(&self, path: &str, extract: impl FnOnce(&'a Value) -> Option<T>) -> Lookup<T> {
        match value_at(self.root, path) {
            None | Some(Value::Null) => Lookup::Missing,
            Some(value) => extract(value).map_or(Lookup::WrongType, Lookup::Found),
        }
    }

    pub fn object(&self, path: &str, optional: bool) -> Result<Option<&'a Map<String, Value>>> {
        self.lookup(path, Value::as_object)
            .into_result(path, "object", optional)
    }

    pub fn array(&self, path: &str, optional: bool) -> Result<Option<&'a Vec<Value>>> {
        self.lookup(path, Value::as_array)
            .into_result(path, "array", optional)
    }

    pub fn str(&self, path: &str, optional: bool) -> Result<Option<&'a str>> {
        self.lookup(path, Value::as_str)
            .into_result(path, "string", optional)
    }

    pub fn bool(&self, path: &str, optional: bool) -> Result<Option<bool>> {
        self.lookup(path, Value::as_bool)
            .into_result(path, "boolean", optional)
    }

    /// Integer lookup; whole-valued floats are accepted
    pub fn int(&self, path: &str, optional: bool) -> Result<Option<i64>> {
        self.lookup(path, |v| {
            v.as_i64().or_else(|| {
                v.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    .map(|f| f as i64)
            })
        })
        .into_result(path, "integer", optional)
    }

    pub fn float(&self, path: &str, optional: bool) -> Result<Option<f64>> {
        self.lookup(path, Value::as_f64)
            .into_result(path, "float", optional)
    }

    /// String lookup falling back to `default` when missing
    pub fn str_with_default(&self, path: &str, default: &str) -> Result<String> {
        Ok(self
            .str(path, true)?
            .map_or_else(|| default.to_string(), str::to_string))
    }
}
