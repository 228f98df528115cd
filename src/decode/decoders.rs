//! Decoder implementations
//!
//! Each decoder handles a specific body format.

use super::types::{BodyDecoder, BodyFormat};
use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Decoder for a body format
pub fn decoder_for(format: BodyFormat) -> Box<dyn BodyDecoder> {
    match format {
        BodyFormat::Json => Box::new(JsonDecoder),
        BodyFormat::Xml => Box::new(XmlDecoder),
        BodyFormat::Csv => Box::new(CsvDecoder::new()),
    }
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}

// ============================================================================
// JSON Decoder
// ============================================================================

/// JSON decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl BodyDecoder for JsonDecoder {
    fn decode(&self, body: &[u8]) -> Result<Value> {
        if is_blank(body) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(body)?)
    }
}

// ============================================================================
// CSV Decoder
// ============================================================================

/// CSV decoder: the header row supplies the keys of each record object
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    /// Field delimiter
    delimiter: char,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl CsvDecoder {
    /// Create a new CSV decoder with a comma delimiter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a CSV decoder with a custom delimiter
    pub fn with_delimiter(delimiter: char) -> Self {
        Self { delimiter }
    }
}

impl BodyDecoder for CsvDecoder {
    fn decode(&self, body: &[u8]) -> Result<Value> {
        if is_blank(body) {
            return Ok(Value::Null);
        }

        let text = std::str::from_utf8(body)
            .map_err(|e| Error::decode(format!("Invalid UTF-8 in CSV: {e}")))?;
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());

        let Some(header_line) = lines.next() else {
            return Ok(Value::Array(Vec::new()));
        };
        let headers = parse_csv_line(header_line, self.delimiter);

        let records = lines
            .map(|line| {
                let fields = parse_csv_line(line, self.delimiter);
                let record: Map<String, Value> = headers
                    .iter()
                    .enumerate()
                    .map(|(i, header)| {
                        let value = fields.get(i).map_or("", String::as_str);
                        (header.clone(), parse_csv_value(value))
                    })
                    .collect();
                Value::Object(record)
            })
            .collect();

        Ok(Value::Array(records))
    }
}

/// Parse a CSV line into fields
fn parse_csv_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes {
                // Check for escaped quote
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                in_quotes = true;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(current.trim().to_string());
            current = String::new();
        } else {
            current.push(c);
        }
    }

    fields.push(current.trim().to_string());
    fields
}

/// Parse a CSV field into a JSON value
fn parse_csv_value(value: &str) -> Value {
    if value.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return Value::Number(n);
    }
    match value {
        "true" | "TRUE" | "True" => Value::Bool(true),
        "false" | "FALSE" | "False" => Value::Bool(false),
        _ => Value::String(value.to_string()),
    }
}

// ============================================================================
// XML Decoder
// ============================================================================

/// XML decoder
///
/// Elements become objects, attributes become `@name` keys, text content of
/// an element with attributes goes into `_text`, and repeated sibling
/// elements become arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDecoder;

impl BodyDecoder for XmlDecoder {
    fn decode(&self, body: &[u8]) -> Result<Value> {
        if is_blank(body) {
            return Ok(Value::Null);
        }
        let xml = std::str::from_utf8(body).map_err(|e| Error::XmlParse {
            message: format!("Invalid UTF-8 in XML: {e}"),
        })?;
        xml_to_json(xml)
    }
}

fn xml_error(message: impl std::fmt::Display) -> Error {
    Error::XmlParse {
        message: message.to_string(),
    }
}

fn element_attributes(element: &quick_xml::events::BytesStart<'_>) -> Map<String, Value> {
    element
        .attributes()
        .flatten()
        .map(|attr| {
            (
                format!("@{}", String::from_utf8_lossy(attr.key.as_ref())),
                Value::String(String::from_utf8_lossy(&attr.value).to_string()),
            )
        })
        .collect()
}

fn insert_child(parent: &mut Value, name: String, value: Value) {
    let Value::Object(parent) = parent else {
        return;
    };
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, value]);
        }
        None => {
            parent.insert(name, value);
        }
    }
}

/// Convert an XML document to a JSON value
pub fn xml_to_json(xml: &str) -> Result<Value> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<(String, Value)> = vec![(String::new(), Value::Object(Map::new()))];

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push((name, Value::Object(element_attributes(&e))));
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    if let Some((name, value)) = stack.pop() {
                        if let Some((_, parent)) = stack.last_mut() {
                            insert_child(parent, name, value);
                        }
                    }
                }
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(xml_error)?;
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                if let Some((_, current)) = stack.last_mut() {
                    match current {
                        Value::Object(obj) if obj.is_empty() => {
                            *current = Value::String(text.to_string());
                        }
                        Value::Object(obj) => {
                            obj.insert("_text".to_string(), Value::String(text.to_string()));
                        }
                        _ => {}
                    }
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let attributes = element_attributes(&e);
                let value = if attributes.is_empty() {
                    Value::Null
                } else {
                    Value::Object(attributes)
                };
                if let Some((_, parent)) = stack.last_mut() {
                    insert_child(parent, name, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(xml_error("unexpected end of document"));
    }
    let Some((_, Value::Object(root))) = stack.pop() else {
        return Err(xml_error("Failed to parse XML structure"));
    };

    // A single document element is returned directly
    if root.len() == 1 {
        Ok(root.into_iter().next().map_or(Value::Null, |(_, v)| v))
    } else {
        Ok(Value::Object(root))
    }
}

/// Serialise a JSON object as a flat XML element
pub fn json_to_xml(root: &str, value: &Value) -> String {
    let mut out = String::new();
    write_xml_element(&mut out, root, value);
    out
}

fn write_xml_element(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                write_xml_element(out, name, item);
            }
        }
        Value::Object(map) => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            for (key, child) in map {
                write_xml_element(out, key, child);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Value::Null => {
            out.push('<');
            out.push_str(name);
            out.push_str("/>");
        }
        Value::String(s) => {
            out.push_str(&format!(
                "<{name}>{}</{name}>",
                quick_xml::escape::escape(s.as_str())
            ));
        }
        other => out.push_str(&format!("<{name}>{other}</{name}>")),
    }
}
