//! Body decoder module
//!
//! Supports: JSON, XML, CSV
//!
//! # Overview
//!
//! Decoders turn response bytes into a JSON value. XML elements map onto
//! objects and CSV rows onto objects keyed by the header row, so the parse
//! helpers only ever walk JSON trees.

mod decoders;
mod types;

pub use decoders::{decoder_for, json_to_xml, xml_to_json, CsvDecoder, JsonDecoder, XmlDecoder};
pub use types::{BodyDecoder, BodyFormat};
