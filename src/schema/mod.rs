//! Object schema module
//!
//! Describes the fields of provider objects, either from a static schema
//! document or by inference over sampled records.
//!
//! # Features
//!
//! - **Static schemas**: YAML/JSON documents keyed by module and object
//! - **Type inference**: maps sampled JSON values onto [`ValueType`]
//! - **Type merging**: int/float and date/datetime widen; conflicts become `other`

mod inference;
mod types;

pub use inference::{infer_metadata, SchemaInferrer};
pub use types::{FieldMetadata, ObjectMetadata, StaticSchema, ValueType};
