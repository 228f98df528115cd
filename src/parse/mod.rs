//! Response parsing helpers
//!
//! - [`JsonQuery`]: typed path lookups that distinguish missing keys from
//!   values of the wrong type
//! - Record extraction by dot path or JSONPath
//! - Case-insensitive field projection and record id coercion
//! - [`parse_result`]: composes the above into a [`ReadResult`](crate::connector::ReadResult)

mod query;
mod records;

pub use query::{value_at, JsonQuery, Lookup};
pub use records::{
    extract_records, lower_keys, parse_result, project, read_result, record_id, record_id_at, records_at,
    string_at,
};
