// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Solidafy Connect
//!
//! One runtime for reading, writing, deleting and describing records
//! across SaaS provider APIs.
//!
//! ## Features
//!
//! - **Provider Catalog**: Declarative base URLs, modules and auth schemes with `{{var}}` substitution
//! - **Authenticated Clients**: API key, Basic, bearer/JWT, OAuth2 with refresh, AWS SigV4
//! - **Transport**: JSON, XML and raw requests with uniform error interpretation
//! - **Pagination**: Cursor, offset, page number, next URL and Link header tokens
//! - **Connectors**: Composable read/write/delete/metadata strategies behind endpoint support rules
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_connect::auth::HeaderAuthClient;
//! use solidafy_connect::connector::{ConnectorParams, GenericConnector, ReadParams, RestConfig};
//! use solidafy_connect::context::Context;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> solidafy_connect::Result<()> {
//!     let params = ConnectorParams::new()
//!         .with_client(Arc::new(HeaderAuthClient::bearer("sk_test_...")));
//!     let connector = GenericConnector::builtin("stripe", params, &RestConfig::default())?;
//!
//!     let page = connector
//!         .read(&Context::new(), &ReadParams::new("customers").with_fields(["id", "email"]))
//!         .await?;
//!     println!("{} records, next page: {}", page.rows, page.next_page);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Connector                                │
//! │  read() → ReadResult   write() → WriteResult   delete()         │
//! │  list_object_metadata() → per-object metadata or error          │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │ Catalog  │   Auth    │   Transport   │ Paginate  │  Support    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Base URL │ API Key   │ JSON          │ Cursor    │ Glob rules  │
//! │ Modules  │ OAuth2    │ XML           │ Offset    │ Capabilities│
//! │ Metadata │ SigV4     │ Raw / CSV     │ Next URL  │             │
//! │ {{var}}  │ Basic/JWT │ Error interp. │ Link      │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types and error kinds
pub mod error;

/// Common types and type aliases
pub mod types;

/// Cancellation and deadlines carried through every call
pub mod context;

/// Authenticated HTTP clients
pub mod auth;

/// Provider catalog
pub mod catalog;

/// Template interpolation
pub mod template;

/// Transport, JSON/XML clients and error interpretation
pub mod http;

/// Response body decoders (JSON, XML, CSV)
pub mod decode;

/// Endpoint support rules
pub mod support;

/// Pagination strategies
pub mod pagination;

/// Record extraction and JSON path helpers
pub mod parse;

/// Object metadata and schema inference
pub mod schema;

/// Connector core and operation strategies
pub mod connector;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, Result};
pub use types::*;

// Re-export commonly used types
pub use catalog::Catalog;
pub use connector::{Connector, ConnectorParams, GenericConnector, RestConfig};
pub use context::Context;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
