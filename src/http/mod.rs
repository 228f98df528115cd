//! HTTP transport module
//!
//! Binds an authenticated client to a provider module and exposes JSON,
//! XML, CSV and raw helpers.
//!
//! # Features
//!
//! - **Uniform errors**: every non-2xx response goes through an
//!   [`ErrorHandler`]; the default [`ErrorInterpreter`] maps status and
//!   payload onto the error taxonomy
//! - **Content checks**: JSON helpers reject non-JSON responses
//! - **Cancellation**: bodies are read chunk by chunk under the caller's
//!   [`Context`](crate::context::Context)
//! - **Override hooks**: base URL, error handler and response handler

mod interpret;
mod transport;
mod types;

pub use interpret::{common_payload, ErrorDetails, ErrorHandler, ErrorInterpreter, PayloadParser};
pub use transport::{
    build_request, json_request, parse_json, parse_xml, JsonClient, Transport, XmlClient,
    AWS_JSON_CONTENT_TYPE,
};
pub use types::{HttpResponse, ParsedResponse, ResponseHandler};
