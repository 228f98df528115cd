//! Connector core
//!
//! A [`Connector`] composes a [`Transport`](crate::http::Transport), an
//! [`EndpointSupport`](crate::support::EndpointSupport) registry and one
//! strategy per operation. [`initialize`] resolves a catalog provider,
//! runs a provider constructor and validates the caller's inputs.
//!
//! Every operation validates its parameters and consults the support
//! registry before any request is built, so caller defects and unsupported
//! objects never reach the network.

mod base;
mod generic;
mod params;
mod requirements;
mod strategy;
mod subscribe;

pub use base::{initialize, Connector};
pub use generic::{GenericConnector, ObjectSupport, RestConfig};
pub use params::{
    ConnectorParams, DeleteParams, DeleteResult, ErrorSummary, FieldMetadata,
    ListObjectMetadataResult, ObjectMetadata, ReadParams, ReadResult, ReadResultRow, ValueType,
    WriteParams, WriteResult,
};
pub use requirements::{validate, Requirement};
pub use strategy::{
    record_path, DeleteStrategy, MetadataStrategy, NotImplemented, ReadStrategy, RestDelete,
    RestMetadata, RestRead, RestWrite, UpdateMethod, WriteStrategy,
};
pub use subscribe::{
    SignatureEncoding, SubscribeParams, SubscribeResult, SubscribeStrategy, WebhookVerifier,
};

#[cfg(test)]
mod tests;
