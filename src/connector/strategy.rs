//! Operation strategies
//!
//! Each operation is realised by a strategy: `build_request` turns caller
//! parameters into an HTTP request, `parse_response` turns the response
//! into a typed result. The connector runs the request in between.
//!
//! Default REST strategies cover the common shapes. [`NotImplemented`] is
//! the explicit value for operations a connector does not offer.

use super::params::{
    DeleteParams, DeleteResult, ObjectMetadata, ReadParams, ReadResult, WriteParams, WriteResult,
};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::{json_request, parse_json, HttpResponse, Transport};
use crate::pagination::{set_query_params, NoPaginator, PageContext, PaginationConfig, Paginator};
use crate::parse::{extract_records, read_result, record_id_at};
use crate::schema::{infer_metadata, StaticSchema};
use crate::types::JsonObject;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, Request};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

// ============================================================================
// Strategy traits
// ============================================================================

#[async_trait]
pub trait ReadStrategy: Send + Sync {
    async fn build_request(
        &self,
        ctx: &Context,
        transport: &Transport,
        params: &ReadParams,
    ) -> Result<Request>;

    async fn parse_response(
        &self,
        ctx: &Context,
        params: &ReadParams,
        request: &Request,
        response: HttpResponse,
    ) -> Result<ReadResult>;
}

#[async_trait]
pub trait WriteStrategy: Send + Sync {
    async fn build_request(
        &self,
        ctx: &Context,
        transport: &Transport,
        params: &WriteParams,
    ) -> Result<Request>;

    async fn parse_response(
        &self,
        ctx: &Context,
        params: &WriteParams,
        request: &Request,
        response: HttpResponse,
    ) -> Result<WriteResult>;
}

#[async_trait]
pub trait DeleteStrategy: Send + Sync {
    async fn build_request(
        &self,
        ctx: &Context,
        transport: &Transport,
        params: &DeleteParams,
    ) -> Result<Request>;

    async fn parse_response(
        &self,
        ctx: &Context,
        params: &DeleteParams,
        request: &Request,
        response: HttpResponse,
    ) -> Result<DeleteResult>;
}

/// Describes objects, from a static schema or by sampling a live response
#[async_trait]
pub trait MetadataStrategy: Send + Sync {
    /// Metadata known without I/O. When this returns `Some`, no request is made.
    fn static_metadata(&self, _module: &str, _object: &str) -> Option<ObjectMetadata> {
        None
    }

    async fn build_request(
        &self,
        ctx: &Context,
        transport: &Transport,
        object: &str,
    ) -> Result<Request>;

    async fn parse_response(
        &self,
        ctx: &Context,
        object: &str,
        request: &Request,
        response: HttpResponse,
    ) -> Result<ObjectMetadata>;
}

// ============================================================================
// Not implemented
// ============================================================================

/// Strategy for an operation the connector does not offer. Fails before
/// any request is built.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotImplemented;

#[async_trait]
impl ReadStrategy for NotImplemented {
    async fn build_request(&self, _: &Context, _: &Transport, _: &ReadParams) -> Result<Request> {
        Err(Error::not_implemented("read"))
    }

    async fn parse_response(
        &self,
        _: &Context,
        _: &ReadParams,
        _: &Request,
        _: HttpResponse,
    ) -> Result<ReadResult> {
        Err(Error::not_implemented("read"))
    }
}

#[async_trait]
impl WriteStrategy for NotImplemented {
    async fn build_request(&self, _: &Context, _: &Transport, _: &WriteParams) -> Result<Request> {
        Err(Error::not_implemented("write"))
    }

    async fn parse_response(
        &self,
        _: &Context,
        _: &WriteParams,
        _: &Request,
        _: HttpResponse,
    ) -> Result<WriteResult> {
        Err(Error::not_implemented("write"))
    }
}

#[async_trait]
impl DeleteStrategy for NotImplemented {
    async fn build_request(&self, _: &Context, _: &Transport, _: &DeleteParams) -> Result<Request> {
        Err(Error::not_implemented("delete"))
    }

    async fn parse_response(
        &self,
        _: &Context,
        _: &DeleteParams,
        _: &Request,
        _: HttpResponse,
    ) -> Result<DeleteResult> {
        Err(Error::not_implemented("delete"))
    }
}

#[async_trait]
impl MetadataStrategy for NotImplemented {
    async fn build_request(&self, _: &Context, _: &Transport, _: &str) -> Result<Request> {
        Err(Error::not_implemented("metadata"))
    }

    async fn parse_response(
        &self,
        _: &Context,
        _: &str,
        _: &Request,
        _: HttpResponse,
    ) -> Result<ObjectMetadata> {
        Err(Error::not_implemented("metadata"))
    }
}

// ============================================================================
// REST read
// ============================================================================

/// Default read: GET `base/object` with pagination and time-window query
/// parameters. A continuation token is requested verbatim.
#[derive(Clone)]
pub struct RestRead {
    records_path: Option<String>,
    paginator: Arc<dyn Paginator>,
    since_param: Option<String>,
    until_param: Option<String>,
}

impl Default for RestRead {
    fn default() -> Self {
        Self::new(NoPaginator)
    }
}

impl RestRead {
    pub fn new(paginator: impl Paginator + 'static) -> Self {
        Self {
            records_path: None,
            paginator: Arc::new(paginator),
            since_param: None,
            until_param: None,
        }
    }

    pub fn from_config(config: &PaginationConfig) -> Self {
        Self {
            paginator: Arc::from(crate::pagination::create_paginator(config)),
            ..Self::default()
        }
    }

    /// Path of the record list in the response; the body itself when unset
    #[must_use]
    pub fn with_records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = Some(path.into());
        self
    }

    /// Query parameter carrying `since`
    #[must_use]
    pub fn with_since_param(mut self, name: impl Into<String>) -> Self {
        self.since_param = Some(name.into());
        self
    }

    /// Query parameter carrying `until`
    #[must_use]
    pub fn with_until_param(mut self, name: impl Into<String>) -> Self {
        self.until_param = Some(name.into());
        self
    }

    fn first_page_url(&self, transport: &Transport, params: &ReadParams) -> Result<Url> {
        let mut url = transport.url(&params.object_name)?;
        let mut query = self.paginator.initial_params(params.page_size);
        let window = [
            (&self.since_param, params.since),
            (&self.until_param, params.until),
        ];
        for (name, instant) in window {
            if let (Some(name), Some(instant)) = (name, instant) {
                query.push((name.clone(), format_instant(instant)));
            }
        }
        set_query_params(&mut url, &query);
        Ok(url)
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl ReadStrategy for RestRead {
    async fn build_request(
        &self,
        _ctx: &Context,
        transport: &Transport,
        params: &ReadParams,
    ) -> Result<Request> {
        let url = if params.next_page.is_empty() {
            self.first_page_url(transport, params)?
        } else {
            Url::parse(&params.next_page)?
        };
        json_request(Method::GET, url, None, &[])
    }

    async fn parse_response(
        &self,
        ctx: &Context,
        params: &ReadParams,
        request: &Request,
        response: HttpResponse,
    ) -> Result<ReadResult> {
        let parsed = parse_json(response)?;
        ctx.check()?;

        let records = extract_records(&parsed.body, self.records_path.as_deref())?;
        let page = PageContext {
            url: request.url(),
            headers: &parsed.headers,
            body: &parsed.body,
            records_count: records.len(),
        };
        let next_page = self.paginator.next_page(&page).into_token(request.url());

        Ok(read_result(records, next_page, &params.fields))
    }
}

// ============================================================================
// REST write
// ============================================================================

/// Verb used for updates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpdateMethod {
    #[default]
    Put,
    Patch,
}

impl UpdateMethod {
    fn method(self) -> Method {
        match self {
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
        }
    }
}

/// Default write: POST `base/object` to create, PUT or PATCH
/// `base/object/{id}` to update
#[derive(Debug, Clone)]
pub struct RestWrite {
    update_method: UpdateMethod,
    id_path: String,
}

impl Default for RestWrite {
    fn default() -> Self {
        Self {
            update_method: UpdateMethod::Put,
            id_path: "id".to_string(),
        }
    }
}

impl RestWrite {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_update_method(mut self, method: UpdateMethod) -> Self {
        self.update_method = method;
        self
    }

    /// Path of the record id in the response body
    #[must_use]
    pub fn with_id_path(mut self, path: impl Into<String>) -> Self {
        self.id_path = path.into();
        self
    }
}

/// `object/{id}` with the id percent-encoded
pub fn record_path(object: &str, record_id: &str) -> String {
    format!(
        "{}/{}",
        object.trim_end_matches('/'),
        urlencoding::encode(record_id)
    )
}

#[async_trait]
impl WriteStrategy for RestWrite {
    async fn build_request(
        &self,
        _ctx: &Context,
        transport: &Transport,
        params: &WriteParams,
    ) -> Result<Request> {
        let (method, url) = if params.is_update() {
            (
                self.update_method.method(),
                transport.url(&record_path(&params.object_name, &params.record_id))?,
            )
        } else {
            (Method::POST, transport.url(&params.object_name)?)
        };
        json_request(method, url, Some(&params.record_data), &[])
    }

    async fn parse_response(
        &self,
        _ctx: &Context,
        params: &WriteParams,
        _request: &Request,
        response: HttpResponse,
    ) -> Result<WriteResult> {
        let parsed = parse_json(response)?;

        let mut record_id = record_id_at(&parsed.body, &self.id_path);
        if record_id.is_empty() {
            record_id.clone_from(&params.record_id);
        }
        let data = match parsed.body {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        };

        Ok(WriteResult {
            success: true,
            record_id,
            errors: Vec::new(),
            data,
        })
    }
}

// ============================================================================
// REST delete
// ============================================================================

/// Default delete: DELETE `base/object/{id}`
#[derive(Debug, Clone, Copy, Default)]
pub struct RestDelete;

#[async_trait]
impl DeleteStrategy for RestDelete {
    async fn build_request(
        &self,
        _ctx: &Context,
        transport: &Transport,
        params: &DeleteParams,
    ) -> Result<Request> {
        let url = transport.url(&record_path(&params.object_name, &params.record_id))?;
        json_request(Method::DELETE, url, None, &[])
    }

    async fn parse_response(
        &self,
        _ctx: &Context,
        _params: &DeleteParams,
        _request: &Request,
        _response: HttpResponse,
    ) -> Result<DeleteResult> {
        Ok(DeleteResult { success: true })
    }
}

// ============================================================================
// REST metadata
// ============================================================================

/// Default metadata: a static schema when one covers the object, otherwise
/// a one-record read whose keys become the fields
#[derive(Clone)]
pub struct RestMetadata {
    schema: Option<Arc<StaticSchema>>,
    records_path: Option<String>,
    paginator: Arc<dyn Paginator>,
}

impl Default for RestMetadata {
    fn default() -> Self {
        Self {
            schema: None,
            records_path: None,
            paginator: Arc::new(NoPaginator),
        }
    }
}

impl RestMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_schema(mut self, schema: StaticSchema) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    #[must_use]
    pub fn with_records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = Some(path.into());
        self
    }

    /// Pagination style, used to ask for a single record
    #[must_use]
    pub fn with_pagination(mut self, config: &PaginationConfig) -> Self {
        self.paginator = Arc::from(crate::pagination::create_paginator(config));
        self
    }
}

#[async_trait]
impl MetadataStrategy for RestMetadata {
    fn static_metadata(&self, module: &str, object: &str) -> Option<ObjectMetadata> {
        self.schema.as_ref()?.lookup(module, object).cloned()
    }

    async fn build_request(
        &self,
        _ctx: &Context,
        transport: &Transport,
        object: &str,
    ) -> Result<Request> {
        let mut url = transport.url(object)?;
        set_query_params(&mut url, &self.paginator.initial_params(Some(1)));
        json_request(Method::GET, url, None, &[])
    }

    async fn parse_response(
        &self,
        _ctx: &Context,
        object: &str,
        _request: &Request,
        response: HttpResponse,
    ) -> Result<ObjectMetadata> {
        let parsed = parse_json(response)?;
        let records = extract_records(&parsed.body, self.records_path.as_deref())?;
        let Some(first) = records.into_iter().next() else {
            return Err(Error::EmptyResponse);
        };
        Ok(infer_metadata(object, &[first]))
    }
}
