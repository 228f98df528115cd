//! Transport
//!
//! Binds an authenticated client to a resolved provider and module, and
//! exposes JSON, XML and CSV helpers with uniform error handling:
//! - Every non-2xx response goes through the configured [`ErrorHandler`]
//! - Bodies are read chunk by chunk so cancellation is observed mid-body
//! - Relative paths resolve against the module base URL

use super::interpret::{ErrorHandler, ErrorInterpreter};
use super::types::{HttpResponse, ParsedResponse, ResponseHandler};
use crate::auth::{apply_headers, Header, Mode, SharedClient};
use crate::catalog::{ProviderInfo, ResolvedProvider};
use crate::context::Context;
use crate::decode::{BodyDecoder, BodyFormat, CsvDecoder, JsonDecoder, XmlDecoder};
use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Request, Response};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Content type of AWS JSON protocol requests
pub const AWS_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// HTTP transport for one provider module
#[derive(Clone)]
pub struct Transport {
    resolved: ResolvedProvider,
    base_url: String,
    client: SharedClient,
    error_handler: Arc<dyn ErrorHandler>,
    response_handler: Option<ResponseHandler>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("provider", &self.resolved.info.name)
            .field("module", &self.resolved.module_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Create a transport for a resolved provider
    pub fn new(resolved: ResolvedProvider, client: SharedClient) -> Self {
        Self {
            base_url: resolved.base_url.clone(),
            resolved,
            client,
            error_handler: Arc::new(ErrorInterpreter::default()),
            response_handler: None,
        }
    }

    /// Create a transport for an API outside the catalog
    pub fn for_url(provider: &str, base_url: &str, client: SharedClient) -> Self {
        Self::new(ResolvedProvider::custom(provider, base_url), client)
    }

    /// Override the base URL
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
    }

    /// Replace the handler invoked on non-2xx responses
    pub fn set_error_handler(&mut self, handler: impl ErrorHandler + 'static) {
        self.error_handler = Arc::new(handler);
    }

    /// Install a hook run on every successful response
    pub fn set_response_handler(
        &mut self,
        handler: impl Fn(HttpResponse) -> Result<HttpResponse> + Send + Sync + 'static,
    ) {
        self.response_handler = Some(Arc::new(handler));
    }

    /// Provider name
    pub fn provider(&self) -> &str {
        &self.resolved.info.name
    }

    /// Selected module id
    pub fn module(&self) -> &str {
        &self.resolved.module_id
    }

    /// Resolved provider descriptor
    pub fn info(&self) -> &ProviderInfo {
        &self.resolved.info
    }

    /// Base URL requests resolve against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The authenticated client, for byte-level access
    pub fn client(&self) -> SharedClient {
        Arc::clone(&self.client)
    }

    /// Resolve a path or absolute URL. Absolute URLs are used verbatim.
    pub fn url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return Ok(Url::parse(&self.base_url)?);
        }
        Ok(Url::parse(&format!("{}/{}", self.base_url, path))?)
    }

    /// Send a request and read the whole body.
    ///
    /// Non-2xx responses are turned into errors by the error handler.
    pub async fn execute(&self, ctx: &Context, request: Request) -> Result<HttpResponse> {
        ctx.check()?;
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self.client.execute(ctx, &request).await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = read_body(ctx, response).await?;

        if !(200..300).contains(&status) {
            debug!("{} {} failed with HTTP {}", method, url.path(), status);
            return Err(self.error_handler.handle(status, &headers, &body));
        }

        let response = HttpResponse {
            status,
            headers,
            body,
        };
        match &self.response_handler {
            Some(handler) => handler(response),
            None => Ok(response),
        }
    }

    /// JSON helpers
    pub fn json(&self) -> JsonClient<'_> {
        JsonClient { transport: self }
    }

    /// XML helpers
    pub fn xml(&self) -> XmlClient<'_> {
        XmlClient { transport: self }
    }

    /// GET a CSV document; rows decode into objects keyed by the header row
    pub async fn get_csv(&self, ctx: &Context, url: &str, headers: &[Header]) -> Result<ParsedResponse> {
        let request = build_request(Method::GET, self.url(url)?, BodyFormat::Csv, None, headers)?;
        let response = self.execute(ctx, request).await?;
        let body = CsvDecoder::new().decode(&response.body)?;
        Ok(ParsedResponse {
            status: response.status,
            headers: response.headers,
            body,
        })
    }
}

async fn read_body(ctx: &Context, mut response: Response) -> Result<Bytes> {
    let mut body = BytesMut::new();
    while let Some(chunk) = ctx
        .run(async { response.chunk().await.map_err(Error::Http) })
        .await?
    {
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

/// Build a request carrying `Accept` for `format`, and `Content-Type` when a
/// body is present. Caller headers are applied last.
pub fn build_request(
    method: Method,
    url: Url,
    format: BodyFormat,
    body: Option<Vec<u8>>,
    headers: &[Header],
) -> Result<Request> {
    let mut request = Request::new(method, url);
    request
        .headers_mut()
        .insert(ACCEPT, HeaderValue::from_static(format.accept()));
    if let Some(body) = body {
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
        *request.body_mut() = Some(body.into());
    }
    apply_headers(request.headers_mut(), headers)?;
    Ok(request)
}

/// Build a JSON request
pub fn json_request(
    method: Method,
    url: Url,
    body: Option<&Value>,
    headers: &[Header],
) -> Result<Request> {
    let body = body.map(serde_json::to_vec).transpose()?;
    build_request(method, url, BodyFormat::Json, body, headers)
}

/// Decode a JSON response, rejecting other content types
pub fn parse_json(response: HttpResponse) -> Result<ParsedResponse> {
    parse_with(response, BodyFormat::Json, |ct| {
        BodyFormat::Json.accepts_content_type(ct)
    })
}

fn parse_aws_json(response: HttpResponse) -> Result<ParsedResponse> {
    parse_with(response, BodyFormat::Json, |ct| {
        BodyFormat::Json.accepts_content_type(ct) || ct.starts_with("application/x-amz-json")
    })
}

/// Decode an XML response into a JSON tree
pub fn parse_xml(response: HttpResponse) -> Result<ParsedResponse> {
    parse_with(response, BodyFormat::Xml, |ct| {
        BodyFormat::Xml.accepts_content_type(ct)
    })
}

fn parse_with(
    response: HttpResponse,
    format: BodyFormat,
    accepts: impl Fn(&str) -> bool,
) -> Result<ParsedResponse> {
    let blank = response.body.iter().all(u8::is_ascii_whitespace);
    if !blank && !accepts(response.content_type()) {
        let content_type = response.content_type().to_string();
        return Err(match format {
            BodyFormat::Json => Error::NotJson { content_type },
            _ => Error::decode(format!("unexpected content type '{content_type}'")),
        });
    }

    let body = match format {
        BodyFormat::Json => JsonDecoder.decode(&response.body)?,
        BodyFormat::Xml => XmlDecoder.decode(&response.body)?,
        BodyFormat::Csv => CsvDecoder::new().decode(&response.body)?,
    };
    Ok(ParsedResponse {
        status: response.status,
        headers: response.headers,
        body,
    })
}

// ============================================================================
// JSON client
// ============================================================================

/// JSON request helpers bound to a transport
#[derive(Debug, Clone, Copy)]
pub struct JsonClient<'a> {
    transport: &'a Transport,
}

impl JsonClient<'_> {
    /// Send a JSON request and decode the JSON response
    pub async fn send(
        &self,
        ctx: &Context,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: &[Header],
    ) -> Result<ParsedResponse> {
        let request = json_request(method, self.transport.url(url)?, body, headers)?;
        let response = self.transport.execute(ctx, request).await?;
        parse_json(response)
    }

    pub async fn get(&self, ctx: &Context, url: &str, headers: &[Header]) -> Result<ParsedResponse> {
        self.send(ctx, Method::GET, url, None, headers).await
    }

    pub async fn post(
        &self,
        ctx: &Context,
        url: &str,
        body: &Value,
        headers: &[Header],
    ) -> Result<ParsedResponse> {
        self.send(ctx, Method::POST, url, Some(body), headers).await
    }

    pub async fn put(
        &self,
        ctx: &Context,
        url: &str,
        body: &Value,
        headers: &[Header],
    ) -> Result<ParsedResponse> {
        self.send(ctx, Method::PUT, url, Some(body), headers).await
    }

    pub async fn patch(
        &self,
        ctx: &Context,
        url: &str,
        body: &Value,
        headers: &[Header],
    ) -> Result<ParsedResponse> {
        self.send(ctx, Method::PATCH, url, Some(body), headers).await
    }

    pub async fn delete(&self, ctx: &Context, url: &str, headers: &[Header]) -> Result<ParsedResponse> {
        self.send(ctx, Method::DELETE, url, None, headers).await
    }

    /// POST using the AWS JSON protocol: `X-Amz-Target: <prefix>.<command>`.
    /// The signing service name comes from `ctx`.
    pub async fn post_aws(
        &self,
        ctx: &Context,
        url: &str,
        service_prefix: &str,
        command: &str,
        body: &Value,
    ) -> Result<ParsedResponse> {
        let headers = [
            Header::new(CONTENT_TYPE.as_str(), AWS_JSON_CONTENT_TYPE).with_mode(Mode::Overwrite),
            Header::new("X-Amz-Target", format!("{service_prefix}.{command}"))
                .with_mode(Mode::Overwrite),
        ];
        let request = json_request(Method::POST, self.transport.url(url)?, Some(body), &headers)?;
        let response = self.transport.execute(ctx, request).await?;
        parse_aws_json(response)
    }
}

// ============================================================================
// XML client
// ============================================================================

/// XML request helpers bound to a transport. Response bodies decode into a
/// JSON tree.
#[derive(Debug, Clone, Copy)]
pub struct XmlClient<'a> {
    transport: &'a Transport,
}

impl XmlClient<'_> {
    /// Send an XML request and decode the XML response
    pub async fn send(
        &self,
        ctx: &Context,
        method: Method,
        url: &str,
        body: Option<&str>,
        headers: &[Header],
    ) -> Result<ParsedResponse> {
        let body = body.map(|b| b.as_bytes().to_vec());
        let request = build_request(method, self.transport.url(url)?, BodyFormat::Xml, body, headers)?;
        let response = self.transport.execute(ctx, request).await?;
        parse_xml(response)
    }

    pub async fn get(&self, ctx: &Context, url: &str, headers: &[Header]) -> Result<ParsedResponse> {
        self.send(ctx, Method::GET, url, None, headers).await
    }

    pub async fn post(
        &self,
        ctx: &Context,
        url: &str,
        body: &str,
        headers: &[Header],
    ) -> Result<ParsedResponse> {
        self.send(ctx, Method::POST, url, Some(body), headers).await
    }

    pub async fn put(
        &self,
        ctx: &Context,
        url: &str,
        body: &str,
        headers: &[Header],
    ) -> Result<ParsedResponse> {
        self.send(ctx, Method::PUT, url, Some(body), headers).await
    }

    pub async fn patch(
        &self,
        ctx: &Context,
        url: &str,
        body: &str,
        headers: &[Header],
    ) -> Result<ParsedResponse> {
        self.send(ctx, Method::PATCH, url, Some(body), headers).await
    }

    pub async fn delete(&self, ctx: &Context, url: &str, headers: &[Header]) -> Result<ParsedResponse> {
        self.send(ctx, Method::DELETE, url, None, headers).await
    }
}
