//! Connector assembly and operation dispatch

use super::params::{
    ConnectorParams, DeleteParams, DeleteResult, ListObjectMetadataResult, ObjectMetadata,
    ReadParams, ReadResult, WriteParams, WriteResult,
};
use super::requirements::{defects, validate, Requirement};
use super::strategy::{
    DeleteStrategy, MetadataStrategy, NotImplemented, ReadStrategy, WriteStrategy,
};
use super::subscribe::{SubscribeParams, SubscribeResult, SubscribeStrategy};
use crate::auth::{clone_request, RawClient, SharedClient};
use crate::catalog::{Catalog, ResolvedProvider, ROOT_MODULE};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::Transport;
use crate::support::{Capability, EndpointSupport};
use crate::template::Variables;
use futures::future::join_all;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A provider connector: a transport, the objects it supports, and one
/// strategy per operation
#[derive(Clone)]
pub struct Connector {
    transport: Transport,
    support: EndpointSupport,
    reader: Arc<dyn ReadStrategy>,
    writer: Arc<dyn WriteStrategy>,
    deleter: Arc<dyn DeleteStrategy>,
    describer: Arc<dyn MetadataStrategy>,
    subscriber: Option<Arc<dyn SubscribeStrategy>>,
    requirements: Vec<Requirement>,
    fields_optional: bool,
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("transport", &self.transport)
            .field("requirements", &self.requirements)
            .field("fields_optional", &self.fields_optional)
            .finish_non_exhaustive()
    }
}

impl AsRef<Connector> for Connector {
    fn as_ref(&self) -> &Connector {
        self
    }
}

/// Build a connector for a catalog provider.
///
/// The module defaults to `root`. Requirements implied by the catalog
/// entry are checked before any URL is resolved; when some are unmet the
/// constructor still runs against the unresolved descriptor, so the
/// requirements it declares are reported in the same joined error.
/// Otherwise every requirement of the result is checked once more.
pub fn initialize<C, F>(
    catalog: &Catalog,
    provider: &str,
    mut params: ConnectorParams,
    constructor: F,
) -> Result<C>
where
    C: AsRef<Connector>,
    F: FnOnce(Connector) -> Result<C>,
{
    if params.module.is_empty() {
        params.module = ROOT_MODULE.to_string();
    }

    let info = catalog.get(provider)?;
    let implied = Requirement::for_provider(info);
    let mut unmet = defects(&params, &implied);

    let resolved = if unmet.is_empty() {
        let mut vars = Variables::new().with_metadata(&params.metadata);
        if !params.workspace.is_empty() {
            vars.set("workspace", params.workspace.clone());
        }
        catalog.resolve(provider, &params.module, &vars)?
    } else {
        ResolvedProvider {
            info: info.clone(),
            module_id: params.module.clone(),
            module: info.module(&params.module).unwrap_or_default(),
            base_url: info.base_url.clone(),
        }
    };

    let client: SharedClient = match &params.authenticated_client {
        Some(client) => Arc::clone(client),
        None => Arc::new(RawClient::new()),
    };
    let base = Connector::new(Transport::new(resolved, client)).with_requirements(implied);

    let connector = match constructor(base) {
        Ok(connector) => connector,
        Err(error) if unmet.is_empty() => return Err(error),
        Err(error) => {
            unmet.push(error);
            return Err(Error::Multiple(unmet));
        }
    };
    validate(&params, connector.as_ref().requirements())?;

    debug!(
        "initialized connector for {} (module {})",
        provider,
        params.module_id()
    );
    Ok(connector)
}

impl Connector {
    /// A connector with no supported objects and no implemented operations
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            support: EndpointSupport::new(),
            reader: Arc::new(NotImplemented),
            writer: Arc::new(NotImplemented),
            deleter: Arc::new(NotImplemented),
            describer: Arc::new(NotImplemented),
            subscriber: None,
            requirements: Vec::new(),
            fields_optional: false,
        }
    }

    #[must_use]
    pub fn with_support(mut self, support: EndpointSupport) -> Self {
        self.support = support;
        self
    }

    #[must_use]
    pub fn with_read(mut self, strategy: impl ReadStrategy + 'static) -> Self {
        self.reader = Arc::new(strategy);
        self
    }

    #[must_use]
    pub fn with_write(mut self, strategy: impl WriteStrategy + 'static) -> Self {
        self.writer = Arc::new(strategy);
        self
    }

    #[must_use]
    pub fn with_delete(mut self, strategy: impl DeleteStrategy + 'static) -> Self {
        self.deleter = Arc::new(strategy);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, strategy: impl MetadataStrategy + 'static) -> Self {
        self.describer = Arc::new(strategy);
        self
    }

    #[must_use]
    pub fn with_subscribe(mut self, strategy: impl SubscribeStrategy + 'static) -> Self {
        self.subscriber = Some(Arc::new(strategy));
        self
    }

    /// Declare an input the caller must supply
    #[must_use]
    pub fn require(mut self, requirement: Requirement) -> Self {
        if !self.requirements.contains(&requirement) {
            self.requirements.push(requirement);
        }
        self
    }

    #[must_use]
    fn with_requirements(self, requirements: Vec<Requirement>) -> Self {
        requirements.into_iter().fold(self, Self::require)
    }

    /// Allow reads with an empty field set
    #[must_use]
    pub fn with_fields_optional(mut self, optional: bool) -> Self {
        self.fields_optional = optional;
        self
    }

    pub fn provider(&self) -> &str {
        self.transport.provider()
    }

    pub fn module(&self) -> &str {
        self.transport.module()
    }

    /// The authenticated client, for raw access
    pub fn http_client(&self) -> SharedClient {
        self.transport.client()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    pub fn support(&self) -> &EndpointSupport {
        &self.support
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    fn require_support(&self, object: &str, capability: Capability, operation: &str) -> Result<()> {
        if self.support.supports(self.module(), object, capability) {
            return Ok(());
        }
        warn!(
            "{} on '{}' refused: {} does not support {}",
            operation,
            object,
            self.provider(),
            capability
        );
        Err(Error::not_supported(operation, object))
    }

    /// Read one page of records
    pub async fn read(&self, ctx: &Context, params: &ReadParams) -> Result<ReadResult> {
        params.validate(self.fields_optional)?;
        self.require_support(&params.object_name, Capability::Read, "read")?;

        let ctx = ctx.child();
        let request = self
            .reader
            .build_request(&ctx, &self.transport, params)
            .await?;
        let response = self.transport.execute(&ctx, clone_request(&request)?).await?;
        self.reader
            .parse_response(&ctx, params, &request, response)
            .await
    }

    /// Create or update a record
    pub async fn write(&self, ctx: &Context, params: &WriteParams) -> Result<WriteResult> {
        params.validate()?;
        self.require_support(&params.object_name, Capability::Write, "write")?;

        let ctx = ctx.child();
        let request = self
            .writer
            .build_request(&ctx, &self.transport, params)
            .await?;
        let response = self.transport.execute(&ctx, clone_request(&request)?).await?;
        self.writer
            .parse_response(&ctx, params, &request, response)
            .await
    }

    /// Delete a record
    pub async fn delete(&self, ctx: &Context, params: &DeleteParams) -> Result<DeleteResult> {
        params.validate()?;
        self.require_support(&params.object_name, Capability::Delete, "delete")?;

        let ctx = ctx.child();
        let request = self
            .deleter
            .build_request(&ctx, &self.transport, params)
            .await?;
        let response = self.transport.execute(&ctx, clone_request(&request)?).await?;
        self.deleter
            .parse_response(&ctx, params, &request, response)
            .await
    }

    /// Describe several objects concurrently. Each object carries either
    /// its metadata or the error that prevented describing it.
    pub async fn list_object_metadata<S: AsRef<str>>(
        &self,
        ctx: &Context,
        objects: &[S],
    ) -> Result<ListObjectMetadataResult> {
        if objects.is_empty() {
            return Err(Error::MissingObjects);
        }

        let ctx = ctx.child();
        let outcomes = join_all(objects.iter().map(|object| {
            let object = object.as_ref();
            let ctx = &ctx;
            async move { (object, self.object_metadata(ctx, object).await) }
        }))
        .await;

        let mut result = ListObjectMetadataResult::new();
        for (object, outcome) in outcomes {
            match outcome {
                Ok(metadata) => result.add_metadata(object, metadata),
                Err(error) => result.add_error(object, error),
            }
        }
        Ok(result)
    }

    async fn object_metadata(&self, ctx: &Context, object: &str) -> Result<ObjectMetadata> {
        if object.is_empty() {
            return Err(Error::MissingObjects);
        }
        self.require_support(object, Capability::Read, "metadata")?;

        if let Some(metadata) = self.describer.static_metadata(self.module(), object) {
            return Ok(metadata);
        }
        let request = self
            .describer
            .build_request(ctx, &self.transport, object)
            .await?;
        let response = self.transport.execute(ctx, clone_request(&request)?).await?;
        self.describer
            .parse_response(ctx, object, &request, response)
            .await
    }

    fn subscriber(&self) -> Result<&Arc<dyn SubscribeStrategy>> {
        self.subscriber
            .as_ref()
            .ok_or_else(|| Error::not_implemented("subscribe"))
    }

    /// Register a webhook subscription for the given objects
    pub async fn subscribe(&self, ctx: &Context, params: &SubscribeParams) -> Result<SubscribeResult> {
        let subscriber = self.subscriber()?;
        if params.objects.is_empty() {
            return Err(Error::MissingObjects);
        }
        Error::join(
            params
                .objects
                .iter()
                .filter_map(|object| {
                    self.require_support(object, Capability::Subscribe, "subscribe")
                        .err()
                })
                .collect(),
        )?;
        subscriber
            .subscribe(&ctx.child(), &self.transport, params)
            .await
    }

    /// Remove a subscription created by [`Connector::subscribe`]
    pub async fn delete_subscription(&self, ctx: &Context, subscription: &SubscribeResult) -> Result<()> {
        self.subscriber()?
            .delete_subscription(&ctx.child(), &self.transport, subscription)
            .await
    }

    /// Check the signature of a webhook delivery
    pub fn verify_webhook_message(&self, headers: &HeaderMap, body: &[u8]) -> Result<()> {
        self.subscriber()?.verify_webhook_message(headers, body)
    }
}
