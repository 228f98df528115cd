//! CLI runner - executes commands

use crate::auth::{AuthConfig, HeaderAuthClient, Location, SharedClient};
use crate::catalog::{AuthType, Catalog, ProviderInfo};
use crate::cli::commands::{Cli, Commands, ConnectionArgs, OutputFormat};
use crate::connector::{
    ConnectorParams, DeleteParams, GenericConnector, ReadParams, RestConfig, WriteParams,
};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::template::Variables;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Providers => self.providers(),
            Commands::Info {
                provider,
                workspace,
                metadata,
            } => self.info(provider, workspace.as_deref(), metadata),
            Commands::Read {
                connection,
                object,
                fields,
                next_page,
                since,
                until,
                page_size,
            } => {
                self.read(
                    connection,
                    object,
                    fields,
                    next_page.as_deref(),
                    (*since, *until),
                    *page_size,
                )
                .await
            }
            Commands::Write {
                connection,
                object,
                data,
                record_id,
            } => {
                self.write(connection, object, data, record_id.as_deref())
                    .await
            }
            Commands::Delete {
                connection,
                object,
                record_id,
            } => self.delete(connection, object, record_id).await,
            Commands::Metadata {
                connection,
                objects,
            } => self.metadata(connection, objects).await,
        }
    }

    fn catalog(&self) -> Result<Cow<'static, Catalog>> {
        match &self.cli.catalog {
            Some(path) => Ok(Cow::Owned(Catalog::from_file(path)?)),
            None => Ok(Cow::Borrowed(Catalog::builtin()?)),
        }
    }

    fn rest_config(&self) -> Result<RestConfig> {
        match &self.cli.config {
            Some(path) => RestConfig::from_file(path),
            None => Ok(RestConfig::default()),
        }
    }

    /// List catalog providers
    fn providers(&self) -> Result<()> {
        let catalog = self.catalog()?;
        let providers: Vec<Value> = catalog
            .providers()
            .into_iter()
            .filter_map(|name| catalog.get(name).ok())
            .map(|info| {
                json!({
                    "name": info.name,
                    "display_name": info.display_name,
                    "auth": info.auth.auth_type,
                    "modules": info.module_ids(),
                })
            })
            .collect();
        self.output(&providers)
    }

    /// Show a provider with every URL substituted
    fn info(&self, provider: &str, workspace: Option<&str>, metadata: &[(String, String)]) -> Result<()> {
        let catalog = self.catalog()?;
        let mut vars = Variables::new();
        for (key, value) in metadata {
            vars.set(key.to_lowercase(), value.clone());
        }
        if let Some(workspace) = workspace {
            vars.set("workspace", workspace);
        }
        let info = catalog.read_info(provider, &vars)?;
        self.output(&info)
    }

    /// Build a generic connector from connection flags
    fn connector(&self, args: &ConnectionArgs) -> Result<GenericConnector> {
        let catalog = self.catalog()?;
        let info = catalog.get(&args.provider)?;

        let mut params = ConnectorParams::new();
        if let Some(module) = &args.module {
            params = params.with_module(module);
        }
        if let Some(workspace) = &args.workspace {
            params = params.with_workspace(workspace);
        }
        for (key, value) in &args.metadata {
            params = params.with_metadata(key, value);
        }
        if let Some(client) = credentials(info, args)? {
            params = params.with_client(client);
        }

        debug!("connecting to {}", args.provider);
        GenericConnector::new(&catalog, &args.provider, params, &self.rest_config()?)
    }

    async fn read(
        &self,
        args: &ConnectionArgs,
        object: &str,
        fields: &[String],
        next_page: Option<&str>,
        window: (Option<DateTime<Utc>>, Option<DateTime<Utc>>),
        page_size: Option<usize>,
    ) -> Result<()> {
        let connector = self.connector(args)?;

        let mut params = ReadParams::new(object).with_fields(fields);
        if let Some(token) = next_page {
            params = params.with_next_page(token);
        }
        if let Some(since) = window.0 {
            params = params.with_since(since);
        }
        if let Some(until) = window.1 {
            params = params.with_until(until);
        }
        if let Some(size) = page_size {
            params = params.with_page_size(size);
        }

        let result = connector.read(&Context::new(), &params).await?;
        self.output(&result)
    }

    async fn write(
        &self,
        args: &ConnectionArgs,
        object: &str,
        data: &str,
        record_id: Option<&str>,
    ) -> Result<()> {
        let connector = self.connector(args)?;
        let record: Value = serde_json::from_str(data)
            .map_err(|e| Error::validation(format!("--data is not valid JSON: {e}")))?;

        let mut params = WriteParams::new(object, record);
        if let Some(id) = record_id {
            params = params.with_record_id(id);
        }

        let result = connector.write(&Context::new(), &params).await?;
        self.output(&result)
    }

    async fn delete(&self, args: &ConnectionArgs, object: &str, record_id: &str) -> Result<()> {
        let connector = self.connector(args)?;
        let result = connector
            .delete(&Context::new(), &DeleteParams::new(object, record_id))
            .await?;
        self.output(&result)
    }

    async fn metadata(&self, args: &ConnectionArgs, objects: &[String]) -> Result<()> {
        let connector = self.connector(args)?;
        let result = connector
            .list_object_metadata(&Context::new(), objects)
            .await?;
        self.output(&result)
    }

    /// Print a value in the selected format
    fn output(&self, value: &impl Serialize) -> Result<()> {
        let text = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        };
        println!("{text}");
        Ok(())
    }
}

/// Authenticated client for the credential flags, shaped by the provider's
/// auth descriptor
fn credentials(info: &ProviderInfo, args: &ConnectionArgs) -> Result<Option<SharedClient>> {
    if let Some(token) = &args.bearer {
        return Ok(Some(Arc::new(HeaderAuthClient::bearer(token))));
    }
    if let Some(basic) = &args.basic {
        let (username, password) = basic
            .split_once(':')
            .ok_or_else(|| Error::validation("--basic expects user:password"))?;
        return Ok(Some(Arc::new(HeaderAuthClient::basic(username, password))));
    }
    let Some(key) = &args.api_key else {
        return Ok(None);
    };

    let auth = &info.auth;
    let config = match auth.auth_type {
        AuthType::ApiKeyQuery => AuthConfig::ApiKey {
            location: Location::Query,
            name: auth.query_param.clone().unwrap_or_else(|| "api_key".to_string()),
            prefix: auth.value_prefix.clone(),
            value: key.clone(),
        },
        _ => AuthConfig::ApiKey {
            location: Location::Header,
            name: auth
                .header_name
                .clone()
                .unwrap_or_else(|| "Authorization".to_string()),
            prefix: auth.value_prefix.clone(),
            value: key.clone(),
        },
    };
    Ok(Some(config.into_client()))
}
