//! Provider catalog registry
//!
//! The built-in catalog is embedded in the binary and parsed once on first
//! use. Callers can load their own catalog with the same schema from a YAML
//! string or file.

use super::types::{module_url, ModuleInfo, ProviderInfo, ROOT_MODULE};
use crate::error::{Error, Result};
use crate::template::{extract_variables, render, render_opt, Variables};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

static BUILTIN_YAML: &str = include_str!("../../catalog/providers.yaml");

/// Built-in provider catalog, parsed on first use
static BUILTIN: LazyLock<std::result::Result<Catalog, String>> =
    LazyLock::new(|| Catalog::from_yaml(BUILTIN_YAML).map_err(|e| e.to_string()));

#[derive(Debug, Deserialize)]
struct CatalogFile {
    providers: BTreeMap<String, ProviderInfo>,
}

/// An immutable set of provider descriptors
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    providers: BTreeMap<String, ProviderInfo>,
}

/// A provider descriptor with every URL template substituted, bound to one
/// module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedProvider {
    /// Provider descriptor with provider-level URLs resolved
    pub info: ProviderInfo,
    /// Selected module id
    pub module_id: String,
    /// Selected module
    pub module: ModuleInfo,
    /// Resolved base URL for the selected module
    pub base_url: String,
}

impl ResolvedProvider {
    /// Root-module resolution of an ad-hoc provider
    pub fn custom(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let info = ProviderInfo::custom(name, base_url);
        Self {
            base_url: info.base_url.clone(),
            info,
            module_id: ROOT_MODULE.to_string(),
            module: ModuleInfo::default(),
        }
    }

    /// Provider name
    pub fn provider(&self) -> &str {
        &self.info.name
    }
}

impl Catalog {
    /// The catalog embedded in this crate
    pub fn builtin() -> Result<&'static Catalog> {
        BUILTIN
            .as_ref()
            .map_err(|e| Error::Other(format!("built-in catalog is invalid: {e}")))
    }

    /// Parse a catalog document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        let providers = file
            .providers
            .into_iter()
            .map(|(name, mut info)| {
                info.name.clone_from(&name);
                if info.display_name.is_empty() {
                    info.display_name.clone_from(&name);
                }
                (name, info)
            })
            .collect::<BTreeMap<_, _>>();

        for info in providers.values() {
            if info.base_url.is_empty() {
                return Err(Error::validation(format!(
                    "provider '{}' has an empty base_url",
                    info.name
                )));
            }
        }

        Ok(Self { providers })
    }

    /// Load a catalog document from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Provider names, sorted
    pub fn providers(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Unresolved descriptor for a provider
    pub fn get(&self, provider: &str) -> Result<&ProviderInfo> {
        self.providers
            .get(provider)
            .ok_or_else(|| Error::UnknownProvider {
                provider: provider.to_string(),
            })
    }

    /// Provider descriptor with every URL field substituted, module URLs
    /// included. Every unresolved placeholder is reported in one error.
    pub fn read_info(&self, provider: &str, vars: &Variables) -> Result<ProviderInfo> {
        let info = self.get(provider)?;
        let vars = with_defaults(info, vars);

        let mut templates = provider_templates(info);
        for module in info.modules.values() {
            templates.extend(module.base_url.as_deref());
        }
        check_resolvable(&templates, &vars)?;

        let mut resolved = resolve_provider_fields(info, &vars)?;
        for module in resolved.modules.values_mut() {
            module.base_url = render_opt(module.base_url.as_deref(), &vars)?;
        }
        Ok(resolved)
    }

    /// Resolve a provider for one module. Only the selected module's URL is
    /// substituted, so other modules' variables need not be supplied.
    pub fn resolve(&self, provider: &str, module: &str, vars: &Variables) -> Result<ResolvedProvider> {
        let info = self.get(provider)?;
        let module_id = if module.is_empty() {
            ROOT_MODULE
        } else {
            module
        };
        let mut selected = info.module(module_id).ok_or_else(|| Error::UnknownModule {
            provider: provider.to_string(),
            module: module_id.to_string(),
        })?;

        let vars = with_defaults(info, vars);
        let mut templates = provider_templates(info);
        templates.extend(selected.base_url.as_deref());
        check_resolvable(&templates, &vars)?;

        let resolved = resolve_provider_fields(info, &vars)?;
        selected.base_url = render_opt(selected.base_url.as_deref(), &vars)?;
        let base_url = module_url(&resolved.base_url, &selected);

        Ok(ResolvedProvider {
            info: resolved,
            module_id: module_id.to_string(),
            module: selected,
            base_url,
        })
    }
}

fn with_defaults(info: &ProviderInfo, vars: &Variables) -> Variables {
    info.metadata_inputs
        .iter()
        .filter_map(|input| input.default.as_ref().map(|d| (&input.name, d)))
        .fold(vars.clone(), |vars, (name, default)| {
            vars.with_default(name.to_lowercase(), default.clone())
        })
}

fn provider_templates(info: &ProviderInfo) -> Vec<&str> {
    let mut templates = vec![info.base_url.as_str()];
    templates.extend(info.auth.token_url.as_deref());
    templates.extend(info.auth.authorize_url.as_deref());
    templates
}

fn check_resolvable(templates: &[&str], vars: &Variables) -> Result<()> {
    let missing: BTreeSet<String> = templates
        .iter()
        .flat_map(|t| extract_variables(t))
        .filter(|name| vars.get(name).is_none())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::undefined_var(
            missing.into_iter().collect::<Vec<_>>().join(", "),
        ))
    }
}

fn resolve_provider_fields(info: &ProviderInfo, vars: &Variables) -> Result<ProviderInfo> {
    let mut resolved = info.clone();
    resolved.base_url = render(&info.base_url, vars)?;
    resolved.auth.token_url = render_opt(info.auth.token_url.as_deref(), vars)?;
    resolved.auth.authorize_url = render_opt(info.auth.authorize_url.as_deref(), vars)?;
    Ok(resolved)
}
