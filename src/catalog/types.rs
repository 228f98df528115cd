//! Catalog types
//!
//! Declarative provider descriptors as they appear in the catalog YAML.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Module id meaning "no sub-API"
pub const ROOT_MODULE: &str = "root";

// ============================================================================
// Provider
// ============================================================================

/// One provider in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderInfo {
    /// Unique provider name (the catalog key)
    #[serde(default)]
    pub name: String,
    /// Human readable name
    #[serde(default)]
    pub display_name: String,
    /// Base URL template, e.g. `https://{{workspace}}.example.com`
    pub base_url: String,
    /// Authentication descriptor
    pub auth: AuthDescriptor,
    /// Sub-APIs keyed by module id
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleInfo>,
    /// Whether callers must supply a workspace
    #[serde(default)]
    pub explicit_workspace_required: bool,
    /// Substitution variables the caller supplies through metadata
    #[serde(default)]
    pub metadata_inputs: Vec<MetadataInput>,
}

impl ProviderInfo {
    /// Ad-hoc descriptor for an API outside the catalog
    pub fn custom(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: AuthDescriptor::default(),
            modules: BTreeMap::new(),
            explicit_workspace_required: false,
            metadata_inputs: Vec::new(),
        }
    }

    /// Look up a module. `root` is always available and has an empty path.
    pub fn module(&self, id: &str) -> Option<ModuleInfo> {
        match self.modules.get(id) {
            Some(module) => Some(module.clone()),
            None if id == ROOT_MODULE || id.is_empty() => Some(ModuleInfo::default()),
            None => None,
        }
    }

    /// Module ids callers may select, `root` included
    pub fn module_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.modules.keys().cloned().collect();
        if !self.modules.contains_key(ROOT_MODULE) {
            ids.insert(0, ROOT_MODULE.to_string());
        }
        ids
    }

    /// Base URL for a module: its own URL when declared, otherwise the
    /// provider base URL joined with `label/version`
    pub fn module_base_url(&self, id: &str) -> Option<String> {
        self.module(id).map(|module| module_url(&self.base_url, &module))
    }

    /// Metadata keys the caller must supply (inputs without a default)
    pub fn required_metadata(&self) -> Vec<String> {
        self.metadata_inputs
            .iter()
            .filter(|input| input.default.is_none())
            .map(|input| input.name.clone())
            .collect()
    }
}

// ============================================================================
// Module
// ============================================================================

/// A sub-API of a provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModuleInfo {
    /// Path label, e.g. `crm`
    #[serde(default)]
    pub label: String,
    /// API version, e.g. `v3`
    #[serde(default)]
    pub version: String,
    /// Module-specific base URL template
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ModuleInfo {
    /// URL path fragment `label/version`, skipping empty parts
    pub fn path(&self) -> String {
        [self.label.as_str(), self.version.as_str()]
            .iter()
            .map(|part| part.trim_matches('/'))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Base URL of `module` under a provider base URL
pub fn module_url(provider_base: &str, module: &ModuleInfo) -> String {
    if let Some(url) = &module.base_url {
        return url.trim_end_matches('/').to_string();
    }
    let base = provider_base.trim_end_matches('/');
    let fragment = module.path();
    if fragment.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{fragment}")
    }
}

// ============================================================================
// Auth descriptor
// ============================================================================

/// Authentication scheme a provider uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthType {
    Oauth2AuthCode,
    Oauth2ClientCreds,
    ApiKeyHeader,
    ApiKeyQuery,
    Basic,
    Jwt,
    Aws,
    Custom,
    #[default]
    None,
}

impl AuthType {
    /// Whether requests need an authenticated client
    pub fn requires_client(self) -> bool {
        self != Self::None
    }
}

/// Authentication details for a provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthDescriptor {
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    /// OAuth2 token endpoint (template)
    #[serde(default)]
    pub token_url: Option<String>,
    /// OAuth2 authorization endpoint (template)
    #[serde(default)]
    pub authorize_url: Option<String>,
    /// Default OAuth2 scopes
    #[serde(default)]
    pub scopes: Vec<String>,
    /// OAuth2 audience parameter
    #[serde(default)]
    pub audience: Option<String>,
    /// Header carrying the API key
    #[serde(default)]
    pub header_name: Option<String>,
    /// Prefix prepended to the API key value, e.g. `Bearer `
    #[serde(default)]
    pub value_prefix: Option<String>,
    /// Query parameter carrying the API key
    #[serde(default)]
    pub query_param: Option<String>,
    /// Credential inputs a custom scheme needs
    #[serde(default)]
    pub custom_inputs: Vec<CustomInput>,
}

/// A named credential input for custom auth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CustomInput {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

/// A metadata value used as a substitution variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetadataInput {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    /// Value used when the caller does not supply one
    #[serde(default)]
    pub default: Option<String>,
}
