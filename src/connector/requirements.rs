//! Caller parameter requirements
//!
//! A connector declares which inputs it needs; [`validate`] checks every
//! declared requirement against the caller's [`ConnectorParams`] and reports
//! all defects in one joined error. No I/O happens here.

use super::params::ConnectorParams;
use crate::catalog::ProviderInfo;
use crate::error::{Error, Result};

/// An input a connector needs from its caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// An authenticated client must be supplied
    AuthenticatedClient,
    /// A non-empty workspace must be supplied
    Workspace,
    /// Each key must be present in the metadata map
    Metadata { keys: Vec<String> },
    /// The selected module must be one of these
    Module { allowed: Vec<String> },
}

impl Requirement {
    pub fn metadata<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Metadata {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn module<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Module {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Requirements implied by a catalog descriptor
    pub fn for_provider(info: &ProviderInfo) -> Vec<Requirement> {
        let mut requirements = Vec::new();
        if info.auth.auth_type.requires_client() {
            requirements.push(Self::AuthenticatedClient);
        }
        if info.explicit_workspace_required {
            requirements.push(Self::Workspace);
        }
        let keys = info.required_metadata();
        if !keys.is_empty() {
            requirements.push(Self::Metadata { keys });
        }
        requirements.push(Self::module(info.module_ids()));
        requirements
    }

    /// Defects of `params` with respect to this requirement
    pub fn check(&self, params: &ConnectorParams) -> Vec<Error> {
        match self {
            Self::AuthenticatedClient if params.authenticated_client.is_none() => {
                vec![Error::missing_parameter("authenticatedClient")]
            }
            Self::Workspace if params.workspace.is_empty() => {
                vec![Error::missing_parameter("workspace")]
            }
            Self::Metadata { keys } => keys
                .iter()
                .filter(|key| params.metadata_value(key).is_none())
                .map(|key| Error::missing_parameter(format!("metadata.{key}")))
                .collect(),
            Self::Module { allowed } => {
                let module = params.module_id();
                if allowed.iter().any(|m| m == module) {
                    Vec::new()
                } else {
                    vec![Error::validation(format!(
                        "module '{module}' is not supported (expected one of: {})",
                        allowed.join(", ")
                    ))]
                }
            }
            _ => Vec::new(),
        }
    }
}

/// Every defect of `params` across `requirements`, in declaration order
pub fn defects(params: &ConnectorParams, requirements: &[Requirement]) -> Vec<Error> {
    requirements
        .iter()
        .flat_map(|requirement| requirement.check(params))
        .collect()
}

/// Check every requirement, joining all defects into one error
pub fn validate(params: &ConnectorParams, requirements: &[Requirement]) -> Result<()> {
    Error::join(defects(params, requirements))
}
