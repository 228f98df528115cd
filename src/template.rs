//! Placeholder substitution for catalog URL templates
//!
//! Handles `{{ variable }}` placeholders in base URLs, token URLs and module
//! URLs. Substitution is a single, non-recursive pass: a substituted value
//! that itself looks like `{{ x }}` is left as written.

use crate::error::{Error, Result};
use crate::types::StringMap;
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable }}
static TEMPLATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_.\-]*)\s*\}\}").unwrap());

/// Variables available to a substitution
///
/// Names are case-sensitive. Metadata keys are stored lower-cased, so a
/// placeholder that misses an exact match is retried in lower case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: StringMap,
}

impl Variables {
    /// Create an empty variable set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `workspace` variable
    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.values.insert("workspace".to_string(), workspace.into());
        self
    }

    /// Add caller metadata; keys are normalised to lower case
    #[must_use]
    pub fn with_metadata(mut self, metadata: &StringMap) -> Self {
        for (key, value) in metadata {
            self.values.insert(key.to_lowercase(), value.clone());
        }
        self
    }

    /// Add a default that only applies when the variable is not already set
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.entry(name.into()).or_insert_with(|| value.into());
        self
    }

    /// Set a variable, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Look up a variable by placeholder name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .or_else(|| self.values.get(&name.to_lowercase()))
            .map(String::as_str)
    }

    /// Whether no variables are set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Substitute every placeholder in `template`.
///
/// Fails with a validation error naming every unresolved placeholder.
pub fn render(template: &str, vars: &Variables) -> Result<String> {
    let mut missing = BTreeSet::new();

    let rendered = TEMPLATE_REGEX.replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        match vars.get(name) {
            Some(value) => value.to_string(),
            None => {
                missing.insert(name.to_string());
                caps[0].to_string()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(
            missing.into_iter().collect::<Vec<_>>().join(", "),
        ))
    }
}

/// Render an optional template
pub fn render_opt(template: Option<&str>, vars: &Variables) -> Result<Option<String>> {
    template.map(|t| render(t, vars)).transpose()
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_workspace_substitution() {
        let vars = Variables::new().with_workspace("acme");
        let result = render("https://{{workspace}}.my.salesforce.com", &vars).unwrap();
        assert_eq!(result, "https://acme.my.salesforce.com");
    }

    #[test]
    fn test_whitespace_in_template() {
        let vars = Variables::new().with_workspace("acme");
        assert_eq!(render("{{workspace}}", &vars).unwrap(), "acme");
        assert_eq!(render("{{ workspace }}", &vars).unwrap(), "acme");
        assert_eq!(render("{{  workspace  }}", &vars).unwrap(), "acme");
    }

    #[test]
    fn test_metadata_keys_are_lowercased() {
        let mut metadata = StringMap::new();
        metadata.insert("CloudId".to_string(), "c-123".to_string());
        let vars = Variables::new().with_metadata(&metadata);

        assert_eq!(vars.get("cloudid"), Some("c-123"));
        assert_eq!(
            render("https://api.atlassian.com/ex/jira/{{cloudId}}", &vars).unwrap(),
            "https://api.atlassian.com/ex/jira/c-123"
        );
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut vars = Variables::new();
        vars.set("region", "us-east-1").set("REGION", "eu-west-1");
        assert_eq!(render("{{REGION}}/{{region}}", &vars).unwrap(), "eu-west-1/us-east-1");
    }

    #[test]
    fn test_every_unresolved_variable_is_reported() {
        let err = render("https://{{workspace}}.{{region}}.example.com", &Variables::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        let message = err.to_string();
        assert!(message.contains("workspace"));
        assert!(message.contains("region"));
    }

    #[test]
    fn test_substitution_is_not_recursive() {
        let mut vars = Variables::new();
        vars.set("a", "{{b}}").set("b", "nope");
        assert_eq!(render("x/{{a}}", &vars).unwrap(), "x/{{b}}");
    }

    #[test]
    fn test_defaults_do_not_override() {
        let vars = Variables::new()
            .with_workspace("mine")
            .with_default("workspace", "theirs")
            .with_default("region", "us-east-1");
        assert_eq!(vars.get("workspace"), Some("mine"));
        assert_eq!(vars.get("region"), Some("us-east-1"));
    }

    #[test]
    fn test_render_opt() {
        let vars = Variables::new().with_workspace("w");
        assert_eq!(render_opt(None, &vars).unwrap(), None);
        assert_eq!(
            render_opt(Some("{{workspace}}"), &vars).unwrap(),
            Some("w".to_string())
        );
    }

    #[test]
    fn test_has_templates() {
        assert!(has_templates("{{ workspace }}"));
        assert!(has_templates("prefix {{ var }} suffix"));
        assert!(!has_templates("no templates here"));
        assert!(!has_templates("{ not a template }"));
    }

    #[test]
    fn test_extract_variables() {
        let vars = extract_variables("https://{{workspace}}.example.com/{{ region }}");
        assert_eq!(vars, vec!["workspace", "region"]);
    }
}
