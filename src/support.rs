//! Endpoint support registry
//!
//! Per module, a list of glob patterns over object names, each granting a
//! set of capabilities. Lookups union the capabilities of every matching
//! pattern; no match means the object is unsupported.
//!
//! Glob syntax: `*` matches any run of characters, `?` a single character,
//! and `{a,b}` either alternative. Patterns compile on first use.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// An operation an object may support
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Read,
    Write,
    Delete,
    Subscribe,
    BulkInsert,
    BulkUpdate,
    BulkUpsert,
    BulkDelete,
    Proxy,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Subscribe => "subscribe",
            Self::BulkInsert => "bulk-insert",
            Self::BulkUpdate => "bulk-update",
            Self::BulkUpsert => "bulk-upsert",
            Self::BulkDelete => "bulk-delete",
            Self::Proxy => "proxy",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// The empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Read only
    pub fn read() -> Self {
        Self::from_iter([Capability::Read])
    }

    /// Read, write and delete
    pub fn crud() -> Self {
        Self::from_iter([Capability::Read, Capability::Write, Capability::Delete])
    }

    /// Add a capability
    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add every capability of `other`
    pub fn union_with(&mut self, other: &CapabilitySet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One registry row
#[derive(Debug)]
pub struct SupportEntry {
    pattern: String,
    capabilities: CapabilitySet,
    compiled: OnceCell<Option<Regex>>,
}

impl Clone for SupportEntry {
    fn clone(&self) -> Self {
        Self::new(self.pattern.clone(), self.capabilities.clone())
    }
}

impl SupportEntry {
    pub fn new(pattern: impl Into<String>, capabilities: CapabilitySet) -> Self {
        Self {
            pattern: pattern.into(),
            capabilities,
            compiled: OnceCell::new(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Whether the pattern matches an object name. A pattern that fails to
    /// compile matches nothing.
    pub fn matches(&self, object: &str) -> bool {
        self.compiled
            .get_or_init(|| Regex::new(&glob_to_regex(&self.pattern)).ok())
            .as_ref()
            .is_some_and(|re| re.is_match(object))
    }
}

/// Translate a glob into an anchored regular expression
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut in_group = false;
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '{' if !in_group => {
                in_group = true;
                out.push_str("(?:");
            }
            '}' if in_group => {
                in_group = false;
                out.push(')');
            }
            ',' if in_group => out.push('|'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    if in_group {
        out.push(')');
    }
    out.push('$');
    out
}

/// Support rows for every module of a connector
#[derive(Debug, Clone, Default)]
pub struct EndpointSupport {
    modules: HashMap<String, Vec<SupportEntry>>,
}

impl EndpointSupport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row to a module
    #[must_use]
    pub fn with(mut self, module: &str, pattern: &str, capabilities: CapabilitySet) -> Self {
        self.add(module, pattern, capabilities);
        self
    }

    /// Add a row to a module
    pub fn add(&mut self, module: &str, pattern: &str, capabilities: CapabilitySet) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .push(SupportEntry::new(pattern, capabilities));
    }

    /// Union of the capabilities of every row matching `object`.
    /// Unknown modules and unmatched objects yield the empty set.
    pub fn support(&self, module: &str, object: &str) -> CapabilitySet {
        let mut result = CapabilitySet::new();
        if let Some(entries) = self.modules.get(module) {
            for entry in entries.iter().filter(|e| e.matches(object)) {
                result.union_with(entry.capabilities());
            }
        }
        result
    }

    /// Whether `object` in `module` supports `capability`
    pub fn supports(&self, module: &str, object: &str, capability: Capability) -> bool {
        self.support(module, object).contains(capability)
    }

    /// Rows registered for a module
    pub fn entries(&self, module: &str) -> &[SupportEntry] {
        self.modules.get(module).map_or(&[], Vec::as_slice)
    }
}
