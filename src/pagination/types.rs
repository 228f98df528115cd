//! Pagination types and traits
//!
//! Pagination is stateless between calls: everything a paginator needs to
//! compute the following page (offset, page number, cursor) travels in the
//! URL of the request that produced the current page. The continuation
//! handed back to callers is that next URL, which they pass back opaquely.

use crate::parse::{string_at, value_at};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Default number of records per page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// More pages available
    Continue {
        /// Query parameters to set on the current URL
        query_params: Vec<(String, String)>,
        /// Replacement URL (absolute or relative to the current URL)
        url: Option<String>,
    },
    /// No more pages
    Done,
}

impl NextPage {
    /// Continue with query parameters
    pub fn with_params(params: Vec<(String, String)>) -> Self {
        Self::Continue {
            query_params: params,
            url: None,
        }
    }

    /// Continue with a single parameter
    pub fn with_param(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_params(vec![(key.into(), value.into())])
    }

    /// Continue with a new URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::Continue {
            query_params: Vec::new(),
            url: Some(url.into()),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue { .. })
    }

    /// Opaque continuation for a page fetched from `current`; empty when done
    pub fn into_token(self, current: &Url) -> String {
        match self {
            Self::Done => String::new(),
            Self::Continue { url: Some(url), .. } => current
                .join(&url)
                .map_or(url, |resolved| resolved.to_string()),
            Self::Continue {
                query_params,
                url: None,
            } => {
                let mut next = current.clone();
                set_query_params(&mut next, &query_params);
                next.to_string()
            }
        }
    }
}

/// Replace (or add) query parameters on a URL, keeping the others in order
pub fn set_query_params(url: &mut Url, params: &[(String, String)]) {
    if params.is_empty() {
        return;
    }
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .filter(|(k, _)| !params.iter().any(|(name, _)| name == k))
        .collect();
    pairs.extend(params.iter().cloned());
    url.query_pairs_mut().clear().extend_pairs(pairs);
}

/// Value of a query parameter on a URL
pub fn query_value(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Declarative pagination settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationConfig {
    /// Single page
    #[default]
    None,

    /// Cursor token in the body, sent back as a query parameter
    Cursor {
        /// Query parameter carrying the cursor (e.g. `starting_after`)
        cursor_param: String,
        /// Path of the cursor in the response body
        cursor_path: String,
        #[serde(default)]
        stop_condition: StopCondition,
        /// Query parameter carrying a requested page size
        #[serde(default)]
        limit_param: Option<String>,
    },

    /// Offset/limit pagination
    Offset {
        offset_param: String,
        limit_param: String,
        /// Page size when the caller does not request one
        #[serde(default = "default_page_size")]
        limit_value: usize,
        #[serde(default)]
        stop_condition: StopCondition,
    },

    /// Page number pagination
    PageNumber {
        page_param: String,
        #[serde(default = "default_start_page")]
        start_page: u64,
        #[serde(default)]
        page_size_param: Option<String>,
        #[serde(default)]
        page_size: Option<usize>,
        #[serde(default)]
        stop_condition: StopCondition,
    },

    /// `Link` header (RFC 8288)
    LinkHeader {
        #[serde(default = "default_rel")]
        rel: String,
    },

    /// Next page URL in the response body
    NextUrl { path: String },
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_start_page() -> u64 {
    1
}

fn default_rel() -> String {
    "next".to_string()
}

impl PaginationConfig {
    pub fn cursor(
        cursor_param: impl Into<String>,
        cursor_path: impl Into<String>,
        stop_condition: StopCondition,
    ) -> Self {
        Self::Cursor {
            cursor_param: cursor_param.into(),
            cursor_path: cursor_path.into(),
            stop_condition,
            limit_param: None,
        }
    }

    pub fn offset(
        offset_param: impl Into<String>,
        limit_param: impl Into<String>,
        limit_value: usize,
    ) -> Self {
        Self::Offset {
            offset_param: offset_param.into(),
            limit_param: limit_param.into(),
            limit_value,
            stop_condition: StopCondition::EmptyPage,
        }
    }

    pub fn page_number(page_param: impl Into<String>, start_page: u64) -> Self {
        Self::PageNumber {
            page_param: page_param.into(),
            start_page,
            page_size_param: None,
            page_size: None,
            stop_condition: StopCondition::EmptyPage,
        }
    }

    pub fn link_header() -> Self {
        Self::LinkHeader { rel: default_rel() }
    }

    pub fn next_url(path: impl Into<String>) -> Self {
        Self::NextUrl { path: path.into() }
    }
}

/// Stop conditions for pagination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopCondition {
    /// Stop when a page has no records
    #[default]
    EmptyPage,

    /// Stop when a body field has a specific value
    Field { path: String, value: Value },

    /// Stop when a body flag is false, e.g. `has_more`
    HasMore { path: String },
}

impl StopCondition {
    pub fn field(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Field {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn has_more(path: impl Into<String>) -> Self {
        Self::HasMore { path: path.into() }
    }

    /// Whether pagination should stop after this page
    pub fn should_stop(&self, body: &Value, records_count: usize) -> bool {
        match self {
            Self::EmptyPage => records_count == 0,
            Self::Field { path, value } => value_at(body, path) == Some(value),
            Self::HasMore { path } => value_at(body, path) != Some(&Value::Bool(true)),
        }
    }
}

/// The page just fetched
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// URL that produced this page
    pub url: &'a Url,
    pub headers: &'a HeaderMap,
    pub body: &'a Value,
    /// Number of records extracted from the body
    pub records_count: usize,
}

impl PageContext<'_> {
    /// Scalar at a body path as a string
    pub fn body_string(&self, path: &str) -> Option<String> {
        string_at(self.body, path).filter(|s| !s.is_empty())
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Query parameters for the first request
    fn initial_params(&self, page_size: Option<usize>) -> Vec<(String, String)>;

    /// Decide how to fetch the page after `page`
    fn next_page(&self, page: &PageContext<'_>) -> NextPage;
}
