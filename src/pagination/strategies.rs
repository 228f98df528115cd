//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{
    query_value, NextPage, PageContext, PaginationConfig, Paginator, StopCondition,
    DEFAULT_PAGE_SIZE,
};

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Cursor-based pagination (e.g., Stripe, Slack)
///
/// Uses a cursor value from the response to fetch the next page.
/// Common patterns:
/// - `?starting_after=obj_123`
/// - `?cursor=abc123`
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    /// Query parameter name for cursor
    pub cursor_param: String,
    /// Path of the cursor in the response body
    pub cursor_path: String,
    /// Stop condition
    pub stop_condition: StopCondition,
    /// Query parameter carrying a requested page size, e.g. `limit`
    pub limit_param: Option<String>,
}

impl CursorPaginator {
    pub fn new(
        cursor_param: impl Into<String>,
        cursor_path: impl Into<String>,
        stop_condition: StopCondition,
    ) -> Self {
        Self {
            cursor_param: cursor_param.into(),
            cursor_path: cursor_path.into(),
            stop_condition,
            limit_param: None,
        }
    }

    #[must_use]
    pub fn with_limit_param(mut self, param: impl Into<String>) -> Self {
        self.limit_param = Some(param.into());
        self
    }
}

impl Paginator for CursorPaginator {
    fn initial_params(&self, page_size: Option<usize>) -> Vec<(String, String)> {
        match (&self.limit_param, page_size) {
            (Some(param), Some(size)) => vec![(param.clone(), size.to_string())],
            _ => Vec::new(),
        }
    }

    fn next_page(&self, page: &PageContext<'_>) -> NextPage {
        if self.stop_condition.should_stop(page.body, page.records_count) {
            return NextPage::Done;
        }
        match page.body_string(&self.cursor_path) {
            Some(cursor) => NextPage::with_param(&self.cursor_param, cursor),
            None => NextPage::Done,
        }
    }
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset-based pagination
///
/// The offset advances by the number of records actually returned. A page
/// shorter than the requested size is the last one. The requested size is
/// read back from the limit parameter of the current URL.
/// Common patterns:
/// - `?offset=100&limit=50`
/// - `?skip=100&take=50`
#[derive(Debug, Clone)]
pub struct OffsetPaginator {
    /// Query parameter name for offset
    pub offset_param: String,
    /// Query parameter name for limit
    pub limit_param: String,
    /// Page size when none is requested
    pub limit_value: usize,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl OffsetPaginator {
    pub fn new(offset_param: impl Into<String>, limit_param: impl Into<String>, limit_value: usize) -> Self {
        Self {
            offset_param: offset_param.into(),
            limit_param: limit_param.into(),
            limit_value,
            stop_condition: StopCondition::EmptyPage,
        }
    }

    #[must_use]
    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = condition;
        self
    }
}

impl Paginator for OffsetPaginator {
    fn initial_params(&self, page_size: Option<usize>) -> Vec<(String, String)> {
        vec![(
            self.limit_param.clone(),
            page_size.unwrap_or(self.limit_value).to_string(),
        )]
    }

    fn next_page(&self, page: &PageContext<'_>) -> NextPage {
        if self.stop_condition.should_stop(page.body, page.records_count) {
            return NextPage::Done;
        }

        let limit = query_value(page.url, &self.limit_param)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(self.limit_value);
        if page.records_count < limit {
            return NextPage::Done;
        }

        let offset = query_value(page.url, &self.offset_param)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let Some(next) = offset.checked_add(page.records_count) else {
            return NextPage::Done;
        };
        NextPage::with_params(vec![
            (self.offset_param.clone(), next.to_string()),
            (self.limit_param.clone(), limit.to_string()),
        ])
    }
}

// ============================================================================
// Page Number Pagination
// ============================================================================

/// Page number pagination
///
/// Common patterns:
/// - `?page=2`
/// - `?page=2&per_page=50`
#[derive(Debug, Clone)]
pub struct PageNumberPaginator {
    /// Query parameter name for page number
    pub page_param: String,
    /// First page number (usually 0 or 1)
    pub start_page: u64,
    /// Optional page size parameter name
    pub page_size_param: Option<String>,
    /// Page size value
    pub page_size: Option<usize>,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl PageNumberPaginator {
    pub fn new(page_param: impl Into<String>, start_page: u64) -> Self {
        Self {
            page_param: page_param.into(),
            start_page,
            page_size_param: None,
            page_size: None,
            stop_condition: StopCondition::EmptyPage,
        }
    }

    /// Set page size parameter
    #[must_use]
    pub fn with_page_size(mut self, param: impl Into<String>, size: usize) -> Self {
        self.page_size_param = Some(param.into());
        self.page_size = Some(size);
        self
    }

    /// Set stop condition
    #[must_use]
    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = condition;
        self
    }

    fn requested_size(&self, page: &PageContext<'_>) -> Option<usize> {
        self.page_size_param
            .as_ref()
            .and_then(|param| query_value(page.url, param))
            .and_then(|v| v.parse().ok())
            .or(self.page_size)
    }
}

impl Paginator for PageNumberPaginator {
    fn initial_params(&self, page_size: Option<usize>) -> Vec<(String, String)> {
        let mut params = vec![(self.page_param.clone(), self.start_page.to_string())];
        if let (Some(param), Some(size)) = (&self.page_size_param, page_size.or(self.page_size)) {
            params.push((param.clone(), size.to_string()));
        }
        params
    }

    fn next_page(&self, page: &PageContext<'_>) -> NextPage {
        if self.stop_condition.should_stop(page.body, page.records_count) {
            return NextPage::Done;
        }
        if let Some(size) = self.requested_size(page) {
            if page.records_count < size {
                return NextPage::Done;
            }
        }

        let current = query_value(page.url, &self.page_param)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(self.start_page);
        match current.checked_add(1) {
            Some(next) => NextPage::with_param(&self.page_param, next.to_string()),
            None => NextPage::Done,
        }
    }
}

// ============================================================================
// Link Header Pagination
// ============================================================================

/// Link header pagination (RFC 8288)
///
/// Extracts next page URL from the Link header.
/// Format: `Link: <https://api.github.com/...?page=2>; rel="next", ...`
#[derive(Debug, Clone)]
pub struct LinkHeaderPaginator {
    /// Rel value to follow (default: "next")
    pub rel: String,
}

impl Default for LinkHeaderPaginator {
    fn default() -> Self {
        Self {
            rel: "next".to_string(),
        }
    }
}

impl LinkHeaderPaginator {
    pub fn new(rel: impl Into<String>) -> Self {
        Self { rel: rel.into() }
    }
}

impl Paginator for LinkHeaderPaginator {
    fn initial_params(&self, _page_size: Option<usize>) -> Vec<(String, String)> {
        Vec::new()
    }

    fn next_page(&self, page: &PageContext<'_>) -> NextPage {
        page.headers
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(|header| parse_link_header(header, &self.rel))
            .map_or(NextPage::Done, NextPage::with_url)
    }
}

/// Parse a Link header and extract the URL for the given rel
pub fn parse_link_header(header: &str, target_rel: &str) -> Option<String> {
    // Link header format: <url>; rel="next", <url>; rel="prev"
    for part in header.split(',') {
        let part = part.trim();
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(stripped) = segment.strip_prefix("rel=") {
                rel = Some(stripped.trim_matches('"').trim_matches('\''));
            }
        }

        if let (Some(u), Some(r)) = (url, rel) {
            if r.split_whitespace().any(|r| r == target_rel) {
                return Some(u.to_string());
            }
        }
    }

    None
}

// ============================================================================
// Next URL Pagination
// ============================================================================

/// Next URL pagination (URL in response body)
///
/// Common patterns:
/// - `{ "next": "https://api.example.com/items?page=2" }`
/// - `{ "links": { "next": "..." } }`
#[derive(Debug, Clone)]
pub struct NextUrlPaginator {
    /// Path of the next URL in the response body
    pub path: String,
}

impl NextUrlPaginator {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Paginator for NextUrlPaginator {
    fn initial_params(&self, _page_size: Option<usize>) -> Vec<(String, String)> {
        Vec::new()
    }

    fn next_page(&self, page: &PageContext<'_>) -> NextPage {
        page.body_string(&self.path)
            .map_or(NextPage::Done, NextPage::with_url)
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn initial_params(&self, _page_size: Option<usize>) -> Vec<(String, String)> {
        Vec::new()
    }

    fn next_page(&self, _page: &PageContext<'_>) -> NextPage {
        NextPage::Done
    }
}

/// Build the paginator described by a config
pub fn create_paginator(config: &PaginationConfig) -> Box<dyn Paginator> {
    match config {
        PaginationConfig::None => Box::new(NoPaginator),
        PaginationConfig::Cursor {
            cursor_param,
            cursor_path,
            stop_condition,
            limit_param,
        } => {
            let mut paginator = CursorPaginator::new(
                cursor_param.clone(),
                cursor_path.clone(),
                stop_condition.clone(),
            );
            paginator.limit_param.clone_from(limit_param);
            Box::new(paginator)
        }
        PaginationConfig::Offset {
            offset_param,
            limit_param,
            limit_value,
            stop_condition,
        } => Box::new(
            OffsetPaginator::new(
                offset_param.clone(),
                limit_param.clone(),
                if *limit_value == 0 { DEFAULT_PAGE_SIZE } else { *limit_value },
            )
            .with_stop_condition(stop_condition.clone()),
        ),
        PaginationConfig::PageNumber {
            page_param,
            start_page,
            page_size_param,
            page_size,
            stop_condition,
        } => {
            let mut paginator = PageNumberPaginator::new(page_param.clone(), *start_page)
                .with_stop_condition(stop_condition.clone());
            if let (Some(param), Some(size)) = (page_size_param, page_size) {
                paginator = paginator.with_page_size(param.clone(), *size);
            } else {
                paginator.page_size_param.clone_from(page_size_param);
            }
            Box::new(paginator)
        }
        PaginationConfig::LinkHeader { rel } => Box::new(LinkHeaderPaginator::new(rel.clone())),
        PaginationConfig::NextUrl { path } => Box::new(NextUrlPaginator::new(path.clone())),
    }
}
