//! Pagination module
//!
//! Supports: Cursor, Offset, Page Number, Link Header, Next URL
//!
//! # Overview
//!
//! Each strategy inspects the page just fetched and decides how to fetch
//! the next one. The decision becomes an opaque continuation token (the
//! full URL of the next page) via [`NextPage::into_token`]; an empty token
//! means the read is done.

mod strategies;
mod types;

pub use strategies::{
    create_paginator, parse_link_header, CursorPaginator, LinkHeaderPaginator, NextUrlPaginator,
    NoPaginator, OffsetPaginator, PageNumberPaginator,
};
pub use types::{
    query_value, set_query_params, NextPage, PageContext, PaginationConfig, Paginator,
    StopCondition, DEFAULT_PAGE_SIZE,
};

#[cfg(test)]
mod tests;
