//! Tests for pagination module

use super::*;
use pretty_assertions::assert_eq;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};
use url::Url;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn page<'a>(url: &'a Url, headers: &'a HeaderMap, body: &'a Value, count: usize) -> PageContext<'a> {
    PageContext {
        url,
        headers,
        body,
        records_count: count,
    }
}

// ============================================================================
// NextPage Tests
// ============================================================================

#[test]
fn test_next_page_with_param_token() {
    let current = url("https://api.example.com/orders?limit=10&cursor=old");
    let token = NextPage::with_param("cursor", "new").into_token(&current);
    assert_eq!(token, "https://api.example.com/orders?limit=10&cursor=new");
}

#[test]
fn test_next_page_with_url_token() {
    let current = url("https://api.example.com/orders");
    assert_eq!(
        NextPage::with_url("https://api.example.com/orders?page=2").into_token(&current),
        "https://api.example.com/orders?page=2"
    );
    assert_eq!(
        NextPage::with_url("/orders?page=3").into_token(&current),
        "https://api.example.com/orders?page=3"
    );
}

#[test]
fn test_next_page_done_token_is_empty() {
    let current = url("https://api.example.com/orders");
    assert!(NextPage::Done.is_done());
    assert_eq!(NextPage::Done.into_token(&current), "");
}

#[test]
fn test_set_query_params_preserves_others() {
    let mut u = url("https://x.test/a?keep=1&offset=0");
    set_query_params(&mut u, &[("offset".to_string(), "50".to_string())]);
    assert_eq!(u.as_str(), "https://x.test/a?keep=1&offset=50");
    assert_eq!(query_value(&u, "keep").as_deref(), Some("1"));
}

// ============================================================================
// Cursor Pagination Tests
// ============================================================================

#[test]
fn test_cursor_paginator() {
    let paginator = CursorPaginator::new("cursor", "meta.next_cursor", StopCondition::EmptyPage);
    let u = url("https://x.test/items");
    let headers = HeaderMap::new();

    let body = json!({"data": [1, 2], "meta": {"next_cursor": "abc"}});
    let next = paginator.next_page(&page(&u, &headers, &body, 2));
    assert_eq!(next, NextPage::with_param("cursor", "abc"));

    let body = json!({"data": [1], "meta": {"next_cursor": null}});
    assert!(paginator.next_page(&page(&u, &headers, &body, 1)).is_done());

    let body = json!({"data": [], "meta": {"next_cursor": "zzz"}});
    assert!(paginator.next_page(&page(&u, &headers, &body, 0)).is_done());
}

#[test]
fn test_cursor_has_more_stop_condition() {
    let paginator = CursorPaginator::new("starting_after", "data[-1].id", StopCondition::has_more("has_more"));
    let u = url("https://x.test/charges");
    let headers = HeaderMap::new();

    let body = json!({"data": [{"id": "ch_1"}, {"id": "ch_2"}], "has_more": true});
    assert_eq!(
        paginator.next_page(&page(&u, &headers, &body, 2)),
        NextPage::with_param("starting_after", "ch_2")
    );

    let body = json!({"data": [{"id": "ch_3"}], "has_more": false});
    assert!(paginator.next_page(&page(&u, &headers, &body, 1)).is_done());
}

#[test]
fn test_cursor_requests_page_size_when_configured() {
    let plain = CursorPaginator::new("cursor", "next", StopCondition::EmptyPage);
    assert!(plain.initial_params(Some(25)).is_empty());

    let sized = plain.with_limit_param("limit");
    assert_eq!(
        sized.initial_params(Some(25)),
        vec![("limit".to_string(), "25".to_string())]
    );
    assert!(sized.initial_params(None).is_empty());
}

#[test]
fn test_cursor_limit_param_from_yaml() {
    let config: PaginationConfig = serde_yaml::from_str(
        "type: cursor\ncursor_param: cursor\ncursor_path: meta.next\nlimit_param: page_size\n",
    )
    .unwrap();
    let paginator = create_paginator(&config);
    assert_eq!(
        paginator.initial_params(Some(10)),
        vec![("page_size".to_string(), "10".to_string())]
    );
}

// ============================================================================
// Offset Pagination Tests
// ============================================================================

#[test]
fn test_offset_initial_params() {
    let paginator = OffsetPaginator::new("offset", "limit", DEFAULT_PAGE_SIZE);
    assert_eq!(
        paginator.initial_params(None),
        vec![("limit".to_string(), "100".to_string())]
    );
    assert_eq!(
        paginator.initial_params(Some(25)),
        vec![("limit".to_string(), "25".to_string())]
    );
}

#[test]
fn test_offset_full_page_advances_by_count() {
    let paginator = OffsetPaginator::new("offset", "limit", 100);
    let u = url("https://x.test/items?limit=2&offset=4");
    let headers = HeaderMap::new();
    let body = json!([{}, {}]);

    let token = paginator
        .next_page(&page(&u, &headers, &body, 2))
        .into_token(&u);
    assert_eq!(token, "https://x.test/items?offset=6&limit=2");
}

#[test]
fn test_offset_short_page_is_done() {
    let paginator = OffsetPaginator::new("offset", "limit", 100);
    let u = url("https://x.test/items");
    let headers = HeaderMap::new();
    let body = json!({});

    assert!(paginator.next_page(&page(&u, &headers, &body, 37)).is_done());
    assert!(paginator.next_page(&page(&u, &headers, &body, 100)).is_continue());
}

#[test]
fn test_offset_uses_requested_limit() {
    let paginator = OffsetPaginator::new("skip", "take", 100);
    let u = url("https://x.test/items?take=10");
    let headers = HeaderMap::new();
    let body = json!({});

    assert_eq!(
        paginator.next_page(&page(&u, &headers, &body, 10)),
        NextPage::with_params(vec![
            ("skip".to_string(), "10".to_string()),
            ("take".to_string(), "10".to_string())
        ])
    );
}

#[test]
fn test_offset_overflowing_token_ends_pagination() {
    let paginator = OffsetPaginator::new("offset", "limit", 1);
    let u = url(&format!("https://x.test/items?offset={}&limit=1", usize::MAX));
    let headers = HeaderMap::new();
    let body = json!([{"id": 1}]);

    assert!(paginator.next_page(&page(&u, &headers, &body, 1)).is_done());
}

// ============================================================================
// Page Number Tests
// ============================================================================

#[test]
fn test_page_number_initial_params() {
    let paginator = PageNumberPaginator::new("page", 1).with_page_size("per_page", 50);
    assert_eq!(
        paginator.initial_params(None),
        vec![
            ("page".to_string(), "1".to_string()),
            ("per_page".to_string(), "50".to_string())
        ]
    );
}

#[test]
fn test_page_number_increments() {
    let paginator = PageNumberPaginator::new("page", 1);
    let u = url("https://x.test/items?page=3");
    let headers = HeaderMap::new();
    let body = json!([1]);

    assert_eq!(
        paginator.next_page(&page(&u, &headers, &body, 1)),
        NextPage::with_param("page", "4")
    );
    assert!(paginator.next_page(&page(&u, &headers, &body, 0)).is_done());
}

#[test]
fn test_page_number_short_page_done() {
    let paginator = PageNumberPaginator::new("page", 0).with_page_size("size", 10);
    let u = url("https://x.test/items?page=0&size=10");
    let headers = HeaderMap::new();
    let body = json!({});

    assert!(paginator.next_page(&page(&u, &headers, &body, 9)).is_done());
    assert_eq!(
        paginator.next_page(&page(&u, &headers, &body, 10)),
        NextPage::with_param("page", "1")
    );
}

#[test]
fn test_page_number_overflowing_token_ends_pagination() {
    let paginator = PageNumberPaginator::new("page", 1);
    let u = url(&format!("https://x.test/items?page={}", u64::MAX));
    let headers = HeaderMap::new();
    let body = json!([1]);

    assert!(paginator.next_page(&page(&u, &headers, &body, 1)).is_done());
}

// ============================================================================
// Link Header Tests
// ============================================================================

#[test]
fn test_parse_link_header() {
    let header = r#"<https://api.github.com/repos?page=2>; rel="next", <https://api.github.com/repos?page=5>; rel="last""#;
    assert_eq!(
        parse_link_header(header, "next"),
        Some("https://api.github.com/repos?page=2".to_string())
    );
    assert_eq!(
        parse_link_header(header, "last"),
        Some("https://api.github.com/repos?page=5".to_string())
    );
    assert_eq!(parse_link_header(header, "prev"), None);
}

#[test]
fn test_link_header_paginator() {
    let paginator = LinkHeaderPaginator::default();
    let u = url("https://x.test/repos");
    let body = json!([]);

    let mut headers = HeaderMap::new();
    headers.insert(
        "link",
        HeaderValue::from_static(r#"<https://x.test/repos?page=2>; rel="next""#),
    );
    assert_eq!(
        paginator.next_page(&page(&u, &headers, &body, 0)),
        NextPage::with_url("https://x.test/repos?page=2")
    );

    assert!(paginator.next_page(&page(&u, &HeaderMap::new(), &body, 0)).is_done());
}

// ============================================================================
// Next URL / None Tests
// ============================================================================

#[test]
fn test_next_url_paginator() {
    let paginator = NextUrlPaginator::new("links.next");
    let u = url("https://x.test/orders");
    let headers = HeaderMap::new();

    let body = json!({"links": {"next": "https://x.test/orders?cursor=XYZ"}});
    assert_eq!(
        paginator
            .next_page(&page(&u, &headers, &body, 2))
            .into_token(&u),
        "https://x.test/orders?cursor=XYZ"
    );

    let body = json!({"links": {"next": ""}});
    assert!(paginator.next_page(&page(&u, &headers, &body, 2)).is_done());
}

#[test]
fn test_no_paginator() {
    let u = url("https://x.test/orders");
    let headers = HeaderMap::new();
    let body = json!([1, 2, 3]);
    assert!(NoPaginator.next_page(&page(&u, &headers, &body, 3)).is_done());
    assert!(NoPaginator.initial_params(Some(5)).is_empty());
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_from_yaml() {
    let config: PaginationConfig = serde_yaml::from_str(
        "type: offset\noffset_param: offset\nlimit_param: limit\n",
    )
    .unwrap();
    assert_eq!(config, PaginationConfig::offset("offset", "limit", DEFAULT_PAGE_SIZE));

    let paginator = create_paginator(&config);
    assert_eq!(
        paginator.initial_params(None),
        vec![("limit".to_string(), "100".to_string())]
    );
}

#[test]
fn test_create_paginator_variants() {
    let u = url("https://x.test/a");
    let headers = HeaderMap::new();
    let body = json!({"next": "https://x.test/a?p=2"});

    let next_url = create_paginator(&PaginationConfig::next_url("next"));
    assert!(next_url.next_page(&page(&u, &headers, &body, 1)).is_continue());

    let none = create_paginator(&PaginationConfig::None);
    assert!(none.next_page(&page(&u, &headers, &body, 1)).is_done());

    let pages = create_paginator(&PaginationConfig::page_number("page", 1));
    assert_eq!(
        pages.initial_params(None),
        vec![("page".to_string(), "1".to_string())]
    );
}
