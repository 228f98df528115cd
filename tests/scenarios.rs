//! End-to-end connector scenarios against mock provider APIs

use pretty_assertions::assert_eq;
use serde_json::json;
use solidafy_connect::auth::{
    AwsCredentials, AwsSigV4Client, HeaderAuthClient, OAuth2Client, OAuth2Config, OAuthToken,
};
use solidafy_connect::connector::{
    ConnectorParams, DeleteParams, GenericConnector, ObjectSupport, ReadParams, RestConfig,
    WriteParams,
};
use solidafy_connect::pagination::PaginationConfig;
use solidafy_connect::support::CapabilitySet;
use solidafy_connect::{Catalog, Context, ErrorKind};
use std::sync::Arc;
use wiremock::matchers::{any, body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog(server: &MockServer, auth: &str) -> Catalog {
    Catalog::from_yaml(&format!(
        r#"
providers:
  billing:
    display_name: Billing
    base_url: "{uri}"
    auth:
      type: {auth}
"#,
        uri = server.uri()
    ))
    .unwrap()
}

fn connector(server: &MockServer, params: ConnectorParams, config: &RestConfig) -> GenericConnector {
    let params = if params.authenticated_client.is_some() {
        params
    } else {
        params.with_client(Arc::new(HeaderAuthClient::bearer("sk_test")))
    };
    GenericConnector::new(&catalog(server, "jwt"), "billing", params, config).unwrap()
}

#[tokio::test]
async fn cursor_read_follows_next_link() {
    let server = MockServer::start().await;
    let next = format!("{}/contacts?cursor=abc", server.uri());
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .and(query_param("cursor", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "3", "name": "Cy"}],
            "links": {"next": null}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "1", "name": "Ann"}, {"id": "2", "name": "Bo"}],
            "links": {"next": next}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = RestConfig {
        records_path: Some("data".to_string()),
        pagination: PaginationConfig::NextUrl {
            path: "links.next".to_string(),
        },
        ..RestConfig::default()
    };
    let connector = connector(&server, ConnectorParams::new(), &config);
    let ctx = Context::new();

    let first = connector
        .read(&ctx, &ReadParams::new("contacts").with_fields(["id", "name"]))
        .await
        .unwrap();
    assert_eq!(first.rows, 2);
    assert!(!first.done);
    assert_eq!(first.next_page, next);
    assert_eq!(first.data[1].fields["name"], json!("Bo"));

    let second = connector
        .read(
            &ctx,
            &ReadParams::new("contacts")
                .with_fields(["id"])
                .with_next_page(first.next_page),
        )
        .await
        .unwrap();
    assert_eq!(second.rows, 1);
    assert!(second.done);
    assert_eq!(second.next_page, "");
}

#[tokio::test]
async fn short_offset_page_ends_the_read() {
    let server = MockServer::start().await;
    let records: Vec<_> = (0..37).map(|i| json!({"id": i})).collect();
    Mock::given(method("GET"))
        .and(path("/invoices"))
        .and(query_param("offset", "100"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": records })))
        .expect(1)
        .mount(&server)
        .await;

    let config = RestConfig {
        records_path: Some("items".to_string()),
        pagination: PaginationConfig::offset("offset", "limit", 100),
        ..RestConfig::default()
    };
    let connector = connector(&server, ConnectorParams::new(), &config);

    let page = connector
        .read(
            &Context::new(),
            &ReadParams::new("invoices")
                .with_fields(["id"])
                .with_next_page(format!("{}/invoices?offset=100&limit=100", server.uri())),
        )
        .await
        .unwrap();
    assert_eq!(page.rows, 37);
    assert!(page.done);
    assert_eq!(page.next_page, "");
}

#[tokio::test]
async fn write_creates_then_updates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/customers"))
        .and(body_json(json!({"email": "a@b.co"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "c_1", "email": "a@b.co"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/customers/c_1"))
        .and(body_json(json!({"email": "new@b.co"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "c_1", "email": "new@b.co"})))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server, ConnectorParams::new(), &RestConfig::default());
    let ctx = Context::new();

    let created = connector
        .write(&ctx, &WriteParams::new("customers", json!({"email": "a@b.co"})))
        .await
        .unwrap();
    assert!(created.success);
    assert_eq!(created.record_id, "c_1");

    let updated = connector
        .write(
            &ctx,
            &WriteParams::new("customers", json!({"email": "new@b.co"})).with_record_id(created.record_id),
        )
        .await
        .unwrap();
    assert!(updated.success);
    assert_eq!(updated.record_id, "c_1");
    assert_eq!(updated.data["email"], json!("new@b.co"));
}

#[tokio::test]
async fn delete_on_read_only_object_is_refused_without_io() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let config = RestConfig {
        objects: vec![
            ObjectSupport::new("customers", CapabilitySet::crud()),
            ObjectSupport::new("widgets", CapabilitySet::read()),
        ],
        ..RestConfig::default()
    };
    let connector = connector(&server, ConnectorParams::new(), &config);

    let err = connector
        .delete(&Context::new(), &DeleteParams::new("widgets", "w_1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotSupported);
}

#[tokio::test]
async fn expired_oauth_token_is_refreshed_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).insert_header(
            "WWW-Authenticate",
            r#"Bearer error="invalid_token", error_description="expired""#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1"}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = OAuth2Client::auth_code(
        OAuth2Config::new(format!("{}/oauth/token", server.uri()), "client", "secret"),
        OAuthToken::expires_in("stale", 3600).with_refresh_token("r1"),
    );
    let params = ConnectorParams::new().with_client(Arc::new(client));
    let connector = GenericConnector::new(
        &catalog(&server, "oauth2-auth-code"),
        "billing",
        params,
        &RestConfig::default(),
    )
    .unwrap();

    let page = connector
        .read(&Context::new(), &ReadParams::new("contacts").with_fields(["id"]))
        .await
        .unwrap();
    assert_eq!(page.rows, 1);
    assert!(page.done);
}

#[tokio::test]
async fn aws_request_without_service_is_a_caller_error() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = AwsSigV4Client::new(
        Arc::new(AwsCredentials::new("AKIDEXAMPLE", "secret")),
        "us-east-1",
    );
    let params = ConnectorParams::new().with_client(Arc::new(client));
    let connector = GenericConnector::new(
        &catalog(&server, "aws"),
        "billing",
        params,
        &RestConfig::default(),
    )
    .unwrap();

    let err = connector
        .read(&Context::new(), &ReadParams::new("queues").with_fields(["id"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Caller);
    assert_eq!(err.to_string(), "AWS request is missing Service name");
}
