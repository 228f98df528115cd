//! Tests for the connector core

use super::*;
use crate::auth::{HeaderAuthClient, RawClient, SharedClient};
use crate::catalog::Catalog;
use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::http::Transport;
use crate::pagination::{PaginationConfig, StopCondition};
use crate::schema::StaticSchema;
use crate::support::{Capability, CapabilitySet, EndpointSupport};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};
use std::sync::Arc;
use test_case::test_case;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog(server: &MockServer) -> Catalog {
    Catalog::from_yaml(&format!(
        r#"
providers:
  acme:
    base_url: "{uri}/{{{{workspace}}}}"
    explicit_workspace_required: true
    auth:
      type: api-key-header
      header_name: X-Api-Key
    metadata_inputs:
      - name: region
      - name: tier
        default: free
    modules:
      crm:
        label: crm
        version: v1
  open:
    base_url: "{uri}"
    auth:
      type: none
"#,
        uri = server.uri()
    ))
    .unwrap()
}

fn api_key() -> SharedClient {
    Arc::new(HeaderAuthClient::api_key("X-Api-Key", "k1"))
}

fn acme_params() -> ConnectorParams {
    ConnectorParams::new()
        .with_client(api_key())
        .with_workspace("w1")
        .with_metadata("Region", "eu")
}

fn open(server: &MockServer, config: &RestConfig) -> GenericConnector {
    GenericConnector::new(&catalog(server), "open", ConnectorParams::new(), config).unwrap()
}

fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

// ============================================================================
// Initialization
// ============================================================================

#[tokio::test]
async fn test_initialize_reports_every_missing_input() {
    let server = MockServer::start().await;
    let err = GenericConnector::new(
        &catalog(&server),
        "acme",
        ConnectorParams::new(),
        &RestConfig::default(),
    )
    .unwrap_err();

    let message = err.to_string();
    assert!(matches!(err, Error::Multiple(ref errors) if errors.len() == 3), "{err:?}");
    assert!(message.contains("authenticatedClient"), "{message}");
    assert!(message.contains("workspace"), "{message}");
    assert!(message.contains("metadata.region"), "{message}");
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

#[tokio::test]
async fn test_initialize_rejects_unknown_module() {
    let server = MockServer::start().await;
    let err = GenericConnector::new(
        &catalog(&server),
        "acme",
        acme_params().with_module("billing"),
        &RestConfig::default(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(err.to_string().contains("'billing'"), "{err}");
    assert!(err.to_string().contains("root, crm"), "{err}");
}

#[tokio::test]
async fn test_initialize_unknown_provider() {
    let server = MockServer::start().await;
    let err = GenericConnector::new(
        &catalog(&server),
        "nope",
        ConnectorParams::new(),
        &RestConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnknownProvider { .. }));
}

#[tokio::test]
async fn test_initialize_defaults_module_and_resolves_urls() {
    let server = MockServer::start().await;
    let connector = GenericConnector::new(
        &catalog(&server),
        "acme",
        acme_params(),
        &RestConfig::default(),
    )
    .unwrap();

    assert_eq!(connector.provider(), "acme");
    assert_eq!(connector.module(), "root");
    assert_eq!(connector.transport().base_url(), format!("{}/w1", server.uri()));
}

#[tokio::test]
async fn test_module_base_url_and_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w1/crm/v1/contacts"))
        .and(header("X-Api-Key", "k1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let connector = GenericConnector::new(
        &catalog(&server),
        "acme",
        acme_params().with_module("crm"),
        &RestConfig::default(),
    )
    .unwrap();

    let result = connector
        .read(&Context::new(), &ReadParams::new("contacts").with_fields(["id"]))
        .await
        .unwrap();
    assert_eq!(result.rows, 1);
    assert!(result.done);
}

#[tokio::test]
async fn test_constructor_requirements_are_validated() {
    let server = MockServer::start().await;
    let err = initialize(&catalog(&server), "open", ConnectorParams::new(), |base| {
        Ok(base
            .require(Requirement::Workspace)
            .require(Requirement::metadata(["tenant"])))
    })
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("workspace"), "{message}");
    assert!(message.contains("metadata.tenant"), "{message}");
}

#[tokio::test]
async fn test_catalog_and_constructor_requirements_reported_together() {
    let server = MockServer::start().await;
    let params = ConnectorParams::new().with_client(api_key());
    let err = initialize(&catalog(&server), "acme", params, |base| {
        Ok(base.require(Requirement::metadata(["tenant"])))
    })
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "missing required parameter: workspace; \
         missing required parameter: metadata.region; \
         missing required parameter: metadata.tenant"
    );
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

#[tokio::test]
async fn test_constructor_error_joins_catalog_defects() {
    let server = MockServer::start().await;
    let err = initialize::<Connector, _>(&catalog(&server), "acme", ConnectorParams::new(), |_| {
        Err(Error::validation("bad constructor"))
    })
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("authenticatedClient"), "{message}");
    assert!(message.contains("bad constructor"), "{message}");
}

#[tokio::test]
async fn test_constructor_error_propagates() {
    let server = MockServer::start().await;
    let err = initialize::<Connector, _>(&catalog(&server), "open", ConnectorParams::new(), |_| {
        Err(Error::validation("bad constructor"))
    })
    .unwrap_err();
    assert!(err.to_string().contains("bad constructor"));
}

// ============================================================================
// Requirements
// ============================================================================

#[test]
fn test_metadata_requirement_case_insensitive() {
    let params = ConnectorParams::new().with_metadata("REGION", "eu");
    assert!(validate(&params, &[Requirement::metadata(["region"])]).is_ok());

    let params = ConnectorParams::new().with_metadata("region", "");
    assert!(validate(&params, &[Requirement::metadata(["region"])]).is_err());
}

#[test]
fn test_requirements_satisfied() {
    let params = ConnectorParams::new()
        .with_client(Arc::new(RawClient::new()))
        .with_workspace("w")
        .with_module("crm");
    let requirements = [
        Requirement::AuthenticatedClient,
        Requirement::Workspace,
        Requirement::module(["root", "crm"]),
    ];
    assert!(validate(&params, &requirements).is_ok());
}

// ============================================================================
// Read
// ============================================================================

#[tokio::test]
async fn test_read_validation_happens_before_io() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let connector = open(&server, &RestConfig::default());
    let err = connector
        .read(&Context::new(), &ReadParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Multiple(ref errors) if errors.len() == 2));
    assert_eq!(err.kind(), ErrorKind::MissingObjects);
}

#[tokio::test]
async fn test_read_since_after_until_rejected() {
    let server = MockServer::start().await;
    let connector = open(&server, &RestConfig::default());
    let params = ReadParams::new("orders")
        .with_fields(["id"])
        .with_since(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
        .with_until(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

    let err = connector.read(&Context::new(), &params).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

#[tokio::test]
async fn test_read_fields_optional() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .mount(&server)
        .await;

    let config = RestConfig {
        fields_optional: true,
        ..RestConfig::default()
    };
    let result = open(&server, &config)
        .read(&Context::new(), &ReadParams::new("orders"))
        .await
        .unwrap();

    assert_eq!(result.rows, 1);
    assert!(result.data[0].fields.is_empty());
    assert_eq!(result.data[0].raw, json!({"id": 1}));
}

#[tokio::test]
async fn test_read_time_window_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("updated_since", "2024-01-01T00:00:00Z"))
        .and(query_param("updated_before", "2024-02-01T12:30:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let config = RestConfig {
        records_path: Some("data".into()),
        since_param: Some("updated_since".into()),
        until_param: Some("updated_before".into()),
        ..RestConfig::default()
    };
    let params = ReadParams::new("orders")
        .with_fields(["id"])
        .with_since(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .with_until(Utc.with_ymd_and_hms(2024, 2, 1, 12, 30, 0).unwrap());

    let result = open(&server, &config)
        .read(&Context::new(), &params)
        .await
        .unwrap();
    assert_eq!(result.rows, 0);
    assert!(result.done);
}

#[tokio::test]
async fn test_read_cursor_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"Id": 3, "Name": "Cy"}],
            "paging": {}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"Id": 1, "Name": "Ada"}, {"Id": 2, "Name": "Bo"}],
            "paging": {"next": "c2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = RestConfig {
        records_path: Some("results".into()),
        pagination: PaginationConfig::cursor("cursor", "paging.next", StopCondition::EmptyPage),
        ..RestConfig::default()
    };
    let connector = open(&server, &config);
    let params = ReadParams::new("contacts").with_fields(fields(&["name"]));

    let first = connector.read(&Context::new(), &params).await.unwrap();
    assert_eq!(first.rows, 2);
    assert!(!first.done);
    assert_eq!(first.next_page, format!("{}/contacts?cursor=c2", server.uri()));
    assert_eq!(Value::Object(first.data[1].fields.clone()), json!({"name": "Bo"}));

    let second = connector
        .read(&Context::new(), &params.clone().with_next_page(first.next_page))
        .await
        .unwrap();
    assert_eq!(second.rows, 1);
    assert!(second.done);
    assert_eq!(second.next_page, "");
}

#[tokio::test]
async fn test_read_offset_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 3}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
        .mount(&server)
        .await;

    let config = RestConfig {
        pagination: PaginationConfig::offset("offset", "limit", 100),
        ..RestConfig::default()
    };
    let connector = open(&server, &config);
    let params = ReadParams::new("items").with_fields(["id"]).with_page_size(2);

    let first = connector.read(&Context::new(), &params).await.unwrap();
    assert_eq!(first.next_page, format!("{}/items?offset=2&limit=2", server.uri()));

    let second = connector
        .read(&Context::new(), &params.clone().with_next_page(first.next_page))
        .await
        .unwrap();
    assert_eq!(second.rows, 1);
    assert!(second.done);
}

#[tokio::test]
async fn test_read_non_json_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html></html>"),
        )
        .mount(&server)
        .await;

    let err = open(&server, &RestConfig::default())
        .read(&Context::new(), &ReadParams::new("orders").with_fields(["id"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotJson);
}

#[tokio::test]
async fn test_read_cancelled_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = Context::new();
    ctx.cancel();
    let err = open(&server, &RestConfig::default())
        .read(&ctx, &ReadParams::new("orders").with_fields(["id"]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(err.is_retryable());
}

#[test_case(None, ErrorKind::Retryable ; "default")]
#[test_case(Some(ErrorKind::Caller), ErrorKind::Caller ; "configured")]
#[tokio::test]
async fn test_read_not_found_kind(configured: Option<ErrorKind>, expected: ErrorKind) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "no such object"})))
        .mount(&server)
        .await;

    let config = RestConfig {
        not_found: configured,
        ..RestConfig::default()
    };
    let err = open(&server, &config)
        .read(&Context::new(), &ReadParams::new("orders").with_fields(["id"]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), expected);
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("no such object"));
}

// ============================================================================
// Write
// ============================================================================

#[tokio::test]
async fn test_write_create_and_patch_update() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/customers"))
        .and(body_json(json!({"name": "A"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 7, "name": "A"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/customers/7"))
        .and(body_json(json!({"name": "B"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = RestConfig::from_yaml("update_method: PATCH\nid_path: data.id\n").unwrap();
    let connector = open(&server, &config);

    let created = connector
        .write(&Context::new(), &WriteParams::new("customers", json!({"name": "A"})))
        .await
        .unwrap();
    assert!(created.success);
    assert_eq!(created.record_id, "7");
    assert_eq!(Value::Object(created.data), json!({"data": {"id": 7, "name": "A"}}));

    let updated = connector
        .write(
            &Context::new(),
            &WriteParams::new("customers", json!({"name": "B"})).with_record_id("7"),
        )
        .await
        .unwrap();
    assert!(updated.success);
    assert_eq!(updated.record_id, "7");
    assert!(updated.data.is_empty());
}

#[tokio::test]
async fn test_write_validation() {
    let server = MockServer::start().await;
    let err = open(&server, &RestConfig::default())
        .write(&Context::new(), &WriteParams::new("", Value::Null))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("missing object name"), "{message}");
    assert!(message.contains("missing record data"), "{message}");
}

#[test]
fn test_record_path_encodes_id() {
    assert_eq!(record_path("files", "a b/c"), "files/a%20b%2Fc");
    assert_eq!(record_path("files/", "1"), "files/1");
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/orders/o_1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = open(&server, &RestConfig::default())
        .delete(&Context::new(), &DeleteParams::new("orders", "o_1"))
        .await
        .unwrap();
    assert!(result.success);
}

#[tokio::test]
async fn test_delete_missing_record_id() {
    let server = MockServer::start().await;
    let err = open(&server, &RestConfig::default())
        .delete(&Context::new(), &DeleteParams::new("orders", ""))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRecordId);
}

#[tokio::test]
async fn test_unsupported_operations_make_no_request() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = RestConfig::from_yaml(
        r"
objects:
  - pattern: 'orders'
    capabilities: [read]
",
    )
    .unwrap();
    let connector = open(&server, &config);
    let ctx = Context::new();

    let err = connector
        .delete(&ctx, &DeleteParams::new("orders", "1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotSupported);

    let err = connector
        .write(&ctx, &WriteParams::new("orders", json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotSupported);

    let err = connector
        .read(&ctx, &ReadParams::new("widgets").with_fields(["id"]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "read is not supported for object 'widgets'");
}

#[tokio::test]
async fn test_not_implemented_strategy() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let transport = Transport::for_url("bare", &server.uri(), Arc::new(RawClient::new()));
    let connector = Connector::new(transport)
        .with_support(EndpointSupport::new().with("root", "*", CapabilitySet::crud()));

    let err = connector
        .read(&Context::new(), &ReadParams::new("orders").with_fields(["id"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);

    let err = connector
        .delete(&Context::new(), &DeleteParams::new("orders", "1"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "delete is not implemented");
}

// ============================================================================
// Metadata
// ============================================================================

#[tokio::test]
async fn test_metadata_static_and_sampled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1, "total": 9.5, "paid": true}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let schema = StaticSchema::new().with_object(
        "root",
        "contacts",
        ObjectMetadata::new("Contacts")
            .with_field("email", FieldMetadata::new("Email", ValueType::String)),
    );
    let config = RestConfig {
        records_path: Some("data".into()),
        pagination: PaginationConfig::offset("offset", "limit", 100),
        schema: Some(schema),
        ..RestConfig::default()
    };

    let result = open(&server, &config)
        .list_object_metadata(&Context::new(), &["contacts", "orders"])
        .await
        .unwrap();

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let contacts = &result.result["contacts"];
    assert_eq!(contacts.display_name, "Contacts");
    assert_eq!(contacts.fields["email"].value_type, ValueType::String);

    let orders = &result.result["orders"];
    assert_eq!(orders.fields["id"].value_type, ValueType::Int);
    assert_eq!(orders.fields["total"].value_type, ValueType::Float);
    assert_eq!(orders.fields["paid"].value_type, ValueType::Boolean);
}

#[tokio::test]
async fn test_metadata_per_object_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "o_1"}])))
        .mount(&server)
        .await;

    let config = RestConfig::from_yaml(
        r"
objects:
  - pattern: '{orders,empty}'
    capabilities: [read]
",
    )
    .unwrap();

    let result = open(&server, &config)
        .list_object_metadata(&Context::new(), &["orders", "empty", "secret"])
        .await
        .unwrap();

    assert_eq!(result.result.len(), 1);
    assert_eq!(result.errors["empty"].kind(), ErrorKind::EmptyResponse);
    assert_eq!(result.errors["secret"].kind(), ErrorKind::OperationNotSupported);

    let serialized = serde_json::to_value(&result).unwrap();
    assert_eq!(serialized["errors"]["secret"]["kind"], "operation-not-supported");
}

#[tokio::test]
async fn test_metadata_requires_objects() {
    let server = MockServer::start().await;
    let err = open(&server, &RestConfig::default())
        .list_object_metadata::<&str>(&Context::new(), &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingObjects);
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_rest_config_defaults() {
    let config = RestConfig::from_yaml("records_path: items\n").unwrap();
    assert_eq!(config.records_path.as_deref(), Some("items"));
    assert_eq!(config.pagination, PaginationConfig::None);
    assert_eq!(config.update_method, UpdateMethod::Put);
    assert_eq!(config.id_path, "id");
    assert_eq!(config.objects, vec![ObjectSupport::new("*", CapabilitySet::crud())]);
}

#[test]
fn test_rest_config_full() {
    let config = RestConfig::from_yaml(
        r"
pagination:
  type: page_number
  page_param: page
  start_page: 1
objects:
  - pattern: 'tickets'
    capabilities: [read, subscribe]
not_found: caller
",
    )
    .unwrap();

    assert_eq!(config.pagination, PaginationConfig::page_number("page", 1));
    assert!(config.objects[0].capabilities.contains(Capability::Subscribe));
    assert_eq!(config.not_found, Some(ErrorKind::Caller));
}

#[test]
fn test_rest_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("connector.yaml");
    std::fs::write(&file, "update_method: PATCH\n").unwrap();

    let config = RestConfig::from_file(&file).unwrap();
    assert_eq!(config.update_method, UpdateMethod::Patch);
    assert!(RestConfig::from_file(dir.path().join("missing.yaml")).is_err());
}

// ============================================================================
// Subscriptions
// ============================================================================

struct WebhookSubscriber {
    verifier: WebhookVerifier,
}

#[async_trait]
impl SubscribeStrategy for WebhookSubscriber {
    async fn subscribe(
        &self,
        ctx: &Context,
        transport: &Transport,
        params: &SubscribeParams,
    ) -> Result<SubscribeResult> {
        let body = json!({"url": params.target_url, "objects": params.objects});
        let response = transport
            .json()
            .post(ctx, "webhooks", &body, &[])
            .await?;
        Ok(SubscribeResult {
            id: crate::parse::record_id_at(&response.body, "id"),
            objects: params.objects.clone(),
            raw: response.body,
        })
    }

    async fn delete_subscription(
        &self,
        ctx: &Context,
        transport: &Transport,
        subscription: &SubscribeResult,
    ) -> Result<()> {
        transport
            .json()
            .delete(ctx, &record_path("webhooks", &subscription.id), &[])
            .await?;
        Ok(())
    }

    fn verify_webhook_message(&self, headers: &HeaderMap, body: &[u8]) -> Result<()> {
        self.verifier.verify(headers, body)
    }
}

fn subscribing(server: &MockServer) -> Connector {
    let transport = Transport::for_url("hooks", &server.uri(), Arc::new(RawClient::new()));
    Connector::new(transport)
        .with_support(EndpointSupport::new().with(
            "root",
            "tickets",
            CapabilitySet::read().with(Capability::Subscribe),
        ))
        .with_subscribe(WebhookSubscriber {
            verifier: WebhookVerifier::new("s3cret", "X-Signature").with_prefix("sha256="),
        })
}

#[tokio::test]
async fn test_subscribe_and_delete_subscription() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhooks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 55})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/webhooks/55"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let connector = subscribing(&server);
    let params = SubscribeParams {
        objects: vec!["tickets".into()],
        events: Vec::new(),
        target_url: "https://hooks.example.com/in".into(),
    };

    let subscription = connector.subscribe(&Context::new(), &params).await.unwrap();
    assert_eq!(subscription.id, "55");
    connector
        .delete_subscription(&Context::new(), &subscription)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_subscribe_unsupported_object() {
    let server = MockServer::start().await;
    let params = SubscribeParams {
        objects: vec!["tickets".into(), "users".into()],
        ..SubscribeParams::default()
    };
    let err = subscribing(&server)
        .subscribe(&Context::new(), &params)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "subscribe is not supported for object 'users'");
}

#[tokio::test]
async fn test_subscribe_not_implemented() {
    let server = MockServer::start().await;
    let connector = open(&server, &RestConfig::default());
    let params = SubscribeParams {
        objects: vec!["orders".into()],
        ..SubscribeParams::default()
    };

    let err = connector.subscribe(&Context::new(), &params).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
    assert!(connector
        .verify_webhook_message(&HeaderMap::new(), b"{}")
        .is_err());
}

#[tokio::test]
async fn test_connector_verifies_webhooks() {
    let server = MockServer::start().await;
    let connector = subscribing(&server);
    let body = br#"{"event":"ticket.created"}"#;

    let signature = WebhookVerifier::new("s3cret", "X-Signature")
        .with_prefix("sha256=")
        .sign(body)
        .unwrap();
    let mut headers = HeaderMap::new();
    headers.insert("x-signature", HeaderValue::from_str(&signature).unwrap());

    assert!(connector.verify_webhook_message(&headers, body).is_ok());
    let err = connector
        .verify_webhook_message(&headers, b"tampered")
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid webhook signature: signature mismatch");
}

#[test]
fn test_webhook_verifier_known_digest() {
    // RFC 4231 test case 2
    let verifier = WebhookVerifier::new("Jefe", "X-Hub-Signature");
    assert_eq!(
        verifier.sign(b"what do ya want for nothing?").unwrap(),
        "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
    );
}

#[test]
fn test_webhook_verifier_base64() {
    let verifier =
        WebhookVerifier::new("key", "X-Signature").with_encoding(SignatureEncoding::Base64);
    let signature = verifier.sign(b"payload").unwrap();

    let mut headers = HeaderMap::new();
    headers.insert("x-signature", HeaderValue::from_str(&signature).unwrap());
    assert!(verifier.verify(&headers, b"payload").is_ok());
}

#[test_case(None ; "missing header")]
#[test_case(Some("md5=abc") ; "wrong prefix")]
#[test_case(Some("sha256=zz") ; "not hex")]
fn test_webhook_verifier_rejects(value: Option<&str>) {
    let verifier = WebhookVerifier::new("key", "X-Signature").with_prefix("sha256=");
    let mut headers = HeaderMap::new();
    if let Some(value) = value {
        headers.insert("x-signature", HeaderValue::from_str(value).unwrap());
    }

    let err = verifier.verify(&headers, b"payload").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

// ============================================================================
// Introspection
// ============================================================================

#[tokio::test]
async fn test_http_client_is_the_supplied_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w1/raw"))
        .and(header("X-Api-Key", "k1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let connector = GenericConnector::new(
        &catalog(&server),
        "acme",
        acme_params(),
        &RestConfig::default(),
    )
    .unwrap();

    let url = connector.transport().url("raw").unwrap();
    let request = reqwest::Request::new(reqwest::Method::GET, url);
    let response = connector
        .http_client()
        .execute(&Context::new(), &request)
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

