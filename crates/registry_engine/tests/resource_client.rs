use std::sync::{Arc, Once};
use std::time::Duration;

use bytes::Bytes;
use pretty_assertions::assert_eq;
use registry_core::{reconcile, EntityKind, ListQuery, NormalizedRecord};
use registry_engine::{
    FailureKind, FetchSettings, ImageUploader, ReqwestTransport, ResourceClient, RetryPolicy,
    Transport,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(registry_logging::initialize_for_tests);
}

fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_millis(1),
        request_timeout: Duration::from_secs(5),
        ..RetryPolicy::default()
    }
}

fn transport() -> Arc<dyn Transport> {
    Arc::new(ReqwestTransport::new(&FetchSettings::default()).unwrap())
}

fn client(server: &MockServer, kind: EntityKind) -> ResourceClient {
    ResourceClient::new(kind, &format!("{}/api", server.uri()), transport(), fast_retries())
        .unwrap()
}

fn locations(range: std::ops::RangeInclusive<u32>) -> Value {
    Value::Array(
        range
            .map(|n| json!({"locationId": n, "locationName": format!("Site {n}")}))
            .collect(),
    )
}

#[tokio::test]
async fn second_page_with_total_count_header() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/location"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "10"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Count", "25")
                .set_body_json(locations(11..=20)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server, EntityKind::Location)
        .list_page(ListQuery::new(2, 10), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!page.exhausted);
    assert_eq!(page.records.len(), 10);
    assert_eq!(page.records[0], NormalizedRecord::new("11", "Site 11"));
    assert_eq!(page.hints.total_count, Some(25));

    let state = reconcile(&page.hints, page.records.len(), 2, 10);
    assert_eq!((state.page, state.total_pages, state.total_count), (2, 3, 25));
}

#[tokio::test]
async fn later_pagination_convention_is_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Asset"))
        .and(query_param("pageNumber", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"AssetId": 7, "AssetName": "Drill", "Description": "cordless"}]
        })))
        .mount(&server)
        .await;

    let page = client(&server, EntityKind::Asset)
        .list_page(ListQuery::new(1, 10), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].id, "7");
    assert_eq!(page.records[0].name(), "Drill");
    assert_eq!(page.records[0].get("description"), "cordless");
}

#[tokio::test]
async fn plural_location_path_is_tried_last() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/locations"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(locations(1..=3)))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server, EntityKind::Location)
        .list_page(ListQuery::new(1, 10), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!page.exhausted);
    assert_eq!(page.records.len(), 3);
    // Eight failing candidates, three attempts each, then the hit.
    assert_eq!(server.received_requests().await.unwrap().len(), 25);
}

#[tokio::test]
async fn unreachable_backend_yields_exhausted_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let page = client(&server, EntityKind::Supplier)
        .list_page(ListQuery::new(1, 10), &CancellationToken::new())
        .await
        .unwrap();

    assert!(page.exhausted);
    assert!(page.records.is_empty());
    assert!(page.last_error.unwrap().contains("500"));
    // Seven conventions, three attempts each.
    assert_eq!(server.received_requests().await.unwrap().len(), 21);
}

#[tokio::test]
async fn get_normalizes_single_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Employee/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "EmployeeId": 3, "employeeName": "Ann", "Email": "ann@example.com"
        })))
        .mount(&server)
        .await;

    let record = client(&server, EntityKind::Employee)
        .get_normalized("3", &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.id, "3");
    assert_eq!(record.name(), "Ann");
    assert_eq!(record.get("email"), "ann@example.com");
}

#[tokio::test]
async fn update_puts_payload_to_item_url() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/Employee/3"))
        .and(body_json(json!({"name": "Ann B"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server, EntityKind::Employee)
        .update("3", json!({"name": "Ann B"}), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(body, None);
}

#[tokio::test]
async fn delete_accepts_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/Asset/42"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, EntityKind::Asset)
        .delete("42", &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_falls_back_to_query_form() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/Asset"))
        .and(query_param("id", "42"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, EntityKind::Asset)
        .delete("42", &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_failure_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "Asset is assigned"})),
        )
        .mount(&server)
        .await;

    let err = client(&server, EntityKind::Asset)
        .delete("42", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(409));
    assert_eq!(err.message, "Asset is assigned");
}

#[tokio::test]
async fn duplicate_found_by_later_search_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/location"))
        .and(query_param("search", "Main Office"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/location"))
        .and(query_param("name", "Main Office"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": 1, "name": "Main Office Annex"},
                {"id": 2, "name": "main office"}
            ]
        })))
        .mount(&server)
        .await;

    let found = client(&server, EntityKind::Location)
        .find_duplicate(" Main Office ", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(found.map(|record| record.id), Some("2".to_string()));
}

#[tokio::test]
async fn no_duplicate_when_names_differ() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Department"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "Name": "Ops"}])))
        .mount(&server)
        .await;

    let found = client(&server, EntityKind::Department)
        .find_duplicate("Finance", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(found, None);
}

#[tokio::test]
async fn create_tries_name_casings_until_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/Department"))
        .and(body_json(json!({"departmentName": "Ops"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5, "departmentName": "Ops"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"title": "Name is required"})))
        .mount(&server)
        .await;

    let created = client(&server, EntityKind::Department)
        .create_with_payload_variants("Ops", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(created, Some(json!({"id": 5, "departmentName": "Ops"})));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn create_reports_last_failure_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Duplicate department"})),
        )
        .mount(&server)
        .await;

    let err = client(&server, EntityKind::Department)
        .create_with_payload_variants("Ops", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(400));
    assert_eq!(err.message, "Duplicate department");
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn upload_returns_hosted_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/image"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"fileUrl": "http://cdn.test/a.png"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let uploader = ImageUploader::new(
        &format!("{}/api", server.uri()),
        transport(),
        Duration::from_secs(5),
    )
    .unwrap();
    let url = uploader
        .upload(
            Bytes::from_static(b"\x89PNG"),
            "a.png",
            "image/png",
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(url, "http://cdn.test/a.png");

    let received = server.received_requests().await.unwrap();
    let content_type = received[0]
        .headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn upload_without_url_key_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let uploader = ImageUploader::new(
        &format!("{}/api", server.uri()),
        transport(),
        Duration::from_secs(5),
    )
    .unwrap();
    let err = uploader
        .upload(Bytes::from_static(b"x"), "x.jpg", "image/jpeg", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Undecodable);
}

#[tokio::test]
async fn duplicate_email_is_matched_on_canonical_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Employee"))
        .and(query_param("email", "ann@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"employeeName": "Ann", "Email": "ANN@example.com"}
        ])))
        .mount(&server)
        .await;

    let found = client(&server, EntityKind::Employee)
        .find_duplicate_by("email", "ann@example.com", &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.name(), "Ann");
    assert_eq!(found.id, "");
}

#[tokio::test]
async fn rename_tries_id_and_name_casings() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/Department/4"))
        .and(body_json(json!({"departmentId": "4", "departmentName": "Finance"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"title": "Validation failed"})))
        .mount(&server)
        .await;

    let body = client(&server, EntityKind::Department)
        .update_with_payload_variants("4", "Finance", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(body, None);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn own_record_is_not_its_own_duplicate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Department"))
        .and(query_param("search", "Finance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"departmentId": 4, "departmentName": "Finance"}
        ])))
        .mount(&server)
        .await;

    let departments = client(&server, EntityKind::Department);
    let cancel = CancellationToken::new();
    let found = departments
        .find_duplicate_except("Finance", "4", &cancel)
        .await
        .unwrap();
    assert_eq!(found, None);

    let found = departments
        .find_duplicate_except("Finance", "9", &cancel)
        .await
        .unwrap();
    assert_eq!(found.map(|record| record.id), Some("4".to_string()));
}
