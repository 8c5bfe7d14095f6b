use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kaggle_api::resolver::ResourceRef;
use kaggle_api::{Configuration, Credential, KaggleClient, KaggleError};

fn test_client(server: &MockServer) -> KaggleClient {
    let config = Configuration::new(Credential::new("alice", "secret"))
        .expect("client builder should succeed")
        .with_base_path(server.uri())
        .with_user_agent("kaggle-api-tests/1.0");
    KaggleClient::new(Arc::new(config))
}

#[test]
fn default_configuration_builds() {
    let config = Configuration::new(Credential::new("alice", "secret"));
    assert!(config.is_ok());
}

// base64("alice:secret")
const ALICE_BASIC: &str = "Basic YWxpY2U6c2VjcmV0";

#[tokio::test]
async fn dataset_metadata_passes_raw_body_through() {
    let server = MockServer::start().await;
    let body = r#"{"@context": "https://schema.org/", "name": "ds1"}"#;

    Mock::given(method("GET"))
        .and(path("/owner1/ds1/croissant/download"))
        .and(header("authorization", ALICE_BASIC))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let text = client
        .dataset_metadata(&ResourceRef::new("owner1", "ds1"))
        .await
        .expect("metadata fetch should succeed");

    // Verbatim passthrough, no re-formatting.
    assert_eq!(text, body);
}

#[tokio::test]
async fn non_2xx_status_collapses_to_api_error_with_detail() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/owner1/missing/croissant/download"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .dataset_metadata(&ResourceRef::new("owner1", "missing"))
        .await
        .expect_err("404 should be an error");

    match err {
        KaggleError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn search_posts_fixed_first_page_and_returns_list() {
    let server = MockServer::start().await;
    let results = json!([
        {"ref": "owner1/flowers", "title": "Flowers"},
        {"ref": "owner2/more-flowers", "title": "More Flowers"}
    ]);

    Mock::given(method("POST"))
        .and(path("/api/v1/datasets/list"))
        .and(header("authorization", ALICE_BASIC))
        .and(body_json(json!({"search": "flowers", "page": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(&results))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let list = client
        .search_datasets("flowers")
        .await
        .expect("search should succeed");

    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["ref"], "owner1/flowers");
}

#[tokio::test]
async fn notebook_status_sends_owner_and_slug_as_query_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/kernels/status"))
        .and(query_param("userName", "owner2"))
        .and(query_param("kernelSlug", "nb1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"complete"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let text = client
        .notebook_status(&ResourceRef::new("owner2", "nb1"))
        .await
        .expect("status fetch should succeed");

    assert_eq!(text, r#"{"status":"complete"}"#);
}

#[tokio::test]
async fn notebook_content_uses_path_appended_pull_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/kernels/pull/owner2/nb1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("cell source"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let text = client
        .notebook_content(&ResourceRef::new("owner2", "nb1"))
        .await
        .expect("pull should succeed");

    assert_eq!(text, "cell source");
}

#[tokio::test]
async fn push_notebook_derives_slug_and_attaches_dataset() {
    let server = MockServer::start().await;

    let expected_text = kaggle_api::notebook::single_cell_notebook("print('hi')").to_string();
    Mock::given(method("POST"))
        .and(path("/api/v1/kernels/push"))
        .and(body_json(json!({
            "slug": "alice/my-notebook",
            "newTitle": "My Notebook",
            "text": expected_text,
            "language": "python",
            "kernelType": "notebook",
            "isPrivate": true,
            "datasetDataSources": ["owner1/ds1"],
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ref": "alice/my-notebook", "error": null})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client
        .push_notebook("My Notebook", "print('hi')", &ResourceRef::new("owner1", "ds1"))
        .await
        .expect("push should succeed");

    assert_eq!(result["ref"], "alice/my-notebook");
}

#[tokio::test]
async fn repeated_calls_issue_independent_upstream_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/owner1/ds1/croissant/download"))
        .respond_with(ResponseTemplate::new(200).set_body_string("doc"))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let dataset = ResourceRef::new("owner1", "ds1");
    let first = client.dataset_metadata(&dataset).await.unwrap();
    let second = client.dataset_metadata(&dataset).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn network_failure_collapses_to_request_error() {
    // A bare (non-pooled) server actually closes its socket on drop;
    // pooled `MockServer::start()` instances keep listening.
    let server = MockServer::builder().start().await;
    let client = test_client(&server);
    drop(server);

    let err = client
        .dataset_metadata(&ResourceRef::new("owner1", "ds1"))
        .await
        .expect_err("dead server should be an error");
    assert!(matches!(err, KaggleError::Request(_)));
}
