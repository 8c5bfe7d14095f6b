//! Tool table and operation handlers.
//!
//! Every handler follows the same shape: resolve the caller's identifier,
//! invoke the Kaggle client, and wrap the outcome in a [`ToolResponse`].
//! Handlers never return errors across the tool boundary; validation and
//! upstream failures are rendered as a text block with `isError` set, with
//! the original identifier or query echoed for traceability. Upstream
//! failure detail stays in the logs.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use kaggle_api::resolver::{ResourceKind, resolve};
use kaggle_api::{KaggleClient, notebook};

#[derive(Debug, Serialize)]
pub struct ToolResponse {
    content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "isError")]
    is_error: Option<bool>,
}

impl ToolResponse {
    /// Successful result: exactly one text block carrying the payload
    /// verbatim.
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: None,
        }
    }

    /// Failed result: still a well-formed response with one text block, so
    /// the calling agent never sees a protocol-level error for a tool
    /// failure.
    pub fn failure<S: Into<String>>(text: S) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: Some(true),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Default, Deserialize)]
pub struct DatasetMetadataParams {
    #[serde(default, rename = "datasetHandle")]
    pub dataset_handle: Option<String>,
    #[serde(default, rename = "kaggleUrl")]
    pub kaggle_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchDatasetsParams {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateNotebookParams {
    pub code: String,
    pub title: String,
    #[serde(rename = "datasetHandle")]
    pub dataset_handle: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotebookParams {
    #[serde(default, rename = "notebookHandle")]
    pub notebook_handle: Option<String>,
    #[serde(default, rename = "kaggleUrl")]
    pub kaggle_url: Option<String>,
}

/// The identifier as the caller supplied it, for echoing in failure text.
fn supplied_identifier(handle: &Option<String>, url: &Option<String>) -> String {
    handle
        .clone()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| url.clone().filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| "<no identifier>".to_owned())
}

pub async fn dataset_metadata(client: &KaggleClient, params: DatasetMetadataParams) -> ToolResponse {
    let identifier = supplied_identifier(&params.dataset_handle, &params.kaggle_url);
    let dataset = match resolve(
        params.dataset_handle.as_deref(),
        params.kaggle_url.as_deref(),
        ResourceKind::Dataset,
    ) {
        Ok(dataset) => dataset,
        Err(err) => return ToolResponse::failure(format!("Cannot fetch dataset metadata: {err}")),
    };

    match client.dataset_metadata(&dataset).await {
        Ok(text) if !text.is_empty() => ToolResponse::text(text),
        Ok(_) => ToolResponse::failure(format!(
            "Failed to fetch Croissant metadata for \"{identifier}\": empty response"
        )),
        Err(err) => {
            tracing::warn!(%dataset, error = %err, "dataset metadata fetch failed");
            ToolResponse::failure(format!(
                "Failed to fetch Croissant metadata for \"{identifier}\""
            ))
        }
    }
}

pub async fn search_datasets(client: &KaggleClient, params: SearchDatasetsParams) -> ToolResponse {
    let query = params.query;
    match client.search_datasets(&query).await {
        Ok(results) if !results.is_empty() => {
            let text = serde_json::to_string_pretty(&results)
                .unwrap_or_else(|_| Value::Array(results).to_string());
            ToolResponse::text(text)
        }
        Ok(_) => ToolResponse::failure(format!("No datasets found for query \"{query}\"")),
        Err(err) => {
            tracing::warn!(query = %query, error = %err, "dataset search failed");
            ToolResponse::failure(format!("Dataset search failed for query \"{query}\""))
        }
    }
}

pub async fn create_notebook(client: &KaggleClient, params: CreateNotebookParams) -> ToolResponse {
    let dataset = match kaggle_api::resolver::parse_handle(params.dataset_handle.trim()) {
        Ok(dataset) => dataset,
        Err(err) => return ToolResponse::failure(format!("Cannot create notebook: {err}")),
    };

    if notebook::notebook_slug(&params.title).is_empty() {
        return ToolResponse::failure(format!(
            "Cannot create notebook: title {:?} produces an empty notebook slug",
            params.title
        ));
    }

    match client
        .push_notebook(&params.title, &params.code, &dataset)
        .await
    {
        Ok(result) => {
            let text =
                serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());
            ToolResponse::text(text)
        }
        Err(err) => {
            tracing::warn!(title = %params.title, error = %err, "notebook push failed");
            ToolResponse::failure(format!("Failed to create notebook \"{}\"", params.title))
        }
    }
}

pub async fn notebook_status(client: &KaggleClient, params: NotebookParams) -> ToolResponse {
    let identifier = supplied_identifier(&params.notebook_handle, &params.kaggle_url);
    let notebook = match resolve(
        params.notebook_handle.as_deref(),
        params.kaggle_url.as_deref(),
        ResourceKind::Notebook,
    ) {
        Ok(notebook) => notebook,
        Err(err) => return ToolResponse::failure(format!("Cannot fetch notebook status: {err}")),
    };

    match client.notebook_status(&notebook).await {
        Ok(text) if !text.is_empty() => ToolResponse::text(text),
        Ok(_) => ToolResponse::failure(format!(
            "Failed to fetch status for notebook \"{identifier}\": empty response"
        )),
        Err(err) => {
            tracing::warn!(%notebook, error = %err, "notebook status fetch failed");
            ToolResponse::failure(format!("Failed to fetch status for notebook \"{identifier}\""))
        }
    }
}

pub async fn notebook_content(client: &KaggleClient, params: NotebookParams) -> ToolResponse {
    let identifier = supplied_identifier(&params.notebook_handle, &params.kaggle_url);
    let notebook = match resolve(
        params.notebook_handle.as_deref(),
        params.kaggle_url.as_deref(),
        ResourceKind::Notebook,
    ) {
        Ok(notebook) => notebook,
        Err(err) => return ToolResponse::failure(format!("Cannot fetch notebook content: {err}")),
    };

    match client.notebook_content(&notebook).await {
        Ok(text) if !text.is_empty() => ToolResponse::text(text),
        Ok(_) => ToolResponse::failure(format!(
            "Failed to fetch content for notebook \"{identifier}\": empty response"
        )),
        Err(err) => {
            tracing::warn!(%notebook, error = %err, "notebook pull failed");
            ToolResponse::failure(format!("Failed to fetch content for notebook \"{identifier}\""))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToolSpec {
    pub tool_name: &'static str,
    pub method_name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

#[derive(Debug, Serialize)]
pub struct ToolDescriptor {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    tool_specs()
        .into_iter()
        .map(|spec| ToolDescriptor {
            name: spec.tool_name,
            description: spec.description,
            input_schema: spec.input_schema,
        })
        .collect()
}

pub fn find_tool_spec(name: &str) -> Option<ToolSpec> {
    tool_specs().into_iter().find(|spec| spec.tool_name == name)
}

pub fn find_tool_spec_by_method(method: &str) -> Option<ToolSpec> {
    tool_specs()
        .into_iter()
        .find(|spec| spec.method_name == method)
}

pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            tool_name: "kaggle_dataset_metadata",
            method_name: "kaggle.datasetMetadata",
            description: "Fetch the Croissant (JSON-LD) metadata document for a Kaggle dataset",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "datasetHandle": {"type": "string", "description": "Dataset handle in owner/slug form, e.g. owner1/ds1"},
                    "kaggleUrl": {"type": "string", "description": "Full dataset URL, e.g. https://www.kaggle.com/datasets/owner1/ds1"}
                },
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "kaggle_search_datasets",
            method_name: "kaggle.searchDatasets",
            description: "Search public Kaggle datasets by free-text query",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Full-text search query"}
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "kaggle_create_notebook",
            method_name: "kaggle.createNotebook",
            description: "Create a single-cell Python notebook attached to one dataset",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "code": {"type": "string", "description": "Python source for the notebook's code cell"},
                    "title": {"type": "string", "description": "Notebook title; the slug is derived from it"},
                    "datasetHandle": {"type": "string", "description": "Dataset to attach, in owner/slug form"}
                },
                "required": ["code", "title", "datasetHandle"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "kaggle_notebook_status",
            method_name: "kaggle.notebookStatus",
            description: "Fetch the execution status of a Kaggle notebook",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "notebookHandle": {"type": "string", "description": "Notebook handle in owner/slug form"},
                    "kaggleUrl": {"type": "string", "description": "Full notebook URL, e.g. https://www.kaggle.com/code/owner2/nb1"}
                },
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "kaggle_notebook_content",
            method_name: "kaggle.notebookContent",
            description: "Pull the current source of a Kaggle notebook",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "notebookHandle": {"type": "string", "description": "Notebook handle in owner/slug form"},
                    "kaggleUrl": {"type": "string", "description": "Full notebook URL, e.g. https://www.kaggle.com/code/owner2/nb1"}
                },
                "additionalProperties": false
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaggle_api::{Configuration, Credential};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> KaggleClient {
        let config = Configuration::new(Credential::new("alice", "secret"))
            .expect("client builder should succeed")
            .with_base_path(server.uri());
        KaggleClient::new(Arc::new(config))
    }

    fn response_text(response: &ToolResponse) -> &str {
        assert_eq!(response.content.len(), 1, "exactly one content block");
        let ToolContent::Text { text } = &response.content[0];
        text
    }

    #[test]
    fn every_tool_has_a_method_alias_and_schema() {
        for spec in tool_specs() {
            assert!(spec.method_name.starts_with("kaggle."));
            assert!(find_tool_spec(spec.tool_name).is_some());
            assert!(find_tool_spec_by_method(spec.method_name).is_some());
            assert_eq!(spec.input_schema["type"], "object");
        }
        assert_eq!(tool_specs().len(), 5);
    }

    #[tokio::test]
    async fn empty_search_result_is_a_failure_echoing_the_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/datasets/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let response = search_datasets(
            &test_client(&server),
            SearchDatasetsParams {
                query: "flowers".to_owned(),
            },
        )
        .await;

        assert_eq!(response.is_error, Some(true));
        assert!(response_text(&response).contains("flowers"));
    }

    #[tokio::test]
    async fn missing_identifier_is_rendered_as_a_tool_failure() {
        let server = MockServer::start().await;
        let response =
            dataset_metadata(&test_client(&server), DatasetMetadataParams::default()).await;

        assert_eq!(response.is_error, Some(true));
        assert!(response_text(&response).contains("no dataset identifier provided"));
    }

    #[tokio::test]
    async fn metadata_failure_echoes_the_supplied_identifier() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let response = dataset_metadata(
            &test_client(&server),
            DatasetMetadataParams {
                dataset_handle: Some("owner1/ds1".to_owned()),
                kaggle_url: None,
            },
        )
        .await;

        assert_eq!(response.is_error, Some(true));
        assert!(response_text(&response).contains("owner1/ds1"));
    }

    #[tokio::test]
    async fn metadata_success_passes_payload_through_unmodified() {
        let server = MockServer::start().await;
        let body = r#"{"@context": "https://schema.org/"}"#;
        Mock::given(method("GET"))
            .and(path("/owner1/ds1/croissant/download"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let response = dataset_metadata(
            &test_client(&server),
            DatasetMetadataParams {
                dataset_handle: Some("owner1/ds1".to_owned()),
                kaggle_url: None,
            },
        )
        .await;

        assert_eq!(response.is_error, None);
        assert_eq!(response_text(&response), body);
    }

    #[tokio::test]
    async fn notebook_status_network_failure_is_a_tool_failure_echoing_the_handle() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        drop(server);

        let response = notebook_status(
            &client,
            NotebookParams {
                notebook_handle: Some("owner2/nb1".to_owned()),
                kaggle_url: None,
            },
        )
        .await;

        assert_eq!(response.is_error, Some(true));
        assert!(response_text(&response).contains("owner2/nb1"));
    }

    #[tokio::test]
    async fn notebook_content_network_failure_is_a_tool_failure_echoing_the_handle() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        drop(server);

        let response = notebook_content(
            &client,
            NotebookParams {
                notebook_handle: Some("owner2/nb1".to_owned()),
                kaggle_url: None,
            },
        )
        .await;

        assert_eq!(response.is_error, Some(true));
        assert!(response_text(&response).contains("owner2/nb1"));
    }

    #[tokio::test]
    async fn create_notebook_trims_the_dataset_handle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/kernels/push"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ref": "alice/my-notebook"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = create_notebook(
            &test_client(&server),
            CreateNotebookParams {
                code: "print('hi')".to_owned(),
                title: "My Notebook".to_owned(),
                dataset_handle: "  owner1/ds1  ".to_owned(),
            },
        )
        .await;

        assert_eq!(response.is_error, None);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["datasetDataSources"], serde_json::json!(["owner1/ds1"]));
    }

    #[tokio::test]
    async fn unsluggable_title_is_rejected_before_any_network_call() {
        let server = MockServer::start().await;
        let response = create_notebook(
            &test_client(&server),
            CreateNotebookParams {
                code: "print('hi')".to_owned(),
                title: "!!!".to_owned(),
                dataset_handle: "owner1/ds1".to_owned(),
            },
        )
        .await;

        assert_eq!(response.is_error, Some(true));
        assert!(response_text(&response).contains("empty notebook slug"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
