use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::notebook;
use crate::resolver::ResourceRef;

/// Configuration for the Kaggle client
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Origin for the Kaggle API (e.g., "https://www.kaggle.com")
    pub base_path: String,
    /// User agent string for HTTP requests
    pub user_agent: Option<String>,
    /// HTTP client instance
    pub client: reqwest::Client,
    /// Basic credential attached to every upstream call
    pub credential: Credential,
}

impl Configuration {
    /// Create a configuration for the production Kaggle origin with the
    /// given account credential. The underlying HTTP client carries a
    /// bounded request timeout; there are no retries.
    pub fn new(credential: Credential) -> Result<Configuration, KaggleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Configuration {
            base_path: crate::KAGGLE_BASE_URL.to_owned(),
            user_agent: Some("kaggle-api-rs/0.1".to_owned()),
            client,
            credential,
        })
    }

    /// Override the upstream origin, e.g. a localhost instance.
    pub fn with_base_path<S: Into<String>>(mut self, base_path: S) -> Self {
        self.base_path = base_path.into();
        // Endpoint templates join with a single '/'.
        while self.base_path.ends_with('/') {
            self.base_path.pop();
        }
        self
    }

    /// Set custom user agent
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// A process-lifetime Kaggle account credential.
///
/// The `Basic` authorization header value is encoded exactly once, at
/// construction. The struct is immutable afterwards and its `Debug`
/// rendering never includes the key material.
#[derive(Clone)]
pub struct Credential {
    username: String,
    authorization: String,
}

impl Credential {
    pub fn new<U: Into<String>, K: AsRef<str>>(username: U, key: K) -> Self {
        let username = username.into();
        let token = STANDARD.encode(format!("{}:{}", username, key.as_ref()));
        Self {
            authorization: format!("Basic {token}"),
            username,
        }
    }

    /// Account username; notebooks pushed through this client are created
    /// under this account.
    pub fn username(&self) -> &str {
        &self.username
    }

    fn header_value(&self) -> &str {
        &self.authorization
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("authorization", &"Basic <redacted>")
            .finish()
    }
}

/// Errors that can occur when interacting with the Kaggle API.
///
/// Transport and HTTP-status failures both surface here with their
/// diagnostic detail attached; callers that present results to an agent are
/// expected to log the detail and render only a generic failure message.
#[derive(Debug, Error)]
pub enum KaggleError {
    /// A user-supplied handle or URL failed validation; no network call was
    /// made.
    #[error("invalid identifier: {message}")]
    InvalidIdentifier { message: String },

    /// Network, connection, or timeout errors from the HTTP layer
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream returned a non-2xx status; the response body is kept as
    /// the diagnostic message
    #[error("Kaggle API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A 2xx response body that could not be parsed as JSON
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl KaggleError {
    pub fn invalid_identifier<S: Into<String>>(message: S) -> Self {
        Self::InvalidIdentifier {
            message: message.into(),
        }
    }
}

/// # Kaggle Client
///
/// An ergonomic async client for the small slice of the Kaggle web API the
/// notebook tools need: Croissant dataset metadata, dataset search, and
/// kernel push/status/pull.
///
/// Every call attaches the account's `Basic` credential and is attempted
/// exactly once; there is no retry or backoff policy.
pub struct KaggleClient {
    configuration: Arc<Configuration>,
}

impl std::fmt::Debug for KaggleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KaggleClient")
            .field("base_path", &self.configuration.base_path)
            .field("username", &self.configuration.credential.username())
            .finish()
    }
}

impl KaggleClient {
    pub fn new(configuration: Arc<Configuration>) -> Self {
        Self { configuration }
    }

    /// Account username from the configured credential.
    pub fn username(&self) -> &str {
        self.configuration.credential.username()
    }

    // === Transport ===

    /// Issue an authenticated GET and return the raw response body.
    ///
    /// The body is deliberately not parsed: Croissant documents and status
    /// payloads are passed through verbatim so upstream formatting is
    /// preserved exactly.
    async fn get_text(&self, url: &str) -> Result<String, KaggleError> {
        let mut request = self
            .configuration
            .client
            .get(url)
            .header(AUTHORIZATION, self.configuration.credential.header_value());
        if let Some(user_agent) = &self.configuration.user_agent {
            request = request.header(USER_AGENT, user_agent);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.text().await?)
        } else {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(%status, url, body = %message, "upstream GET failed");
            Err(KaggleError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Issue an authenticated POST with a JSON body and parse the response.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, KaggleError> {
        let mut request = self
            .configuration
            .client
            .post(url)
            .header(AUTHORIZATION, self.configuration.credential.header_value())
            .json(body);
        if let Some(user_agent) = &self.configuration.user_agent {
            request = request.header(USER_AGENT, user_agent);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            Ok(serde_json::from_str(&text)?)
        } else {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(%status, url, body = %message, "upstream POST failed");
            Err(KaggleError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    // === Operations ===

    /// Fetch the Croissant (JSON-LD) metadata document for a dataset.
    ///
    /// Returns the document text verbatim.
    pub async fn dataset_metadata(&self, dataset: &ResourceRef) -> Result<String, KaggleError> {
        let url = format!(
            "{}/{}/{}/croissant/download",
            self.configuration.base_path, dataset.owner, dataset.slug
        );
        self.get_text(&url).await
    }

    /// Search public datasets by free-text query. The first page of results
    /// is returned as the upstream list, unmodified.
    pub async fn search_datasets(&self, query: &str) -> Result<Vec<Value>, KaggleError> {
        let url = format!("{}/api/v1/datasets/list", self.configuration.base_path);
        let body = json!({ "search": query, "page": 1 });
        let result = self.post_json(&url, &body).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Push a new single-cell Python notebook under the configured account,
    /// attached to one dataset.
    ///
    /// The notebook slug is derived from the title; see
    /// [`notebook::notebook_slug`] for the derivation rules.
    pub async fn push_notebook(
        &self,
        title: &str,
        code: &str,
        dataset: &ResourceRef,
    ) -> Result<Value, KaggleError> {
        let url = format!("{}/api/v1/kernels/push", self.configuration.base_path);
        let slug = notebook::notebook_slug(title);
        let document = notebook::single_cell_notebook(code);
        let body = json!({
            "slug": format!("{}/{}", self.username(), slug),
            "newTitle": title,
            "text": document.to_string(),
            "language": "python",
            "kernelType": "notebook",
            "isPrivate": true,
            "datasetDataSources": [dataset.handle()],
        });
        self.post_json(&url, &body).await
    }

    /// Fetch the execution status of a notebook. Owner and slug travel as
    /// query parameters on this endpoint, not path segments.
    pub async fn notebook_status(&self, notebook: &ResourceRef) -> Result<String, KaggleError> {
        let url = format!(
            "{}/api/v1/kernels/status?userName={}&kernelSlug={}",
            self.configuration.base_path,
            urlencoding::encode(&notebook.owner),
            urlencoding::encode(&notebook.slug)
        );
        self.get_text(&url).await
    }

    /// Pull the current source of a notebook.
    pub async fn notebook_content(&self, notebook: &ResourceRef) -> Result<String, KaggleError> {
        let url = format!(
            "{}/api/v1/kernels/pull/{}/{}",
            self.configuration.base_path, notebook.owner, notebook.slug
        );
        self.get_text(&url).await
    }
}
