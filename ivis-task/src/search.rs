//! Search engine client handed to task code
//!
//! The task only ever reads from the search engine directly; every write goes
//! through the host. The client is a thin handle around `reqwest` pointed at
//! the endpoint from the bootstrap payload.

use ivis_config::SearchConfig;
use reqwest::Client;
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

use crate::bootstrap::SearchEndpoint;
use crate::error::{TaskError, TaskResult};

/// Read-only search engine handle
#[derive(Debug, Clone)]
pub struct SearchClient {
    base_url: Url,
    http: Client,
}

impl SearchClient {
    /// Build a client. No connection is made until a query is issued.
    pub fn new(endpoint: &SearchEndpoint, config: &SearchConfig) -> TaskResult<Self> {
        let base_url = Url::parse(&format!(
            "{}://{}:{}/",
            config.scheme, endpoint.host, endpoint.port
        ))
        .map_err(|e| TaskError::Search(format!("invalid search endpoint: {}", e)))?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TaskError::Search(e.to_string()))?;

        Ok(Self { base_url, http })
    }

    /// Root URL of the search engine
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Underlying HTTP client for queries not covered here
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Run a `_search` query against `index`
    pub async fn search(&self, index: &str, body: &JsonValue) -> TaskResult<JsonValue> {
        self.post(&format!("{}/_search", index), body).await
    }

    /// Run a `_count` query against `index`
    pub async fn count(&self, index: &str, body: &JsonValue) -> TaskResult<u64> {
        let response = self.post(&format!("{}/_count", index), body).await?;
        response
            .get("count")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| TaskError::Search("count response without `count`".to_string()))
    }

    async fn post(&self, path: &str, body: &JsonValue) -> TaskResult<JsonValue> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| TaskError::Search(format!("invalid path {}: {}", path, e)))?;

        debug!(%url, "Querying search engine");

        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| TaskError::Search(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TaskError::Search(format!("{}: {}", status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| TaskError::Search(e.to_string()))
    }
}
