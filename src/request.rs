//! Request layer: base-URL resolution and the JSON API client.
//!
//! The client is a thin consumer of the two core subsystems: registry
//! entries tell it which paths exist, and the credential provider is asked
//! for a header before every call. `Credential::LoginRequired` aborts the
//! request with [`RequestError::Unauthenticated`] — it is never retried
//! anonymously.

use std::sync::Arc;

use serde_json::Value;

use crate::config::ConsoleConfig;
use crate::credential::{Credential, CredentialProvider};
use crate::error::RequestError;
use crate::registry::ResourceEntry;
use crate::routes::fill_template;

/// Resolve the API base URL: explicit config override first, else the first
/// server URL of the OpenAPI document.
pub fn resolve_base_url(config: Option<&ConsoleConfig>, oas: &Value) -> Option<String> {
    if let Some(base) = config.and_then(|c| c.api_base_url.as_deref()) {
        return Some(base.to_string());
    }
    oas.get("servers")?
        .get(0)?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

/// JSON API client bound to one base URL and one credential provider.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a JSON request against an API path.
    ///
    /// The credential provider is consulted first; only `Header` and
    /// `Anonymous` outcomes proceed to the network.
    pub async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, RequestError> {
        let url = format!("{}{}", self.base_url, path);

        let mut builder = self.http.request(method, &url);
        match self.credentials.credential().await? {
            Credential::Header(header) => {
                builder = builder.header(reqwest::header::AUTHORIZATION, header);
            }
            Credential::Anonymous => {}
            Credential::LoginRequired => {
                tracing::debug!(url = %url, "aborting request: interactive login required");
                return Err(RequestError::Unauthenticated);
            }
        }
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|source| RequestError::Network {
            url: url.clone(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Status {
                url,
                status: status.as_u16(),
            });
        }
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        response.json().await.map_err(|source| RequestError::Decode {
            url: url.clone(),
            source,
        })
    }

    /// List a collection.
    pub async fn list(&self, collection_path: &str, query: &[(&str, &str)]) -> Result<Value, RequestError> {
        self.request(reqwest::Method::GET, collection_path, query, None)
            .await
    }

    /// Create an item in a collection.
    pub async fn create(&self, collection_path: &str, body: &Value) -> Result<Value, RequestError> {
        self.request(reqwest::Method::POST, collection_path, &[], Some(body))
            .await
    }

    /// Fetch a single resource by id.
    pub async fn fetch(&self, resource: &ResourceEntry, id: &str) -> Result<Value, RequestError> {
        self.request(reqwest::Method::GET, &fill_template(&resource.path, id), &[], None)
            .await
    }

    /// Update a single resource by id.
    pub async fn update(
        &self,
        resource: &ResourceEntry,
        id: &str,
        body: &Value,
    ) -> Result<Value, RequestError> {
        self.request(
            reqwest::Method::PUT,
            &fill_template(&resource.path, id),
            &[],
            Some(body),
        )
        .await
    }

    /// Delete a single resource by id.
    pub async fn delete(&self, resource: &ResourceEntry, id: &str) -> Result<Value, RequestError> {
        self.request(
            reqwest::Method::DELETE,
            &fill_template(&resource.path, id),
            &[],
            None,
        )
        .await
    }
}
