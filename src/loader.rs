//! Document loading from various sources.
//!
//! Handles loading the console config and the OpenAPI document from files,
//! strings, and HTTP URLs. Documents are JSON; the OpenAPI document is
//! expected to be dereferenced already (no `$ref` resolution happens here).

use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use crate::error::LoadError;

/// Default timeout for HTTP requests (10 seconds).
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson {
        source_name: path.display().to_string(),
        source,
    })
}

/// Load a JSON document from a string.
pub fn load_document_str(content: &str, source_name: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson {
        source_name: source_name.to_string(),
        source,
    })
}

/// Load a JSON document from an HTTP/HTTPS URL.
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or returns a
/// non-success status, or `LoadError::InvalidJson` if the response body
/// isn't valid JSON.
pub async fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    // Check for HTTP errors before parsing
    let response = response
        .error_for_status()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let body = response
        .text()
        .await
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;
    load_document_str(&body, url)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a JSON document from a file path or URL, detected automatically.
pub async fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        load_document_url(source).await
    } else {
        load_document(Path::new(source))
    }
}
