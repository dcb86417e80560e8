//! Error types for configuration, authentication, loading, and requests.

use std::path::PathBuf;
use thiserror::Error;

/// Errors detected while validating console configuration.
///
/// All of these are raised before any session or network attempt.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("security_config.client_id is required for oauth2")]
    MissingClientId,

    #[error("security_config.as_base_url is required for oauth2")]
    MissingAsBaseUrl,

    #[error("navigation item \"{label}\" must include a collection path or children")]
    NavItemEmpty { label: String },

    #[error("navigation item \"{label}\" cannot include both a collection and children")]
    NavItemConflict { label: String },

    #[error("security_config.dev_bypass can only be set in debug builds")]
    DevBypassInRelease,

    #[error("dev auth bypass is enabled but no access token is configured")]
    DevBypassTokenMissing,
}

impl ConfigError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors from the OAuth2/OIDC session core.
///
/// Network failures carry `{url, message}` strings rather than source errors
/// so the enum stays `Clone` — a failed discovery result is cached for the
/// lifetime of the session generation and handed to every later caller.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("OIDC discovery failed for {url}: {message}")]
    Discovery { url: String, message: String },

    #[error("OIDC discovery response from {url} is missing a usable issuer")]
    MissingIssuer { url: String },

    #[error("OIDC discovery response from {url} is missing {field}")]
    MissingMetadata { url: String, field: &'static str },

    #[error("OAuth is not configured (security type is not oauth2)")]
    NotConfigured,

    #[error("authorization server rejected the request: {error}")]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    #[error("callback state does not match any pending login request")]
    StateMismatch,

    #[error("callback URL is missing the authorization code")]
    MissingCode,

    #[error("token exchange failed at {url}: {message}")]
    Exchange { url: String, message: String },

    #[error("token refresh failed at {url}: {message}")]
    RefreshFailed { url: String, message: String },
}

impl AuthError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Discovery { .. } | Self::Exchange { .. } | Self::RefreshFailed { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors while loading a config or OpenAPI document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid JSON in {source_name}: {source}")]
    InvalidJson {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } | Self::ReadError { .. } | Self::NetworkError { .. } => 3,
            Self::InvalidJson { .. } => 2,
        }
    }
}

/// Errors surfaced to callers of the request layer.
#[derive(Debug, Error)]
pub enum RequestError {
    /// No usable credential; the caller must trigger interactive login and
    /// abort this request. Never downgraded to an anonymous retry.
    #[error("no valid credential available; interactive login required")]
    Unauthenticated,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}
