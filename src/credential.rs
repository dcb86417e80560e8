//! Credential provider contract consumed by the request layer.
//!
//! A provider yields a ready `Authorization` header, an explicit
//! "login required" signal, or "anonymous" for security modes that send no
//! header. `LoginRequired` is deliberately not an error: the request layer
//! must abort and hand control to interactive login, never retry without
//! credentials.

use async_trait::async_trait;

use crate::config::DevBypass;
use crate::error::{AuthError, ConfigError};

/// Outcome of a credential request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Ready `Authorization` header value.
    Header(String),
    /// No header needed; the request proceeds unauthenticated by design.
    Anonymous,
    /// No valid token and no way to refresh one; the caller must trigger
    /// interactive login and abort the request.
    LoginRequired,
}

impl Credential {
    pub fn header(&self) -> Option<&str> {
        match self {
            Credential::Header(value) => Some(value),
            _ => None,
        }
    }
}

/// Async source of credentials for outbound API calls.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credential(&self) -> Result<Credential, AuthError>;
}

/// Provider for security modes without token machinery (`none`, or `bearer`
/// with the header supplied out of band).
#[derive(Debug, Default)]
pub struct AnonymousCredentials;

#[async_trait]
impl CredentialProvider for AnonymousCredentials {
    async fn credential(&self) -> Result<Credential, AuthError> {
        Ok(Credential::Anonymous)
    }
}

/// Development-only provider that synthesizes a static header from config,
/// skipping all OAuth machinery.
///
/// Construction fails fast when the bypass is enabled without a usable
/// token, so every request attempt errors before any network I/O.
#[derive(Debug, Clone)]
pub struct DevBypassCredentials {
    header: String,
}

impl DevBypassCredentials {
    /// Build from the `dev_bypass` config section. An enabled bypass without
    /// a usable token is a configuration error, not a fallthrough.
    pub fn new(bypass: Option<&DevBypass>) -> Result<Self, ConfigError> {
        let Some(bypass) = bypass else {
            return Err(ConfigError::DevBypassTokenMissing);
        };
        let token = bypass.access_token.trim();
        if token.is_empty() {
            return Err(ConfigError::DevBypassTokenMissing);
        }
        // A token that already carries a scheme ("Basic abc...") is used
        // verbatim; otherwise the configured or default type is prepended.
        let header = if token.contains(' ') {
            token.to_string()
        } else {
            let token_type = bypass
                .token_type
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or("Bearer");
            format!("{token_type} {token}")
        };
        Ok(Self { header })
    }
}

#[async_trait]
impl CredentialProvider for DevBypassCredentials {
    async fn credential(&self) -> Result<Credential, AuthError> {
        Ok(Credential::Header(self.header.clone()))
    }
}
