//! OAuth2/OIDC session core: discovery, interactive login, silent renewal,
//! coalesced refresh, persistence.
//!
//! One [`AuthSession`] exists per configuration generation, owned by the
//! composition root and handed by reference to the request layer. Replacing
//! the configuration means dropping the session and building a new one; an
//! in-flight network call of the old generation may still complete but its
//! result is never installed into the replacement.
//!
//! Discovery runs at most once per session (single-flight via
//! `tokio::sync::OnceCell`) and its outcome — success or failure — is sticky:
//! an unreachable metadata endpoint is fatal and is not retried. Refreshes
//! coalesce on a mutex with a freshness re-check after acquisition, so
//! concurrent callers share one token-endpoint call and a finishing refresh
//! can never overwrite a newer token with a stale one.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, OnceCell};

use crate::config::{SecurityConfig, SecurityType};
use crate::credential::{AnonymousCredentials, Credential, CredentialProvider, DevBypassCredentials};
use crate::error::{AuthError, ConfigError};
use crate::store::{PendingLogin, SessionStore, TokenState};

const WELL_KNOWN_PATH: &str = ".well-known/openid-configuration";

/// Fallback token lifetime when the token response omits `expires_in`.
const DEFAULT_EXPIRES_IN: Duration = Duration::from_secs(3600);

/// The two callback locations this app answers on.
#[derive(Debug, Clone)]
pub struct RedirectConfig {
    /// Interactive login callback route.
    pub redirect_uri: String,
    /// Silent-renewal callback route.
    pub silent_redirect_uri: String,
}

impl RedirectConfig {
    /// Conventional routes under an application origin.
    pub fn from_origin(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            redirect_uri: format!("{origin}/oauth/callback"),
            silent_redirect_uri: format!("{origin}/oauth/silent"),
        }
    }
}

/// The subset of the authorization server's metadata this console consumes.
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
}

/// Discovery product: one authority bound to one redirect configuration.
#[derive(Debug, Clone)]
struct SessionManager {
    metadata: ProviderMetadata,
    client_id: String,
    client_secret: Option<String>,
    scope: String,
    audience: Option<String>,
    redirects: RedirectConfig,
}

/// An interactive or silent login redirect, ready to be navigated to.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub authorize_url: String,
    /// State nonce; matched against the callback by [`AuthSession::complete_login`].
    pub state: String,
}

/// Raw token-endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_token_state(self, now: SystemTime, previous_refresh: Option<String>) -> TokenState {
        let lifetime = self
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_EXPIRES_IN);
        TokenState {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at: now + lifetime,
            // A refresh response may omit the refresh token; keep the old one.
            refresh_token: self.refresh_token.or(previous_refresh),
        }
    }
}

/// Stateful OAuth2/OIDC token lifecycle manager.
pub struct AuthSession {
    security: SecurityConfig,
    redirects: RedirectConfig,
    http: reqwest::Client,
    store: Arc<dyn SessionStore>,
    manager: OnceCell<Result<SessionManager, AuthError>>,
    refresh_lock: Mutex<()>,
}

impl AuthSession {
    /// Create a session for an `oauth2` security config. Configuration
    /// errors are rejected here, before any network attempt.
    pub fn new(
        security: SecurityConfig,
        redirects: RedirectConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ConfigError> {
        security.validate()?;
        Ok(Self {
            security,
            redirects,
            http: reqwest::Client::new(),
            store,
            manager: OnceCell::new(),
            refresh_lock: Mutex::new(()),
        })
    }

    /// The persisted-state handle, shared with callback routes.
    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    /// Wipe all persisted token material as one logical operation.
    pub fn logout(&self) {
        self.store.clear();
        tracing::info!("session cleared");
    }

    /// Resolve a credential for an outbound request.
    ///
    /// A fresh persisted token is returned without any network round-trip.
    /// A stale one triggers exactly one coalesced silent refresh; when that
    /// fails (or no refresh token exists) the result is
    /// [`Credential::LoginRequired`] — the caller must start interactive
    /// login, not retry anonymously.
    pub async fn authorization_header(&self) -> Result<Credential, AuthError> {
        if self.security.security_type != SecurityType::OAuth2 {
            return Err(AuthError::NotConfigured);
        }

        if let Some(state) = self.store.load() {
            if state.is_fresh(SystemTime::now()) {
                return Ok(Credential::Header(state.authorization_header()));
            }
        }

        // Discovery happens on the first credential request that cannot be
        // satisfied from the store.
        self.manager().await?;

        match self.refresh().await {
            Ok(Some(state)) => Ok(Credential::Header(state.authorization_header())),
            Ok(None) => Ok(Credential::LoginRequired),
            Err(err) => {
                tracing::warn!(error = %err, "silent refresh failed; interactive login required");
                Ok(Credential::LoginRequired)
            }
        }
    }

    /// Build the interactive login redirect, persisting the pending state
    /// (nonce, PKCE verifier, return-to location). The redirect itself is a
    /// full-page navigation owned by the caller; control returns only when a
    /// callback route later invokes [`complete_login`](Self::complete_login).
    pub async fn login_request(&self, return_to: &str) -> Result<LoginRequest, AuthError> {
        let manager = self.manager().await?;
        let redirect_uri = manager.redirects.redirect_uri.clone();
        self.build_login_request(manager, &redirect_uri, return_to, false)
    }

    /// Build a non-interactive (`prompt=none`) renewal redirect against the
    /// silent callback route.
    pub async fn silent_login_request(&self) -> Result<LoginRequest, AuthError> {
        let manager = self.manager().await?;
        let redirect_uri = manager.redirects.silent_redirect_uri.clone();
        self.build_login_request(manager, &redirect_uri, "/", true)
    }

    /// Complete an interactive login from the callback URL. Exchanges the
    /// authorization code, persists the tokens, and returns the location to
    /// resume at (default `/`). Exchange failure is fatal to this attempt;
    /// the user must re-initiate login.
    pub async fn complete_login(&self, callback_url: &str) -> Result<String, AuthError> {
        let manager = self.manager().await?;
        let redirect_uri = manager.redirects.redirect_uri.clone();
        let (code, pending) = self.pending_from_callback(callback_url)?;
        let state = self
            .exchange_code(manager, &code, &pending.code_verifier, &redirect_uri)
            .await?;
        self.store.save(state);
        tracing::info!("interactive login completed");
        if pending.return_to.is_empty() {
            Ok("/".to_string())
        } else {
            Ok(pending.return_to)
        }
    }

    /// Complete a silent renewal from the callback URL. Only updates the
    /// persisted token state; waiters observe the refreshed store.
    pub async fn complete_silent_login(&self, callback_url: &str) -> Result<(), AuthError> {
        let manager = self.manager().await?;
        let redirect_uri = manager.redirects.silent_redirect_uri.clone();
        let (code, pending) = self.pending_from_callback(callback_url)?;
        let state = self
            .exchange_code(manager, &code, &pending.code_verifier, &redirect_uri)
            .await?;
        self.store.save(state);
        tracing::debug!("silent renewal completed");
        Ok(())
    }

    // --- Internal implementation ---

    /// Discovery, single-flight and sticky per session generation.
    async fn manager(&self) -> Result<&SessionManager, AuthError> {
        let result = self.manager.get_or_init(|| self.discover()).await;
        result.as_ref().map_err(AuthError::clone)
    }

    async fn discover(&self) -> Result<SessionManager, AuthError> {
        let base = self
            .security
            .as_base_url
            .as_deref()
            .unwrap_or_default()
            .trim_end_matches('/');
        let url = format!("{base}/{WELL_KNOWN_PATH}");

        tracing::debug!(url = %url, "starting OIDC discovery");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::Discovery {
                url: url.clone(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(AuthError::Discovery {
                url,
                message: format!("status {}", response.status().as_u16()),
            });
        }
        let metadata: serde_json::Value =
            response.json().await.map_err(|e| AuthError::Discovery {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let issuer = metadata
            .get("issuer")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::MissingIssuer { url: url.clone() })?
            .to_string();
        let authorization_endpoint = required_metadata(&metadata, &url, "authorization_endpoint")?;
        let token_endpoint = required_metadata(&metadata, &url, "token_endpoint")?;

        tracing::info!(issuer = %issuer, "OIDC discovery succeeded");
        Ok(SessionManager {
            metadata: ProviderMetadata {
                issuer,
                authorization_endpoint,
                token_endpoint,
            },
            client_id: self.security.client_id.clone().unwrap_or_default(),
            client_secret: self.security.client_secret.clone(),
            scope: self.security.scope(),
            audience: self.security.audience.clone(),
            redirects: self.redirects.clone(),
        })
    }

    fn build_login_request(
        &self,
        manager: &SessionManager,
        redirect_uri: &str,
        return_to: &str,
        silent: bool,
    ) -> Result<LoginRequest, AuthError> {
        let state = random_token(32);
        let code_verifier = random_token(64);
        let code_challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()));

        self.store.save_pending(PendingLogin {
            state: state.clone(),
            code_verifier,
            return_to: return_to.to_string(),
            created_at: SystemTime::now(),
        });

        let mut params: Vec<(&str, &str)> = vec![
            ("response_type", "code"),
            ("client_id", manager.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", manager.scope.as_str()),
            ("state", state.as_str()),
            ("code_challenge", code_challenge.as_str()),
            ("code_challenge_method", "S256"),
        ];
        if let Some(audience) = manager.audience.as_deref() {
            params.push(("audience", audience));
        }
        if silent {
            params.push(("prompt", "none"));
        }
        let query = serde_urlencoded::to_string(&params).expect("query params serialize");
        let separator = if manager.metadata.authorization_endpoint.contains('?') {
            '&'
        } else {
            '?'
        };
        Ok(LoginRequest {
            authorize_url: format!(
                "{}{}{}",
                manager.metadata.authorization_endpoint, separator, query
            ),
            state,
        })
    }

    /// Parse the callback query and match it against the pending login.
    fn pending_from_callback(&self, callback_url: &str) -> Result<(String, PendingLogin), AuthError> {
        let query = callback_url.split_once('?').map(|(_, q)| q).unwrap_or("");
        let params: Vec<(String, String)> =
            serde_urlencoded::from_str(query).unwrap_or_default();
        let get = |name: &str| {
            params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };

        if let Some(error) = get("error") {
            return Err(AuthError::AuthorizationDenied {
                error,
                description: get("error_description"),
            });
        }
        let state = get("state").ok_or(AuthError::StateMismatch)?;
        let code = get("code").ok_or(AuthError::MissingCode)?;
        let pending = self
            .store
            .take_pending(&state)
            .ok_or(AuthError::StateMismatch)?;
        Ok((code, pending))
    }

    async fn exchange_code(
        &self,
        manager: &SessionManager,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenState, AuthError> {
        let url = manager.metadata.token_endpoint.clone();
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", manager.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];
        if let Some(secret) = manager.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let now = SystemTime::now();
        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Exchange {
                url: url.clone(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(AuthError::Exchange {
                url,
                message: format!("status {}", response.status().as_u16()),
            });
        }
        let tokens: TokenResponse = response.json().await.map_err(|e| AuthError::Exchange {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(tokens.into_token_state(now, None))
    }

    /// One coalesced refresh attempt. `Ok(None)` means no refresh token is
    /// available and interactive login is the only way forward.
    async fn refresh(&self) -> Result<Option<TokenState>, AuthError> {
        let manager = self.manager().await?;
        let _guard = self.refresh_lock.lock().await;

        // A refresh that finished while we waited on the lock serves us too;
        // this is what coalesces concurrent callers onto one network call.
        let now = SystemTime::now();
        let current = self.store.load();
        if let Some(state) = &current {
            if state.is_fresh(now) {
                return Ok(Some(state.clone()));
            }
        }
        let Some(refresh_token) = current.and_then(|state| state.refresh_token) else {
            return Ok(None);
        };

        let url = manager.metadata.token_endpoint.clone();
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", manager.client_id.as_str()),
        ];
        if let Some(secret) = manager.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed {
                url: url.clone(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(AuthError::RefreshFailed {
                url,
                message: format!("status {}", response.status().as_u16()),
            });
        }
        let tokens: TokenResponse =
            response.json().await.map_err(|e| AuthError::RefreshFailed {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let state = tokens.into_token_state(now, Some(refresh_token));
        self.store.save(state.clone());
        tracing::info!("access token refreshed");
        Ok(Some(state))
    }
}

#[async_trait]
impl CredentialProvider for AuthSession {
    async fn credential(&self) -> Result<Credential, AuthError> {
        self.authorization_header().await
    }
}

/// Compose the credential provider for a security configuration.
///
/// `dev_bypass` is typically [`crate::config::dev_bypass_enabled`]; when set,
/// the static bypass replaces the OAuth path entirely, and a missing bypass
/// token is a configuration error rather than a fallthrough to anonymous.
pub fn credential_provider(
    security: Option<&SecurityConfig>,
    redirects: RedirectConfig,
    store: Arc<dyn SessionStore>,
    dev_bypass: bool,
) -> Result<Arc<dyn CredentialProvider>, ConfigError> {
    let Some(security) = security else {
        return Ok(Arc::new(AnonymousCredentials));
    };
    security.validate()?;
    if dev_bypass {
        let bypass = DevBypassCredentials::new(security.dev_bypass.as_ref())?;
        return Ok(Arc::new(bypass));
    }
    match security.security_type {
        SecurityType::OAuth2 => {
            let session = AuthSession::new(security.clone(), redirects, store)?;
            Ok(Arc::new(session))
        }
        // `bearer` headers are supplied out of band; `none` sends nothing.
        SecurityType::Bearer | SecurityType::None => Ok(Arc::new(AnonymousCredentials)),
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn required_metadata(
    metadata: &serde_json::Value,
    url: &str,
    field: &'static str,
) -> Result<String, AuthError> {
    metadata
        .get(field)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(AuthError::MissingMetadata {
            url: url.to_string(),
            field,
        })
}
