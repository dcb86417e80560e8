//! Integration tests for the OAuth2/OIDC session core.
//!
//! Discovery and token endpoints are stood up with mockito; the hit
//! expectations are the point of most tests here (single-flight discovery,
//! coalesced refresh, fail-before-network for the dev bypass).

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use oas_console::{
    credential_provider, AuthError, AuthSession, ConfigError, Credential, CredentialProvider,
    MemoryStore, RedirectConfig, SecurityConfig, SecurityType, SessionStore, TokenState,
};

fn security(as_base_url: &str) -> SecurityConfig {
    SecurityConfig {
        security_type: SecurityType::OAuth2,
        client_id: Some("console".into()),
        client_secret: None,
        as_base_url: Some(as_base_url.into()),
        scopes: None,
        audience: None,
        dev_bypass: None,
    }
}

fn redirects() -> RedirectConfig {
    RedirectConfig::from_origin("https://console.example.com")
}

fn discovery_body(server_url: &str) -> String {
    format!(
        r#"{{
            "issuer": "{server_url}",
            "authorization_endpoint": "{server_url}/authorize",
            "token_endpoint": "{server_url}/token"
        }}"#
    )
}

fn token_state(expires_in_secs: i64, refresh_token: Option<&str>) -> TokenState {
    let now = SystemTime::now();
    let expires_at = if expires_in_secs >= 0 {
        now + Duration::from_secs(expires_in_secs as u64)
    } else {
        now - Duration::from_secs((-expires_in_secs) as u64)
    };
    TokenState {
        access_token: "stored-tok".into(),
        token_type: "Bearer".into(),
        expires_at,
        refresh_token: refresh_token.map(String::from),
    }
}

fn session(server_url: &str, store: Arc<MemoryStore>) -> AuthSession {
    AuthSession::new(security(server_url), redirects(), store).unwrap()
}

#[tokio::test]
async fn fresh_persisted_token_needs_no_network() {
    let mut server = mockito::Server::new_async().await;
    let discovery = server
        .mock("GET", "/.well-known/openid-configuration")
        .expect(0)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    store.save(token_state(300, None));

    let session = session(&server.url(), Arc::clone(&store));
    let credential = session.authorization_header().await.unwrap();

    assert_eq!(credential, Credential::Header("Bearer stored-tok".into()));
    discovery.assert_async().await;
}

#[tokio::test]
async fn expired_token_without_refresh_requires_login() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    let discovery = server
        .mock("GET", "/.well-known/openid-configuration")
        .with_status(200)
        .with_body(discovery_body(&url))
        .expect(1)
        .create_async()
        .await;
    let token_endpoint = server
        .mock("POST", "/token")
        .expect(0)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    store.save(token_state(-60, None));

    let session = session(&url, Arc::clone(&store));
    let credential = session.authorization_header().await.unwrap();

    assert_eq!(credential, Credential::LoginRequired);
    discovery.assert_async().await;
    token_endpoint.assert_async().await;
}

// Two concurrent credential requests over a stale token must resolve to the
// same token and cause exactly one refresh call.
#[tokio::test]
async fn concurrent_refreshes_coalesce() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    server
        .mock("GET", "/.well-known/openid-configuration")
        .with_status(200)
        .with_body(discovery_body(&url))
        .expect(1)
        .create_async()
        .await;
    let token_endpoint = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"access_token":"fresh-tok","token_type":"Bearer","expires_in":300,"refresh_token":"r2"}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    store.save(token_state(-60, Some("r1")));

    let session = session(&url, Arc::clone(&store));
    let (a, b) = tokio::join!(session.authorization_header(), session.authorization_header());

    let expected = Credential::Header("Bearer fresh-tok".into());
    assert_eq!(a.unwrap(), expected);
    assert_eq!(b.unwrap(), expected);
    token_endpoint.assert_async().await;

    // The rotated refresh token was persisted.
    assert_eq!(store.load().unwrap().refresh_token.as_deref(), Some("r2"));
}

#[tokio::test]
async fn concurrent_first_requests_share_one_discovery() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    let discovery = server
        .mock("GET", "/.well-known/openid-configuration")
        .with_status(200)
        .with_body(discovery_body(&url))
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let session = session(&url, store);
    let (a, b) = tokio::join!(session.authorization_header(), session.authorization_header());

    assert_eq!(a.unwrap(), Credential::LoginRequired);
    assert_eq!(b.unwrap(), Credential::LoginRequired);
    discovery.assert_async().await;
}

#[tokio::test]
async fn failed_discovery_is_fatal_and_sticky() {
    let mut server = mockito::Server::new_async().await;
    let discovery = server
        .mock("GET", "/.well-known/openid-configuration")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let session = session(&server.url(), store);

    let first = session.authorization_header().await.unwrap_err();
    assert!(matches!(first, AuthError::Discovery { .. }));

    // No retry: the second call reports the cached failure without a fetch.
    let second = session.authorization_header().await.unwrap_err();
    assert!(matches!(second, AuthError::Discovery { .. }));
    discovery.assert_async().await;
}

#[tokio::test]
async fn discovery_without_issuer_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    server
        .mock("GET", "/.well-known/openid-configuration")
        .with_status(200)
        .with_body(format!(
            r#"{{"authorization_endpoint": "{url}/authorize", "token_endpoint": "{url}/token"}}"#
        ))
        .create_async()
        .await;

    let session = session(&url, Arc::new(MemoryStore::new()));
    let err = session.authorization_header().await.unwrap_err();
    assert!(matches!(err, AuthError::MissingIssuer { .. }));
}

#[tokio::test]
async fn interactive_login_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    server
        .mock("GET", "/.well-known/openid-configuration")
        .with_status(200)
        .with_body(discovery_body(&url))
        .create_async()
        .await;
    let token_endpoint = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"access_token":"tok-1","token_type":"Bearer","expires_in":300,"refresh_token":"r1"}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let session = session(&url, Arc::clone(&store));

    let login = session.login_request("/pets?page=2").await.unwrap();
    assert!(login.authorize_url.starts_with(&format!("{url}/authorize?")));
    assert!(login.authorize_url.contains("response_type=code"));
    assert!(login.authorize_url.contains("client_id=console"));
    assert!(login.authorize_url.contains("code_challenge_method=S256"));
    assert!(login.authorize_url.contains(&format!("state={}", login.state)));
    assert!(login
        .authorize_url
        .contains("scope=openid+profile"));

    let callback = format!(
        "https://console.example.com/oauth/callback?code=abc&state={}",
        login.state
    );
    let return_to = session.complete_login(&callback).await.unwrap();

    assert_eq!(return_to, "/pets?page=2");
    assert_eq!(store.load().unwrap().access_token, "tok-1");
    token_endpoint.assert_async().await;

    // The token is now served from the store with no further exchange.
    let credential = session.authorization_header().await.unwrap();
    assert_eq!(credential, Credential::Header("Bearer tok-1".into()));
}

#[tokio::test]
async fn callback_error_param_is_fatal() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    server
        .mock("GET", "/.well-known/openid-configuration")
        .with_status(200)
        .with_body(discovery_body(&url))
        .create_async()
        .await;

    let session = session(&url, Arc::new(MemoryStore::new()));
    let err = session
        .complete_login(
            "https://console.example.com/oauth/callback?error=access_denied&error_description=nope",
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AuthError::AuthorizationDenied { error, .. } if error == "access_denied"
    ));
}

#[tokio::test]
async fn callback_with_unknown_state_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    server
        .mock("GET", "/.well-known/openid-configuration")
        .with_status(200)
        .with_body(discovery_body(&url))
        .create_async()
        .await;
    let token_endpoint = server
        .mock("POST", "/token")
        .expect(0)
        .create_async()
        .await;

    let session = session(&url, Arc::new(MemoryStore::new()));
    let err = session
        .complete_login("https://console.example.com/oauth/callback?code=abc&state=forged")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::StateMismatch));
    token_endpoint.assert_async().await;
}

#[tokio::test]
async fn failed_exchange_leaves_no_token_behind() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    server
        .mock("GET", "/.well-known/openid-configuration")
        .with_status(200)
        .with_body(discovery_body(&url))
        .create_async()
        .await;
    server
        .mock("POST", "/token")
        .with_status(400)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let session = session(&url, Arc::clone(&store));

    let login = session.login_request("/").await.unwrap();
    let callback = format!(
        "https://console.example.com/oauth/callback?code=bad&state={}",
        login.state
    );
    let err = session.complete_login(&callback).await.unwrap_err();

    assert!(matches!(err, AuthError::Exchange { .. }));
    assert!(store.load().is_none());
}

#[tokio::test]
async fn silent_renewal_updates_store_only() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    server
        .mock("GET", "/.well-known/openid-configuration")
        .with_status(200)
        .with_body(discovery_body(&url))
        .create_async()
        .await;
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"silent-tok","token_type":"Bearer","expires_in":300}"#)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let session = session(&url, Arc::clone(&store));

    let renewal = session.silent_login_request().await.unwrap();
    assert!(renewal.authorize_url.contains("prompt=none"));
    assert!(renewal
        .authorize_url
        .contains(&urlencoding::encode("https://console.example.com/oauth/silent").into_owned()));

    let callback = format!(
        "https://console.example.com/oauth/silent?code=xyz&state={}",
        renewal.state
    );
    session.complete_silent_login(&callback).await.unwrap();

    assert_eq!(store.load().unwrap().access_token, "silent-tok");
}

#[tokio::test]
async fn logout_clears_everything() {
    let store = Arc::new(MemoryStore::new());
    store.save(token_state(300, Some("r1")));

    let session = session("https://as.example.com", Arc::clone(&store));
    session.logout();

    assert!(store.load().is_none());
}

// === Dev bypass ===

#[tokio::test]
async fn dev_bypass_without_token_fails_before_any_network_call() {
    let mut server = mockito::Server::new_async().await;
    let discovery = server
        .mock("GET", "/.well-known/openid-configuration")
        .expect(0)
        .create_async()
        .await;

    let result = credential_provider(
        Some(&security(&server.url())),
        redirects(),
        Arc::new(MemoryStore::new()),
        true,
    );

    assert!(matches!(result, Err(ConfigError::DevBypassTokenMissing)));
    discovery.assert_async().await;
}

#[tokio::test]
async fn dev_bypass_replaces_oauth_entirely() {
    let mut server = mockito::Server::new_async().await;
    let discovery = server
        .mock("GET", "/.well-known/openid-configuration")
        .expect(0)
        .create_async()
        .await;

    let mut config = security(&server.url());
    config.dev_bypass = Some(oas_console::DevBypass {
        access_token: "static-token".into(),
        token_type: None,
    });

    let provider = credential_provider(
        Some(&config),
        redirects(),
        Arc::new(MemoryStore::new()),
        true,
    )
    .unwrap();
    let credential = provider.credential().await.unwrap();

    assert_eq!(credential, Credential::Header("Bearer static-token".into()));
    discovery.assert_async().await;
}

#[tokio::test]
async fn non_oauth_security_is_anonymous() {
    let config = SecurityConfig {
        security_type: SecurityType::None,
        client_id: None,
        client_secret: None,
        as_base_url: None,
        scopes: None,
        audience: None,
        dev_bypass: None,
    };
    let provider = credential_provider(
        Some(&config),
        redirects(),
        Arc::new(MemoryStore::new()),
        false,
    )
    .unwrap();

    assert_eq!(provider.credential().await.unwrap(), Credential::Anonymous);
}
