//! Token and pending-login persistence.
//!
//! The browser console keeps these in short-lived cookies; here the storage
//! is a trait seam so hosts can plug a cookie jar, keyring, or anything else.
//! [`MemoryStore`] is the provided implementation and the one used in tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Safety margin subtracted from a token's validity window. A credential is
/// never handed out within this many seconds of its real expiry.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// How long an unconsumed pending login request stays valid.
pub const PENDING_LOGIN_TTL: Duration = Duration::from_secs(600);

/// Persisted token material for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenState {
    pub access_token: String,
    pub token_type: String,
    /// Absolute expiry of the access token.
    pub expires_at: SystemTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenState {
    /// Whether the access token is still usable at `now`, honoring the
    /// safety margin.
    pub fn is_fresh(&self, now: SystemTime) -> bool {
        match self.expires_at.duration_since(now) {
            Ok(remaining) => remaining > EXPIRY_MARGIN,
            Err(_) => false,
        }
    }

    /// Ready `Authorization` header value.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// State persisted between issuing a login redirect and its callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingLogin {
    /// Opaque state nonce echoed by the authorization server.
    pub state: String,
    /// PKCE code verifier matching the challenge sent in the redirect.
    pub code_verifier: String,
    /// Location to resume after a completed login.
    pub return_to: String,
    pub created_at: SystemTime,
}

/// Persistence seam for token state and pending login requests.
///
/// Writers are "token acquired" and "token cleared"; last writer wins.
/// `clear` removes every persisted field as one logical operation.
pub trait SessionStore: Send + Sync {
    /// Load the persisted token state, if any. Implementations may drop
    /// entries past their TTL but are not required to; callers check
    /// freshness via [`TokenState::is_fresh`].
    fn load(&self) -> Option<TokenState>;

    fn save(&self, state: TokenState);

    fn clear(&self);

    fn save_pending(&self, pending: PendingLogin);

    /// Remove and return the pending login matching `state`. Expired
    /// records are never returned.
    fn take_pending(&self, state: &str) -> Option<PendingLogin>;
}

/// In-memory [`SessionStore`]; TTL-bounded like the cookie store it stands
/// in for.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    token: Option<TokenState>,
    pending: HashMap<String, PendingLogin>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Option<TokenState> {
        let inner = self.inner.lock().unwrap();
        inner.token.clone()
    }

    fn save(&self, state: TokenState) {
        let mut inner = self.inner.lock().unwrap();
        inner.token = Some(state);
    }

    fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.token = None;
        inner.pending.clear();
    }

    fn save_pending(&self, pending: PendingLogin) {
        let mut inner = self.inner.lock().unwrap();
        // Sweep abandoned flows so the map stays bounded.
        let now = SystemTime::now();
        inner.pending.retain(|_, p| {
            now.duration_since(p.created_at)
                .map(|age| age < PENDING_LOGIN_TTL)
                .unwrap_or(true)
        });
        inner.pending.insert(pending.state.clone(), pending);
    }

    fn take_pending(&self, state: &str) -> Option<PendingLogin> {
        let mut inner = self.inner.lock().unwrap();
        let pending = inner.pending.remove(state)?;
        let age = SystemTime::now().duration_since(pending.created_at).ok()?;
        if age >= PENDING_LOGIN_TTL {
            return None;
        }
        Some(pending)
    }
}
