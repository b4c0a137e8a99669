//! Credential and current-user state.
//!
//! The token lives in a [`SharedToken`] so the REST client and socket URLs
//! see updates immediately. Credentials can be persisted under the name
//! `ludomaster_auth` through a [`CredentialStore`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::{ApiClient, AuthResponse, LoginRequest, RegisterRequest, SharedToken, User};
use crate::error::Result;

/// Storage key for persisted credentials.
pub const CREDENTIALS_KEY: &str = "ludomaster_auth";

/// What gets persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: Option<String>,
    pub user: Option<User>,
}

/// Persistence for [`StoredCredentials`].
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> io::Result<Option<StoredCredentials>>;
    fn save(&self, credentials: &StoredCredentials) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// `ludomaster_auth.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", CREDENTIALS_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> io::Result<Option<StoredCredentials>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        // A corrupt file reads as signed out
        Ok(serde_json::from_str(&text).ok())
    }

    fn save(&self, credentials: &StoredCredentials) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(credentials)?;
        fs::write(&self.path, text)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-process store, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<StoredCredentials>>,
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> io::Result<Option<StoredCredentials>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, credentials: &StoredCredentials) -> io::Result<()> {
        *self.slot.lock() = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// Read the user out of a JWT payload without verifying the signature.
///
/// Claims: `sub` or `id`, `email`, `name` / `displayName` (falling back to
/// `email`), `avatarUrl`.
pub fn decode_token(token: &str) -> Option<User> {
    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    if !claims.is_object() {
        return None;
    }

    let text = |key: &str| -> Option<String> {
        match claims.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };

    let email = text("email");
    Some(User {
        id: text("sub").or_else(|| text("id")),
        display_name: text("name")
            .or_else(|| text("displayName"))
            .or_else(|| email.clone()),
        email,
        avatar_url: text("avatarUrl"),
    })
}

/// Signed-in state.
#[derive(Debug, Clone, Default)]
pub struct AuthStore {
    token: SharedToken,
    user: Option<User>,
}

impl AuthStore {
    pub fn new(token: SharedToken) -> Self {
        Self { token, user: None }
    }

    pub fn token(&self) -> Option<String> {
        self.token.get()
    }

    pub fn shared_token(&self) -> &SharedToken {
        &self.token
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_set()
    }

    /// Take a login/register response. The user falls back to the token's
    /// claims when the body doesn't carry one.
    pub fn accept(&mut self, response: AuthResponse) -> Option<&User> {
        let user = response
            .user
            .or_else(|| response.token.as_deref().and_then(decode_token));
        self.token.set(response.token);
        self.user = user;
        self.user.as_ref()
    }

    pub async fn login(&mut self, api: &ApiClient, credentials: &LoginRequest) -> Result<Option<User>> {
        let response = api.login(credentials).await?;
        info!(identifier = %credentials.identifier, "signed in");
        Ok(self.accept(response).cloned())
    }

    pub async fn register(&mut self, api: &ApiClient, payload: &RegisterRequest) -> Result<Option<User>> {
        let response = api.register(payload).await?;
        info!(email = %payload.email, "registered");
        Ok(self.accept(response).cloned())
    }

    /// Replace the user with the backend's view of it.
    pub async fn refresh_me(&mut self, api: &ApiClient) -> Result<User> {
        let me = api.me().await?;
        self.user = Some(me.clone());
        Ok(me)
    }

    pub fn logout(&mut self) {
        self.token.set(None);
        self.user = None;
    }

    /// Fill in a missing user from the token; an undecodable token signs out.
    pub fn restore(&mut self) {
        let Some(token) = self.token.get() else {
            return;
        };
        if self.user.is_some() {
            return;
        }
        match decode_token(&token) {
            Some(user) => self.user = Some(user),
            None => {
                debug!("stored token is not decodable, signing out");
                self.logout();
            }
        }
    }

    pub fn to_stored(&self) -> StoredCredentials {
        StoredCredentials {
            token: self.token.get(),
            user: self.user.clone(),
        }
    }

    /// Load persisted credentials, then [`restore`](Self::restore).
    pub fn load_from(&mut self, store: &dyn CredentialStore) -> Result<()> {
        let stored = store.load()?.unwrap_or_default();
        self.token.set(stored.token);
        self.user = stored.user;
        self.restore();
        Ok(())
    }

    /// Persist the current credentials; signed out clears the store.
    pub fn save_to(&self, store: &dyn CredentialStore) -> Result<()> {
        if self.is_signed_in() {
            store.save(&self.to_stored())?;
        } else {
            store.clear()?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn make_token(claims: serde_json::Value) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!(
        "{}.{}.sig",
        engine.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        engine.encode(claims.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_token_claims() {
        let token = make_token(serde_json::json!({
            "sub": "u1",
            "email": "ana@ludo.test",
            "name": "Ana",
            "avatarUrl": "https://img/ana.png"
        }));
        let user = decode_token(&token).unwrap();
        assert_eq!(
            user,
            User {
                id: Some("u1".to_string()),
                email: Some("ana@ludo.test".to_string()),
                display_name: Some("Ana".to_string()),
                avatar_url: Some("https://img/ana.png".to_string()),
            }
        );
    }

    #[test]
    fn test_decode_token_fallbacks() {
        let token = make_token(serde_json::json!({"id": 17, "email": "bo@ludo.test"}));
        let user = decode_token(&token).unwrap();
        assert_eq!(user.id.as_deref(), Some("17"));
        assert_eq!(user.display_name.as_deref(), Some("bo@ludo.test"));
    }

    #[test]
    fn test_decode_token_garbage() {
        assert_eq!(decode_token("not-a-jwt"), None);
        assert_eq!(decode_token("a.!!!.c"), None);
    }

    #[test]
    fn test_accept_prefers_body_user() {
        let mut auth = AuthStore::default();
        let body_user = User {
            id: Some("from-body".to_string()),
            ..User::default()
        };
        let token = make_token(serde_json::json!({"sub": "from-token"}));
        auth.accept(AuthResponse {
            token: Some(token.clone()),
            user: Some(body_user.clone()),
        });
        assert_eq!(auth.user(), Some(&body_user));
        assert_eq!(auth.token(), Some(token));
    }

    #[test]
    fn test_accept_decodes_token() {
        let mut auth = AuthStore::default();
        auth.accept(AuthResponse {
            token: Some(make_token(serde_json::json!({"sub": "u5"}))),
            user: None,
        });
        assert_eq!(auth.user().and_then(|u| u.id.as_deref()), Some("u5"));
        assert!(auth.is_signed_in());
    }

    #[test]
    fn test_token_is_shared() {
        let shared = SharedToken::new();
        let mut auth = AuthStore::new(shared.clone());
        auth.accept(AuthResponse {
            token: Some("t".to_string()),
            user: None,
        });
        assert_eq!(shared.get().as_deref(), Some("t"));
        auth.logout();
        assert!(!shared.is_set());
        assert!(auth.user().is_none());
    }

    #[test]
    fn test_restore() {
        let shared = SharedToken::new();
        shared.set(Some(make_token(serde_json::json!({"sub": "u2"}))));
        let mut auth = AuthStore::new(shared.clone());
        auth.restore();
        assert_eq!(auth.user().and_then(|u| u.id.as_deref()), Some("u2"));

        shared.set(Some("broken".to_string()));
        let mut broken = AuthStore::new(shared.clone());
        broken.restore();
        assert!(!broken.is_signed_in());
        assert!(broken.user().is_none());
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryCredentialStore::default();
        let mut auth = AuthStore::default();
        auth.accept(AuthResponse {
            token: Some(make_token(serde_json::json!({"sub": "u3"}))),
            user: None,
        });
        auth.save_to(&store).unwrap();

        let mut restored = AuthStore::default();
        restored.load_from(&store).unwrap();
        assert_eq!(restored.to_stored(), auth.to_stored());

        restored.logout();
        restored.save_to(&store).unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::in_dir(dir.path());
        assert!(store.path().ends_with("ludomaster_auth.json"));
        assert_eq!(store.load().unwrap(), None);

        let creds = StoredCredentials {
            token: Some("abc".to_string()),
            user: None,
        };
        store.save(&creds).unwrap();
        assert_eq!(store.load().unwrap(), Some(creds));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
