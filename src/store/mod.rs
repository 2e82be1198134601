mod file;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;

pub const ACCESS_TOKEN_KEY: &str = "spotify_access_token";
pub const REFRESH_TOKEN_KEY: &str = "spotify_refresh_token";
pub const EXPIRES_AT_KEY: &str = "token_expires_at";
pub const VERIFIER_KEY: &str = "pkce_code_verifier";
pub const INSTALLED_VERSION_KEY: &str = "installed_version";

/// Storage area of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Durable values shared by every surface: tokens, settings, target playlist
    Sync,
    /// Short-lived values such as the PKCE verifier
    Local,
}

impl Namespace {
    pub const fn file_name(self) -> &'static str {
        match self {
            Namespace::Sync => "sync.json",
            Namespace::Local => "local.json",
        }
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, ns: Namespace, key: &str, value: Value) -> Result<(), StoreError>;
    async fn set_many(&self, ns: Namespace, items: Vec<(&str, Value)>) -> Result<(), StoreError>;
    async fn remove(&self, ns: Namespace, keys: &[&str]) -> Result<(), StoreError>;
    async fn clear(&self, ns: Namespace) -> Result<(), StoreError>;
}

pub type DynStore = Arc<dyn KeyValueStore>;

/// Persisted OAuth tokens, a single instance per installation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Absolute expiry in epoch milliseconds
    pub expires_at: Option<u64>,
}

impl TokenState {
    /// Returns the access token when it is still usable at `now`
    pub fn valid_token(&self, now: u64) -> Option<&str> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at)) if now < expires_at => Some(token),
            _ => None,
        }
    }
}

/// Typed view over the store for the token manager
#[derive(Clone)]
pub struct AuthStore {
    inner: DynStore,
}

impl AuthStore {
    pub fn new(inner: DynStore) -> Self {
        Self { inner }
    }

    pub async fn load_tokens(&self) -> Result<TokenState, StoreError> {
        let access_token = self.get_string(ACCESS_TOKEN_KEY).await?;
        let refresh_token = self.get_string(REFRESH_TOKEN_KEY).await?;
        let expires_at = self
            .inner
            .get(Namespace::Sync, EXPIRES_AT_KEY)
            .await?
            .and_then(|v| v.as_u64());
        Ok(TokenState {
            access_token,
            refresh_token,
            expires_at,
        })
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .inner
            .get(Namespace::Sync, key)
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Persist a new access token, the refresh token is only overwritten when given
    pub async fn save_access_token(
        &self,
        access_token: &str,
        expires_at: u64,
        refresh_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut items = vec![
            (ACCESS_TOKEN_KEY, Value::from(access_token)),
            (EXPIRES_AT_KEY, Value::from(expires_at)),
        ];
        if let Some(refresh_token) = refresh_token {
            items.push((REFRESH_TOKEN_KEY, Value::from(refresh_token)));
        }
        self.inner.set_many(Namespace::Sync, items).await
    }

    pub async fn clear_tokens(&self) -> Result<(), StoreError> {
        self.inner
            .remove(
                Namespace::Sync,
                &[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, EXPIRES_AT_KEY],
            )
            .await
    }

    pub async fn save_verifier(&self, verifier: &str) -> Result<(), StoreError> {
        self.inner
            .set(Namespace::Local, VERIFIER_KEY, Value::from(verifier))
            .await
    }

    /// Read the verifier and delete it in the same step
    pub async fn take_verifier(&self) -> Result<Option<String>, StoreError> {
        let verifier = self
            .inner
            .get(Namespace::Local, VERIFIER_KEY)
            .await?
            .and_then(|v| v.as_str().map(str::to_string));
        self.purge_verifier().await?;
        Ok(verifier)
    }

    pub async fn purge_verifier(&self) -> Result<(), StoreError> {
        self.inner.remove(Namespace::Local, &[VERIFIER_KEY]).await
    }

    /// Install/update hook: a verifier left over from another version can never
    /// match a fresh challenge, so it is dropped whenever the version changes
    pub async fn on_install(&self, version: &str) -> Result<bool, StoreError> {
        let installed = self
            .inner
            .get(Namespace::Local, INSTALLED_VERSION_KEY)
            .await?;
        if installed.as_ref().and_then(Value::as_str) == Some(version) {
            return Ok(false);
        }

        info!("new installation of version {}, purging stale PKCE verifier", version);
        self.purge_verifier().await?;
        self.inner
            .set(Namespace::Local, INSTALLED_VERSION_KEY, Value::from(version))
            .await?;
        debug!("recorded installed version");
        Ok(true)
    }
}
