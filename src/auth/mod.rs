pub mod flow;
pub mod model;
pub mod pkce;

use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

pub use flow::{AuthFlow, DynAuthFlow, FlowError, LoopbackFlow};
pub use pkce::PkceChallenge;

use self::model::TokenResponse;
use crate::error::AuthError;
use crate::store::AuthStore;
use crate::utils::now_millis;
use crate::{ConfigArgs, PLACEHOLDER_CLIENT_ID};

/// Owner of the Spotify token lifecycle: cached access, silent refresh and the
/// PKCE authorization code flow
///
/// Every refresh-or-authorize sequence runs under a single lock, so concurrent
/// callers never overwrite each other's verifier or tokens. A caller that had to
/// wait re-reads the store first and reuses a token obtained in the meantime.
pub struct TokenManager {
    client: reqwest::Client,
    store: AuthStore,
    flow: DynAuthFlow,
    client_id: String,
    redirect_uri: String,
    authorize_url: String,
    token_url: String,
    auth_timeout: Duration,
    cancel: CancellationToken,
    lock: Mutex<()>,
}

impl TokenManager {
    const AUTHORIZE_URL: &'static str = "https://accounts.spotify.com/authorize";
    const TOKEN_URL: &'static str = "https://accounts.spotify.com/api/token";
    const SCOPES: &'static str =
        "playlist-modify-public playlist-modify-private playlist-read-private user-read-private";
    const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(config: &ConfigArgs, store: AuthStore, flow: DynAuthFlow) -> Result<Self, AuthError> {
        let client = config.http_client(Self::TOKEN_TIMEOUT)?;
        Ok(Self {
            client,
            store,
            flow,
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri(),
            authorize_url: Self::AUTHORIZE_URL.to_string(),
            token_url: Self::TOKEN_URL.to_string(),
            auth_timeout: config.auth_timeout(),
            cancel: CancellationToken::new(),
            lock: Mutex::new(()),
        })
    }

    /// Point the manager at different accounts endpoints
    pub fn with_endpoints(mut self, authorize_url: &str, token_url: &str) -> Self {
        self.authorize_url = authorize_url.to_string();
        self.token_url = token_url.to_string();
        self
    }

    /// Cancelling this token aborts any pending interactive authorization
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn store(&self) -> &AuthStore {
        &self.store
    }

    /// Whether a non-expired access token is cached, without any network call
    pub async fn is_authenticated(&self) -> Result<bool, AuthError> {
        let state = self.store.load_tokens().await?;
        Ok(state.valid_token(now_millis()).is_some())
    }

    /// Whether the next token request has to show the consent page, i.e. there
    /// is neither a usable access token nor a refresh token to renew it
    pub async fn needs_authorization(&self) -> Result<bool, AuthError> {
        let state = self.store.load_tokens().await?;
        Ok(state.valid_token(now_millis()).is_none() && state.refresh_token.is_none())
    }

    /// Return a usable access token, refreshing or authorizing when needed
    pub async fn get_access_token(&self) -> Result<String, AuthError> {
        let state = self.store.load_tokens().await?;
        if let Some(token) = state.valid_token(now_millis()) {
            return Ok(token.to_string());
        }

        let _guard = self.lock.lock().await;
        // another caller may have renewed the token while we waited
        let state = self.store.load_tokens().await?;
        if let Some(token) = state.valid_token(now_millis()) {
            debug!("reusing token obtained by a concurrent request");
            return Ok(token.to_string());
        }

        if let Some(refresh_token) = &state.refresh_token {
            info!("access token expired, refreshing");
            match self.refresh_locked(refresh_token).await {
                Ok(token) => return Ok(token),
                Err(AuthError::Refresh(e)) => {
                    warn!("token refresh rejected, falling back to authorization: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        self.authorize_locked().await
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let _guard = self.lock.lock().await;
        self.refresh_locked(refresh_token).await
    }

    async fn refresh_locked(&self, refresh_token: &str) -> Result<String, AuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ];
        let res = self.client.post(&self.token_url).form(&params).send().await?;
        let status = res.status();
        let text = res.text().await?;
        let token: TokenResponse = serde_json::from_str(&text).unwrap_or_default();

        let Some(access_token) = token.access_token.as_deref() else {
            let reason = token
                .error_description
                .or(token.error)
                .unwrap_or_else(|| format!("no access token in response (HTTP {})", status));
            return Err(AuthError::Refresh(reason));
        };

        self.store
            .save_access_token(
                access_token,
                token.expires_at(now_millis()),
                token.refresh_token.as_deref(),
            )
            .await?;
        info!("access token refreshed");
        Ok(access_token.to_string())
    }

    /// Run the full PKCE authorization code flow
    pub async fn authorize(&self) -> Result<String, AuthError> {
        let _guard = self.lock.lock().await;
        self.authorize_locked().await
    }

    async fn authorize_locked(&self) -> Result<String, AuthError> {
        if self.client_id.trim().is_empty() || self.client_id == PLACEHOLDER_CLIENT_ID {
            return Err(AuthError::Config(
                "please set SPOTIFY_CLIENT_ID to the Client ID of your Spotify application"
                    .to_string(),
            ));
        }

        let pkce = PkceChallenge::generate();
        self.store.save_verifier(&pkce.verifier).await?;

        let result = self.await_redirect_and_exchange(&pkce).await;

        // the verifier is single use whatever the outcome
        if let Err(e) = self.store.purge_verifier().await {
            if result.is_ok() {
                return Err(e.into());
            }
            warn!("failed to purge PKCE verifier: {}", e);
        }
        result
    }

    async fn await_redirect_and_exchange(&self, pkce: &PkceChallenge) -> Result<String, AuthError> {
        let auth_url = self.build_authorize_url(&pkce.challenge)?;
        debug!("authorization URL: {}", auth_url);

        let redirect = tokio::select! {
            () = self.cancel.cancelled() => {
                return Err(AuthError::Auth("authorization was cancelled".to_string()));
            }
            res = tokio::time::timeout(self.auth_timeout, self.flow.launch(&auth_url)) => match res {
                Err(_) => {
                    return Err(AuthError::Auth(format!(
                        "authorization timed out after {} seconds",
                        self.auth_timeout.as_secs()
                    )));
                }
                Ok(Err(FlowError::Cancelled)) => {
                    return Err(AuthError::Auth("authorization was cancelled or failed".to_string()));
                }
                Ok(Err(FlowError::Failed(e))) => {
                    return Err(AuthError::Auth(format!(
                        "{}. Make sure you've added {} to your Spotify app's redirect URIs",
                        e, self.redirect_uri
                    )));
                }
                Ok(Ok(url)) => url,
            },
        };

        let code = Self::parse_callback(&redirect)?;
        self.exchange_code(&code).await
    }

    fn build_authorize_url(&self, challenge: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.authorize_url)
            .map_err(|e| AuthError::Config(format!("invalid authorization URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", Self::SCOPES)
            .append_pair("code_challenge", challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("show_dialog", "true");
        Ok(url)
    }

    /// Extract the authorization code from the provider redirect
    pub fn parse_callback(redirect: &Url) -> Result<String, AuthError> {
        let mut code = None;
        for (key, value) in redirect.query_pairs() {
            match key.as_ref() {
                "error" => {
                    return Err(AuthError::Auth(format!(
                        "Spotify authorization error: {}",
                        value
                    )));
                }
                "code" if !value.is_empty() => code = Some(value.into_owned()),
                _ => {}
            }
        }
        code.ok_or_else(|| {
            AuthError::Auth("no authorization code received from Spotify".to_string())
        })
    }

    /// Trade an authorization code for tokens, consuming the persisted verifier
    pub async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let verifier = self
            .store
            .take_verifier()
            .await?
            .ok_or_else(|| AuthError::Pkce("PKCE code verifier not found".to_string()))?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("code_verifier", verifier.as_str()),
        ];
        let res = self.client.post(&self.token_url).form(&params).send().await?;
        let status = res.status();
        let text = res.text().await?;
        let token: TokenResponse = serde_json::from_str(&text).unwrap_or_default();

        if let Some(access_token) = token.access_token.as_deref() {
            self.store
                .save_access_token(
                    access_token,
                    token.expires_at(now_millis()),
                    token.refresh_token.as_deref(),
                )
                .await?;
            info!("authorized with Spotify");
            return Ok(access_token.to_string());
        }

        if let Some(error) = token.error {
            return Err(AuthError::TokenExchange {
                error,
                description: token.error_description.unwrap_or_default(),
            });
        }
        Err(AuthError::Auth(format!(
            "failed to get access token (HTTP {})",
            status
        )))
    }

    /// Forget every token, the next request needs a new authorization
    pub async fn disconnect(&self) -> Result<(), AuthError> {
        let _guard = self.lock.lock().await;
        self.store.clear_tokens().await?;
        info!("disconnected from Spotify");
        Ok(())
    }
}
