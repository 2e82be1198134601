use thiserror::Error;

/// Failures of the token lifecycle, every kind reaches the caller as is
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or placeholder client identifier, the user must fix the configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// The user denied or cancelled the authorization, or the callback was malformed
    #[error("authorization failed: {0}")]
    Auth(String),

    /// The code verifier was gone when the authorization code came back
    #[error("PKCE error: {0}")]
    Pkce(String),

    /// The token endpoint rejected the authorization code
    #[error("token exchange failed: {error} - {description}")]
    TokenExchange { error: String, description: String },

    /// The token endpoint did not hand out a new access token
    #[error("token refresh failed: {0}")]
    Refresh(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Whether retrying the same operation can succeed without changing the configuration
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AuthError::Config(_) | AuthError::Store(_))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
