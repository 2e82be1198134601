use serde::Deserialize;

/// Body returned by the accounts token endpoint, success and failure alike
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    /// Only present on code exchange, or when the provider rotates it
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: Option<u64>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl TokenResponse {
    const DEFAULT_EXPIRES_IN: u64 = 3600;

    pub fn expires_at(&self, now: u64) -> u64 {
        now + self.expires_in.unwrap_or(Self::DEFAULT_EXPIRES_IN) * 1000
    }
}
