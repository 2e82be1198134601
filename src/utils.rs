use std::time::{Duration, SystemTime, UNIX_EPOCH};

use color_eyre::eyre::Result;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::ConfigArgs;

/// Current time in epoch milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Deserialize a response body, dumping it to `<filename>.json` in debug mode
pub async fn debug_response_json<T>(
    config: &ConfigArgs,
    res: reqwest::Response,
    filename: &str,
) -> Result<T>
where
    T: DeserializeOwned,
{
    let text = res.text().await?;
    if config.debug {
        let path = format!("{}.json", filename);
        if let Err(e) = std::fs::write(&path, &text) {
            warn!("failed to write debug response to {}: {}", path, e);
        } else {
            debug!("response saved to {}", path);
        }
    }
    Ok(serde_json::from_str(&text)?)
}

/// Action to take after a failed request
#[derive(Debug, PartialEq, Eq)]
pub enum RetryAction {
    /// Retry the request after the specified backoff duration
    Retry(Duration),
    /// The failure is not transient, give up immediately
    GiveUp,
    /// Maximum retries exceeded, abort the request
    MaxRetriesExceeded,
}

const MAX_BACKOFF_SECS: u64 = 30;

/// Exponential backoff before attempt `retry_count + 2`: 2^(retry_count + 1)
/// seconds, capped at `MAX_BACKOFF_SECS`
pub fn backoff(retry_count: u32) -> Duration {
    let secs = 2u64
        .checked_pow(retry_count.saturating_add(1))
        .map_or(MAX_BACKOFF_SECS, |s| s.min(MAX_BACKOFF_SECS));
    Duration::from_secs(secs)
}

/// Decide whether a response status warrants another attempt
///
/// Rate limiting (429) and server errors are transient. The backoff grows as
/// 2^(retry_count + 1) seconds, capped at `MAX_BACKOFF_SECS`; a `Retry-After`
/// value from the server takes precedence.
pub fn retry_action(
    status: reqwest::StatusCode,
    retry_after: Option<u64>,
    retry_count: u32,
    max_retries: u32,
) -> RetryAction {
    let transient = status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
    if !transient {
        return RetryAction::GiveUp;
    }
    if retry_count >= max_retries {
        return RetryAction::MaxRetriesExceeded;
    }

    let backoff_secs = retry_after
        .map_or_else(|| backoff(retry_count).as_secs(), |secs| secs.min(MAX_BACKOFF_SECS));
    warn!(
        "request failed with {} (attempt {}/{}), waiting {} seconds before retry",
        status,
        retry_count + 1,
        max_retries + 1,
        backoff_secs
    );
    RetryAction::Retry(Duration::from_secs(backoff_secs))
}
