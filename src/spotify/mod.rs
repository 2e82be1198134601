pub mod model;

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Result, eyre};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use self::model::{
    Playlist, SpotifyPage, SpotifySearchResponse, SpotifySnapshotResponse, SpotifyUser, Track,
};
use crate::ConfigArgs;
use crate::auth::TokenManager;
use crate::settings::Settings;
use crate::utils::{RetryAction, backoff, debug_response_json, retry_action};

/// Authenticated wrapper around the Spotify Web API
pub struct SpotifyApi {
    client: reqwest::Client,
    tokens: Arc<TokenManager>,
    base_url: String,
    max_retries: u32,
    config: ConfigArgs,
}

impl SpotifyApi {
    const BASE_API: &'static str = "https://api.spotify.com/v1";
    const RES_DEBUG_FILENAME: &'static str = "spotify_response";
    const PLAYLISTS_LIMIT: u32 = 50;

    pub fn new(config: ConfigArgs, settings: &Settings, tokens: Arc<TokenManager>) -> Result<Self> {
        let client = config.http_client(Duration::from_secs(settings.api_timeout))?;
        Ok(Self {
            client,
            tokens,
            base_url: Self::BASE_API.to_string(),
            max_retries: settings.max_retries.min(Settings::MAX_RETRIES),
            config,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn make_request<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("requesting: {} {}", method, url);

        let mut retry_count = 0;
        loop {
            let token = self.tokens.get_access_token().await?;
            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(token)
                .query(query);
            if let Some(body) = body {
                request = request.json(body);
            }

            let res = match request.send().await {
                Ok(res) => res,
                Err(e) if (e.is_timeout() || e.is_connect()) && retry_count < self.max_retries => {
                    let wait = backoff(retry_count);
                    retry_count += 1;
                    warn!(
                        "request failed: {} (attempt {}/{}), waiting {} seconds before retry",
                        e,
                        retry_count,
                        self.max_retries + 1,
                        wait.as_secs()
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = res.status();
            if status.is_success() {
                return debug_response_json(&self.config, res, Self::RES_DEBUG_FILENAME).await;
            }

            let retry_after = res
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let text = res.text().await.unwrap_or_default();

            match retry_action(status, retry_after, retry_count, self.max_retries) {
                RetryAction::Retry(wait) => {
                    tokio::time::sleep(wait).await;
                    retry_count += 1;
                }
                RetryAction::MaxRetriesExceeded => {
                    return Err(eyre!(
                        "Spotify API still failing after {} attempts: HTTP {}",
                        self.max_retries + 1,
                        status
                    ));
                }
                RetryAction::GiveUp => {
                    return Err(eyre!(
                        "Spotify API error {}: {}",
                        status,
                        text.chars().take(200).collect::<String>()
                    ));
                }
            }
        }
    }

    /// Return the best match for a free text query
    pub async fn search_track(&self, query: &str) -> Result<Option<Track>> {
        debug!("searching for track: {}", query);
        let res: SpotifySearchResponse = self
            .make_request(
                Method::GET,
                "/search",
                &[
                    ("q", query.to_string()),
                    ("type", "track".to_string()),
                    ("limit", "1".to_string()),
                ],
                None,
            )
            .await?;
        Ok(res.tracks.items.into_iter().next())
    }

    pub async fn add_to_playlist(&self, playlist_id: &str, track_uri: &str) -> Result<()> {
        let body = json!({ "uris": [track_uri] });
        let _: SpotifySnapshotResponse = self
            .make_request(
                Method::POST,
                &format!("/playlists/{}/tracks", playlist_id),
                &[],
                Some(&body),
            )
            .await?;
        Ok(())
    }

    pub async fn list_playlists(&self) -> Result<Vec<Playlist>> {
        let page: SpotifyPage<Playlist> = self
            .make_request(
                Method::GET,
                "/me/playlists",
                &[("limit", Self::PLAYLISTS_LIMIT.to_string())],
                None,
            )
            .await?;
        if page.next.is_some() {
            info!(
                "showing the first {} of {} playlists",
                page.items.len(),
                page.total
            );
        }
        Ok(page.items)
    }

    pub async fn current_user(&self) -> Result<SpotifyUser> {
        self.make_request(Method::GET, "/me", &[], None).await
    }

    /// Create a private playlist owned by the current user
    pub async fn create_playlist(&self, name: &str, description: &str) -> Result<Playlist> {
        let user = self.current_user().await?;
        let body = json!({
            "name": name,
            "description": description,
            "public": false,
        });
        let playlist: Playlist = self
            .make_request(
                Method::POST,
                &format!("/users/{}/playlists", user.id),
                &[],
                Some(&body),
            )
            .await?;
        info!("created playlist {} ({})", playlist.name, playlist.id);
        Ok(playlist)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::{AuthFlow, FlowError};
    use crate::store::{AuthStore, MemoryStore};
    use crate::utils::now_millis;

    struct NoFlow;

    #[async_trait::async_trait]
    impl AuthFlow for NoFlow {
        async fn launch(&self, _auth_url: &url::Url) -> Result<url::Url, FlowError> {
            Err(FlowError::Cancelled)
        }
    }

    pub(crate) async fn api(server: &MockServer) -> SpotifyApi {
        let config = ConfigArgs {
            client_id: "client".to_string(),
            ..ConfigArgs::default()
        };
        let store = AuthStore::new(Arc::new(MemoryStore::default()));
        store
            .save_access_token("token", now_millis() + 60_000, None)
            .await
            .unwrap();
        let tokens = Arc::new(TokenManager::new(&config, store, Arc::new(NoFlow)).unwrap());
        let settings = Settings {
            max_retries: 1,
            ..Settings::default()
        };
        SpotifyApi::new(config, &settings, tokens)
            .unwrap()
            .with_base_url(&server.uri())
    }

    fn track_json(id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "uri": format!("spotify:track:{}", id),
            "artists": [{ "id": "a1", "name": "Rick Astley" }],
            "album": { "id": "al1", "name": "Whenever You Need Somebody" },
            "duration_ms": 213_573,
        })
    }

    #[tokio::test]
    async fn search_returns_first_hit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Never Gonna Give You Up Rick Astley"))
            .and(query_param("type", "track"))
            .and(query_param("limit", "1"))
            .and(header("Authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tracks": { "items": [track_json("4uLU6hMCjMI75M1A2tKUQC", "Never Gonna Give You Up")], "next": null, "total": 1 }
            })))
            .mount(&server)
            .await;

        let track = api(&server)
            .await
            .search_track("Never Gonna Give You Up Rick Astley")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(track.uri, "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track.artist_names(), "Rick Astley");
    }

    #[tokio::test]
    async fn search_without_hit_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tracks": { "items": [], "next": null, "total": 0 }
            })))
            .mount(&server)
            .await;

        assert!(api(&server).await.search_track("zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn add_posts_track_uri() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/playlists/pl1/tracks"))
            .and(body_json(json!({ "uris": ["spotify:track:abc"] })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "snapshot_id": "s" })))
            .expect(1)
            .mount(&server)
            .await;

        api(&server)
            .await
            .add_to_playlist("pl1", "spotify:track:abc")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_playlist_uses_current_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user1", "display_name": "User" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/users/user1/playlists"))
            .and(body_json(json!({ "name": "From YouTube", "description": "d", "public": false })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "new", "name": "From YouTube", "description": "d", "public": false
            })))
            .mount(&server)
            .await;

        let playlist = api(&server)
            .await
            .create_playlist("From YouTube", "d")
            .await
            .unwrap();
        assert_eq!(playlist.id, "new");
    }

    #[tokio::test]
    async fn list_playlists_limits_to_fifty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/playlists"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "id": "p1", "name": "Mix", "owner": { "id": "user1", "display_name": null }, "tracks": { "total": 3 } }],
                "next": null,
                "total": 1
            })))
            .mount(&server)
            .await;

        let playlists = api(&server).await.list_playlists().await.unwrap();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].tracks.as_ref().map(|t| t.total), Some(3));
    }

    #[tokio::test]
    async fn rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user1" })))
            .mount(&server)
            .await;

        let user = api(&server).await.current_user().await.unwrap();
        assert_eq!(user.id, "user1");
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/playlists/missing/tracks"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
            .expect(1)
            .mount(&server)
            .await;

        let err = api(&server)
            .await
            .add_to_playlist("missing", "spotify:track:x")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn retry_budget_is_bounded() {
        let config = ConfigArgs {
            client_id: "client".to_string(),
            ..ConfigArgs::default()
        };
        let store = AuthStore::new(Arc::new(MemoryStore::default()));
        let tokens = Arc::new(TokenManager::new(&config, store, Arc::new(NoFlow)).unwrap());
        let settings = Settings {
            max_retries: 64,
            ..Settings::default()
        };

        let api = SpotifyApi::new(config, &settings, tokens).unwrap();
        assert_eq!(api.max_retries, Settings::MAX_RETRIES);
    }
}
