use color_eyre::eyre::{Result, eyre};
use tracing::info;

use crate::settings::TargetPlaylist;
use crate::spotify::SpotifyApi;
use crate::spotify::model::Track;
use crate::store::KeyValueStore;
use crate::title::ParsedSong;

#[derive(Debug)]
pub struct AddOutcome {
    pub track: Track,
    pub playlist: TargetPlaylist,
}

/// Search the guessed song and append the best hit to the target playlist
pub async fn add_to_target_playlist(
    api: &SpotifyApi,
    store: &dyn KeyValueStore,
    song: &ParsedSong,
) -> Result<AddOutcome> {
    let playlist = TargetPlaylist::load(store)
        .await?
        .ok_or_else(|| eyre!("No target playlist set. Please configure one with `target set`."))?;

    let query = song.search_query();
    let track = api
        .search_track(&query)
        .await?
        .ok_or_else(|| eyre!("{} not found on Spotify", song.song_title))?;

    api.add_to_playlist(&playlist.id, &track.uri).await?;
    info!(
        "{} by {} added to {}",
        track.name,
        track.artist_names(),
        playlist.name
    );
    Ok(AddOutcome { track, playlist })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::spotify::tests::api;
    use crate::store::MemoryStore;
    use crate::title::extract_song_info;

    async fn store_with_target() -> MemoryStore {
        let store = MemoryStore::default();
        TargetPlaylist {
            id: "pl1".to_string(),
            name: "From YouTube".to_string(),
        }
        .save(&store)
        .await
        .unwrap();
        store
    }

    #[tokio::test]
    async fn adds_best_hit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Lose Yourself Eminem"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tracks": { "items": [{
                    "id": "5Z01UMMf7V1o0MzF86s6WJ",
                    "name": "Lose Yourself",
                    "uri": "spotify:track:5Z01UMMf7V1o0MzF86s6WJ",
                    "artists": [{ "id": "e", "name": "Eminem" }],
                    "album": null
                }] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/playlists/pl1/tracks"))
            .and(body_json(json!({ "uris": ["spotify:track:5Z01UMMf7V1o0MzF86s6WJ"] })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "snapshot_id": "s" })))
            .expect(1)
            .mount(&server)
            .await;

        let song = extract_song_info("Lose Yourself by Eminem [Lyrics]", "EminemMusic");
        let outcome = add_to_target_playlist(&api(&server).await, &store_with_target().await, &song)
            .await
            .unwrap();
        assert_eq!(outcome.track.name, "Lose Yourself");
        assert_eq!(outcome.playlist.name, "From YouTube");
    }

    #[tokio::test]
    async fn missing_target_is_reported_before_searching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let song = extract_song_info("Bad Guy", "Billie Eilish");
        let err = add_to_target_playlist(&api(&server).await, &MemoryStore::default(), &song)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No target playlist"));
    }

    #[tokio::test]
    async fn unknown_song_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tracks": { "items": [] } })))
            .mount(&server)
            .await;

        let song = extract_song_info("Obscure Demo Tape", "Nobody");
        let err = add_to_target_playlist(&api(&server).await, &store_with_target().await, &song)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found on Spotify"));
    }
}
