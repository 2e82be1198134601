mod ollama;

use std::time::Duration;

use async_trait::async_trait;
use color_eyre::eyre::Result;
use tracing::{debug, warn};

pub use ollama::{OllamaClient, SongGuess};

use crate::ConfigArgs;
use crate::settings::Settings;
use crate::title::{ParsedSong, extract_song_info};

/// Turns scraped video information into a song guess
#[async_trait]
pub trait TitleResolver: Send + Sync {
    async fn resolve(&self, title: &str, channel_name: &str) -> ParsedSong;
}

pub type DynTitleResolver = Box<dyn TitleResolver>;

/// Pattern based guess, always available
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicResolver;

#[async_trait]
impl TitleResolver for HeuristicResolver {
    async fn resolve(&self, title: &str, channel_name: &str) -> ParsedSong {
        extract_song_info(title, channel_name)
    }
}

/// Asks a local language model first and falls back to the heuristic on any failure
pub struct AssistedResolver {
    ollama: OllamaClient,
    fallback: HeuristicResolver,
}

impl AssistedResolver {
    pub fn new(ollama: OllamaClient) -> Self {
        Self {
            ollama,
            fallback: HeuristicResolver,
        }
    }
}

#[async_trait]
impl TitleResolver for AssistedResolver {
    async fn resolve(&self, title: &str, channel_name: &str) -> ParsedSong {
        let heuristic = self.fallback.resolve(title, channel_name).await;
        match self.ollama.guess_song(title, channel_name).await {
            Ok(guess) => {
                debug!("assisted guess: {:?}", guess);
                ParsedSong {
                    song_title: non_empty_or(guess.song_title, heuristic.song_title),
                    artist: non_empty_or(guess.artist, heuristic.artist),
                }
            }
            Err(e) => {
                warn!("smart matching unavailable, using title patterns: {}", e);
                heuristic
            }
        }
    }
}

fn non_empty_or(value: String, fallback: String) -> String {
    if value.trim().is_empty() {
        fallback
    } else {
        value.trim().to_string()
    }
}

/// Pick the resolver matching the user settings
pub fn build_resolver(config: &ConfigArgs, settings: &Settings) -> Result<DynTitleResolver> {
    if !settings.enable_smart_matching {
        return Ok(Box::new(HeuristicResolver));
    }
    let ollama = OllamaClient::new(config, Duration::from_secs(settings.api_timeout))?;
    Ok(Box::new(AssistedResolver::new(ollama)))
}
