use std::time::Duration;

use color_eyre::eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::ConfigArgs;

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Fields of the JSON object the model is asked to answer with
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongGuess {
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub song_title: String,
}

/// Client of a local Ollama server
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &ConfigArgs, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: config.http_client(timeout)?,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
        })
    }

    fn prompt(title: &str, channel_name: &str) -> String {
        format!(
            r#"Extract the artist and song title from the following YouTube music video information.

YouTube Title: "{}"
YouTube Channel: "{}"

Respond ONLY with a JSON object like:
{{
  "artist": "artist name",
  "songTitle": "song title"
}}
If no clear artist or title, use the channel name as artist."#,
            title, channel_name
        )
    }

    pub async fn guess_song(&self, title: &str, channel_name: &str) -> Result<SongGuess> {
        let body = json!({
            "model": self.model,
            "prompt": Self::prompt(title, channel_name),
            "stream": false,
        });
        let res = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(eyre!("Ollama API error: {}", status));
        }

        let generated: GenerateResponse = res.json().await?;
        debug!("ollama answered: {}", generated.response);
        // the model answer is itself a JSON document
        let guess: SongGuess = serde_json::from_str(generated.response.trim())?;
        Ok(guess)
    }
}
