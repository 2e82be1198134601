pub mod add;
pub mod auth;
pub mod error;
pub mod resolver;
pub mod settings;
pub mod spotify;
pub mod store;
pub mod title;
pub mod utils;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

pub use auth::TokenManager;
pub use error::{AuthError, StoreError};
pub use title::{ParsedSong, extract_song_info};

/// Client identifier shipped in the default configuration, it must be replaced
/// by the identifier of a registered Spotify application
pub const PLACEHOLDER_CLIENT_ID: &str = "YOUR_SPOTIFY_CLIENT_ID";

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// The client ID of the Spotify API application
    #[arg(long, env = "SPOTIFY_CLIENT_ID", default_value = PLACEHOLDER_CLIENT_ID)]
    pub client_id: String,

    /// Callback host for the Spotify authorization redirect
    #[arg(long, env = "SPOTIFY_CALLBACK_HOST", default_value = "127.0.0.1")]
    pub callback_host: String,

    /// Callback port for the Spotify authorization redirect
    #[arg(long, env = "SPOTIFY_CALLBACK_PORT", default_value_t = 8888)]
    pub callback_port: u16,

    /// Print the authorization URL instead of opening the browser
    #[arg(long, env = "NO_BROWSER")]
    pub no_browser: bool,

    /// Seconds to wait for the user to complete the authorization dialog
    #[arg(long, env = "AUTH_TIMEOUT", default_value_t = 120)]
    pub auth_timeout: u64,

    /// Directory holding the persisted tokens and settings
    #[arg(long, env = "YT_TO_SPOTIFY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the local Ollama server used for smart matching
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    /// Model name passed to Ollama
    #[arg(long, env = "OLLAMA_MODEL", default_value = "gemma:2b")]
    pub ollama_model: String,

    /// Proxy URL used for every HTTP request
    #[arg(long, env = "HTTP_PROXY_URL")]
    pub proxy: Option<String>,

    /// Dump raw API responses to files in the working directory
    #[arg(long, env = "DEBUG_RESPONSES")]
    pub debug: bool,
}

impl ConfigArgs {
    pub fn redirect_uri(&self) -> String {
        format!(
            "http://{}:{}/callback",
            self.callback_host, self.callback_port
        )
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout)
    }

    /// Resolve the data directory, defaulting to the system config directory
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::config_dir().map(|d| d.join("yt_to_spotify")))
    }

    /// Build an HTTP client honoring the proxy setting
    pub fn http_client(&self, timeout: Duration) -> reqwest::Result<reqwest::Client> {
        let mut client = reqwest::Client::builder().timeout(timeout);
        if let Some(proxy) = &self.proxy {
            client = client
                .proxy(reqwest::Proxy::all(proxy)?)
                .danger_accept_invalid_certs(true);
        }
        client.build()
    }
}

impl Default for ConfigArgs {
    fn default() -> Self {
        Self {
            client_id: PLACEHOLDER_CLIENT_ID.to_string(),
            callback_host: "127.0.0.1".to_string(),
            callback_port: 8888,
            no_browser: false,
            auth_timeout: 120,
            data_dir: None,
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "gemma:2b".to_string(),
            proxy: None,
            debug: false,
        }
    }
}
