use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use yt_to_spotify::ConfigArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Logging level
    #[arg(short, long, value_enum, default_value_t = LoggingLevel::Info, env = "LOGGING_LEVEL")]
    pub logging: LoggingLevel,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Connect to Spotify through the browser consent page
    Authorize,
    /// Forget the stored Spotify tokens
    Disconnect,
    /// Show the connection status and the target playlist
    Status,
    /// Print the redirect URI to register in the Spotify developer dashboard
    RedirectUri,
    /// Show the song guessed from a video title
    Parse {
        /// The video title as displayed on the watch page
        #[arg(long)]
        title: String,
        /// The channel name of the video
        #[arg(long, default_value = "")]
        channel: String,
    },
    /// Add the song of a video to the target playlist
    Add {
        /// The video title as displayed on the watch page
        #[arg(long)]
        title: String,
        /// The channel name of the video
        #[arg(long, default_value = "")]
        channel: String,
    },
    /// Manage Spotify playlists
    Playlists {
        #[command(subcommand)]
        action: PlaylistsAction,
    },
    /// Manage the playlist songs are added to
    Target {
        #[command(subcommand)]
        action: TargetAction,
    },
    /// Manage user settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum PlaylistsAction {
    /// List your playlists
    List,
    /// Create a private playlist
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "Songs added from YouTube")]
        description: String,
        /// Use the new playlist as target
        #[arg(long)]
        select: bool,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum TargetAction {
    Show,
    Set { id: String, name: String },
    Clear,
}

#[derive(Subcommand, Clone, Debug)]
pub enum SettingsAction {
    Show,
    Set { key: String, value: String },
    /// Reset every setting, token and target playlist
    Reset,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum LoggingLevel {
    /// Only log errors
    Error,
    /// Log errors and warnings
    Warn,
    /// Log errors, warnings and info
    Info,
    /// Log errors, warnings, info and debug (very verbose)
    Debug,
}

impl From<LoggingLevel> for Level {
    fn from(level: LoggingLevel) -> Self {
        match level {
            LoggingLevel::Warn => Level::WARN,
            LoggingLevel::Error => Level::ERROR,
            LoggingLevel::Info => Level::INFO,
            LoggingLevel::Debug => Level::DEBUG,
        }
    }
}
