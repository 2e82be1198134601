mod args;

use std::sync::Arc;

use args::{Command, PlaylistsAction, RootArgs, SettingsAction, TargetAction};
use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use yt_to_spotify::add::add_to_target_playlist;
use yt_to_spotify::auth::LoopbackFlow;
use yt_to_spotify::resolver::build_resolver;
use yt_to_spotify::settings::{Settings, TargetPlaylist};
use yt_to_spotify::spotify::SpotifyApi;
use yt_to_spotify::store::{AuthStore, DynStore, FileStore};
use yt_to_spotify::{ConfigArgs, TokenManager};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = RootArgs::parse();

    let level: Level = args.logging.into();
    tracing_subscriber::fmt().with_max_level(level).init();

    let data_dir = args
        .config
        .data_dir()
        .ok_or(eyre!("couldn't find system config dir"))?;
    let store: DynStore = Arc::new(FileStore::new(&data_dir)?);
    let auth_store = AuthStore::new(store.clone());
    auth_store.on_install(env!("CARGO_PKG_VERSION")).await?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let flow = Arc::new(
        LoopbackFlow::new(args.config.callback_host.clone(), args.config.callback_port)
            .with_browser(!args.config.no_browser),
    );
    let tokens = Arc::new(
        TokenManager::new(&args.config, auth_store, flow)?.with_cancellation(cancel),
    );

    run(args.command, args.config, store, tokens).await
}

async fn run(
    command: Command,
    config: ConfigArgs,
    store: DynStore,
    tokens: Arc<TokenManager>,
) -> Result<()> {
    let settings = Settings::load(store.as_ref()).await?;

    match command {
        Command::Authorize => match tokens.authorize().await {
            Ok(_) => info!("successfully connected to Spotify"),
            Err(e) => {
                if e.is_recoverable() {
                    warn!("authorization did not complete, run `authorize` again to retry");
                }
                return Err(e.into());
            }
        },
        Command::Disconnect => tokens.disconnect().await?,
        Command::Status => {
            let connected = tokens.is_authenticated().await?;
            println!(
                "Spotify: {}",
                if connected { "connected" } else { "not connected" }
            );
            match TargetPlaylist::load(store.as_ref()).await? {
                Some(target) => println!("Target playlist: {} ({})", target.name, target.id),
                None => println!("Target playlist: not set"),
            }
        }
        Command::RedirectUri => {
            println!("{}", tokens.redirect_uri());
            println!();
            println!("Add this URI to the Redirect URIs of your app at https://developer.spotify.com/dashboard");
        }
        Command::Parse { title, channel } => {
            let resolver = build_resolver(&config, &settings)?;
            let song = resolver.resolve(&title, &channel).await;
            println!("Title:  {}", song.song_title);
            println!("Artist: {}", song.artist);
        }
        Command::Add { title, channel } => {
            let resolver = build_resolver(&config, &settings)?;
            let song = resolver.resolve(&title, &channel).await;
            let api = SpotifyApi::new(config, &settings, tokens)?;
            match add_to_target_playlist(&api, store.as_ref(), &song).await {
                Ok(outcome) => {
                    if settings.notify(true) {
                        println!(
                            "Added {} by {} to {}",
                            outcome.track.name,
                            outcome.track.artist_names(),
                            outcome.playlist.name
                        );
                    }
                }
                Err(e) => {
                    if settings.notify(false) {
                        error!("{}", e);
                    }
                    return Err(e);
                }
            }
        }
        Command::Playlists { action } => {
            if tokens.needs_authorization().await? {
                warn!("not connected to Spotify, the authorization page will open");
            }
            let api = SpotifyApi::new(config, &settings, tokens)?;
            match action {
                PlaylistsAction::List => {
                    for playlist in api.list_playlists().await? {
                        let total = playlist.tracks.map_or(0, |t| t.total);
                        println!("{}\t{} ({} tracks)", playlist.id, playlist.name, total);
                    }
                }
                PlaylistsAction::Create {
                    name,
                    description,
                    select,
                } => {
                    let playlist = api.create_playlist(&name, &description).await?;
                    println!("{}\t{}", playlist.id, playlist.name);
                    if select {
                        TargetPlaylist {
                            id: playlist.id,
                            name: playlist.name,
                        }
                        .save(store.as_ref())
                        .await?;
                    }
                }
            }
        }
        Command::Target { action } => match action {
            TargetAction::Show => match TargetPlaylist::load(store.as_ref()).await? {
                Some(target) => println!("{}\t{}", target.id, target.name),
                None => println!("no target playlist set"),
            },
            TargetAction::Set { id, name } => {
                TargetPlaylist { id, name }.save(store.as_ref()).await?;
            }
            TargetAction::Clear => TargetPlaylist::clear(store.as_ref()).await?,
        },
        Command::Settings { action } => match action {
            SettingsAction::Show => println!("{}", serde_json::to_string_pretty(&settings)?),
            SettingsAction::Set { key, value } => {
                let mut settings = settings;
                settings.set(&key, &value)?;
                settings.save(store.as_ref()).await?;
            }
            SettingsAction::Reset => Settings::reset_all(store.as_ref()).await?,
        },
    }

    Ok(())
}
