mod config;
mod logging;
mod model;
mod player;
mod plex_rs;
mod ports;
mod services;
mod tui;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    logging::init_tracing,
    player::{
        PlayerHandle,
        process::{CommandLauncher, find_player},
    },
    services::{playlist_loader::PlaylistLoader, plex::client::PlexHttpAdapter},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "PLEX_TUI_CONFIG")]
    config: Option<PathBuf>,

    /// Plex server URL, e.g. http://127.0.0.1:32400 (overrides the config file)
    #[arg(long, env = "PLEX_BASE_URL")]
    server_url: Option<String>,

    /// Plex authentication token (overrides the config file)
    #[arg(long, env = "PLEX_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log filter, e.g. "info" or "plex_tui=debug"
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// Path to log file
    #[arg(long, env = "PLEX_TUI_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// OTLP gRPC endpoint to export spans to
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", global = true)]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let log_file = args.log_file.clone().or_else(Config::log_file_path);
    let tracer_provider = init_tracing(
        "plex-tui",
        args.otlp_endpoint.as_deref(),
        &args.log_level,
        log_file.as_deref(),
    )?;

    tracing::debug!("plex-tui starting");
    let result = run(args).await;

    if let Some(tracer_provider) = tracer_provider
        && let Err(e) = tracer_provider.shutdown()
    {
        eprintln!("Failed to flush traces: {:?}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Some(Commands::Config(ConfigCommands::CreateDefault)) => {
            let path = Config::create_default()?;
            tracing::info!("Default config at {}", path.display());
            println!("{}", path.display());
            return Ok(());
        }
        Some(Commands::Config(ConfigCommands::Path)) => {
            match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            }
            return Ok(());
        }
        None => {}
    }

    let mut config = {
        if let Some(config) = &args.config {
            Config::from_file(config)
        } else {
            Config::load()
        }
    }
    .wrap_err("Failed to load plex-tui config")?;

    if let Some(server_url) = args.server_url {
        config.plex.server_url = Some(server_url);
    }
    if let Some(token) = args.token {
        config.plex.token = Some(token);
    }

    let server_url = config.server_url()?;
    tracing::info!("Using Plex server {}", server_url);
    let client = Arc::new(PlexHttpAdapter::new(
        server_url,
        config.token()?.to_string(),
    ));
    let loader = Arc::new(PlaylistLoader::new(client, config.loading.clone()));

    if find_player(&config.player.command).is_none() {
        tracing::warn!(
            "Player `{}` not found, playback will fail until it is installed",
            config.player.command
        );
    }
    let (player_events_tx, player_events) = mpsc::unbounded_channel();
    let (player, player_task) = PlayerHandle::spawn(
        CommandLauncher::new(&config.player),
        config.player.terminate_grace(),
        player_events_tx,
    );

    let result = tui::run(loader, player.clone(), player_events).await;

    // Make sure no player outlives the UI.
    player.shutdown();
    if let Err(e) = player_task.await {
        tracing::error!("Playback controller failed: {}", e);
    }

    result
}
