use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{Context, OptionExt, eyre};
use serde::{Deserialize, Serialize};
use url::Url;

const APP_DIR: &str = "plex-tui";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub plex: PlexConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub loading: LoadingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlexConfig {
    /// e.g. "http://127.0.0.1:32400"
    pub server_url: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub command: String,
    pub args: Vec<String>,
    /// How long a terminated player gets to exit before it is killed.
    pub terminate_grace_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: "ffplay".to_string(),
            args: ["-nodisp", "-autoexit", "-loglevel", "quiet"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            terminate_grace_ms: 1500,
        }
    }
}

impl PlayerConfig {
    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingConfig {
    /// Playlists declaring more tracks than this are loaded through a library search.
    pub large_playlist_threshold: u32,
    /// Tracks loaded for large playlists (kept small for speed).
    pub large_playlist_limit: u32,
    /// Tracks loaded for regular playlists.
    pub regular_playlist_limit: u32,
    /// Upper bound for any single request.
    pub max_api_results: u32,
    pub page_size: u32,
    pub search_limit: u32,
    /// Allow one metadata request per track when the artist is missing (regular loads only).
    pub resolve_remote_artists: bool,
    pub artist_lookup_concurrency: usize,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            large_playlist_threshold: 1000,
            large_playlist_limit: 50,
            regular_playlist_limit: 100,
            max_api_results: 1000,
            page_size: 50,
            search_limit: 20,
            resolve_remote_artists: true,
            artist_lookup_concurrency: 4,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err(format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .wrap_err(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join(APP_DIR).join("config.toml"))
    }

    /// Load the default config file, falling back to defaults when it does not exist
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write a default config file, unless one already exists. Returns its path.
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_eyre("No config directory on this platform")?;
        Self::write_default_to(&path)?;
        Ok(path)
    }

    fn write_default_to(path: &Path) -> Result<()> {
        if path.exists() {
            tracing::info!("Config already exists at {}", path.display());
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err(format!("Failed to create {}", parent.display()))?;
        }

        let mut config = Config::default();
        config.plex.server_url = Some("http://127.0.0.1:32400".to_string());
        let contents = toml::to_string_pretty(&config).wrap_err("Failed to serialize config")?;
        std::fs::write(path, contents)
            .wrap_err(format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Parsed server URL, always ending in `/` so relative joins keep any path prefix.
    pub fn server_url(&self) -> Result<Url> {
        let raw = self
            .plex
            .server_url
            .as_deref()
            .ok_or_eyre("No Plex server URL configured. Set plex.server_url or --server-url")?;
        let mut url = Url::parse(raw).wrap_err(format!("Invalid Plex server URL: {}", raw))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn token(&self) -> Result<&str> {
        self.plex
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| eyre!("No Plex token configured. Set plex.token or PLEX_TOKEN"))
    }

    /// Default log file location
    pub fn log_file_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|path| path.join(APP_DIR).join("plex-tui.log"))
    }
}
