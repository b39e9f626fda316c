//! Configuration management for musync.
//!
//! Two sources are involved:
//!
//! 1. Environment variables, optionally read from a `.env` file in the local
//!    data directory (`~/.local/share/musync/.env` on Linux). These carry the
//!    OAuth client credentials and endpoint overrides.
//! 2. A per-library JSON file (`<library>/.musync/config.json`) holding the
//!    home items filter and discovery settings. It is created with defaults on
//!    first use.

use std::{
    env,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_API_URL: &str = "https://www.googleapis.com/youtube/v3";
const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";
const DEFAULT_YTDLP_PATH: &str = "yt-dlp";

/// Loads environment variables from `musync/.env` in the local data directory.
///
/// The directory is created if needed. A missing `.env` file is fine: every
/// value can also come from the process environment.
pub async fn load_env() -> Result<(), ConfigError> {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("musync/.env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    match dotenv::from_path(&path) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(dotenv::Error::Io(e)) => Err(ConfigError::Io(e)),
        Err(e) => Err(ConfigError::Io(std::io::Error::new(
            ErrorKind::InvalidData,
            e.to_string(),
        ))),
    }
}

/// Logger filter directives: `rust_log` when it is set, else `info` with
/// `debug` for this crate when `debug` is on.
pub fn log_filter(debug: bool, rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim).filter(|f| !f.is_empty()) {
        Some(filter) => filter.to_string(),
        None if debug => format!("info,{}=debug", env!("CARGO_CRATE_NAME")),
        None => "info".to_string(),
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn with_default(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Address the local OAuth callback server binds to (`SERVER_ADDRESS`).
pub fn server_addr() -> String {
    with_default("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)
}

/// OAuth client id of the Google "Desktop app" client (`GOOGLE_CLIENT_ID`).
pub fn google_client_id() -> Result<String, ConfigError> {
    required("GOOGLE_CLIENT_ID")
}

/// OAuth client secret (`GOOGLE_CLIENT_SECRET`). Google requires it for
/// desktop clients even with PKCE.
pub fn google_client_secret() -> Result<String, ConfigError> {
    required("GOOGLE_CLIENT_SECRET")
}

pub fn google_redirect_uri() -> String {
    with_default("GOOGLE_REDIRECT_URI", DEFAULT_REDIRECT_URI)
}

pub fn google_auth_url() -> String {
    with_default("GOOGLE_AUTH_URL", DEFAULT_AUTH_URL)
}

pub fn google_token_url() -> String {
    with_default("GOOGLE_TOKEN_URL", DEFAULT_TOKEN_URL)
}

pub fn youtube_api_url() -> String {
    with_default("YOUTUBE_API_URL", DEFAULT_API_URL)
}

pub fn youtube_scope() -> String {
    with_default("YOUTUBE_SCOPE", DEFAULT_SCOPE)
}

/// Program used to download audio (`YTDLP_PATH`).
pub fn ytdlp_path() -> String {
    with_default("YTDLP_PATH", DEFAULT_YTDLP_PATH)
}

/// Allow-lists of home item titles. `None` lets everything through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeItemsFilter {
    pub playlists: Option<Vec<String>>,
    pub channels: Option<Vec<String>>,
}

impl Default for HomeItemsFilter {
    fn default() -> Self {
        let mut playlists: Vec<String> = ["Your Likes", "Archive Mix", "Replay Mix", "My Supermix"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        playlists.extend((1..=6).map(|i| format!("My Mix {}", i)));

        Self {
            playlists: Some(playlists),
            channels: None,
        }
    }
}

impl HomeItemsFilter {
    pub fn allows_playlist(&self, title: &str) -> bool {
        Self::allows(&self.playlists, title)
    }

    pub fn allows_channel(&self, title: &str) -> bool {
        Self::allows(&self.channels, title)
    }

    /// Updates one allow-list from a typed answer. An empty answer keeps the
    /// list, `*` allows every title, anything else is a comma separated list
    /// of titles. Returns whether the list changed.
    pub fn apply_answer(list: &mut Option<Vec<String>>, answer: &str) -> bool {
        let answer = answer.trim();
        let updated = match answer {
            "" => return false,
            "*" => None,
            _ => {
                let mut titles: Vec<String> = answer
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                crate::utils::dedupe_by_key(&mut titles, |t| t.clone());
                Some(titles)
            }
        };

        let changed = *list != updated;
        *list = updated;
        changed
    }

    /// Human readable form of an allow-list.
    pub fn describe(list: &Option<Vec<String>>) -> String {
        match list {
            None => "all".to_string(),
            Some(titles) if titles.is_empty() => "none".to_string(),
            Some(titles) => titles.join(", "),
        }
    }

    fn allows(filter: &Option<Vec<String>>, title: &str) -> bool {
        filter
            .as_ref()
            .is_none_or(|titles| titles.iter().any(|t| t == title))
    }
}

fn default_each_playlist_limit() -> usize {
    200
}

/// Settings of one music library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub home_items_filter: HomeItemsFilter,
    /// Playlist ids that are always synced, e.g. generated mixes.
    #[serde(default)]
    pub extra_playlists: Vec<String>,
    #[serde(default = "default_each_playlist_limit")]
    pub each_playlist_limit: usize,
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            home_items_filter: HomeItemsFilter::default(),
            extra_playlists: Vec::new(),
            each_playlist_limit: default_each_playlist_limit(),
            proxy: None,
        }
    }
}

impl LibraryConfig {
    pub fn config_path(home_dir: &Path) -> PathBuf {
        home_dir.join(".musync").join("config.json")
    }

    /// Reads the config file, writing a default one if there is none.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        match async_fs::read_to_string(path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("config {} not found, creating new config", path.display());
                let config = Self::default();
                config.save(path).await?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        async_fs::write(path, json).await?;
        Ok(())
    }
}
