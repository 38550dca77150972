//! Configuration management for the Last.fm linking service.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory. The configuration system follows a
//! hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use crate::error::{ConfigError, ListenerError};

pub const DEFAULT_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";
pub const DEFAULT_AUTH_URL: &str = "https://www.last.fm/api/auth/";

/// Cache lifetimes per category of Last.fm call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTtls {
    pub default: Duration,
    /// Recent tracks and now-playing.
    pub recent: Duration,
    /// Top artists/albums/tracks aggregates.
    pub top: Duration,
    /// Artist, album and track metadata.
    pub metadata: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(300),
            recent: Duration::from_secs(60),
            top: Duration::from_secs(1800),
            metadata: Duration::from_secs(3600),
        }
    }
}

/// Typed application settings.
///
/// Built by [`Config::from_env`]; every field maps to one environment
/// variable listed in `.env.example`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Last.fm API key (`FMKEY`), sent with every request
    pub api_key: String,
    /// Shared secret (`FMSECRET`), only ever used to compute `api_sig`
    pub api_secret: String,
    /// Web service root (`LASTFM_API_URL`)
    pub api_url: String,
    /// Page the user opens to allow access (`LASTFM_AUTH_URL`)
    pub auth_url: String,
    /// Redirect target passed as `cb` (`OAUTH_CALLBACK_URL`). Without it
    /// Last.fm uses the URL registered for the API key.
    pub callback_url: Option<String>,
    /// Listener bind host (`OAUTH_HOST`)
    pub host: String,
    /// Listener bind port (`OAUTH_PORT`)
    pub port: u16,
    /// Other requesters allowed on one Last.fm account (`MAX_ALT_ACCOUNTS`)
    pub max_alt_accounts: usize,
    /// How long a started link stays open (`LINK_EXPIRY_SECS`)
    pub link_expiry: Duration,
    /// Delay between background session checks (`LINK_POLL_INTERVAL_SECS`)
    pub poll_interval: Duration,
    /// Response cache capacity (`CACHE_MAX_ENTRIES`)
    pub cache_max_entries: usize,
    pub cache_ttls: CacheTtls,
    /// Linked accounts file (`UTAFM_USERS_FILE`)
    pub users_file: PathBuf,
}

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the `utafm` data directory if needed. A missing `.env` file is not
/// an error since every value can come from the process environment.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/utafm/.env`
/// - macOS: `~/Library/Application Support/utafm/.env`
/// - Windows: `%LOCALAPPDATA%/utafm/.env`
pub async fn load_env() -> Result<(), String> {
    let mut path = data_dir();
    async_fs::create_dir_all(&path)
        .await
        .map_err(|e| e.to_string())?;

    path.push(".env");
    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Platform-specific data directory for this application.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("utafm");
    path
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("FMKEY").ok_or(ConfigError::Missing("FMKEY"))?;
        let api_secret = get("FMSECRET").ok_or(ConfigError::Missing("FMSECRET"))?;

        let defaults = CacheTtls::default();
        let cache_ttls = CacheTtls {
            default: secs(&get, "CACHE_TTL_DEFAULT_SECS", defaults.default)?,
            recent: secs(&get, "CACHE_TTL_RECENT_SECS", defaults.recent)?,
            top: secs(&get, "CACHE_TTL_TOP_SECS", defaults.top)?,
            metadata: secs(&get, "CACHE_TTL_METADATA_SECS", defaults.metadata)?,
        };

        Ok(Self {
            api_key,
            api_secret,
            api_url: get("LASTFM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            auth_url: get("LASTFM_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            callback_url: get("OAUTH_CALLBACK_URL"),
            host: get("OAUTH_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&get, "OAUTH_PORT", 3001)?,
            max_alt_accounts: parsed(&get, "MAX_ALT_ACCOUNTS", 2)?,
            link_expiry: secs(&get, "LINK_EXPIRY_SECS", Duration::from_secs(300))?,
            poll_interval: secs(&get, "LINK_POLL_INTERVAL_SECS", Duration::from_secs(3))?,
            cache_max_entries: parsed(&get, "CACHE_MAX_ENTRIES", 5000)?,
            cache_ttls,
            users_file: get("UTAFM_USERS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir().join("users.json")),
        })
    }

    /// Address the callback listener binds to.
    pub fn server_addr(&self) -> Result<SocketAddr, ListenerError> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        Ok(SocketAddr::from_str(&format!("{host}:{}", self.port))?)
    }

    /// Base URL a process on this machine uses to reach a running listener.
    /// Wildcard bind addresses are reached through loopback.
    pub fn listener_url(&self) -> String {
        let host = match self.host.as_str() {
            "" | "0.0.0.0" => "127.0.0.1",
            "::" | "[::]" => "[::1]",
            h if h.contains(':') && !h.starts_with('[') => return format!("http://[{h}]:{}", self.port),
            h => h,
        };
        format!("http://{host}:{}", self.port)
    }
}

fn parsed<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

fn secs<G>(get: &G, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    parsed(get, var, default.as_secs()).map(Duration::from_secs)
}
