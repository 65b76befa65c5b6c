//! Server configuration parsed from environment variables.
//!
//! Optional, all with defaults:
//! - `PORT`: 3000
//! - `DATA_DIR`: `./data` (scene state, map registry and map images)
//! - `OPEN5E_BASE_URL`: `https://api.open5e.com/v1`
//! - `MAX_UPLOAD_BYTES`: 20 MiB
//! - `MAX_MAP_DIMENSION`: 4096 px on the longest side
//! - `VIEWER_CHANNEL_CAPACITY`: 64 frames buffered per player socket
//!
//! Unparseable numbers fall back to their default.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_OPEN5E_BASE_URL: &str = "https://api.open5e.com/v1";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_MAX_MAP_DIMENSION: u32 = 4096;
pub const DEFAULT_VIEWER_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("OPEN5E_BASE_URL must be an http(s) URL, got '{0}'")]
    BaseUrl(String),
    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub open5e_base_url: String,
    pub max_upload_bytes: usize,
    pub max_map_dimension: u32,
    pub viewer_channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            open5e_base_url: DEFAULT_OPEN5E_BASE_URL.to_owned(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_map_dimension: DEFAULT_MAX_MAP_DIMENSION,
            viewer_channel_capacity: DEFAULT_VIEWER_CHANNEL_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Build config from the process environment.
    ///
    /// # Errors
    ///
    /// Fails on a malformed base URL or a zero map dimension or channel
    /// capacity.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let open5e_base_url = lookup("OPEN5E_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPEN5E_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        if !(open5e_base_url.starts_with("http://") || open5e_base_url.starts_with("https://")) {
            return Err(ConfigError::BaseUrl(open5e_base_url));
        }

        let max_map_dimension = env_parse(&lookup, "MAX_MAP_DIMENSION", DEFAULT_MAX_MAP_DIMENSION);
        if max_map_dimension == 0 {
            return Err(ConfigError::Zero { var: "MAX_MAP_DIMENSION" });
        }
        let viewer_channel_capacity = env_parse(&lookup, "VIEWER_CHANNEL_CAPACITY", DEFAULT_VIEWER_CHANNEL_CAPACITY);
        if viewer_channel_capacity == 0 {
            return Err(ConfigError::Zero { var: "VIEWER_CHANNEL_CAPACITY" });
        }

        Ok(Self {
            port: env_parse(&lookup, "PORT", DEFAULT_PORT),
            data_dir: lookup("DATA_DIR").map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            open5e_base_url,
            max_upload_bytes: env_parse(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            max_map_dimension,
            viewer_channel_capacity,
        })
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
{
    lookup(key).and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}
