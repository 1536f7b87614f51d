use crate::constants::DEFAULT_BASE_URL;
use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;

/// Runtime configuration. Everything but the geocoding API key lives in
/// `config.toml`; the key is a secret and comes from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Country prefix used when building geocoding queries.
    #[serde(default = "default_country")]
    pub country: String,

    /// Worker width for the fetch+extract fan-out.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Per-page fetch timeout.
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,

    /// Client-side throttle between successive geocoder calls.
    #[serde(default = "default_geocode_delay_seconds")]
    pub geocode_delay_seconds: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_country() -> String {
    "Brasil".to_string()
}

fn default_fetch_concurrency() -> usize {
    3
}

fn default_fetch_timeout_seconds() -> u64 {
    10
}

fn default_geocode_delay_seconds() -> u64 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            country: default_country(),
            fetch_concurrency: default_fetch_concurrency(),
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
            geocode_delay_seconds: default_geocode_delay_seconds(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        if !std::path::Path::new(config_path).exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{config_path}': {e}"))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Geocoding provider API key, the single secret this crate needs.
    pub fn geocoding_api_key() -> Result<String> {
        Ok(std::env::var("GEOCODING_API_KEY")?)
    }
}
