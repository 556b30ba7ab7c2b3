use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Runtime settings, read once at startup and passed by reference.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub api_endpoint: String,
    pub user_pool_id: String,
    pub user_pool_client_id: String,
    pub region: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Config {
    /// Runtime config file if one exists, otherwise environment fallbacks.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let request_timeout_secs = match lookup("DECKPROOF_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow!("DECKPROOF_REQUEST_TIMEOUT_SECS must be a number of seconds, got {raw:?}"))?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            api_endpoint: var("DECKPROOF_API_ENDPOINT", "YOUR_API_ENDPOINT"),
            user_pool_id: var("DECKPROOF_USER_POOL_ID", "YOUR_USER_POOL_ID"),
            user_pool_client_id: var("DECKPROOF_USER_POOL_CLIENT_ID", "YOUR_USER_POOL_CLIENT_ID"),
            region: var("DECKPROOF_REGION", "us-east-1"),
            request_timeout_secs,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("deckproof"))
    }

    fn get_config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("DECKPROOF_CONFIG") {
            return Ok(PathBuf::from(path));
        }

        Ok(Self::config_dir()?.join("config.json"))
    }
}
