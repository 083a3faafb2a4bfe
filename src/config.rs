use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub disk: DiskConfig,
    #[serde(default = "default_albums_config")]
    pub albums: AlbumsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiskConfig {
    pub oauth_token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Replace files that already exist at the target path
    #[serde(default)]
    pub overwrite: bool,
    /// Top-level Disk folder everything is stored under
    #[serde(default = "default_root_folder")]
    pub root_folder: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlbumsConfig {
    /// How long a media group must stay quiet before it is considered
    /// complete and uploaded
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
}

fn default_albums_config() -> AlbumsConfig {
    AlbumsConfig {
        quiet_period_ms: default_quiet_period_ms(),
    }
}

fn default_base_url() -> String {
    "https://cloud-api.yandex.net/v1/disk".to_string()
}

fn default_root_folder() -> String {
    "TelegramMedia".to_string()
}

fn default_quiet_period_ms() -> u64 {
    1000
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}
