mod albums;
mod config;
mod disk;
mod platform;
#[cfg(test)]
mod testsupport;
mod uploader;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::albums::AlbumBuffer;
use crate::config::Config;
use crate::disk::DiskClient;
use crate::platform::telegram::{self, TelegramMessenger};
use crate::uploader::MediaUploader;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,teledisk=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Disk folder: {}", config.disk.root_folder);
    info!("  Overwrite uploads: {}", config.disk.overwrite);
    info!("  Album quiet period: {}ms", config.albums.quiet_period_ms);

    let bot = Bot::new(&config.telegram.bot_token);
    let quiet = Duration::from_millis(config.albums.quiet_period_ms);

    let uploader = MediaUploader::new(
        TelegramMessenger::new(bot.clone()),
        DiskClient::new(config.disk.clone()),
        config.disk.root_folder.clone(),
    );
    let albums = AlbumBuffer::new(quiet, uploader);

    // Run the Telegram bot
    info!("Bot is starting...");
    telegram::run(bot, albums.clone()).await?;

    // The dispatcher has stopped (Ctrl-C); push out whatever is still buffered.
    albums.shutdown().await;

    Ok(())
}
