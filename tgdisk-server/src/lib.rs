//! tgdisk server: wires the Telegram blob store, the HTTP routes and the link bot.

pub mod bot;
pub mod config;
pub mod telegram;

use std::sync::Arc;

use anyhow::Context;
use tgdisk_axum::{AccessGuard, TgDiskApp, TgDiskState};
use tgdisk_blob::{BlobStore, TransferAdapter};
use tower_http::services::ServeDir;
use tracing::info;

pub use bot::LinkBot;
pub use config::Config;
pub use telegram::{TelegramClient, TelegramError, TelegramStore};

/// Build the HTTP app over `store`, serving `config.static_dir` for unmatched paths
pub fn build(config: &Config, store: Arc<dyn BlobStore>) -> anyhow::Result<TgDiskApp> {
    let settings = config.transfer_config();
    info!(
        chunk_size = settings.chunk_size,
        workers = settings.workers,
        static_dir = %config.static_dir.display(),
        "configuring app"
    );
    let transfers =
        TransferAdapter::from_shared(store, settings).context("invalid transfer settings")?;

    let access = AccessGuard::new(&config.access_pwd).context("failed to hash access password")?;
    let mut state = TgDiskState::new(transfers, access);
    if let Some(base) = config.public_base() {
        state = state.with_public_base(base);
    }

    Ok(tgdisk_axum::axum(state).fallback_service(ServeDir::new(&config.static_dir)))
}

/// Telegram client and store from `config`
pub fn telegram(config: &Config) -> anyhow::Result<(TelegramClient, TelegramStore)> {
    let client = TelegramClient::with_options(&config.bot_token, &config.api_url, config.proxy())
        .context("failed to create Telegram client")?;
    let store = TelegramStore::new(client.clone(), config.chat_id);
    Ok((client, store))
}
