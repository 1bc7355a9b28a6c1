use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tgdisk_blob::{TransferConfig, DEFAULT_WORKERS};

use crate::telegram::DEFAULT_API_URL;

/// Server settings; every flag can also come from the environment (or a `.env` file)
#[derive(Parser, Debug, Clone)]
#[command(name = "tgdisk", version, about = "Store files of any size in a Telegram chat")]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Telegram bot token
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    /// Password required for uploads
    #[arg(long, env = "ACCESS_PWD", hide_env_values = true)]
    pub access_pwd: String,

    /// Chat the bot stores files in (also the only user allowed to ask for links)
    #[arg(long, env = "CHAT_ID", allow_negative_numbers = true)]
    pub chat_id: i64,

    /// HTTP(S) proxy for Bot API traffic
    #[arg(long, env = "PROXY")]
    pub proxy: Option<String>,

    /// Public base URL used in download links (e.g. https://files.example.com)
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Directory served for any path no route matches
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Pieces kept in flight per transfer
    #[arg(short, long, env = "WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Piece size in MiB
    #[arg(long, env = "CHUNK_SIZE_MIB", default_value_t = 20)]
    pub chunk_size_mib: u64,

    /// Bot API endpoint (a local Bot API server works too)
    #[arg(long, env = "TELEGRAM_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Do not start the link bot
    #[arg(long)]
    pub no_bot: bool,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            bail!("BOT_TOKEN must not be empty");
        }
        if self.access_pwd.is_empty() {
            bail!("ACCESS_PWD must not be empty");
        }
        if self.chat_id == 0 {
            bail!("CHAT_ID must be a Telegram chat id");
        }
        if let Some(base) = self.public_base() {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                bail!("BASE_URL must start with http:// or https://, got '{}'", base);
            }
        }
        Ok(())
    }

    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig::new()
            .with_chunk_size_mib(self.chunk_size_mib)
            .with_workers(self.workers)
    }

    /// Non-empty base URL without trailing slash
    pub fn public_base(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(|base| base.trim().trim_end_matches('/'))
            .filter(|base| !base.is_empty())
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref().filter(|p| !p.trim().is_empty())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
