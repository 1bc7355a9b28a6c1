use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tgdisk_server::{Config, LinkBot};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let (client, store) = tgdisk_server::telegram(&config)?;
    let app = tgdisk_server::build(&config, Arc::new(store))?;

    if config.no_bot {
        info!("link bot disabled");
    } else {
        let bot = LinkBot::new(client, config.chat_id, config.public_base().map(str::to_string));
        tokio::spawn(bot.run());
    }

    info!(chat_id = config.chat_id, api = %config.api_url, "starting tgdisk");
    app.listen(config.addr()).await
}
