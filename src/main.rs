use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{error, info, warn};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod ui;

use crate::audio::player::Player;
use crate::bot::TuneboxBot;
use crate::config::Config;
use crate::sources::YtDlpClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tunebox=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Starting Tunebox v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("{}", config.summary());

    let ytdlp = YtDlpClient::from_config(&config);

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&ytdlp).await;
    }

    match ytdlp.verify().await {
        Ok(version) => info!("✅ yt-dlp {} available", version),
        Err(e) => warn!("⚠️ yt-dlp is not runnable, every play command will fail: {:?}", e),
    }

    let player = Arc::new(Player::new(Arc::new(ytdlp), config.player_settings()));

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let token = config.discord_token.clone();
    let handler = TuneboxBot::new(config, player);

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .register_songbird()
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Shutdown signal received, closing...");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot started");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}

/// `--health-check`: exits successfully only when yt-dlp runs.
async fn health_check(ytdlp: &YtDlpClient) -> Result<()> {
    let version = ytdlp.verify().await?;
    println!("OK (yt-dlp {})", version);
    Ok(())
}
