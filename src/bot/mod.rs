//! # Bot Module
//!
//! Discord side of Tunebox: the gateway [`EventHandler`], command
//! registration, voice connections and the now-playing announcer.
//!
//! Slash commands and prefix commands share one execution path
//! ([`handlers`]), so both surfaces answer with the same embeds.

use anyhow::Result;
use dashmap::DashMap;
use serenity::{
    all::{ActivityData, ChannelId, Context, EventHandler, GuildId, Interaction, Message, Ready, VoiceState},
    async_trait,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{error, info, warn};

pub mod commands;
pub mod events;
pub mod handlers;

use crate::{
    audio::{player::Player, session::SongbirdSession},
    config::Config,
    error::MusicError,
};

/// Result of asking the bot into a voice channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Joined,
    Moved,
    Already,
}

pub struct TuneboxBot {
    config: Arc<Config>,
    pub player: Arc<Player>,
    /// Shared by every session for stream requests.
    http_client: reqwest::Client,
    /// Last text channel a command came from, per guild; announcements go there.
    announce_channels: Arc<DashMap<GuildId, ChannelId>>,
    announcer_started: AtomicBool,
}

impl TuneboxBot {
    pub fn new(config: Config, player: Arc<Player>) -> Self {
        Self {
            config: Arc::new(config),
            player,
            http_client: reqwest::Client::new(),
            announce_channels: Arc::new(DashMap::new()),
            announcer_started: AtomicBool::new(false),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.config.command_prefix
    }

    pub fn remember_channel(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.announce_channels.insert(guild_id, channel_id);
    }

    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registering slash commands...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Guild commands registered for {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await?;
                info!("✅ Global commands registered");
            }
        }

        Ok(())
    }

    /// Puts the bot in `channel_id`, joining or moving as needed, and makes
    /// sure the guild has a playback session.
    pub async fn connect(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Connection, MusicError> {
        let manager = songbird::get(ctx)
            .await
            .ok_or_else(|| MusicError::Voice("voice client is not initialised".to_string()))?;

        if let Some(call) = manager.get(guild_id) {
            let current = call.lock().await.current_channel();
            if self.player.is_attached(guild_id) && current.map(|c| ChannelId::new(c.0.get())) == Some(channel_id) {
                return Ok(Connection::Already);
            }
        }

        let call = manager.join(guild_id, channel_id).await.map_err(|e| {
            error!("Failed to join voice channel {} in guild {}: {:?}", channel_id, guild_id, e);
            MusicError::Voice(e.to_string())
        })?;

        let session = SongbirdSession::new(
            guild_id,
            call,
            manager.clone(),
            self.http_client.clone(),
            self.config.default_volume,
        );

        if self.player.attach(guild_id, Arc::new(session)) {
            info!("🔊 Connected to voice channel {} in guild {}", channel_id, guild_id);
            Ok(Connection::Joined)
        } else {
            info!("🔀 Moved to voice channel {} in guild {}", channel_id, guild_id);
            Ok(Connection::Moved)
        }
    }
}

#[async_trait]
impl EventHandler for TuneboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} is online!", ready.user.name);
        info!("📊 Connected to {} servers", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Failed to register commands: {:?}", e);
        }

        ctx.set_activity(Some(ActivityData::listening("your music")));

        // ready fires again after every reconnect
        if !self.announcer_started.swap(true, Ordering::SeqCst) {
            events::spawn_announcer(ctx.http.clone(), self.player.subscribe(), self.announce_channels.clone());
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => {
                if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                    error!("Error handling command: {:?}", e);
                }
            }
            Interaction::Autocomplete(autocomplete) => {
                if let Err(e) = handlers::handle_autocomplete(&ctx, autocomplete).await {
                    warn!("Error answering autocomplete: {:?}", e);
                }
            }
            _ => {}
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(e) = handlers::handle_message(&ctx, msg, self).await {
            error!("Error handling message command: {:?}", e);
        }
    }

    /// Drops the guild's session when the bot is kicked or disconnected from
    /// voice by someone else.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        if let Some(guild_id) = new.guild_id {
            if self.player.detach(guild_id).await.is_some() {
                info!("🔌 Bot was disconnected from voice in guild {}", guild_id);
            }
        }
    }
}
