use anyhow::Result;
use serenity::{
    builder::{
        CreateAutocompleteResponse, CreateEmbed, CreateInteractionResponse,
        CreateInteractionResponseMessage, CreateMessage, EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        channel::Message,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{error, info, warn};

use super::{commands::MusicCommand, Connection, TuneboxBot};
use crate::{audio::player::PlayOutcome, error::MusicError, ui::embeds};

/// Fixed suggestions offered while typing a `/play` query.
const SUGGESTIONS: [&str; 5] = [
    "Shape of You - Ed Sheeran",
    "Blinding Lights - The Weeknd",
    "Dance Monkey - Tones and I",
    "Stay - The Kid LAROI, Justin Bieber",
    "Good 4 U - Olivia Rodrigo",
];

/// Handles a slash command.
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &TuneboxBot) -> Result<()> {
    let query = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str());

    let Some(music_command) = MusicCommand::from_slash(&command.data.name, query) else {
        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .embed(embeds::error_embed("Unknown command"))
                        .ephemeral(true),
                ),
            )
            .await?;
        return Ok(());
    };

    info!(
        "📝 /{} used by {} in guild {:?}",
        command.data.name, command.user.name, command.guild_id
    );

    // every command takes the guild gate, and play also resolves a song,
    // either of which can outlast the 3 second interaction deadline
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let embed = execute(ctx, bot, command.guild_id, command.channel_id, command.user.id, music_command).await;
    command
        .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
        .await?;

    Ok(())
}

/// Answers autocomplete requests for the `/play` query.
pub async fn handle_autocomplete(ctx: &Context, interaction: CommandInteraction) -> Result<()> {
    let current = interaction
        .data
        .autocomplete()
        .map(|option| option.value)
        .unwrap_or_default();

    let response = suggestions(current)
        .into_iter()
        .fold(CreateAutocompleteResponse::new(), |response, song| {
            response.add_string_choice(song, song)
        });

    interaction
        .create_response(&ctx.http, CreateInteractionResponse::Autocomplete(response))
        .await?;

    Ok(())
}

/// Handles a chat message, running it when it is a prefixed music command.
pub async fn handle_message(ctx: &Context, msg: Message, bot: &TuneboxBot) -> Result<()> {
    if msg.author.bot {
        return Ok(());
    }

    let Some(music_command) = MusicCommand::parse_prefix(&msg.content, bot.prefix()) else {
        return Ok(());
    };

    info!(
        "📝 {}{} used by {} in guild {:?}",
        bot.prefix(),
        music_command.name(),
        msg.author.name,
        msg.guild_id
    );

    if matches!(music_command, MusicCommand::Play(_)) {
        if let Err(e) = msg.channel_id.broadcast_typing(&ctx.http).await {
            warn!("Could not send typing indicator: {:?}", e);
        }
    }

    let embed = execute(ctx, bot, msg.guild_id, msg.channel_id, msg.author.id, music_command).await;
    msg.channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;

    Ok(())
}

/// Runs a command and renders its outcome. Failures become an error embed
/// and never propagate further.
async fn execute(
    ctx: &Context,
    bot: &TuneboxBot,
    guild_id: Option<GuildId>,
    channel_id: ChannelId,
    user_id: UserId,
    command: MusicCommand,
) -> CreateEmbed {
    let name = command.name();

    let result = match guild_id {
        Some(guild_id) => {
            bot.remember_channel(guild_id, channel_id);
            run(ctx, bot, guild_id, user_id, command).await
        }
        None => Err(MusicError::NotInGuild),
    };

    match result {
        Ok(embed) => embed,
        Err(e) => {
            match &e {
                MusicError::Extraction(_) | MusicError::Voice(_) | MusicError::Session(_) => {
                    error!("❌ {} failed in guild {:?}: {}", name, guild_id, e)
                }
                _ => warn!("{} rejected in guild {:?}: {}", name, guild_id, e),
            }
            embeds::error_embed(&e.to_string())
        }
    }
}

async fn run(
    ctx: &Context,
    bot: &TuneboxBot,
    guild_id: GuildId,
    user_id: UserId,
    command: MusicCommand,
) -> Result<CreateEmbed, MusicError> {
    let embed = match command {
        MusicCommand::Play(query) => {
            if query.is_empty() {
                return Err(MusicError::MissingQuery);
            }

            let channel_id = user_voice_channel(ctx, guild_id, user_id).ok_or(MusicError::NotInVoiceChannel)?;
            bot.connect(ctx, guild_id, channel_id).await?;

            match bot.player.play(guild_id, &query, user_id).await? {
                PlayOutcome::Started { track, queue_len } => embeds::now_playing(&track, user_id, queue_len),
                PlayOutcome::Queued { entry, position } => embeds::added_to_queue(&entry.title, position),
            }
        }
        MusicCommand::Skip => {
            bot.player.skip(guild_id).await?;
            embeds::success_embed("Skipped the current song! ⏭️")
        }
        MusicCommand::Queue => {
            let state = bot.player.state(guild_id);
            embeds::queue_embed(&bot.player.queue(guild_id), state)
        }
        MusicCommand::Stop => {
            bot.player.stop(guild_id).await?;
            embeds::success_embed("Stopped the music and cleared the queue! ⏹️")
        }
        MusicCommand::Pause => {
            bot.player.pause(guild_id).await?;
            embeds::success_embed("Paused the music! ⏸️")
        }
        MusicCommand::Resume => {
            bot.player.resume(guild_id).await?;
            embeds::success_embed("Resumed the music! ▶️")
        }
        MusicCommand::Join => {
            let channel_id = user_voice_channel(ctx, guild_id, user_id).ok_or(MusicError::NotInVoiceChannel)?;
            match bot.connect(ctx, guild_id, channel_id).await? {
                Connection::Joined => embeds::success_embed(&format!("Joined <#{}>! 🎵", channel_id)),
                Connection::Moved => embeds::success_embed(&format!("Moved to <#{}>! 🎵", channel_id)),
                Connection::Already => return Err(MusicError::AlreadyConnected),
            }
        }
        MusicCommand::Disconnect => {
            bot.player.disconnect(guild_id).await?;
            embeds::success_embed("Disconnected from the voice channel! 👋")
        }
    };

    Ok(embed)
}

/// Voice channel the user currently sits in, from the gateway cache.
fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild.voice_states.get(&user_id).and_then(|state| state.channel_id)
}

/// Suggestions containing `current`, ignoring case. Empty input gets none.
pub fn suggestions(current: &str) -> Vec<&'static str> {
    let current = current.trim().to_lowercase();
    if current.is_empty() {
        return Vec::new();
    }

    SUGGESTIONS
        .into_iter()
        .filter(|song| song.to_lowercase().contains(&current))
        .take(5)
        .collect()
}
