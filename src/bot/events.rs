use dashmap::DashMap;
use serenity::{
    builder::{CreateEmbed, CreateMessage},
    http::Http,
    model::id::{ChannelId, GuildId},
};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, warn};

use crate::{audio::player::PlayerEvent, ui::embeds};

/// Posts player events to the guild's last command channel until the player
/// goes away.
pub fn spawn_announcer(
    http: Arc<Http>,
    mut events: broadcast::Receiver<PlayerEvent>,
    channels: Arc<DashMap<GuildId, ChannelId>>,
) {
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(missed)) => {
                    warn!("Announcer fell behind, {} player events dropped", missed);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let Some((guild_id, embed)) = announcement(&event) else {
                continue;
            };

            let Some(channel_id) = channels.get(&guild_id).map(|c| *c) else {
                debug!("No channel to announce in for guild {}", guild_id);
                continue;
            };

            if let Err(e) = channel_id
                .send_message(&http, CreateMessage::new().embed(embed))
                .await
            {
                error!("Failed to send announcement to {}: {:?}", channel_id, e);
            }
        }
    });
}

/// The embed a player event is announced with, if any.
fn announcement(event: &PlayerEvent) -> Option<(GuildId, CreateEmbed)> {
    match event {
        PlayerEvent::TrackStarted {
            guild_id,
            entry,
            track,
            remaining,
        } => Some((*guild_id, embeds::now_playing(track, entry.requester, *remaining))),
        PlayerEvent::AdvanceAbandoned {
            guild_id,
            skipped,
            remaining,
        } => Some((
            *guild_id,
            embeds::error_embed(&format!(
                "{} songs in a row failed to play, so playback stopped. {} songs are still queued; use play to start again.",
                skipped, remaining
            )),
        )),
        // a failed entry is only logged; the channel hears about the next start
        PlayerEvent::TrackSkipped { guild_id, entry, .. } => {
            debug!("Not announcing skipped {} in guild {}", entry.title, guild_id);
            None
        }
        PlayerEvent::QueueFinished { guild_id } => {
            debug!("Nothing left to announce in guild {}", guild_id);
            None
        }
    }
}
