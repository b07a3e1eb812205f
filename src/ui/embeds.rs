use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
    model::id::UserId,
};

use crate::{
    audio::{player::PlaybackState, queue::QueueEntry},
    sources::ResolvedTrack,
};

/// How many entries the queue embed lists before summarizing the rest.
const QUEUE_PAGE: usize = 10;

const NOW_PLAYING_FOOTER: &str = "Enjoy the music! 🎶";

pub mod colors {
    use serenity::all::Colour;

    pub const NOW_PLAYING: Colour = Colour::new(0x00ffaa);
    pub const QUEUE: Colour = Colour::new(0xffaa00);
    pub const ERROR: Colour = Colour::new(0xff0000);
    pub const SUCCESS: Colour = Colour::new(0x00ff00);
}

/// Embed announcing a track that just started.
pub fn now_playing(track: &ResolvedTrack, requester: UserId, queue_len: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Now Playing")
        .color(colors::NOW_PLAYING)
        .timestamp(Timestamp::now())
        .field("Title", format!("```{}```", track.title), false)
        .field("Duration", format!("`{}`", track.formatted_duration()), true)
        .field(
            "Uploader",
            format!("`{}`", track.uploader.as_deref().unwrap_or("Unknown")),
            true,
        )
        .field("Requested by", format!("<@{}>", requester), true);

    if queue_len > 0 {
        embed = embed.field("Songs in queue", format!("`{}`", queue_len), true);
    }

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    if let Some(url) = &track.webpage_url {
        embed = embed.url(url);
    }

    embed.footer(CreateEmbedFooter::new(NOW_PLAYING_FOOTER))
}

pub fn added_to_queue(title: &str, position: usize) -> CreateEmbed {
    success_embed(&format!("Added to queue: **{}**\nPosition: `{}`", title, position))
}

pub fn queue_embed(entries: &[QueueEntry], state: PlaybackState) -> CreateEmbed {
    let status = match state {
        PlaybackState::Playing => "▶️ Playing",
        PlaybackState::Paused => "⏸️ Paused",
        PlaybackState::Idle => "⏹️ Nothing playing",
    };

    CreateEmbed::default()
        .title("📜 Music Queue")
        .color(colors::QUEUE)
        .field("Up Next", queue_listing(entries), false)
        .footer(CreateEmbedFooter::new(status))
}

/// Text of the "Up Next" field: the first entries numbered from 1, then a
/// count of whatever did not fit.
pub fn queue_listing(entries: &[QueueEntry]) -> String {
    if entries.is_empty() {
        return "Queue is empty".to_string();
    }

    let mut text: String = entries
        .iter()
        .take(QUEUE_PAGE)
        .enumerate()
        .map(|(i, entry)| format!("`{}.` **{}** - `{}`\n", i + 1, entry.title, entry.duration))
        .collect();

    if entries.len() > QUEUE_PAGE {
        text.push_str(&format!("\n...and {} more songs", entries.len() - QUEUE_PAGE));
    }

    text
}

pub fn error_embed(message: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("❌ Error")
        .description(message)
        .color(colors::ERROR)
}

pub fn success_embed(message: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("✅ Success")
        .description(message)
        .color(colors::SUCCESS)
}
