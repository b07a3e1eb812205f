use crate::{audio::session::SessionError, sources::ExtractionError};

/// Failures of a music command. Every variant is caught at the command
/// boundary and shown to the user; none of them stop the bot.
#[derive(Debug, thiserror::Error)]
pub enum MusicError {
    #[error("This command can only be used in a server!")]
    NotInGuild,
    #[error("You need to be in a voice channel to play music!")]
    NotInVoiceChannel,
    #[error("No music is currently playing!")]
    NothingPlaying,
    #[error("No music is currently paused!")]
    NothingPaused,
    #[error("I'm not connected to a voice channel!")]
    NotConnected,
    #[error("I'm already in your voice channel!")]
    AlreadyConnected,
    #[error("Tell me what to play: a song name or a YouTube URL.")]
    MissingQuery,
    #[error("The queue is full (maximum {0} songs)")]
    QueueFull(usize),
    #[error("Error playing song: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Could not join your voice channel: {0}")]
    Voice(String),
    #[error("Playback error: {0}")]
    Session(#[from] SessionError),
}
