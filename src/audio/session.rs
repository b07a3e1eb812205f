use async_trait::async_trait;
use parking_lot::RwLock;
use serenity::model::id::GuildId;
use songbird::{
    error::JoinError,
    input::{HttpRequest, Input},
    tracks::{ControlError, PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::player::Player;
use crate::sources::ResolvedTrack;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no track is loaded")]
    NoTrack,
    #[error("track control failed: {0}")]
    Control(#[from] ControlError),
    #[error("voice connection failed: {0}")]
    Join(#[from] JoinError),
}

/// The audio sink of one guild's voice connection.
///
/// `play` hands over the notifier the sink must fire once the track stops,
/// whether it finished, was stopped or failed.
#[async_trait]
pub trait PlaybackSession: Send + Sync {
    async fn play(&self, track: &ResolvedTrack, on_end: TrackEndNotifier) -> Result<(), SessionError>;
    async fn pause(&self) -> Result<(), SessionError>;
    async fn resume(&self) -> Result<(), SessionError>;
    async fn stop(&self) -> Result<(), SessionError>;
    async fn is_playing(&self) -> bool;
    async fn is_paused(&self) -> bool;
    async fn disconnect(&self) -> Result<(), SessionError>;
}

/// Completion callback bound to one started track.
#[derive(Clone)]
pub struct TrackEndNotifier {
    player: Arc<Player>,
    guild_id: GuildId,
    generation: u64,
}

impl TrackEndNotifier {
    pub(crate) fn new(player: Arc<Player>, guild_id: GuildId, generation: u64) -> Self {
        Self {
            player,
            guild_id,
            generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Runs the player's track-end transition for this track.
    pub async fn notify(&self) -> super::player::AdvanceOutcome {
        self.player.on_track_end(self.guild_id, self.generation).await
    }
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        debug!("Track ended in guild {} (generation {})", self.guild_id, self.generation);

        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.notify().await;
        });

        None
    }
}

/// [`PlaybackSession`] over a songbird call.
pub struct SongbirdSession {
    guild_id: GuildId,
    call: Arc<Mutex<Call>>,
    manager: Arc<Songbird>,
    http_client: reqwest::Client,
    volume: f32,
    current: RwLock<Option<TrackHandle>>,
}

impl SongbirdSession {
    pub fn new(
        guild_id: GuildId,
        call: Arc<Mutex<Call>>,
        manager: Arc<Songbird>,
        http_client: reqwest::Client,
        volume: f32,
    ) -> Self {
        Self {
            guild_id,
            call,
            manager,
            http_client,
            volume,
            current: RwLock::new(None),
        }
    }

    fn current(&self) -> Option<TrackHandle> {
        self.current.read().clone()
    }

    async fn play_mode(&self) -> Option<PlayMode> {
        let handle = self.current()?;
        handle.get_info().await.ok().map(|info| info.playing)
    }
}

#[async_trait]
impl PlaybackSession for SongbirdSession {
    async fn play(&self, track: &ResolvedTrack, on_end: TrackEndNotifier) -> Result<(), SessionError> {
        let generation = on_end.generation();
        let input: Input = HttpRequest::new(self.http_client.clone(), track.stream_url.clone()).into();

        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };

        handle.set_volume(self.volume)?;
        handle.add_event(Event::Track(TrackEvent::End), on_end.clone())?;
        handle.add_event(Event::Track(TrackEvent::Error), on_end)?;

        *self.current.write() = Some(handle);

        info!("🎵 Playing in guild {}: {}", self.guild_id, track.title);
        debug!("Awaiting end of generation {} in guild {}", generation, self.guild_id);
        Ok(())
    }

    async fn pause(&self) -> Result<(), SessionError> {
        self.current().ok_or(SessionError::NoTrack)?.pause()?;
        info!("⏸️ Playback paused in guild {}", self.guild_id);
        Ok(())
    }

    async fn resume(&self) -> Result<(), SessionError> {
        self.current().ok_or(SessionError::NoTrack)?.play()?;
        info!("▶️ Playback resumed in guild {}", self.guild_id);
        Ok(())
    }

    async fn stop(&self) -> Result<(), SessionError> {
        if let Some(handle) = self.current() {
            // a track that already ended reports Finished; nothing left to stop
            match handle.stop() {
                Ok(()) | Err(ControlError::Finished) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Play))
    }

    async fn is_paused(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Pause))
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        self.stop().await?;
        self.current.write().take();
        self.manager.remove(self.guild_id).await?;
        info!("👋 Disconnected from voice in guild {}", self.guild_id);
        Ok(())
    }
}
