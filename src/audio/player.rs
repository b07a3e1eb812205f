use dashmap::DashMap;
use parking_lot::RwLock;
use serenity::model::id::{GuildId, UserId};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        queue::{QueueEntry, QueueStore},
        session::{PlaybackSession, TrackEndNotifier},
    },
    error::MusicError,
    sources::{Extractor, ResolvedTrack},
};

#[derive(Debug, Clone, Copy)]
pub struct PlayerSettings {
    pub max_queue_size: usize,
    /// Failed entries auto-advance may skip in a row before giving up.
    pub max_consecutive_skips: usize,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            max_queue_size: 1000,
            max_consecutive_skips: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// What a play command did.
#[derive(Debug, Clone)]
pub enum PlayOutcome {
    Started { track: ResolvedTrack, queue_len: usize },
    Queued { entry: QueueEntry, position: usize },
}

/// What a track-end notification did.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Started(QueueEntry),
    Finished,
    Abandoned { skipped: usize },
    /// The notification belonged to a track that is no longer awaited.
    Stale,
    NoSession,
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    TrackStarted {
        guild_id: GuildId,
        entry: QueueEntry,
        track: ResolvedTrack,
        remaining: usize,
    },
    TrackSkipped {
        guild_id: GuildId,
        entry: QueueEntry,
        reason: String,
    },
    QueueFinished {
        guild_id: GuildId,
    },
    AdvanceAbandoned {
        guild_id: GuildId,
        skipped: usize,
        remaining: usize,
    },
}

#[derive(Debug, Default)]
struct GuildState {
    /// Generation handed to the notifier of the track currently awaited.
    generation: u64,
}

struct GuildPlayback {
    session: Arc<dyn PlaybackSession>,
    /// Every transition of the guild runs while holding this lock. It is only
    /// held around session calls, never across extraction.
    gate: Mutex<GuildState>,
    /// Written under the gate, read without it.
    phase: RwLock<PlaybackState>,
}

impl GuildPlayback {
    fn phase(&self) -> PlaybackState {
        *self.phase.read()
    }

    fn set_phase(&self, phase: PlaybackState) {
        *self.phase.write() = phase;
    }

    /// Whether a completion of `generation` is still the one awaited.
    fn awaits(&self, state: &GuildState, generation: u64) -> bool {
        self.phase() != PlaybackState::Idle && state.generation == generation
    }
}

/// Per-guild queue plus the auto-advance state machine.
///
/// The only driver of forward progress is [`Player::on_track_end`], fired by
/// the session when a track stops. Skip just stops the sink and lets that
/// transition pick the next entry.
pub struct Player {
    queues: QueueStore,
    extractor: Arc<dyn Extractor>,
    guilds: DashMap<GuildId, Arc<GuildPlayback>>,
    settings: PlayerSettings,
    events: broadcast::Sender<PlayerEvent>,
}

impl Player {
    pub fn new(extractor: Arc<dyn Extractor>, settings: PlayerSettings) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            queues: QueueStore::new(),
            extractor,
            guilds: DashMap::new(),
            settings,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn queue(&self, guild_id: GuildId) -> Vec<QueueEntry> {
        self.queues.get(guild_id)
    }

    /// Binds a session to the guild. An already bound session is kept and
    /// `false` is returned.
    pub fn attach(&self, guild_id: GuildId, session: Arc<dyn PlaybackSession>) -> bool {
        let mut inserted = false;
        self.guilds.entry(guild_id).or_insert_with(|| {
            inserted = true;
            Arc::new(GuildPlayback {
                session,
                gate: Mutex::new(GuildState::default()),
                phase: RwLock::new(PlaybackState::Idle),
            })
        });

        if inserted {
            info!("🔊 Session attached for guild {}", guild_id);
        }
        inserted
    }

    pub fn is_attached(&self, guild_id: GuildId) -> bool {
        self.guilds.contains_key(&guild_id)
    }

    /// Current phase; never waits for a transition in progress.
    pub fn state(&self, guild_id: GuildId) -> PlaybackState {
        self.guild(guild_id).map_or(PlaybackState::Idle, |guild| guild.phase())
    }

    /// Plays `query` now when the guild is idle, queues it otherwise.
    ///
    /// The query is resolved before anything changes; a failed resolution
    /// leaves both the queue and the playback state untouched.
    pub async fn play(
        self: &Arc<Self>,
        guild_id: GuildId,
        query: &str,
        requester: UserId,
    ) -> Result<PlayOutcome, MusicError> {
        let guild = self.guild(guild_id).ok_or(MusicError::NotConnected)?;

        let track = self.extractor.resolve(query).await?;

        let mut state = guild.gate.lock().await;

        // disconnected while resolving
        if !self.is_current(guild_id, &guild) {
            return Err(MusicError::NotConnected);
        }

        if guild.phase() != PlaybackState::Idle {
            if self.queues.len(guild_id) >= self.settings.max_queue_size {
                return Err(MusicError::QueueFull(self.settings.max_queue_size));
            }

            let entry = QueueEntry::new(&track, query, requester);
            let position = self.queues.append(guild_id, entry.clone());
            return Ok(PlayOutcome::Queued { entry, position });
        }

        self.start(guild_id, &guild, &mut state, &track).await?;

        Ok(PlayOutcome::Started {
            track,
            queue_len: self.queues.len(guild_id),
        })
    }

    /// Track-end transition: pops entries until one starts, the queue runs
    /// dry, or too many fail in a row.
    ///
    /// Each entry is resolved with the gate released. Afterwards the gate is
    /// taken again and the transition only goes on if the same generation is
    /// still awaited; a stop, disconnect or fresh play in the meantime wins
    /// and the popped entry is dropped.
    pub async fn on_track_end(
        self: &Arc<Self>,
        guild_id: GuildId,
        generation: u64,
    ) -> AdvanceOutcome {
        let Some(guild) = self.guild(guild_id) else {
            debug!("Track ended for guild {} without a session", guild_id);
            return AdvanceOutcome::NoSession;
        };

        let mut skipped = 0;

        loop {
            let entry = {
                let state = guild.gate.lock().await;

                if !self.is_current(guild_id, &guild) || !guild.awaits(&state, generation) {
                    debug!(
                        "Ignoring stale track end in guild {} (generation {}, awaiting {})",
                        guild_id, generation, state.generation
                    );
                    return AdvanceOutcome::Stale;
                }

                let Some(entry) = self.queues.pop_front(guild_id) else {
                    guild.set_phase(PlaybackState::Idle);
                    info!("📭 Queue finished for guild {}", guild_id);
                    self.emit(PlayerEvent::QueueFinished { guild_id });
                    return AdvanceOutcome::Finished;
                };
                entry
            };

            let resolved = self.extractor.resolve(&entry.source_ref).await;

            let mut state = guild.gate.lock().await;

            if !self.is_current(guild_id, &guild) || !guild.awaits(&state, generation) {
                debug!(
                    "Dropping {} in guild {}: playback changed while resolving",
                    entry.title, guild_id
                );
                return AdvanceOutcome::Stale;
            }

            let reason = match resolved {
                Ok(track) => match self.start(guild_id, &guild, &mut state, &track).await {
                    Ok(()) => {
                        self.emit(PlayerEvent::TrackStarted {
                            guild_id,
                            entry: entry.clone(),
                            track,
                            remaining: self.queues.len(guild_id),
                        });
                        return AdvanceOutcome::Started(entry);
                    }
                    Err(e) => e.to_string(),
                },
                Err(e) => e.to_string(),
            };

            warn!("⏭️ Skipping {} in guild {}: {}", entry.title, guild_id, reason);
            self.emit(PlayerEvent::TrackSkipped {
                guild_id,
                entry,
                reason,
            });

            skipped += 1;
            if skipped >= self.settings.max_consecutive_skips {
                guild.set_phase(PlaybackState::Idle);
                let remaining = self.queues.len(guild_id);
                error!(
                    "Giving up auto-advance in guild {} after {} failed entries ({} left queued)",
                    guild_id, skipped, remaining
                );
                self.emit(PlayerEvent::AdvanceAbandoned {
                    guild_id,
                    skipped,
                    remaining,
                });
                return AdvanceOutcome::Abandoned { skipped };
            }
        }
    }

    /// Stops the current track; the track-end transition moves the queue on.
    pub async fn skip(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let guild = self.guild(guild_id).ok_or(MusicError::NothingPlaying)?;
        let _state = guild.gate.lock().await;

        if !guild.session.is_playing().await && !guild.session.is_paused().await {
            return Err(MusicError::NothingPlaying);
        }

        guild.session.stop().await?;
        info!("⏭️ Skipped current track in guild {}", guild_id);
        Ok(())
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let guild = self.guild(guild_id).ok_or(MusicError::NothingPlaying)?;
        let _state = guild.gate.lock().await;

        if !guild.session.is_playing().await {
            return Err(MusicError::NothingPlaying);
        }

        guild.session.pause().await?;
        if guild.phase() == PlaybackState::Playing {
            guild.set_phase(PlaybackState::Paused);
        }
        Ok(())
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let guild = self.guild(guild_id).ok_or(MusicError::NothingPaused)?;
        let _state = guild.gate.lock().await;

        if !guild.session.is_paused().await {
            return Err(MusicError::NothingPaused);
        }

        guild.session.resume().await?;
        if guild.phase() == PlaybackState::Paused {
            guild.set_phase(PlaybackState::Playing);
        }
        Ok(())
    }

    /// Clears the queue and stops playback. The guild is idle on return; the
    /// stopped track's end notification finds nothing to do.
    pub async fn stop(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let guild = self.guild(guild_id).ok_or(MusicError::NotConnected)?;
        let _state = guild.gate.lock().await;

        self.queues.clear(guild_id);
        guild.set_phase(PlaybackState::Idle);
        guild.session.stop().await?;

        info!("⏹️ Playback stopped in guild {}", guild_id);
        Ok(())
    }

    /// Clears the queue and tears the guild's session down.
    pub async fn disconnect(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let session = self.detach(guild_id).await.ok_or(MusicError::NotConnected)?;
        session.disconnect().await?;
        Ok(())
    }

    /// Forgets the guild's session without closing it (used when the voice
    /// connection is already gone). Returns the detached session.
    pub async fn detach(&self, guild_id: GuildId) -> Option<Arc<dyn PlaybackSession>> {
        let (_, guild) = self.guilds.remove(&guild_id)?;

        let _state = guild.gate.lock().await;
        guild.set_phase(PlaybackState::Idle);
        self.queues.clear(guild_id);

        info!("🔌 Session detached for guild {}", guild_id);
        Some(guild.session.clone())
    }

    /// Starts `track` on the guild's session. The generation only moves on
    /// once the session accepted the track.
    async fn start(
        self: &Arc<Self>,
        guild_id: GuildId,
        guild: &GuildPlayback,
        state: &mut GuildState,
        track: &ResolvedTrack,
    ) -> Result<(), MusicError> {
        let next = state.generation + 1;
        let notifier = TrackEndNotifier::new(Arc::clone(self), guild_id, next);

        guild.session.play(track, notifier).await?;
        state.generation = next;
        guild.set_phase(PlaybackState::Playing);
        Ok(())
    }

    fn guild(&self, guild_id: GuildId) -> Option<Arc<GuildPlayback>> {
        self.guilds.get(&guild_id).map(|g| Arc::clone(&g))
    }

    /// Whether `guild` is still the playback bound to `guild_id`.
    fn is_current(&self, guild_id: GuildId, guild: &Arc<GuildPlayback>) -> bool {
        self.guilds
            .get(&guild_id)
            .is_some_and(|current| Arc::ptr_eq(&current, guild))
    }

    fn emit(&self, event: PlayerEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
