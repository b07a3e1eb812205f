//! # Audio Module
//!
//! Per-guild playback for Tunebox.
//!
//! ### [`queue`] - Queue Store
//! - Guild id → ordered pending entries
//! - Entries keep the source reference, never the expiring stream URL
//!
//! ### [`session`] - Playback Sessions
//! - The audio sink of one voice connection, behind [`session::PlaybackSession`]
//! - [`session::SongbirdSession`] streams over a songbird call
//! - [`session::TrackEndNotifier`] reports a finished, stopped or failed track
//!
//! ### [`player`] - Auto-Advance Controller
//! - Idle / Playing / Paused state per guild
//! - Starts the next queued entry when a track ends, skipping failures
//! - Publishes [`player::PlayerEvent`]s for announcements

pub mod player;
pub mod queue;
pub mod session;
