use dashmap::DashMap;
use serenity::model::id::{GuildId, UserId};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::sources::ResolvedTrack;

/// A pending song request. Only the source reference is kept for playback:
/// the stream URL is resolved again when the entry reaches the front.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub title: String,
    pub duration: String,
    pub source_ref: String,
    pub requester: UserId,
}

impl QueueEntry {
    pub fn new(track: &ResolvedTrack, source_ref: impl Into<String>, requester: UserId) -> Self {
        Self {
            title: track.title.clone(),
            duration: track.formatted_duration(),
            source_ref: source_ref.into(),
            requester,
        }
    }
}

/// Guild id → ordered pending entries.
///
/// Each operation holds the guild's shard lock for its whole
/// read-modify-write, so operations on one guild never interleave. A guild
/// that was never touched behaves like an empty queue.
#[derive(Debug, Default)]
pub struct QueueStore {
    queues: DashMap<GuildId, VecDeque<QueueEntry>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the guild's queue, creating it empty if absent.
    pub fn get(&self, guild_id: GuildId) -> Vec<QueueEntry> {
        self.queues
            .entry(guild_id)
            .or_default()
            .iter()
            .cloned()
            .collect()
    }

    /// Adds to the tail and returns the new length.
    pub fn append(&self, guild_id: GuildId, entry: QueueEntry) -> usize {
        let mut queue = self.queues.entry(guild_id).or_default();
        info!("➕ Added to queue: {}", entry.title);
        queue.push_back(entry);
        queue.len()
    }

    pub fn pop_front(&self, guild_id: GuildId) -> Option<QueueEntry> {
        let next = self.queues.get_mut(&guild_id)?.pop_front();
        match &next {
            Some(entry) => debug!("➡️ Next in queue: {}", entry.title),
            None => debug!("📭 Queue empty for guild {}", guild_id),
        }
        next
    }

    /// Empties the guild's queue; the key itself is kept.
    pub fn clear(&self, guild_id: GuildId) {
        if let Some(mut queue) = self.queues.get_mut(&guild_id) {
            queue.clear();
            info!("🗑️ Queue cleared for guild {}", guild_id);
        }
    }

    pub fn len(&self, guild_id: GuildId) -> usize {
        self.queues.get(&guild_id).map_or(0, |q| q.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(title: &str) -> QueueEntry {
        QueueEntry {
            title: title.to_string(),
            duration: "03:00".to_string(),
            source_ref: format!("ytsearch:{title}"),
            requester: UserId::new(7),
        }
    }

    #[test]
    fn test_fifo_order() {
        let store = QueueStore::new();
        let guild = GuildId::new(1);

        for title in ["a", "b", "c", "d"] {
            store.append(guild, entry(title));
        }

        let popped: Vec<String> = std::iter::from_fn(|| store.pop_front(guild))
            .map(|e| e.title)
            .collect();
        assert_eq!(popped, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_append_pop_scenario() {
        let store = QueueStore::new();
        let guild = GuildId::new(2);

        assert_eq!(store.append(guild, entry("A")), 1);
        assert_eq!(store.append(guild, entry("B")), 2);
        assert_eq!(store.get(guild), vec![entry("A"), entry("B")]);

        assert_eq!(store.pop_front(guild), Some(entry("A")));
        assert_eq!(store.get(guild), vec![entry("B")]);

        assert_eq!(store.pop_front(guild), Some(entry("B")));
        assert!(store.get(guild).is_empty());

        assert_eq!(store.pop_front(guild), None);
    }

    #[test]
    fn test_pop_front_on_unknown_guild() {
        let store = QueueStore::new();
        assert_eq!(store.pop_front(GuildId::new(99)), None);
        assert_eq!(store.len(GuildId::new(99)), 0);
    }

    #[test]
    fn test_get_creates_empty_queue() {
        let store = QueueStore::new();
        let guild = GuildId::new(3);

        assert!(store.get(guild).is_empty());
        assert!(store.queues.contains_key(&guild));
    }

    #[test]
    fn test_clear_keeps_key() {
        let store = QueueStore::new();
        let guild = GuildId::new(4);

        store.append(guild, entry("x"));
        store.append(guild, entry("y"));
        store.clear(guild);

        assert!(store.get(guild).is_empty());
        assert!(store.queues.contains_key(&guild));
        assert_eq!(store.append(guild, entry("z")), 1);
    }

    #[test]
    fn test_guilds_are_isolated() {
        let store = QueueStore::new();
        let g1 = GuildId::new(100);
        let g2 = GuildId::new(200);

        store.append(g1, entry("one"));
        store.append(g2, entry("two"));
        store.clear(g1);

        assert_eq!(store.len(g1), 0);
        assert_eq!(store.get(g2), vec![entry("two")]);
    }

    #[test]
    fn test_entry_from_resolved_track() {
        let track = ResolvedTrack {
            stream_url: "https://stream".to_string(),
            title: "Song".to_string(),
            duration: Some(std::time::Duration::from_secs(3725)),
            thumbnail: None,
            uploader: None,
            webpage_url: None,
        };

        let e = QueueEntry::new(&track, "song query", UserId::new(1));
        assert_eq!(e.duration, "01:02:05");
        assert_eq!(e.source_ref, "song query");
    }
}
