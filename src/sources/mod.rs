//! # Sources
//!
//! Resolution of user input (a URL or free-text search) into a playable,
//! time-limited stream URL plus display metadata.
//!
//! Stream URLs handed out by the video host expire, so nothing here is cached:
//! every queue entry is resolved again right before it plays.

pub mod ytdlp;

use async_trait::async_trait;
use std::time::Duration;

pub use ytdlp::YtDlpClient;

/// Result of resolving a source reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrack {
    pub stream_url: String,
    pub title: String,
    pub duration: Option<Duration>,
    pub thumbnail: Option<String>,
    pub uploader: Option<String>,
    pub webpage_url: Option<String>,
}

impl ResolvedTrack {
    /// Duration rendered the way embeds and queue entries show it.
    pub fn formatted_duration(&self) -> String {
        format_duration(self.duration)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("could not start yt-dlp: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("this video is not available in the bot's region")]
    GeoRestricted(String),
    #[error("this video is unavailable or unsupported")]
    Unavailable(String),
    #[error("the video host is rate limiting requests, try again later")]
    RateLimited(String),
    #[error("no results found for `{0}`")]
    NoResults(String),
    #[error("yt-dlp failed: {0}")]
    Failed(String),
    #[error("could not read yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no playable stream for `{0}`")]
    MissingStream(String),
}

/// Anything able to turn a URL or a search query into a [`ResolvedTrack`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn resolve(&self, source_ref: &str) -> Result<ResolvedTrack, ExtractionError>;
}

/// Formats a track length as `HH:MM:SS` when it reaches an hour, `MM:SS`
/// otherwise. Missing or zero lengths (live streams, unknown) give `"Unknown"`.
pub fn format_duration(duration: Option<Duration>) -> String {
    let total_seconds = match duration.map(|d| d.as_secs()) {
        Some(secs) if secs > 0 => secs,
        _ => return "Unknown".to_string(),
    };

    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_with_hours() {
        assert_eq!(format_duration(Some(Duration::from_secs(3725))), "01:02:05");
        assert_eq!(format_duration(Some(Duration::from_secs(36000))), "10:00:00");
    }

    #[test]
    fn test_format_duration_minutes_only() {
        assert_eq!(format_duration(Some(Duration::from_secs(65))), "01:05");
        assert_eq!(format_duration(Some(Duration::from_secs(59))), "00:59");
        assert_eq!(format_duration(Some(Duration::from_secs(3599))), "59:59");
    }

    #[test]
    fn test_format_duration_unknown() {
        assert_eq!(format_duration(None), "Unknown");
        assert_eq!(format_duration(Some(Duration::ZERO)), "Unknown");
    }

    #[test]
    fn test_fractional_seconds_are_truncated() {
        assert_eq!(format_duration(Some(Duration::from_secs_f64(65.9))), "01:05");
    }
}
