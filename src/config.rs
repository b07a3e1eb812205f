use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::audio::player::PlayerSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DISCORD_TOKEN is not set; add it to the environment or a .env file")]
    MissingToken,
    #[error("{key} has an invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
    #[error("{0}")]
    OutOfRange(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // registers commands on one guild (development)
    pub command_prefix: String,

    // Audio
    pub default_volume: f32,
    pub max_queue_size: usize,
    pub max_consecutive_skips: usize,

    // yt-dlp
    pub ytdlp_path: PathBuf,
    pub ytdlp_cookies: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from the process environment (and `.env`).
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, applying defaults for
    /// everything except the token.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = value("DISCORD_TOKEN").ok_or(ConfigError::MissingToken)?;

        let config = Self {
            discord_token,
            guild_id: parse_optional(&value, "GUILD_ID")?,
            command_prefix: value("COMMAND_PREFIX").unwrap_or_else(|| "!".to_string()),

            default_volume: parse_or(&value, "DEFAULT_VOLUME", 0.5)?,
            max_queue_size: parse_or(&value, "MAX_QUEUE_SIZE", 1000)?,
            max_consecutive_skips: parse_or(&value, "MAX_CONSECUTIVE_SKIPS", 10)?,

            ytdlp_path: value("YTDLP_PATH")
                .unwrap_or_else(|| "yt-dlp".to_string())
                .into(),
            ytdlp_cookies: value("YTDLP_COOKIES").map(PathBuf::from),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// - Volume must be between 0.0 and 2.0
    /// - Queue size and skip cap must be greater than 0
    /// - The command prefix must not contain whitespace
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_volume) {
            return Err(ConfigError::OutOfRange(format!(
                "Default volume must be between 0.0 and 2.0, got: {}",
                self.default_volume
            )));
        }

        if self.max_queue_size == 0 {
            return Err(ConfigError::OutOfRange(
                "Max queue size must be greater than 0".to_string(),
            ));
        }

        if self.max_consecutive_skips == 0 {
            return Err(ConfigError::OutOfRange(
                "Max consecutive skips must be greater than 0".to_string(),
            ));
        }

        if self.command_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::OutOfRange(format!(
                "Command prefix cannot contain whitespace, got: {:?}",
                self.command_prefix
            )));
        }

        Ok(())
    }

    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            max_queue_size: self.max_queue_size,
            max_consecutive_skips: self.max_consecutive_skips,
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Commands: prefix {:?}, registered {}\n  \
            Audio: {}% vol, {} queue, {} skip cap\n  \
            yt-dlp: {} (cookies: {})",
            self.command_prefix,
            self.guild_id
                .map_or("globally".to_string(), |id| format!("on guild {}", id)),
            (self.default_volume * 100.0) as u32,
            self.max_queue_size,
            self.max_consecutive_skips,
            self.ytdlp_path.display(),
            self.ytdlp_cookies
                .as_ref()
                .map_or("none".to_string(), |p| p.display().to_string()),
        )
    }
}

fn parse_or<T, F>(value: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_optional(value, key)?.unwrap_or(default))
}

fn parse_optional<T, F>(value: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    value(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value: raw })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_missing_token_is_fatal() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingToken)));
        assert!(matches!(
            load(&[("DISCORD_TOKEN", "   ")]),
            Err(ConfigError::MissingToken)
        ));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DISCORD_TOKEN", "secret")]).unwrap();

        assert_eq!(config.discord_token, "secret");
        assert_eq!(config.guild_id, None);
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.max_queue_size, 1000);
        assert_eq!(config.max_consecutive_skips, 10);
        assert_eq!(config.ytdlp_path, PathBuf::from("yt-dlp"));
        assert!(config.ytdlp_cookies.is_none());
        assert!((config.default_volume - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DISCORD_TOKEN", "secret"),
            ("GUILD_ID", "1234"),
            ("COMMAND_PREFIX", "?"),
            ("MAX_QUEUE_SIZE", "5"),
            ("YTDLP_COOKIES", "/data/cookies.txt"),
        ])
        .unwrap();

        assert_eq!(config.guild_id, Some(1234));
        assert_eq!(config.command_prefix, "?");
        assert_eq!(config.player_settings().max_queue_size, 5);
        assert_eq!(config.ytdlp_cookies, Some(PathBuf::from("/data/cookies.txt")));
    }

    #[test]
    fn test_invalid_number() {
        match load(&[("DISCORD_TOKEN", "secret"), ("MAX_QUEUE_SIZE", "lots")]) {
            Err(ConfigError::Invalid { key, value }) => {
                assert_eq!(key, "MAX_QUEUE_SIZE");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_values() {
        assert!(matches!(
            load(&[("DISCORD_TOKEN", "secret"), ("DEFAULT_VOLUME", "3.5")]),
            Err(ConfigError::OutOfRange(_))
        ));
        assert!(matches!(
            load(&[("DISCORD_TOKEN", "secret"), ("MAX_CONSECUTIVE_SKIPS", "0")]),
            Err(ConfigError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_summary_hides_token() {
        let config = load(&[("DISCORD_TOKEN", "super-secret-token")]).unwrap();
        let summary = config.summary();

        assert!(!summary.contains("super-secret-token"));
        assert!(summary.contains("registered globally"));
    }
}
