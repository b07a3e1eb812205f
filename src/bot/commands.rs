use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{
        application::{Command, CommandOptionType},
        id::GuildId,
    },
    prelude::Context,
};

/// A music command, whichever surface (slash or prefix) it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicCommand {
    Play(String),
    Skip,
    Queue,
    Stop,
    Pause,
    Resume,
    Join,
    Disconnect,
}

impl MusicCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play(_) => "play",
            Self::Skip => "skip",
            Self::Queue => "queue",
            Self::Stop => "stop",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Join => "join",
            Self::Disconnect => "disconnect",
        }
    }

    /// Maps a slash command name (plus its `query` option) to a command.
    pub fn from_slash(name: &str, query: Option<&str>) -> Option<Self> {
        let command = match name {
            "play" => Self::Play(query.unwrap_or_default().trim().to_string()),
            "skip" => Self::Skip,
            "queue" => Self::Queue,
            "stop" => Self::Stop,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "join" => Self::Join,
            "disconnect" => Self::Disconnect,
            _ => return None,
        };
        Some(command)
    }

    /// Parses a prefixed chat message such as `!p never gonna give you up`.
    ///
    /// Returns `None` for messages that are not music commands. Everything
    /// after the command word is the play query.
    pub fn parse_prefix(content: &str, prefix: &str) -> Option<Self> {
        let rest = content.trim_start().strip_prefix(prefix)?;
        let (word, args) = match rest.split_once(char::is_whitespace) {
            Some((word, args)) => (word, args.trim()),
            None => (rest, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "play" | "p" => Self::Play(args.to_string()),
            "skip" | "s" => Self::Skip,
            "queue" | "q" => Self::Queue,
            "stop" => Self::Stop,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "join" | "j" => Self::Join,
            "disconnect" | "dc" | "leave" => Self::Disconnect,
            _ => return None,
        };
        Some(command)
    }
}

pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    Command::set_global_commands(&ctx.http, definitions()).await?;
    Ok(())
}

/// Registers on a single guild (development; changes show up immediately).
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, definitions()).await?;
    Ok(())
}

pub fn definitions() -> Vec<CreateCommand> {
    vec![
        play_command(),
        skip_command(),
        queue_command(),
        stop_command(),
        pause_command(),
        resume_command(),
        join_command(),
        disconnect_command(),
    ]
}

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Play a song from YouTube")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "query", "Song name or YouTube URL")
                .required(true)
                .set_autocomplete(true),
        )
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Skip the current song")
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Show the current music queue")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Stop the music and clear the queue")
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pause the current song")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resume the paused song")
}

fn join_command() -> CreateCommand {
    CreateCommand::new("join").description("Join your voice channel")
}

fn disconnect_command() -> CreateCommand {
    CreateCommand::new("disconnect").description("Disconnect the bot from voice channel")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prefix_aliases() {
        let cases = [
            ("!play lofi beats", MusicCommand::Play("lofi beats".to_string())),
            ("!p  lofi beats ", MusicCommand::Play("lofi beats".to_string())),
            ("!s", MusicCommand::Skip),
            ("!skip", MusicCommand::Skip),
            ("!q", MusicCommand::Queue),
            ("!stop", MusicCommand::Stop),
            ("!pause", MusicCommand::Pause),
            ("!resume", MusicCommand::Resume),
            ("!j", MusicCommand::Join),
            ("!dc", MusicCommand::Disconnect),
            ("!leave", MusicCommand::Disconnect),
            ("!DISCONNECT", MusicCommand::Disconnect),
        ];

        for (content, expected) in cases {
            assert_eq!(MusicCommand::parse_prefix(content, "!"), Some(expected), "{content}");
        }
    }

    #[test]
    fn test_prefix_play_without_query() {
        assert_eq!(
            MusicCommand::parse_prefix("!play", "!"),
            Some(MusicCommand::Play(String::new()))
        );
    }

    #[test]
    fn test_non_commands_are_ignored() {
        assert_eq!(MusicCommand::parse_prefix("hello there", "!"), None);
        assert_eq!(MusicCommand::parse_prefix("!dance", "!"), None);
        assert_eq!(MusicCommand::parse_prefix("?play x", "!"), None);
        assert_eq!(MusicCommand::parse_prefix("!", "!"), None);
    }

    #[test]
    fn test_custom_prefix() {
        assert_eq!(
            MusicCommand::parse_prefix("tb!p song", "tb!"),
            Some(MusicCommand::Play("song".to_string()))
        );
        assert_eq!(MusicCommand::parse_prefix("!p song", "tb!"), None);
    }

    #[test]
    fn test_from_slash() {
        assert_eq!(
            MusicCommand::from_slash("play", Some(" song ")),
            Some(MusicCommand::Play("song".to_string()))
        );
        assert_eq!(MusicCommand::from_slash("join", None), Some(MusicCommand::Join));
        assert_eq!(MusicCommand::from_slash("volume", None), None);
    }

    #[test]
    fn test_every_definition_maps_to_a_command() {
        for definition in definitions() {
            let json = serde_json::to_value(&definition).unwrap();
            let name = json["name"].as_str().unwrap();
            let command = MusicCommand::from_slash(name, Some("x")).unwrap();
            assert_eq!(command.name(), name);
        }
    }
}
