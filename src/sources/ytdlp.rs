use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::{path::PathBuf, sync::LazyLock, time::Duration};
use tracing::{debug, info, warn};

use super::{ExtractionError, Extractor, ResolvedTrack};
use crate::config::Config;

static RATE_LIMITED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)HTTP Error 429|too many requests|rate.?limit").expect("valid regex")
});
static GEO_RESTRICTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)available (in|from) your (country|location)|geo.?restrict|blocked it in your country")
        .expect("valid regex")
});
static UNAVAILABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)video unavailable|private video|has been removed|unsupported url|account associated with this video has been terminated|is not available",
    )
    .expect("valid regex")
});

/// Output of `yt-dlp -J`. Searches come back wrapped in `entries`.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    uploader: Option<String>,
    webpage_url: Option<String>,
    entries: Option<Vec<YtDlpInfo>>,
}

/// Extractor backed by the `yt-dlp` executable.
pub struct YtDlpClient {
    executable: PathBuf,
    cookies: Option<PathBuf>,
}

impl YtDlpClient {
    pub fn new(executable: impl Into<PathBuf>, cookies: Option<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            cookies,
        }
    }

    /// Builds the client from configuration, falling back to a `cookies.txt`
    /// in the working directory when no cookies file is configured.
    pub fn from_config(config: &Config) -> Self {
        let cookies = config.ytdlp_cookies.clone().or_else(|| {
            let local = PathBuf::from("cookies.txt");
            local.exists().then_some(local)
        });

        if let Some(path) = &cookies {
            info!("🍪 Using cookies from {}", path.display());
        }

        Self::new(config.ytdlp_path.clone(), cookies)
    }

    /// Checks that the executable runs and returns its version string.
    pub async fn verify(&self) -> anyhow::Result<String> {
        let output = tokio::process::Command::new(&self.executable)
            .arg("--version")
            .output()
            .await?;

        if !output.status.success() {
            anyhow::bail!("{} --version exited with {}", self.executable.display(), output.status);
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn args(&self, target: &str) -> Vec<String> {
        let mut args: Vec<String> = [
            "-J",
            "--no-playlist",
            "-f",
            "bestaudio/best",
            "--no-warnings",
            "--default-search",
            "ytsearch",
            "--geo-bypass",
            "--force-ipv4",
            "--socket-timeout",
            "30",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        if let Some(cookies) = &self.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.display().to_string());
        }

        // "--" keeps user input from being read as an option
        args.push("--".to_string());
        args.push(target.to_string());
        args
    }
}

#[async_trait]
impl Extractor for YtDlpClient {
    async fn resolve(&self, source_ref: &str) -> Result<ResolvedTrack, ExtractionError> {
        let target = search_target(source_ref);
        debug!("🔍 Resolving with yt-dlp: {}", target);

        let output = tokio::process::Command::new(&self.executable)
            .args(self.args(&target))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ExtractionError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp failed for {}: {}", source_ref, stderr.trim());
            return Err(classify_failure(&stderr));
        }

        let track = parse_output(source_ref, &output.stdout)?;
        info!("🎯 Resolved: {} ({})", track.title, track.formatted_duration());
        Ok(track)
    }
}

/// URLs go to yt-dlp untouched; anything else becomes a single-result search.
fn search_target(source_ref: &str) -> String {
    let trimmed = source_ref.trim();
    match url::Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => trimmed.to_string(),
        _ => format!("ytsearch1:{}", trimmed),
    }
}

fn parse_output(source_ref: &str, stdout: &[u8]) -> Result<ResolvedTrack, ExtractionError> {
    let mut info: YtDlpInfo = serde_json::from_slice(stdout)?;

    if let Some(entries) = info.entries.take() {
        info = entries
            .into_iter()
            .next()
            .ok_or_else(|| ExtractionError::NoResults(source_ref.to_string()))?;
    }

    let title = info.title.unwrap_or_else(|| "Unknown".to_string());
    let stream_url = info
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ExtractionError::MissingStream(title.clone()))?;

    Ok(ResolvedTrack {
        stream_url,
        title,
        duration: info
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(Duration::from_secs_f64),
        thumbnail: info.thumbnail,
        uploader: info.uploader,
        webpage_url: info.webpage_url,
    })
}

fn classify_failure(stderr: &str) -> ExtractionError {
    let message = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown error")
        .trim_start_matches("ERROR:")
        .trim()
        .to_string();

    if RATE_LIMITED.is_match(stderr) {
        ExtractionError::RateLimited(message)
    } else if GEO_RESTRICTED.is_match(stderr) {
        ExtractionError::GeoRestricted(message)
    } else if UNAVAILABLE.is_match(stderr) {
        ExtractionError::Unavailable(message)
    } else {
        ExtractionError::Failed(message)
    }
}
