use crate::MusicLibrary;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use playcounts_core::{LibraryTrack, TrackKind, TrackUpdate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info, warn};

const READ_SCRIPT: &str = include_str!("../macos/jxa_library_tracks.js");
const APPLY_SCRIPT: &str = include_str!("../macos/jxa_apply_updates.js");

/// The Music (or iTunes) application, driven through JXA.
///
/// Reads happen in one bulk script run. Writes are queued by `apply` and sent
/// in a single script run on `flush`.
pub struct AppleMusicLibrary {
    app_name: String,
    data_file: Option<PathBuf>,
    pending: Vec<JxaUpdate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JxaTrack {
    persistent_id: String,
    kind: String,
    name: String,
    artist: String,
    album: String,
    duration: Option<f64>,
    played_count: u32,
    played_date: Option<DateTime<Utc>>,
    date_added: Option<DateTime<Utc>>,
    rating: u8,
}

impl From<JxaTrack> for LibraryTrack {
    fn from(t: JxaTrack) -> Self {
        LibraryTrack {
            id: t.persistent_id,
            kind: if t.kind == "fileTrack" {
                TrackKind::File
            } else {
                TrackKind::Other
            },
            name: t.name,
            artist: t.artist,
            album: t.album,
            duration: t
                .duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(|d| d.round() as u32),
            played_count: t.played_count,
            played_date: t.played_date,
            date_added: t.date_added,
            rating: t.rating,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JxaUpdate {
    persistent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    played_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    played_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_added: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct JxaApplyResult {
    applied: usize,
    errors: Vec<String>,
    /// Optional fields the player refused to set, such as a read-only
    /// date added.
    #[serde(default)]
    warnings: Vec<String>,
}

/// Parses the apply script's report. Any track left unwritten is an error.
fn check_apply_result(stdout: &str, queued: usize) -> Result<usize> {
    let parsed: JxaApplyResult =
        serde_json::from_str(stdout.trim()).context("invalid JSON from jxa script")?;
    for warning in &parsed.warnings {
        warn!(warning = %warning, "track field not updated");
    }
    if !parsed.errors.is_empty() || parsed.applied < queued {
        return Err(anyhow!(
            "{} of {} track updates failed: {}",
            queued.saturating_sub(parsed.applied),
            queued,
            parsed.errors.join("; ")
        ));
    }
    Ok(parsed.applied)
}

impl AppleMusicLibrary {
    pub fn new(app_name: String, data_file: Option<PathBuf>) -> Self {
        Self {
            app_name,
            data_file,
            pending: Vec::new(),
        }
    }

    fn default_data_file() -> Option<PathBuf> {
        dirs::home_dir().map(|home| {
            home.join("Music")
                .join("iTunes")
                .join("iTunes Library.itl")
        })
    }

    async fn osascript(script: &str, args: &[&str]) -> Result<String> {
        let output = Command::new("osascript")
            .arg("-l")
            .arg("JavaScript")
            .arg("-e")
            .arg(script)
            .args(args)
            .output()
            .await
            .context("failed to run osascript")?;

        if !output.status.success() {
            return Err(anyhow!(
                "osascript failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        String::from_utf8(output.stdout).context("invalid UTF-8 from osascript")
    }
}

#[async_trait]
impl MusicLibrary for AppleMusicLibrary {
    fn name(&self) -> &'static str {
        "apple_music"
    }

    fn data_file(&self) -> Option<PathBuf> {
        self.data_file.clone().or_else(Self::default_data_file)
    }

    async fn tracks(&mut self) -> Result<Vec<LibraryTrack>> {
        let stdout = Self::osascript(READ_SCRIPT, &[self.app_name.as_str()]).await?;
        let parsed: Vec<JxaTrack> =
            serde_json::from_str(stdout.trim()).context("invalid JSON from jxa script")?;
        info!(app = %self.app_name, tracks = parsed.len(), "read library tracks");
        Ok(parsed.into_iter().map(LibraryTrack::from).collect())
    }

    async fn apply(&mut self, track: &LibraryTrack, update: &TrackUpdate) -> Result<()> {
        self.pending.push(JxaUpdate {
            persistent_id: track.id.clone(),
            played_count: update.played_count,
            played_date: update.played_date,
            date_added: update.date_added,
            rating: update.rating,
        });
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let path = std::env::temp_dir().join(format!(
            "playcounts-updates-{}.json",
            std::process::id()
        ));
        let json = serde_json::to_string(&self.pending)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;

        let path_arg = path.to_string_lossy().into_owned();
        let result =
            Self::osascript(APPLY_SCRIPT, &[self.app_name.as_str(), path_arg.as_str()]).await;
        if let Err(err) = std::fs::remove_file(&path) {
            debug!(error = %err, path = %path.display(), "could not remove update file");
        }

        let queued = std::mem::take(&mut self.pending).len();
        let applied = check_apply_result(&result?, queued)?;
        info!(queued, applied, "library updates written");
        Ok(())
    }
}
