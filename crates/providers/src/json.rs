use crate::{MemoryLibrary, MusicLibrary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use playcounts_core::{LibraryTrack, TrackUpdate};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A library stored as a JSON array of tracks.
///
/// The file is read on the first [`MusicLibrary::tracks`] call and rewritten
/// on [`MusicLibrary::flush`] when anything changed.
pub struct JsonLibrary {
    path: PathBuf,
    loaded: Option<MemoryLibrary>,
    dirty: bool,
}

impl JsonLibrary {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            loaded: None,
            dirty: false,
        }
    }

    fn load(&mut self) -> Result<&mut MemoryLibrary> {
        if self.loaded.is_none() {
            let data = std::fs::read_to_string(&self.path)
                .with_context(|| format!("failed to read {}", self.path.display()))?;
            let tracks: Vec<LibraryTrack> = serde_json::from_str(&data)
                .with_context(|| format!("failed to parse {}", self.path.display()))?;
            debug!(path = %self.path.display(), tracks = tracks.len(), "loaded json library");
            self.loaded = Some(MemoryLibrary::new(tracks));
        }
        self.loaded
            .as_mut()
            .context("json library was not loaded")
    }
}

fn write_tracks(path: &Path, tracks: &[LibraryTrack]) -> Result<()> {
    let json = serde_json::to_string_pretty(tracks)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl MusicLibrary for JsonLibrary {
    fn name(&self) -> &'static str {
        "json"
    }

    fn data_file(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }

    async fn tracks(&mut self) -> Result<Vec<LibraryTrack>> {
        Ok(self.load()?.all().to_vec())
    }

    async fn apply(&mut self, track: &LibraryTrack, update: &TrackUpdate) -> Result<()> {
        self.load()?.apply_update(&track.id, update)?;
        self.dirty = true;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(library) = &self.loaded {
            write_tracks(&self.path, library.all())?;
            debug!(path = %self.path.display(), writes = library.writes(), "json library saved");
        }
        self.dirty = false;
        Ok(())
    }
}
