use crate::MusicLibrary;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use playcounts_core::{LibraryTrack, TrackUpdate};
use std::path::PathBuf;

/// A library held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLibrary {
    tracks: Vec<LibraryTrack>,
    data_file: Option<PathBuf>,
    writes: usize,
}

impl MemoryLibrary {
    pub fn new(tracks: Vec<LibraryTrack>) -> Self {
        Self {
            tracks,
            data_file: None,
            writes: 0,
        }
    }

    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    pub fn get(&self, id: &str) -> Option<&LibraryTrack> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn all(&self) -> &[LibraryTrack] {
        &self.tracks
    }

    /// Number of successful `apply` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub(crate) fn apply_update(&mut self, id: &str, update: &TrackUpdate) -> Result<()> {
        let track = self
            .tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow!("no track with id {id}"))?;
        track.apply(update);
        self.writes += 1;
        Ok(())
    }
}

#[async_trait]
impl MusicLibrary for MemoryLibrary {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn data_file(&self) -> Option<PathBuf> {
        self.data_file.clone()
    }

    async fn tracks(&mut self) -> Result<Vec<LibraryTrack>> {
        Ok(self.tracks.clone())
    }

    async fn apply(&mut self, track: &LibraryTrack, update: &TrackUpdate) -> Result<()> {
        self.apply_update(&track.id, update)
    }
}
