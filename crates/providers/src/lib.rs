use anyhow::{anyhow, Result};
use async_trait::async_trait;
use playcounts_core::{LibraryConfig, LibraryTrack, TrackUpdate};
use std::path::PathBuf;

mod json;
mod memory;

pub use json::JsonLibrary;
pub use memory::MemoryLibrary;

/// A live music library that can be read in bulk and written per track.
#[async_trait]
pub trait MusicLibrary: Send {
    fn name(&self) -> &'static str;

    /// The primary data file backing the library, if the binding knows it.
    fn data_file(&self) -> Option<PathBuf>;

    async fn tracks(&mut self) -> Result<Vec<LibraryTrack>>;

    async fn apply(&mut self, track: &LibraryTrack, update: &TrackUpdate) -> Result<()>;

    /// Commits writes queued by [`MusicLibrary::apply`].
    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn build_library(cfg: &LibraryConfig) -> Result<Box<dyn MusicLibrary>> {
    match cfg.backend.as_str() {
        "apple_music" => platform::apple_music_library(cfg).ok_or_else(|| {
            anyhow!("the apple_music library backend is only available on macOS")
        }),
        "json" => {
            let path = cfg
                .data_file
                .clone()
                .ok_or_else(|| anyhow!("the json library backend needs library.data_file"))?;
            Ok(Box::new(JsonLibrary::new(path)))
        }
        other => Err(anyhow!("unknown library backend: {other}")),
    }
}

mod platform {
    use super::MusicLibrary;
    use playcounts_core::LibraryConfig;

    #[cfg(target_os = "macos")]
    pub fn apple_music_library(cfg: &LibraryConfig) -> Option<Box<dyn MusicLibrary>> {
        Some(Box::new(crate::macos::AppleMusicLibrary::new(
            cfg.app_name.clone(),
            cfg.data_file.clone(),
        )))
    }

    #[cfg(not(target_os = "macos"))]
    pub fn apple_music_library(_cfg: &LibraryConfig) -> Option<Box<dyn MusicLibrary>> {
        None
    }
}

#[cfg(target_os = "macos")]
mod macos;
