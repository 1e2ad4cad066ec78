use crate::snapshot;
use anyhow::Result;
use playcounts_core::fields::project;
use playcounts_core::{LibraryTrack, TrackRecord};
use playcounts_providers::MusicLibrary;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub tracks: usize,
    pub skipped: usize,
    pub records: usize,
}

/// One record per file-backed track, in library order.
pub fn records_from_tracks(tracks: &[LibraryTrack]) -> (Vec<TrackRecord>, ExportSummary) {
    let records: Vec<TrackRecord> = tracks
        .iter()
        .filter(|t| t.is_file_backed())
        .map(project)
        .collect();
    let summary = ExportSummary {
        tracks: tracks.len(),
        skipped: tracks.len() - records.len(),
        records: records.len(),
    };
    (records, summary)
}

/// Reads the whole library and writes its snapshot to `path`.
pub async fn export_library(
    library: &mut dyn MusicLibrary,
    path: &Path,
) -> Result<ExportSummary> {
    let tracks = library.tracks().await?;
    info!(library = library.name(), tracks = tracks.len(), "found tracks");

    let (records, summary) = records_from_tracks(&tracks);
    snapshot::write(path, &records)?;
    info!(
        path = %path.display(),
        records = summary.records,
        skipped = summary.skipped,
        "snapshot exported"
    );
    Ok(summary)
}
