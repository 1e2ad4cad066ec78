use crate::index::TrackIndex;
use crate::merge::Merge;
use anyhow::Result;
use playcounts_core::TrackRecord;
use playcounts_providers::MusicLibrary;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Log the planned changes without writing them.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    NoName,
    NoCandidates,
    /// Same-named tracks exist but none has the record's signature.
    Rejected,
    Matched { tracks: usize, updated: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub records: usize,
    pub no_name: usize,
    pub no_candidates: usize,
    pub rejected: usize,
    pub matched: usize,
    pub tracks_updated: usize,
    pub dry_run: bool,
}

impl UpdateSummary {
    fn record(&mut self, outcome: RecordOutcome) {
        self.records += 1;
        match outcome {
            RecordOutcome::NoName => self.no_name += 1,
            RecordOutcome::NoCandidates => self.no_candidates += 1,
            RecordOutcome::Rejected => self.rejected += 1,
            RecordOutcome::Matched { updated, .. } => {
                self.matched += 1;
                self.tracks_updated += updated;
            }
        }
    }
}

/// Replays snapshot records into a live library.
pub struct Updater<'a> {
    library: &'a mut dyn MusicLibrary,
    index: TrackIndex,
    options: UpdateOptions,
}

impl<'a> Updater<'a> {
    /// Reads the library and indexes its file-backed tracks.
    pub async fn new(library: &'a mut dyn MusicLibrary, options: UpdateOptions) -> Result<Self> {
        let tracks = library.tracks().await?;
        info!(library = library.name(), tracks = tracks.len(), "found tracks");
        let index = TrackIndex::new(tracks);
        debug!(indexed = index.len(), "library indexed by name");
        Ok(Self {
            library,
            index,
            options,
        })
    }

    pub async fn merge_record(&mut self, record: &TrackRecord) -> Result<RecordOutcome> {
        let Some(name) = record.name() else {
            warn!("no name in snapshot record; skipping");
            return Ok(RecordOutcome::NoName);
        };
        if self.index.candidates(name).is_empty() {
            debug!(track = %name, "no library track with this name");
            return Ok(RecordOutcome::NoCandidates);
        }

        let matches = self.index.matching(record);
        if matches.is_empty() {
            debug!(track = %name, "no library track with a matching signature");
            return Ok(RecordOutcome::Rejected);
        }

        let mut updated = 0;
        for &idx in &matches {
            let Some(track) = self.index.get(idx) else {
                continue;
            };
            let merge = Merge::plan(track, record);
            if merge.is_empty() {
                continue;
            }

            info!(
                track = %track.name,
                id = %track.id,
                dry_run = self.options.dry_run,
                "updating track"
            );
            for change in merge.changes() {
                info!(track = %track.name, "\t{change}");
            }

            // Dry run still advances the in-memory copy; only the library
            // write is skipped.
            let update = merge.update();
            if !self.options.dry_run {
                self.library.apply(track, &update).await?;
            }
            if let Some(track) = self.index.get_mut(idx) {
                track.apply(&update);
            }
            updated += 1;
        }

        Ok(RecordOutcome::Matched {
            tracks: matches.len(),
            updated,
        })
    }

    pub async fn run(mut self, records: &[TrackRecord]) -> Result<UpdateSummary> {
        info!(records = records.len(), "applying snapshot");
        let mut summary = UpdateSummary {
            dry_run: self.options.dry_run,
            ..UpdateSummary::default()
        };
        for record in records {
            let outcome = self.merge_record(record).await?;
            summary.record(outcome);
        }

        if !self.options.dry_run {
            self.library.flush().await?;
        }

        info!(
            records = summary.records,
            matched = summary.matched,
            updated = summary.tracks_updated,
            no_name = summary.no_name,
            no_candidates = summary.no_candidates,
            rejected = summary.rejected,
            dry_run = summary.dry_run,
            "update finished"
        );
        Ok(summary)
    }
}
