//! Export and replay of play-history snapshots.

pub mod backup;
pub mod error;
pub mod export;
pub mod index;
pub mod merge;
pub mod snapshot;
pub mod update;

pub use backup::backup_library;
pub use error::{BackupError, SnapshotError};
pub use export::{export_library, records_from_tracks, ExportSummary};
pub use index::{signature_matches, TrackIndex};
pub use merge::{FieldChange, Merge};
pub use update::{RecordOutcome, UpdateOptions, UpdateSummary, Updater};
