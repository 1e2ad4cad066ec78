use chrono::{DateTime, Utc};
use playcounts_core::{LibraryTrack, TrackRecord, TrackUpdate};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldChange {
    PlayedCount {
        from: u32,
        to: u32,
    },
    PlayedDate {
        from: Option<DateTime<Utc>>,
        to: DateTime<Utc>,
    },
    DateAdded {
        from: Option<DateTime<Utc>>,
        to: DateTime<Utc>,
    },
    Rating {
        from: u8,
        to: u8,
    },
}

fn show_date(date: &Option<DateTime<Utc>>) -> String {
    date.map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "never".to_string())
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldChange::PlayedCount { from, to } => {
                write!(f, "played count {to} (was {from})")
            }
            FieldChange::PlayedDate { from, to } => {
                write!(f, "played date {} (was {})", to.to_rfc3339(), show_date(from))
            }
            FieldChange::DateAdded { from, to } => {
                write!(f, "date added {} (was {})", to.to_rfc3339(), show_date(from))
            }
            FieldChange::Rating { from, to } => write!(f, "rating {to} (was {from})"),
        }
    }
}

/// The changes a snapshot record makes to one live track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Merge {
    changes: Vec<FieldChange>,
}

impl Merge {
    /// Plays are added, the latest played date and the earliest date added
    /// win, and a rating only fills an unrated track.
    pub fn plan(track: &LibraryTrack, record: &TrackRecord) -> Self {
        let mut changes = Vec::new();

        if let Some(count) = record.played_count.filter(|&c| c > 0) {
            changes.push(FieldChange::PlayedCount {
                from: track.played_count,
                to: track.played_count.saturating_add(count),
            });
        }

        if let Some(played) = record.played_date {
            if track.played_date.map_or(true, |current| played > current) {
                changes.push(FieldChange::PlayedDate {
                    from: track.played_date,
                    to: played,
                });
            }
        }

        if let Some(added) = record.date_added {
            if track.date_added.map_or(true, |current| added < current) {
                changes.push(FieldChange::DateAdded {
                    from: track.date_added,
                    to: added,
                });
            }
        }

        if let Some(rating) = record.rating.filter(|&r| r > 0) {
            if track.rating == 0 {
                changes.push(FieldChange::Rating {
                    from: track.rating,
                    to: rating,
                });
            }
        }

        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    pub fn update(&self) -> TrackUpdate {
        let mut update = TrackUpdate::default();
        for change in &self.changes {
            match *change {
                FieldChange::PlayedCount { to, .. } => update.played_count = Some(to),
                FieldChange::PlayedDate { to, .. } => update.played_date = Some(to),
                FieldChange::DateAdded { to, .. } => update.date_added = Some(to),
                FieldChange::Rating { to, .. } => update.rating = Some(to),
            }
        }
        update
    }
}
