use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    /// Media backed by a local file.
    #[default]
    File,
    /// Streamed, shared, URL or otherwise remote entries.
    Other,
}

/// A live track as reported by a library binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LibraryTrack {
    pub id: String,
    #[serde(default)]
    pub kind: TrackKind,
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Whole seconds.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub played_count: u32,
    #[serde(default)]
    pub played_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,
    /// 0..=100, zero means unrated.
    #[serde(default)]
    pub rating: u8,
}

impl LibraryTrack {
    pub fn is_file_backed(&self) -> bool {
        self.kind == TrackKind::File
    }

    /// Applies an update to this in-memory copy.
    pub fn apply(&mut self, update: &TrackUpdate) {
        if let Some(count) = update.played_count {
            self.played_count = count;
        }
        if let Some(date) = update.played_date {
            self.played_date = Some(date);
        }
        if let Some(date) = update.date_added {
            self.date_added = Some(date);
        }
        if let Some(rating) = update.rating {
            self.rating = rating;
        }
    }
}

/// One entry of a snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackRecord {
    pub name: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<u32>,
    pub played_count: Option<u32>,
    pub played_date: Option<DateTime<Utc>>,
    pub date_added: Option<DateTime<Utc>>,
    pub rating: Option<u8>,
}

impl TrackRecord {
    /// The record's name, treating an empty string as absent.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

/// The mutable fields to write back to one live track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TrackUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub played_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub played_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_added: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl TrackUpdate {
    pub fn is_empty(&self) -> bool {
        self.played_count.is_none()
            && self.played_date.is_none()
            && self.date_added.is_none()
            && self.rating.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{LibraryTrack, TrackKind, TrackRecord, TrackUpdate};
    use chrono::{TimeZone, Utc};

    #[test]
    fn empty_name_counts_as_missing() {
        let record = TrackRecord {
            name: Some(String::new()),
            ..TrackRecord::default()
        };
        assert_eq!(record.name(), None);
    }

    #[test]
    fn apply_only_touches_fields_present_in_update() {
        let mut track = LibraryTrack {
            id: "1".to_string(),
            kind: TrackKind::File,
            name: "Song".to_string(),
            played_count: 3,
            rating: 40,
            ..LibraryTrack::default()
        };
        let played = Utc.with_ymd_and_hms(2021, 5, 1, 12, 0, 0).unwrap();
        track.apply(&TrackUpdate {
            played_count: Some(8),
            played_date: Some(played),
            ..TrackUpdate::default()
        });

        assert_eq!(track.played_count, 8);
        assert_eq!(track.played_date, Some(played));
        assert_eq!(track.rating, 40);
        assert_eq!(track.date_added, None);
    }

    #[test]
    fn default_update_is_empty() {
        assert!(TrackUpdate::default().is_empty());
        assert!(!TrackUpdate {
            rating: Some(20),
            ..TrackUpdate::default()
        }
        .is_empty());
    }
}
