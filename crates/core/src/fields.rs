//! The fixed table of record fields.
//!
//! Export projection, snapshot encoding and signature comparison all walk
//! [`FIELDS`] instead of naming each attribute by hand.

use crate::model::{LibraryTrack, TrackRecord};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(u64),
    Date(DateTime<Utc>),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{s:?}"),
            FieldValue::Integer(n) => write!(f, "{n}"),
            FieldValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
        }
    }
}

pub struct FieldSpec {
    /// Key used in the snapshot file.
    pub key: &'static str,
    /// Part of the identity check between a record and a live track.
    pub signature: bool,
    /// A zero integer means "unset" and is never written.
    pub zero_filter: bool,
    read_live: fn(&LibraryTrack) -> Option<FieldValue>,
    read_record: fn(&TrackRecord) -> Option<FieldValue>,
    store: fn(&mut TrackRecord, FieldValue) -> bool,
}

impl FieldSpec {
    /// The live track's value, or `None` when it is empty.
    pub fn live_value(&self, track: &LibraryTrack) -> Option<FieldValue> {
        (self.read_live)(track).filter(|v| !self.is_blank(v))
    }

    /// The record's value, or `None` when it is absent or empty.
    pub fn record_value(&self, record: &TrackRecord) -> Option<FieldValue> {
        (self.read_record)(record).filter(|v| !self.is_blank(v))
    }

    /// Stores `value` into the record. Returns `false` when the value has the
    /// wrong type or does not fit the field.
    pub fn store(&self, record: &mut TrackRecord, value: FieldValue) -> bool {
        (self.store)(record, value)
    }

    fn is_blank(&self, value: &FieldValue) -> bool {
        match value {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Integer(0) => self.zero_filter,
            _ => false,
        }
    }
}

fn text(s: &str) -> Option<FieldValue> {
    Some(FieldValue::Text(s.to_string()))
}

fn take_text(value: FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(s) => Some(s),
        _ => None,
    }
}

fn take_int<T: TryFrom<u64>>(value: FieldValue) -> Option<T> {
    match value {
        FieldValue::Integer(n) => T::try_from(n).ok(),
        _ => None,
    }
}

fn take_date(value: FieldValue) -> Option<DateTime<Utc>> {
    match value {
        FieldValue::Date(d) => Some(d),
        _ => None,
    }
}

/// Assigns `parsed` to `slot` when conversion succeeded.
fn put<T>(slot: &mut Option<T>, parsed: Option<T>) -> bool {
    match parsed {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

pub static FIELDS: [FieldSpec; 8] = [
    FieldSpec {
        key: "name",
        signature: true,
        zero_filter: false,
        read_live: |t| text(&t.name),
        read_record: |r| r.name.as_deref().and_then(text),
        store: |r, v| put(&mut r.name, take_text(v)),
    },
    FieldSpec {
        key: "artist",
        signature: true,
        zero_filter: false,
        read_live: |t| text(&t.artist),
        read_record: |r| r.artist.as_deref().and_then(text),
        store: |r, v| put(&mut r.artist, take_text(v)),
    },
    FieldSpec {
        key: "album",
        signature: true,
        zero_filter: false,
        read_live: |t| text(&t.album),
        read_record: |r| r.album.as_deref().and_then(text),
        store: |r, v| put(&mut r.album, take_text(v)),
    },
    FieldSpec {
        key: "duration",
        signature: true,
        zero_filter: true,
        read_live: |t| t.duration.map(|d| FieldValue::Integer(d.into())),
        read_record: |r| r.duration.map(|d| FieldValue::Integer(d.into())),
        store: |r, v| put(&mut r.duration, take_int(v)),
    },
    FieldSpec {
        key: "playedCount",
        signature: false,
        zero_filter: true,
        read_live: |t| Some(FieldValue::Integer(t.played_count.into())),
        read_record: |r| r.played_count.map(|c| FieldValue::Integer(c.into())),
        store: |r, v| put(&mut r.played_count, take_int(v)),
    },
    FieldSpec {
        key: "playedDate",
        signature: false,
        zero_filter: false,
        read_live: |t| t.played_date.map(FieldValue::Date),
        read_record: |r| r.played_date.map(FieldValue::Date),
        store: |r, v| put(&mut r.played_date, take_date(v)),
    },
    FieldSpec {
        key: "dateAdded",
        signature: false,
        zero_filter: false,
        read_live: |t| t.date_added.map(FieldValue::Date),
        read_record: |r| r.date_added.map(FieldValue::Date),
        store: |r, v| put(&mut r.date_added, take_date(v)),
    },
    FieldSpec {
        key: "rating",
        signature: false,
        zero_filter: true,
        read_live: |t| Some(FieldValue::Integer(t.rating.into())),
        read_record: |r| r.rating.map(|c| FieldValue::Integer(c.into())),
        store: |r, v| put(&mut r.rating, take_int(v)),
    },
];

pub fn signature_fields() -> impl Iterator<Item = &'static FieldSpec> {
    FIELDS.iter().filter(|f| f.signature)
}

pub fn field(key: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.key == key)
}

/// Projects a live track onto a record, dropping every empty field.
pub fn project(track: &LibraryTrack) -> TrackRecord {
    let mut record = TrackRecord::default();
    for spec in FIELDS.iter() {
        if let Some(value) = spec.live_value(track) {
            spec.store(&mut record, value);
        }
    }
    record
}
