//! Snapshot files: an XML property list holding an array of track
//! dictionaries.

use crate::error::SnapshotError;
use chrono::{DateTime, Utc};
use playcounts_core::fields::{field, FieldValue, FIELDS};
use playcounts_core::TrackRecord;
use plist::{Dictionary, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Older snapshots stored the duration under this key, as `m:ss` text.
const LEGACY_DURATION_KEY: &str = "time";

pub fn encode(records: &[TrackRecord]) -> Value {
    let entries = records
        .iter()
        .map(|record| {
            let mut dict = Dictionary::new();
            for spec in FIELDS.iter() {
                if let Some(value) = spec.record_value(record) {
                    dict.insert(spec.key.to_string(), to_plist(value));
                }
            }
            Value::Dictionary(dict)
        })
        .collect();
    Value::Array(entries)
}

/// Decodes a snapshot root. Returns `None` when the root is not an array.
pub fn decode(root: Value) -> Option<Vec<TrackRecord>> {
    let Value::Array(entries) = root else {
        return None;
    };

    let mut records = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        match entry {
            Value::Dictionary(dict) => records.push(decode_entry(&dict)),
            _ => warn!(position, "skipping snapshot entry that is not a dictionary"),
        }
    }
    Some(records)
}

fn decode_entry(dict: &Dictionary) -> TrackRecord {
    let mut record = TrackRecord::default();
    for spec in FIELDS.iter() {
        let Some(raw) = dict.get(spec.key) else {
            continue;
        };
        let stored = from_plist(raw).is_some_and(|value| spec.store(&mut record, value));
        if !stored {
            warn!(key = spec.key, "ignoring snapshot value of unexpected type");
        }
    }

    if record.duration.is_none() {
        if let Some(seconds) = dict.get(LEGACY_DURATION_KEY).and_then(legacy_duration) {
            if let Some(spec) = field("duration") {
                spec.store(&mut record, FieldValue::Integer(seconds));
            }
        }
    }
    record
}

fn to_plist(value: FieldValue) -> Value {
    match value {
        FieldValue::Text(s) => Value::String(s),
        FieldValue::Integer(n) => Value::Integer(n.into()),
        FieldValue::Date(d) => Value::Date(SystemTime::from(d).into()),
    }
}

fn from_plist(value: &Value) -> Option<FieldValue> {
    match value {
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        Value::Integer(i) => i.as_unsigned().map(FieldValue::Integer),
        Value::Real(f) if f.is_finite() && *f >= 0.0 => {
            Some(FieldValue::Integer(f.round() as u64))
        }
        Value::Date(d) => {
            let time = SystemTime::from(*d);
            Some(FieldValue::Date(DateTime::<Utc>::from(time)))
        }
        _ => None,
    }
}

/// Parses a legacy duration: integer seconds, or `m:ss` / `h:mm:ss` text.
fn legacy_duration(value: &Value) -> Option<u64> {
    match value {
        Value::Integer(i) => i.as_unsigned(),
        Value::String(s) => parse_clock(s),
        _ => None,
    }
}

fn parse_clock(text: &str) -> Option<u64> {
    let mut total: u64 = 0;
    for part in text.trim().split(':') {
        let n: u64 = part.parse().ok()?;
        total = total.checked_mul(60)?.checked_add(n)?;
    }
    Some(total)
}

/// Writes the records to `path`, replacing any existing file.
pub fn write(path: &Path, records: &[TrackRecord]) -> Result<(), SnapshotError> {
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    let tmp = path.with_extension("plist.tmp");
    let file = File::create(&tmp).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    encode(records)
        .to_writer_xml(&mut writer)
        .map_err(|source| SnapshotError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    writer.flush().map_err(io_err)?;
    drop(writer);
    std::fs::rename(&tmp, path).map_err(io_err)?;
    debug!(path = %path.display(), records = records.len(), "snapshot written");
    Ok(())
}

pub fn read(path: &Path) -> Result<Vec<TrackRecord>, SnapshotError> {
    let root = Value::from_file(path).map_err(|source| SnapshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode(root).ok_or_else(|| SnapshotError::NotAnArray(path.to_path_buf()))
}
