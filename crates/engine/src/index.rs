use playcounts_core::fields::signature_fields;
use playcounts_core::{LibraryTrack, TrackRecord};
use std::collections::HashMap;
use tracing::warn;

/// File-backed live tracks, indexed by name.
///
/// Several tracks may share a name; lookups return all of them in library
/// order.
pub struct TrackIndex {
    tracks: Vec<LibraryTrack>,
    by_name: HashMap<String, Vec<usize>>,
}

impl TrackIndex {
    pub fn new(tracks: Vec<LibraryTrack>) -> Self {
        let tracks: Vec<LibraryTrack> = tracks
            .into_iter()
            .filter(|t| t.is_file_backed())
            .collect();
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, track) in tracks.iter().enumerate() {
            by_name.entry(track.name.clone()).or_default().push(idx);
        }
        Self { tracks, by_name }
    }

    /// Number of indexed (file-backed) tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Positions of every track named `name`; empty when there are none.
    pub fn candidates(&self, name: &str) -> &[usize] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Positions of the same-named tracks whose signature matches `record`.
    pub fn matching(&self, record: &TrackRecord) -> Vec<usize> {
        let Some(name) = record.name() else {
            return Vec::new();
        };
        self.candidates(name)
            .iter()
            .copied()
            .filter(|&idx| {
                self.tracks
                    .get(idx)
                    .is_some_and(|track| signature_matches(track, record))
            })
            .collect()
    }

    /// The track at a position returned by [`TrackIndex::candidates`] or
    /// [`TrackIndex::matching`].
    pub fn get(&self, idx: usize) -> Option<&LibraryTrack> {
        self.tracks.get(idx)
    }

    /// Mutable access, used to keep the copy in step with applied updates.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut LibraryTrack> {
        self.tracks.get_mut(idx)
    }
}

/// Whether `record` denotes the same song as `track`.
///
/// The record may omit a signature field the track leaves empty, but not one
/// the track has. Present fields must be equal.
pub fn signature_matches(track: &LibraryTrack, record: &TrackRecord) -> bool {
    for spec in signature_fields() {
        match (spec.live_value(track), spec.record_value(record)) {
            (None, None) => {}
            (Some(live), None) => {
                warn!(
                    field = spec.key,
                    track = %track.name,
                    live = %live,
                    "missing signature value in snapshot record"
                );
                return false;
            }
            (live, Some(wanted)) => {
                if live.as_ref() != Some(&wanted) {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::{signature_matches, TrackIndex};
    use playcounts_core::{LibraryTrack, TrackKind, TrackRecord};

    fn track(id: &str, name: &str, album: &str) -> LibraryTrack {
        LibraryTrack {
            id: id.to_string(),
            name: name.to_string(),
            artist: "X".to_string(),
            album: album.to_string(),
            duration: Some(180),
            ..LibraryTrack::default()
        }
    }

    fn record(name: &str, album: Option<&str>) -> TrackRecord {
        TrackRecord {
            name: Some(name.to_string()),
            artist: Some("X".to_string()),
            album: album.map(str::to_string),
            duration: Some(180),
            ..TrackRecord::default()
        }
    }

    #[test]
    fn indexes_only_file_backed_tracks() {
        let mut stream = track("s", "Song A", "Y");
        stream.kind = TrackKind::Other;
        let index = TrackIndex::new(vec![track("1", "Song A", "Y"), stream]);

        assert_eq!(index.len(), 1);
        assert_eq!(index.candidates("Song A"), &[0usize]);
        assert!(index.candidates("Song B").is_empty());
    }

    #[test]
    fn same_name_different_album_matches_only_one() {
        let index = TrackIndex::new(vec![
            track("1", "Song A", "Y"),
            track("2", "Song A", "Z"),
        ]);
        assert_eq!(index.candidates("Song A").len(), 2);

        let hits = index.matching(&record("Song A", Some("Y")));
        assert_eq!(hits.len(), 1);
        assert_eq!(index.get(hits[0]).unwrap().id, "1");
    }

    #[test]
    fn duplicates_with_equal_signatures_all_match() {
        let index = TrackIndex::new(vec![
            track("1", "Song A", "Y"),
            track("2", "Song A", "Y"),
        ]);
        assert_eq!(index.matching(&record("Song A", Some("Y"))), vec![0usize, 1]);
    }

    #[test]
    fn record_may_omit_field_the_track_lacks() {
        let live = track("1", "Song A", "");
        assert!(signature_matches(&live, &record("Song A", None)));
        assert!(signature_matches(&live, &record("Song A", Some(""))));
    }

    #[test]
    fn record_may_not_omit_field_the_track_has() {
        let live = track("1", "Song A", "Y");
        assert!(!signature_matches(&live, &record("Song A", None)));
    }

    #[test]
    fn record_field_absent_on_track_is_a_mismatch() {
        let live = track("1", "Song A", "");
        assert!(!signature_matches(&live, &record("Song A", Some("Y"))));
    }

    #[test]
    fn duration_must_match_exactly() {
        let live = track("1", "Song A", "Y");
        let mut rec = record("Song A", Some("Y"));
        rec.duration = Some(181);
        assert!(!signature_matches(&live, &rec));
    }

    #[test]
    fn nameless_record_has_no_matches() {
        let index = TrackIndex::new(vec![track("1", "", "Y")]);
        let rec = TrackRecord {
            name: None,
            ..record("", Some("Y"))
        };
        assert!(index.matching(&rec).is_empty());
    }
}
