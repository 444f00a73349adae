use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::dto::frame::{PatchOp, PatchOpKind};

/// Path prefix of the live tally inside the room document.
pub const VOTE_COUNTS_PATH: &str = "/voteCounts";

/// Identifier of an archived song record, used to detect overwritten records.
pub type RecordId = Uuid;

/// Like/dislike/star counts for one song.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    /// Positive votes.
    pub likes: u32,
    /// Negative votes.
    pub dislikes: u32,
    /// Star votes.
    pub stars: u32,
}

impl VoteTally {
    /// Decode a tally from a possibly sparse `voteCounts` value.
    ///
    /// Missing, non-numeric or negative fields read as zero.
    pub fn from_value(value: Option<&Value>) -> Self {
        let field = |name: &str| value.and_then(|v| v.get(name)).and_then(clamp_count);
        Self {
            likes: field("likes").unwrap_or(0),
            dislikes: field("dislikes").unwrap_or(0),
            stars: field("stars").unwrap_or(0),
        }
    }

    /// Fold a remote correction into this tally.
    ///
    /// Likes and dislikes follow the remote value in either direction; stars only
    /// ratchet upward, so applying the same update twice or in any order against
    /// other star updates yields the same result.
    pub fn merge(&mut self, update: TallyUpdate) {
        match update.field {
            TallyField::Likes => self.likes = update.value,
            TallyField::Dislikes => self.dislikes = update.value,
            TallyField::Stars => self.stars = self.stars.max(update.value),
        }
    }

    /// Count one more star.
    pub fn add_star(&mut self) {
        self.stars = self.stars.saturating_add(1);
    }
}

/// Field of a [`VoteTally`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyField {
    /// `likes`
    Likes,
    /// `dislikes`
    Dislikes,
    /// `stars`
    Stars,
}

impl TallyField {
    /// Map a document path such as `/voteCounts/likes` to its tally field.
    pub fn from_path(path: &str) -> Option<Self> {
        match path.strip_prefix(VOTE_COUNTS_PATH)? {
            "/likes" => Some(Self::Likes),
            "/dislikes" => Some(Self::Dislikes),
            "/stars" => Some(Self::Stars),
            _ => None,
        }
    }
}

/// New value for one tally field, extracted from a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallyUpdate {
    /// Tally field to update.
    pub field: TallyField,
    /// New value.
    pub value: u32,
}

impl TallyUpdate {
    /// Extract an update from a `replace` operation on a tally field, if it is one.
    pub fn from_op(op: &PatchOp) -> Option<Self> {
        if op.op != PatchOpKind::Replace {
            return None;
        }
        let field = TallyField::from_path(&op.path)?;
        let value = op.value.as_ref().and_then(clamp_count)?;
        Some(Self { field, value })
    }

    /// Collect every tally update carried by a diff, in order.
    pub fn collect(patch: &[PatchOp]) -> Vec<Self> {
        patch.iter().filter_map(Self::from_op).collect()
    }
}

/// Read a count from JSON, clamping negatives to zero.
fn clamp_count(value: &Value) -> Option<u32> {
    if let Some(count) = value.as_i64() {
        return Some(count.clamp(0, i64::from(u32::MAX)) as u32);
    }
    if value.is_u64() {
        return Some(u32::MAX);
    }
    value
        .as_f64()
        .map(|count| count.clamp(0.0, f64::from(u32::MAX)) as u32)
}

/// Who played what, as needed to archive a song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongIdentity {
    /// Queue identifier, when the remote side sent one.
    pub song_id: Option<String>,
    /// Active DJ when the song started.
    pub dj_uuid: Option<String>,
    /// Artist of the song.
    pub artist_name: String,
    /// Title of the song.
    pub track_name: String,
}

impl SongIdentity {
    /// Whether both identities denote the same queued song.
    pub fn same_song(&self, other: &SongIdentity) -> bool {
        match (&self.song_id, &other.song_id) {
            (Some(left), Some(right)) => left == right && self.dj_uuid == other.dj_uuid,
            _ => self == other,
        }
    }
}

/// Final identity and tally of the most recently finished song, pending announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayedSongRecord {
    /// Generation id of the record.
    #[serde(skip)]
    pub id: RecordId,
    /// DJ who played the song.
    pub dj_uuid: Option<String>,
    /// Artist of the song.
    pub artist_name: String,
    /// Title of the song.
    pub track_name: String,
    /// Final tally.
    pub vote_counts: VoteTally,
}

impl PlayedSongRecord {
    /// Archive `song` with its final live tally under a fresh record id.
    pub fn archive(song: SongIdentity, vote_counts: VoteTally) -> Self {
        Self {
            id: Uuid::new_v4(),
            dj_uuid: song.dj_uuid,
            artist_name: song.artist_name,
            track_name: song.track_name,
            vote_counts,
        }
    }

    /// Whether `user_uuid` is the DJ who played this song.
    pub fn played_by(&self, user_uuid: &str) -> bool {
        self.dj_uuid.as_deref() == Some(user_uuid)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tally_from_sparse_value_defaults_to_zero() {
        assert_eq!(VoteTally::from_value(None), VoteTally::default());
        assert_eq!(
            VoteTally::from_value(Some(&json!({"likes": 4, "stars": "x"}))),
            VoteTally {
                likes: 4,
                dislikes: 0,
                stars: 0
            }
        );
        assert_eq!(
            VoteTally::from_value(Some(&json!({"dislikes": -3}))).dislikes,
            0
        );
    }

    #[test]
    fn likes_follow_corrections_but_stars_only_rise() {
        let mut tally = VoteTally {
            likes: 5,
            dislikes: 1,
            stars: 4,
        };
        tally.merge(TallyUpdate {
            field: TallyField::Likes,
            value: 3,
        });
        tally.merge(TallyUpdate {
            field: TallyField::Stars,
            value: 2,
        });
        assert_eq!(tally.likes, 3);
        assert_eq!(tally.stars, 4);

        tally.merge(TallyUpdate {
            field: TallyField::Stars,
            value: 6,
        });
        tally.merge(TallyUpdate {
            field: TallyField::Stars,
            value: 6,
        });
        assert_eq!(tally.stars, 6);
    }

    #[test]
    fn star_merges_commute() {
        let updates = [2, 7, 5].map(|value| TallyUpdate {
            field: TallyField::Stars,
            value,
        });
        let mut forward = VoteTally::default();
        let mut backward = VoteTally::default();
        updates.iter().for_each(|u| forward.merge(*u));
        updates.iter().rev().for_each(|u| backward.merge(*u));
        assert_eq!(forward, backward);
    }

    #[test]
    fn collects_only_tally_replacements() {
        let patch = vec![
            PatchOp::replace("/voteCounts/likes", json!(9)),
            PatchOp::add("/voteCounts/dislikes", json!(1)),
            PatchOp::replace("/voteCounts/stars", json!(-2)),
            PatchOp::replace("/nowPlaying", json!(null)),
            PatchOp::replace("/voteCounts/extra", json!(1)),
        ];
        assert_eq!(
            TallyUpdate::collect(&patch),
            vec![
                TallyUpdate {
                    field: TallyField::Likes,
                    value: 9
                },
                TallyUpdate {
                    field: TallyField::Stars,
                    value: 0
                },
            ]
        );
    }

    #[test]
    fn same_song_prefers_song_id() {
        let song = SongIdentity {
            song_id: Some("s1".into()),
            dj_uuid: Some("dj".into()),
            artist_name: "A".into(),
            track_name: "T".into(),
        };
        let renamed = SongIdentity {
            track_name: "T (remaster)".into(),
            ..song.clone()
        };
        assert!(song.same_song(&renamed));

        let other = SongIdentity {
            song_id: Some("s2".into()),
            ..song.clone()
        };
        assert!(!song.same_song(&other));
    }
}
