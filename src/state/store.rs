//! Canonical in-memory mirror of the remote room document.

use json_patch::PatchOperation;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::{
    dto::{
        frame::{PatchOp, PatchOpKind},
        room::{DjEntry, NowPlaying, UserEntry},
    },
    error::PatchError,
    state::song::{SongIdentity, VoteTally},
};

/// Owner of the room document; every mutation goes through [`StateStore::apply_patches`].
#[derive(Debug, Clone)]
pub struct StateStore {
    document: Value,
}

impl StateStore {
    /// Build the store from the snapshot received when joining the room.
    pub fn new(snapshot: Value) -> Self {
        Self {
            document: root_object(snapshot),
        }
    }

    /// Current document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Discard the current document in favour of a reconnect snapshot.
    ///
    /// No patches are replayed across the reconnect boundary.
    pub fn replace_snapshot(&mut self, snapshot: Value) {
        self.document = root_object(snapshot);
    }

    /// Apply a diff as one atomic batch.
    ///
    /// Every `add`/`replace` first gets its intermediate containers created with
    /// [`ensure_path_exists`]. The batch runs against a copy that is committed only
    /// when every operation succeeded; on failure the fault is logged and the
    /// previous document is kept untouched.
    pub fn apply_patches(&mut self, patches: &[PatchOp]) -> Result<(), PatchError> {
        let mut working = self.document.clone();
        match apply_batch(&mut working, patches) {
            Ok(()) => {
                self.document = working;
                debug!(ops = patches.len(), "applied patch batch");
                Ok(())
            }
            Err(err) => {
                warn!(
                    ops = patches.len(),
                    error = %err,
                    "rejected patch batch; keeping previous document"
                );
                Err(err)
            }
        }
    }

    /// Song in the `nowPlaying` slot, if a song is playing.
    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.document
            .get("nowPlaying")
            .filter(|value| !value.is_null())
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Identifier of the active DJ (`djs[0]`).
    pub fn active_dj(&self) -> Option<String> {
        self.dj_uuids().into_iter().next()
    }

    /// Identifiers of every DJ, in queue order.
    pub fn dj_uuids(&self) -> Vec<String> {
        uuid_list::<DjEntry>(self.document.get("djs"))
            .into_iter()
            .map(|dj| dj.uuid)
            .collect()
    }

    /// Identifiers of every user present in the room.
    pub fn user_uuids(&self) -> Vec<String> {
        uuid_list::<UserEntry>(self.document.get("allUsers"))
            .into_iter()
            .map(|user| user.uuid)
            .collect()
    }

    /// Live tally of the current song.
    pub fn live_tally(&self) -> VoteTally {
        VoteTally::from_value(self.document.get("voteCounts"))
    }

    /// Identity of the song currently playing, combined with the active DJ.
    pub fn current_song(&self) -> Option<SongIdentity> {
        let playing = self.now_playing()?;
        Some(SongIdentity {
            song_id: playing.song.song_id,
            dj_uuid: self.active_dj(),
            artist_name: playing.song.artist_name,
            track_name: playing.song.track_name,
        })
    }

    /// Display name of a user, taken from `allUserData`.
    pub fn nickname_of(&self, user_uuid: &str) -> Option<String> {
        let pointer = format!(
            "/allUserData/{}/userProfile/nickname",
            escape_segment(user_uuid)
        );
        self.document
            .pointer(&pointer)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Create empty objects along `path` wherever a segment is absent or falsy.
///
/// Truthy values are never replaced, so calling this twice is the same as calling
/// it once. The walk stops at scalars and at array segments that are not an
/// in-bounds index; the patch itself will then decide whether the write is valid.
pub fn ensure_path_exists(doc: &mut Value, path: &str) {
    let Some(rest) = path.strip_prefix('/') else {
        return;
    };

    let mut current = doc;
    for segment in rest.split('/').map(unescape_segment) {
        current = match { current } {
            Value::Object(map) => {
                let slot = map.entry(segment).or_insert(Value::Null);
                fill_if_falsy(slot);
                slot
            }
            Value::Array(items) => {
                let Some(slot) = segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get_mut(index))
                else {
                    return;
                };
                fill_if_falsy(slot);
                slot
            }
            _ => return,
        };
    }
}

fn apply_batch(doc: &mut Value, patches: &[PatchOp]) -> Result<(), PatchError> {
    for (index, op) in patches.iter().enumerate() {
        let raw = match op.op {
            PatchOpKind::Add | PatchOpKind::Replace => {
                ensure_path_exists(doc, &op.path);
                let kind = if op.op == PatchOpKind::Add {
                    "add"
                } else {
                    "replace"
                };
                json!({
                    "op": kind,
                    "path": op.path,
                    "value": op.value.clone().unwrap_or(Value::Null),
                })
            }
            PatchOpKind::Remove => json!({ "op": "remove", "path": op.path }),
            PatchOpKind::Unsupported => {
                return Err(PatchError::Unsupported {
                    index,
                    path: op.path.clone(),
                });
            }
        };

        let operation: PatchOperation =
            serde_json::from_value(raw).map_err(|source| PatchError::Malformed {
                index,
                path: op.path.clone(),
                source,
            })?;

        json_patch::patch(doc, std::slice::from_ref(&operation)).map_err(|source| {
            PatchError::Rejected {
                index,
                path: op.path.clone(),
                source,
            }
        })?;
    }
    Ok(())
}

fn root_object(snapshot: Value) -> Value {
    match snapshot {
        Value::Object(_) => snapshot,
        Value::Null => Value::Object(Map::new()),
        other => {
            warn!(kind = ?other, "room snapshot is not an object; starting from an empty document");
            Value::Object(Map::new())
        }
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn fill_if_falsy(slot: &mut Value) {
    if is_falsy(slot) {
        *slot = Value::Object(Map::new());
    }
}

fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn uuid_list<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}
