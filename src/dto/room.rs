//! Typed read-only views over fields of the mirrored room document.
//!
//! The document itself stays a `serde_json::Value` so sparse or partial remote
//! state can be patched; these views are decoded on demand by the store.

use serde::Deserialize;
use serde_json::Value;

/// The `nowPlaying` entry of the room document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    /// Song currently playing.
    pub song: SongInfo,
    /// Start time as sent by the remote side (number or string).
    #[serde(default)]
    pub start_time: Option<Value>,
}

/// Identity of a song in the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongInfo {
    /// Queue identifier of the song.
    #[serde(default)]
    pub song_id: Option<String>,
    /// Artist of the song.
    #[serde(default)]
    pub artist_name: String,
    /// Title of the song.
    #[serde(default)]
    pub track_name: String,
}

/// One entry of the `djs` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DjEntry {
    /// User id of the DJ.
    pub uuid: String,
}

/// One entry of the `allUsers` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserEntry {
    /// User id.
    pub uuid: String,
}
