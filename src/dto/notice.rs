use std::time::SystemTime;

use serde::Serialize;

use crate::{services::actions::UserRole, state::song::PlayedSongRecord};

use super::format_system_time;

/// Notification fanned out to local subscribers of a room session.
#[derive(Debug, Clone, Serialize)]
pub struct RoomNotice {
    /// Room the notice belongs to.
    pub room: String,
    /// RFC 3339 timestamp of when the notice was produced.
    pub at: String,
    /// What happened.
    #[serde(flatten)]
    pub kind: RoomNoticeKind,
}

impl RoomNotice {
    /// Stamp a notice for `room` with the current time.
    pub fn now(room: &str, kind: RoomNoticeKind) -> Self {
        Self {
            room: room.to_string(),
            at: format_system_time(SystemTime::now()),
            kind,
        }
    }
}

/// What happened in the room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomNoticeKind {
    /// A user entered the room.
    UserJoined {
        /// User who joined.
        user_uuid: String,
        /// Display name, when the document carries one.
        nickname: Option<String>,
        /// Role level, when the lookup succeeded.
        role: Option<UserRole>,
    },
    /// A user left the room.
    UserLeft {
        /// User who left.
        user_uuid: String,
    },
    /// A user joined the DJ queue.
    DjAdded {
        /// User added to the queue.
        user_uuid: String,
    },
    /// A user left the DJ queue.
    DjRemoved {
        /// User removed from the queue.
        user_uuid: String,
    },
    /// A finished song was archived and awaits its announcement.
    SongArchived {
        /// Archived record of the finished song.
        record: PlayedSongRecord,
    },
    /// The room stopped playing.
    NothingPlaying,
    /// The document was replaced by a reconnect snapshot.
    Resynced,
}
