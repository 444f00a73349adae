use tokio::sync::broadcast;

use crate::dto::notice::{RoomNotice, RoomNoticeKind};

/// Broadcast hub fanning room notices out to local subscribers.
pub struct NoticeHub {
    room: String,
    sender: broadcast::Sender<RoomNotice>,
}

impl NoticeHub {
    /// Construct a hub for `room` backed by a Tokio broadcast channel with the given capacity.
    pub fn new(room: &str, capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            room: room.to_string(),
            sender,
        }
    }

    /// Register a new subscriber that will receive subsequent notices.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomNotice> {
        self.sender.subscribe()
    }

    /// Stamp and send a notice to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, kind: RoomNoticeKind) {
        let _ = self.sender.send(RoomNotice::now(&self.room, kind));
    }
}
