//! Classifies raw transport frames and dispatches them to named handlers.
//!
//! Each channel has a closed set of event names. A lookup table maps every known
//! name to a [`Handler`]; unknown names fall through to a no-op. Diffs carried by a
//! frame are applied to the store before any handler runs.

use std::{fmt, sync::Arc};

use serde_json::Value;
use tracing::{debug, info_span};

use crate::{
    dto::frame::{InboundFrame, PatchOp},
    services::{
        actions::{RoleLookup, ServiceHandles},
        membership, song_tracker,
    },
    state::{
        SessionContext, SessionInner,
        hub::NoticeHub,
        lifecycle::{SongTracker, TimerId},
        song::{RecordId, VoteTally},
        store::StateStore,
    },
};

/// Transport channel a frame arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// State-diff channel.
    Stateful,
    /// Ephemeral-event channel.
    Stateless,
    /// Server-notification channel.
    Server,
}

/// Classified frame: channel, event name, parameters and optional diff.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Channel the frame arrived on.
    pub channel: Channel,
    /// Event name.
    pub name: String,
    /// Event parameters (stateless and server frames).
    pub payload: Value,
    /// Diff carried by the frame.
    pub patch: Option<Vec<PatchOp>>,
}

/// Split a raw frame into its classified form.
///
/// Server frames are unwrapped so the nested message's name, params and diff
/// become the event's own.
pub fn classify(frame: InboundFrame) -> InboundEvent {
    match frame {
        InboundFrame::Stateful(frame) => InboundEvent {
            channel: Channel::Stateful,
            name: frame.name,
            payload: Value::Null,
            patch: frame.state_patch,
        },
        InboundFrame::Stateless(frame) => InboundEvent {
            channel: Channel::Stateless,
            name: frame.name,
            payload: frame.params,
            patch: None,
        },
        InboundFrame::Server(frame) => InboundEvent {
            channel: Channel::Server,
            name: frame.message.name,
            payload: frame.message.params,
            patch: frame.message.state_patch,
        },
    }
}

/// Named events of the state-diff channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatefulEvent {
    /// `userJoined`
    UserJoined,
    /// `userLeft`
    UserLeft,
    /// `addedDj`
    AddedDj,
    /// `removedDj`
    RemovedDj,
    /// `playedSong`
    PlayedSong,
    /// `votedOnSong`
    VotedOnSong,
    /// `updatedNextSong`
    UpdatedNextSong,
    /// `updatedUserData`
    UpdatedUserData,
    /// `updatedRoomSettings`
    UpdatedRoomSettings,
    /// Any other name.
    Unknown(String),
}

impl StatefulEvent {
    /// Map a wire name to its variant.
    pub fn from_name(name: &str) -> Self {
        match name {
            "userJoined" => Self::UserJoined,
            "userLeft" => Self::UserLeft,
            "addedDj" => Self::AddedDj,
            "removedDj" => Self::RemovedDj,
            "playedSong" => Self::PlayedSong,
            "votedOnSong" => Self::VotedOnSong,
            "updatedNextSong" => Self::UpdatedNextSong,
            "updatedUserData" => Self::UpdatedUserData,
            "updatedRoomSettings" => Self::UpdatedRoomSettings,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Named events of the ephemeral-event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatelessEvent {
    /// `playedOneTimeAnimation`
    PlayedOneTimeAnimation,
    /// Any other name.
    Unknown(String),
}

impl StatelessEvent {
    /// Map a wire name to its variant.
    pub fn from_name(name: &str) -> Self {
        match name {
            "playedOneTimeAnimation" => Self::PlayedOneTimeAnimation,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Named messages of the server-notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessageKind {
    /// Vote update; routed straight to the vote merge.
    VotedOnSong,
    /// Anything else goes through the generic state-patch handler.
    StatePatch(StatefulEvent),
}

impl ServerMessageKind {
    /// Map a wire name to its variant.
    pub fn from_name(name: &str) -> Self {
        match name {
            "votedOnSong" => Self::VotedOnSong,
            other => Self::StatePatch(StatefulEvent::from_name(other)),
        }
    }
}

/// Action a handler asks for once the session lock has been released.
pub enum FollowUp {
    /// Announce the archived song record once it has settled.
    Announce(RecordId),
    /// Look up the role of a newly joined user, then publish the join.
    ResolveJoin {
        /// User who joined.
        user_uuid: String,
        /// Display name taken from the document.
        nickname: Option<String>,
        /// Role lookup collaborator.
        users: Arc<dyn RoleLookup>,
    },
}

impl fmt::Debug for FollowUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowUp::Announce(record) => f.debug_tuple("Announce").field(record).finish(),
            FollowUp::ResolveJoin {
                user_uuid,
                nickname,
                ..
            } => f
                .debug_struct("ResolveJoin")
                .field("user_uuid", user_uuid)
                .field("nickname", nickname)
                .finish_non_exhaustive(),
        }
    }
}

/// Part of the document captured before a frame's diff is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorView {
    /// Live tally before the diff.
    pub tally: VoteTally,
    /// Users present before the diff.
    pub users: Vec<String>,
    /// DJ queue before the diff.
    pub djs: Vec<String>,
}

impl PriorView {
    /// Snapshot the fields handlers compare against.
    pub fn capture(store: &StateStore) -> Self {
        Self {
            tally: store.live_tally(),
            users: store.user_uuids(),
            djs: store.dj_uuids(),
        }
    }
}

/// What membership handlers get: the full (already patched) state and the service handles.
pub struct MembershipScope<'a> {
    /// Patched room document.
    pub store: &'a StateStore,
    /// Collaborator handles.
    pub services: &'a ServiceHandles,
    /// Room notice hub.
    pub notices: &'a NoticeHub,
    /// State before the diff.
    pub prior: &'a PriorView,
}

/// What every other handler gets: mutable access to the session plus the service handles.
pub struct HandlerScope<'a> {
    /// Patched room document.
    pub store: &'a mut StateStore,
    /// Song lifecycle of the room.
    pub tracker: &'a mut SongTracker,
    /// Session context.
    pub ctx: &'a SessionContext,
    /// State before the diff.
    pub prior: &'a PriorView,
}

impl HandlerScope<'_> {
    /// Arm the dwell timer for the song that just started.
    pub fn arm_song_timer(&mut self) -> TimerId {
        let ctx = self.ctx;
        self.tracker.arm_timer(|id| ctx.spawn_song_timer(id))
    }
}

/// Handler for user joined/left and DJ added/removed events.
pub type MembershipHandler = fn(&MembershipScope<'_>, &InboundEvent) -> Vec<FollowUp>;
/// Handler for every other named event.
pub type SessionHandler = fn(&mut HandlerScope<'_>, &InboundEvent) -> Vec<FollowUp>;

/// Entry of the handler lookup table.
#[derive(Clone, Copy)]
pub enum Handler {
    /// Membership handler.
    Membership(MembershipHandler),
    /// Session handler.
    Session(SessionHandler),
}

fn stateful_handler(event: &StatefulEvent) -> Option<Handler> {
    let handler = match event {
        StatefulEvent::UserJoined => Handler::Membership(membership::user_joined),
        StatefulEvent::UserLeft => Handler::Membership(membership::user_left),
        StatefulEvent::AddedDj => Handler::Membership(membership::dj_added),
        StatefulEvent::RemovedDj => Handler::Membership(membership::dj_removed),
        StatefulEvent::PlayedSong => Handler::Session(song_tracker::on_song_changed),
        StatefulEvent::VotedOnSong => Handler::Session(song_tracker::on_vote_update),
        StatefulEvent::UpdatedNextSong
        | StatefulEvent::UpdatedUserData
        | StatefulEvent::UpdatedRoomSettings => Handler::Session(state_updated),
        StatefulEvent::Unknown(_) => return None,
    };
    Some(handler)
}

fn stateless_handler(event: &StatelessEvent) -> Option<Handler> {
    match event {
        StatelessEvent::PlayedOneTimeAnimation => {
            Some(Handler::Session(song_tracker::on_reaction))
        }
        StatelessEvent::Unknown(_) => None,
    }
}

fn server_handler(kind: &ServerMessageKind) -> Option<Handler> {
    match kind {
        ServerMessageKind::VotedOnSong => Some(Handler::Session(song_tracker::on_vote_update)),
        ServerMessageKind::StatePatch(event) => stateful_handler(event),
    }
}

/// Look up the handler registered for an event, if any.
pub fn lookup(event: &InboundEvent) -> Option<Handler> {
    match event.channel {
        Channel::Stateful => stateful_handler(&StatefulEvent::from_name(&event.name)),
        Channel::Stateless => stateless_handler(&StatelessEvent::from_name(&event.name)),
        Channel::Server => server_handler(&ServerMessageKind::from_name(&event.name)),
    }
}

/// Apply the event's diff (if any) and run its handler against the session.
///
/// Runs entirely under the caller's session lock; anything that must wait on I/O
/// is returned as a [`FollowUp`].
pub fn route(inner: &mut SessionInner, ctx: &SessionContext, event: &InboundEvent) -> Vec<FollowUp> {
    let _span = info_span!("frame", room = %ctx.room, channel = ?event.channel, name = %event.name)
        .entered();

    let prior = PriorView::capture(&inner.store);
    if let Some(patch) = event.patch.as_deref() {
        // A rejected batch is logged by the store; handlers still see the last good document.
        let _ = inner.store.apply_patches(patch);
    }

    let Some(handler) = lookup(event) else {
        debug!("no handler registered; skipping");
        return Vec::new();
    };

    match handler {
        Handler::Membership(handle) => handle(
            &MembershipScope {
                store: &inner.store,
                services: &ctx.services,
                notices: &ctx.notices,
                prior: &prior,
            },
            event,
        ),
        Handler::Session(handle) => handle(
            &mut HandlerScope {
                store: &mut inner.store,
                tracker: &mut inner.tracker,
                ctx,
                prior: &prior,
            },
            event,
        ),
    }
}

fn state_updated(_scope: &mut HandlerScope<'_>, event: &InboundEvent) -> Vec<FollowUp> {
    debug!(
        ops = event.patch.as_ref().map_or(0, Vec::len),
        "room state updated"
    );
    Vec::new()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dto::frame::{ServerFrame, ServerMessage, StatefulFrame, StatelessFrame};

    #[test]
    fn classifies_each_channel() {
        let event = classify(InboundFrame::Stateful(StatefulFrame {
            name: "playedSong".into(),
            state_patch: Some(vec![PatchOp::remove("/nowPlaying")]),
        }));
        assert_eq!(event.channel, Channel::Stateful);
        assert_eq!(event.patch.as_ref().map(Vec::len), Some(1));

        let event = classify(InboundFrame::Stateless(StatelessFrame {
            name: "playedOneTimeAnimation".into(),
            params: json!({"userUuid": "u", "emoji": "⭐"}),
        }));
        assert_eq!(event.channel, Channel::Stateless);
        assert!(event.patch.is_none());
        assert_eq!(event.payload["emoji"], "⭐");

        let event = classify(InboundFrame::Server(ServerFrame {
            message: ServerMessage {
                name: "votedOnSong".into(),
                params: Value::Null,
                state_patch: Some(vec![PatchOp::replace("/voteCounts/likes", json!(2))]),
            },
        }));
        assert_eq!(event.channel, Channel::Server);
        assert_eq!(event.name, "votedOnSong");
        assert!(event.patch.is_some());
    }

    #[test]
    fn names_map_to_closed_variants() {
        assert_eq!(StatefulEvent::from_name("addedDj"), StatefulEvent::AddedDj);
        assert_eq!(
            StatefulEvent::from_name("lookedUpSong"),
            StatefulEvent::Unknown("lookedUpSong".into())
        );
        assert_eq!(
            ServerMessageKind::from_name("votedOnSong"),
            ServerMessageKind::VotedOnSong
        );
        assert_eq!(
            ServerMessageKind::from_name("playedSong"),
            ServerMessageKind::StatePatch(StatefulEvent::PlayedSong)
        );
    }

    #[test]
    fn membership_names_get_membership_handlers() {
        let event = |channel, name: &str| InboundEvent {
            channel,
            name: name.into(),
            payload: Value::Null,
            patch: None,
        };
        for name in ["userJoined", "userLeft", "addedDj", "removedDj"] {
            assert!(matches!(
                lookup(&event(Channel::Stateful, name)),
                Some(Handler::Membership(_))
            ));
        }
        assert!(matches!(
            lookup(&event(Channel::Server, "votedOnSong")),
            Some(Handler::Session(_))
        ));
        assert!(matches!(
            lookup(&event(Channel::Server, "userJoined")),
            Some(Handler::Membership(_))
        ));
        assert!(lookup(&event(Channel::Stateless, "userJoined")).is_none());
        assert!(lookup(&event(Channel::Stateful, "somethingNew")).is_none());
    }
}
