//! Per-room session tying the mirrored document to the song lifecycle.

/// Room notice broadcast hub.
pub mod hub;
/// Song lifecycle state machine and timer.
pub mod lifecycle;
/// Vote tallies and song records.
pub mod song;
/// Mirrored room document.
pub mod store;

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::{sync::broadcast, task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    dto::{
        frame::{InboundFrame, TransportSignal},
        notice::{RoomNotice, RoomNoticeKind},
    },
    services::{
        actions::{RoleLookup, ServiceHandles},
        announcement::render_song_stats,
        reactions::ReactionNormalizer,
        router::{self, FollowUp, HandlerScope, PriorView},
        song_tracker,
    },
};

use self::{
    hub::NoticeHub,
    lifecycle::{Resync, SongPhase, SongTracker, TimerId},
    song::{PlayedSongRecord, RecordId, VoteTally},
    store::StateStore,
};

/// Session handle shared with tasks.
pub type SharedSession = Arc<RoomSession>;

/// Transport error reason meaning the room stopped playing.
pub const NO_SONG_PLAYING_REASON: &str = "No song playing";
const NOTICE_CAPACITY: usize = 64;

/// Mutable per-room state, only ever touched while holding the session lock.
pub struct SessionInner {
    /// Mirrored room document.
    pub store: StateStore,
    /// Song lifecycle of the room.
    pub tracker: SongTracker,
}

/// Read-only per-room context shared with handlers and the timer task.
pub struct SessionContext {
    /// Room identifier.
    pub room: String,
    /// Runtime configuration.
    pub config: Arc<AppConfig>,
    /// Collaborator handles.
    pub services: ServiceHandles,
    /// Star reaction allow-list.
    pub reactions: ReactionNormalizer,
    /// Notice broadcast hub.
    pub notices: NoticeHub,
    session: Weak<RoomSession>,
}

impl SessionContext {
    /// Spawn the task behind song timer `id`; it fires once after the configured dwell.
    pub fn spawn_song_timer(&self, id: TimerId) -> JoinHandle<()> {
        let session = self.session.clone();
        let dwell = self.config.song_dwell;
        tokio::spawn(async move {
            sleep(dwell).await;
            if let Some(session) = session.upgrade() {
                session.fire_song_timer(id).await;
            }
        })
    }
}

/// One room connection: the mirrored document, the song lifecycle and the
/// collaborators used to act on them.
///
/// Shared state is guarded by a synchronous lock whose guard cannot live across an
/// `.await`, so every mutation completes before a handler suspends on I/O.
pub struct RoomSession {
    ctx: SessionContext,
    inner: Mutex<SessionInner>,
}

impl RoomSession {
    /// Build a session from the snapshot received when joining the room.
    pub fn new(config: Arc<AppConfig>, services: ServiceHandles, snapshot: Value) -> SharedSession {
        let store = StateStore::new(snapshot);
        let tracker = SongTracker::new(store.current_song());
        Arc::new_cyclic(|session| Self {
            ctx: SessionContext {
                room: config.room_uuid.clone(),
                reactions: ReactionNormalizer::new(config.star_reactions.clone()),
                notices: NoticeHub::new(&config.room_uuid, NOTICE_CAPACITY),
                config,
                services,
                session: session.clone(),
            },
            inner: Mutex::new(SessionInner { store, tracker }),
        })
    }

    /// Room identifier.
    pub fn room(&self) -> &str {
        &self.ctx.room
    }

    /// Subscribe to notices produced by this session.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomNotice> {
        self.ctx.notices.subscribe()
    }

    /// Entry point for the transport: handle one signal and run its follow-ups in the background.
    pub fn handle_signal(self: &Arc<Self>, signal: TransportSignal) {
        let follow_ups = match signal {
            TransportSignal::Stateful(frame) => self.dispatch(InboundFrame::Stateful(frame)),
            TransportSignal::Stateless(frame) => self.dispatch(InboundFrame::Stateless(frame)),
            TransportSignal::Server(frame) => self.dispatch(InboundFrame::Server(frame)),
            TransportSignal::Reconnect { state } => {
                self.reconnect(state);
                Vec::new()
            }
            TransportSignal::Error { reason } => self.transport_error(&reason),
        };

        for follow_up in follow_ups {
            let session = Arc::clone(self);
            tokio::spawn(async move { session.run_follow_up(follow_up).await });
        }
    }

    /// Classify and route one frame, returning the follow-ups it produced.
    pub fn dispatch(&self, frame: InboundFrame) -> Vec<FollowUp> {
        let event = router::classify(frame);
        let mut inner = self.inner.lock();
        router::route(&mut inner, &self.ctx, &event)
    }

    /// Replace the document with a reconnect snapshot and re-derive the song phase.
    pub fn reconnect(&self, snapshot: Value) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.store.replace_snapshot(snapshot);
        let outcome = inner.tracker.resync(inner.store.current_song());
        if outcome == Resync::NewSong && self.ctx.config.auto_upvote {
            let ctx = &self.ctx;
            inner.tracker.arm_timer(|id| ctx.spawn_song_timer(id));
        }
        info!(room = %self.ctx.room, ?outcome, "resynced room document after reconnect");
        self.ctx.notices.broadcast(RoomNoticeKind::Resynced);
    }

    /// React to a transport error signal.
    pub fn transport_error(&self, reason: &str) -> Vec<FollowUp> {
        if reason != NO_SONG_PLAYING_REASON {
            warn!(room = %self.ctx.room, reason, "unrecognized transport error");
            return Vec::new();
        }

        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let prior = PriorView::capture(&inner.store);
        song_tracker::on_playback_stopped(&mut HandlerScope {
            store: &mut inner.store,
            tracker: &mut inner.tracker,
            ctx: &self.ctx,
            prior: &prior,
        })
    }

    /// Execute one follow-up; failures are logged and never roll state back.
    pub async fn run_follow_up(&self, follow_up: FollowUp) {
        match follow_up {
            FollowUp::Announce(record) => self.announce_song(record).await,
            FollowUp::ResolveJoin {
                user_uuid,
                nickname,
                users,
            } => self.publish_join(user_uuid, nickname, users).await,
        }
    }

    async fn announce_song(&self, id: RecordId) {
        // Late votes for the finished song can still land during the settle delay.
        sleep(self.ctx.config.announcement_delay).await;

        let message = {
            let mut inner = self.inner.lock();
            let Some(record) = inner.tracker.take_archived(id) else {
                debug!(room = %self.ctx.room, record = %id, "song record superseded before announcement");
                return;
            };
            let username = record
                .dj_uuid
                .as_deref()
                .map(|dj| inner.store.nickname_of(dj).unwrap_or_else(|| dj.to_string()))
                .unwrap_or_else(|| "someone".to_string());
            render_song_stats(&self.ctx.config.song_stats_template, &record, &username)
        };

        if let Err(err) = self.ctx.services.room.announce(&self.ctx.room, message).await {
            warn!(
                room = %self.ctx.room,
                action = "announce",
                error = %err,
                "failed to announce finished song"
            );
        }
    }

    async fn publish_join(
        &self,
        user_uuid: String,
        nickname: Option<String>,
        users: Arc<dyn RoleLookup>,
    ) {
        let role = match users.role_of(&user_uuid).await {
            Ok(role) => Some(role),
            Err(err) => {
                warn!(
                    room = %self.ctx.room,
                    user = %user_uuid,
                    action = "role lookup",
                    error = %err,
                    "failed to resolve role of joined user"
                );
                None
            }
        };
        self.ctx.notices.broadcast(RoomNoticeKind::UserJoined {
            user_uuid,
            nickname,
            role,
        });
    }

    async fn fire_song_timer(&self, id: TimerId) {
        let should_vote = self.inner.lock().tracker.timer_fired(id);
        if !should_vote {
            debug!(room = %self.ctx.room, timer = %id, "stale song timer fired; ignoring");
            return;
        }

        let user = &self.ctx.config.bot_user_uuid;
        match self.ctx.services.songs.upvote(&self.ctx.room, user).await {
            Ok(()) => info!(room = %self.ctx.room, user = %user, "cast automatic upvote"),
            Err(err) => warn!(
                room = %self.ctx.room,
                user = %user,
                action = "upvote",
                error = %err,
                "automatic upvote failed"
            ),
        }
    }

    /// Copy of the mirrored document.
    pub fn document(&self) -> Value {
        self.inner.lock().store.document().clone()
    }

    /// Live tally of the current song.
    pub fn live_tally(&self) -> VoteTally {
        self.inner.lock().store.live_tally()
    }

    /// Copy of the archived previous-song record.
    pub fn archived(&self) -> Option<PlayedSongRecord> {
        self.inner.lock().tracker.archived().cloned()
    }

    /// Current playback phase.
    pub fn phase(&self) -> SongPhase {
        self.inner.lock().tracker.phase().clone()
    }

    /// Identifier of the outstanding song timer.
    pub fn active_timer(&self) -> Option<TimerId> {
        self.inner.lock().tracker.active_timer()
    }
}
