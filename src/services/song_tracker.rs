//! Song lifecycle handlers: song changes, vote updates and star reactions.
//!
//! All of these run under the session lock and only touch shared state
//! synchronously; announcements are handed back as [`FollowUp`]s.

use serde_json::json;
use tracing::{debug, info};

use crate::{
    dto::{
        frame::{PatchOp, ReactionParams},
        notice::RoomNoticeKind,
    },
    services::{
        reactions::ReactionClass,
        router::{FollowUp, HandlerScope, InboundEvent},
    },
    state::{
        SessionContext,
        song::{PlayedSongRecord, TallyUpdate, VOTE_COUNTS_PATH},
    },
};

/// Archive the outgoing song and arm the dwell timer for the incoming one.
///
/// The outgoing tally is the one captured before the frame's diff reset the live counts.
/// A frame that leaves the same song playing (a repeated frame, or one whose diff
/// was rejected) changes nothing, so the running timer keeps its single vote.
pub fn on_song_changed(scope: &mut HandlerScope<'_>, _event: &InboundEvent) -> Vec<FollowUp> {
    let next = scope.store.current_song();
    if next.as_ref().is_some_and(|song| scope.tracker.is_playing(song)) {
        debug!("song change leaves the same song playing; ignoring");
        return Vec::new();
    }
    let archived = scope.tracker.song_changed(next.clone(), scope.prior.tally);
    let follow_ups = archived
        .and_then(|record| archive_follow_up(scope.ctx, record))
        .into_iter()
        .collect();

    match next {
        Some(song) => {
            info!(
                dj = ?song.dj_uuid,
                artist = %song.artist_name,
                track = %song.track_name,
                "song started"
            );
            if scope.ctx.config.auto_upvote {
                let timer = scope.arm_song_timer();
                debug!(%timer, dwell = ?scope.ctx.config.song_dwell, "armed song timer");
            }
        }
        None => info!("song change with nothing playing"),
    }

    follow_ups
}

/// Move the room to silence after the transport reported that nothing is playing.
pub fn on_playback_stopped(scope: &mut HandlerScope<'_>) -> Vec<FollowUp> {
    let tally = scope.store.live_tally();
    let archived = scope.tracker.song_changed(None, tally);
    scope.ctx.notices.broadcast(RoomNoticeKind::NothingPlaying);
    info!("nothing playing");
    archived
        .and_then(|record| archive_follow_up(scope.ctx, record))
        .into_iter()
        .collect()
}

/// Land vote corrections carried by a diff on the archived song, if one awaits announcement.
///
/// The live document was already patched by the router.
pub fn on_vote_update(scope: &mut HandlerScope<'_>, event: &InboundEvent) -> Vec<FollowUp> {
    let updates = event
        .patch
        .as_deref()
        .map(TallyUpdate::collect)
        .unwrap_or_default();
    if scope.tracker.merge_votes(&updates) {
        debug!(
            updates = updates.len(),
            "merged late vote update into archived song"
        );
    }
    Vec::new()
}

/// Count a star reaction: on the archived song when the reacting user is the DJ
/// who played it, on the live tally otherwise.
pub fn on_reaction(scope: &mut HandlerScope<'_>, event: &InboundEvent) -> Vec<FollowUp> {
    let params: ReactionParams = match serde_json::from_value(event.payload.clone()) {
        Ok(params) => params,
        Err(err) => {
            debug!(error = %err, "reaction without usable params");
            return Vec::new();
        }
    };
    let Some(symbol) = params.emoji.as_deref() else {
        debug!(animation = ?params.animation, "animation is not a reaction symbol");
        return Vec::new();
    };
    if scope.ctx.reactions.classify(symbol) == ReactionClass::Ignored {
        return Vec::new();
    }

    // A star from the DJ of the archived song belongs to that song, not the one now playing.
    if scope.tracker.credit_star_to_archived(&params.user_uuid) {
        debug!(user = %params.user_uuid, "credited star to the archived song of its DJ");
        return Vec::new();
    }

    let stars = scope.store.live_tally().stars.saturating_add(1);
    let counted = scope
        .store
        .apply_patches(&[PatchOp::replace(
            format!("{VOTE_COUNTS_PATH}/stars"),
            json!(stars),
        )])
        .is_ok();
    if counted {
        debug!(user = %params.user_uuid, stars, "counted star reaction");
    }
    Vec::new()
}

fn archive_follow_up(ctx: &SessionContext, record: PlayedSongRecord) -> Option<FollowUp> {
    info!(
        dj = ?record.dj_uuid,
        track = %record.track_name,
        likes = record.vote_counts.likes,
        dislikes = record.vote_counts.dislikes,
        stars = record.vote_counts.stars,
        "archived finished song"
    );
    let id = record.id;
    ctx.notices
        .broadcast(RoomNoticeKind::SongArchived { record });
    ctx.config
        .announce_song_stats
        .then_some(FollowUp::Announce(id))
}
