use std::sync::Arc;

use tracing::info;

use crate::{
    dto::notice::RoomNoticeKind,
    services::router::{FollowUp, InboundEvent, MembershipScope},
};

/// Entries of `after` that were not present in `before`.
fn added<'a>(before: &'a [String], after: &'a [String]) -> impl Iterator<Item = &'a String> {
    after.iter().filter(move |uuid| !before.contains(*uuid))
}

/// Queue a role lookup for every user that appeared in the user list.
pub fn user_joined(scope: &MembershipScope<'_>, _event: &InboundEvent) -> Vec<FollowUp> {
    let users = scope.store.user_uuids();
    added(&scope.prior.users, &users)
        .map(|uuid| {
            let nickname = scope.store.nickname_of(uuid);
            info!(user = %uuid, nickname = ?nickname, "user joined");
            FollowUp::ResolveJoin {
                user_uuid: uuid.clone(),
                nickname,
                users: Arc::clone(&scope.services.users),
            }
        })
        .collect()
}

/// Publish a notice for every user that disappeared from the user list.
pub fn user_left(scope: &MembershipScope<'_>, _event: &InboundEvent) -> Vec<FollowUp> {
    let users = scope.store.user_uuids();
    for uuid in added(&users, &scope.prior.users) {
        info!(user = %uuid, "user left");
        scope.notices.broadcast(RoomNoticeKind::UserLeft {
            user_uuid: uuid.clone(),
        });
    }
    Vec::new()
}

/// Publish a notice for every user added to the DJ queue.
pub fn dj_added(scope: &MembershipScope<'_>, _event: &InboundEvent) -> Vec<FollowUp> {
    let djs = scope.store.dj_uuids();
    for uuid in added(&scope.prior.djs, &djs) {
        info!(user = %uuid, "dj added");
        scope.notices.broadcast(RoomNoticeKind::DjAdded {
            user_uuid: uuid.clone(),
        });
    }
    Vec::new()
}

/// Publish a notice for every user removed from the DJ queue.
pub fn dj_removed(scope: &MembershipScope<'_>, _event: &InboundEvent) -> Vec<FollowUp> {
    let djs = scope.store.dj_uuids();
    for uuid in added(&djs, &scope.prior.djs) {
        info!(user = %uuid, "dj removed");
        scope.notices.broadcast(RoomNoticeKind::DjRemoved {
            user_uuid: uuid.clone(),
        });
    }
    Vec::new()
}
