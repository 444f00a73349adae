//! Outbound collaborators used by the room core: vote actions, announcements and
//! role lookups. The core only depends on the traits; concrete backends live in
//! [`super::http_actions`] or are the logging stand-ins below.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, ready};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ActionResult;

/// Casting votes on the currently playing song.
pub trait VoteActions: Send + Sync {
    /// Cast a positive vote as `user`.
    fn upvote(&self, room: &str, user: &str) -> BoxFuture<'static, ActionResult<()>>;
    /// Cast a negative vote as `user`.
    fn downvote(&self, room: &str, user: &str) -> BoxFuture<'static, ActionResult<()>>;
}

/// Posting messages to the room's public channel.
pub trait Announcer: Send + Sync {
    /// Post `message` to the room.
    fn announce(&self, room: &str, message: String) -> BoxFuture<'static, ActionResult<()>>;
}

/// Resolving the role level of a user.
pub trait RoleLookup: Send + Sync {
    /// Role level of `user`.
    fn role_of(&self, user: &str) -> BoxFuture<'static, ActionResult<UserRole>>;
}

/// Role levels known by the chat backend, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserRole {
    /// Regular listener.
    Member,
    /// Room moderator.
    Moderator,
    /// Co-owner of the room.
    CoOwner,
    /// Owner of the room.
    Owner,
}

/// Room, user and song service handles passed to event handlers.
#[derive(Clone)]
pub struct ServiceHandles {
    /// Posts announcements.
    pub room: Arc<dyn Announcer>,
    /// Resolves user roles.
    pub users: Arc<dyn RoleLookup>,
    /// Casts votes.
    pub songs: Arc<dyn VoteActions>,
}

impl ServiceHandles {
    /// Use one backend for all three concerns.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: Announcer + RoleLookup + VoteActions + 'static,
    {
        Self {
            room: backend.clone(),
            users: backend.clone(),
            songs: backend,
        }
    }
}

/// Backend that only logs what it would have done; used when no chat backend is configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingActions;

impl VoteActions for LoggingActions {
    fn upvote(&self, room: &str, user: &str) -> BoxFuture<'static, ActionResult<()>> {
        info!(room, user, action = "upvote", "vote action (dry run)");
        ready(Ok(())).boxed()
    }

    fn downvote(&self, room: &str, user: &str) -> BoxFuture<'static, ActionResult<()>> {
        info!(room, user, action = "downvote", "vote action (dry run)");
        ready(Ok(())).boxed()
    }
}

impl Announcer for LoggingActions {
    fn announce(&self, room: &str, message: String) -> BoxFuture<'static, ActionResult<()>> {
        info!(room, %message, "announcement (dry run)");
        ready(Ok(())).boxed()
    }
}

impl RoleLookup for LoggingActions {
    fn role_of(&self, _user: &str) -> BoxFuture<'static, ActionResult<UserRole>> {
        ready(Ok(UserRole::Member)).boxed()
    }
}
