/// Collaborator traits for votes, announcements and role lookups.
pub mod actions;
/// End-of-song announcement formatting.
pub mod announcement;
/// Chat backend reached over HTTP.
#[cfg(feature = "http-actions")]
pub mod http_actions;
/// Handlers for user and DJ membership events.
pub mod membership;
/// Reaction symbol classification.
pub mod reactions;
/// Frame classification and handler dispatch.
pub mod router;
/// Song lifecycle handlers.
pub mod song_tracker;
