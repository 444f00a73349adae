//! Song lifecycle of a room: which song is playing, the archived previous song
//! and the single dwell timer that casts the automatic upvote.

use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::state::song::{PlayedSongRecord, RecordId, SongIdentity, TallyUpdate, VoteTally};

/// Identifier of a scheduled song timer.
pub type TimerId = Uuid;

/// Playback phase of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongPhase {
    /// Nothing is playing.
    NoSong,
    /// The given song is playing.
    Playing(SongIdentity),
}

impl SongPhase {
    fn from_song(song: Option<SongIdentity>) -> Self {
        song.map(SongPhase::Playing).unwrap_or(SongPhase::NoSong)
    }
}

/// Outcome of re-deriving the phase from a reconnect snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resync {
    /// The song that was playing before the reconnect is still playing.
    SameSong,
    /// A different song is playing now.
    NewSong,
    /// Nothing is playing now.
    NothingPlaying,
}

/// Dwell timer armed for the current song.
#[derive(Debug)]
pub struct SongTimer {
    id: TimerId,
    handle: JoinHandle<()>,
}

/// Per-room song lifecycle: playback phase, the archived previous song and the
/// single outstanding song timer.
#[derive(Debug)]
pub struct SongTracker {
    phase: SongPhase,
    archived: Option<PlayedSongRecord>,
    timer: Option<SongTimer>,
}

impl SongTracker {
    /// Start tracking with whatever the join snapshot says is playing.
    pub fn new(current: Option<SongIdentity>) -> Self {
        Self {
            phase: SongPhase::from_song(current),
            archived: None,
            timer: None,
        }
    }

    /// Current playback phase.
    pub fn phase(&self) -> &SongPhase {
        &self.phase
    }

    /// Whether `song` is the one already playing.
    pub fn is_playing(&self, song: &SongIdentity) -> bool {
        matches!(&self.phase, SongPhase::Playing(current) if current.same_song(song))
    }

    /// The archived previous song, if one awaits announcement.
    pub fn archived(&self) -> Option<&PlayedSongRecord> {
        self.archived.as_ref()
    }

    /// Move to the next song (or to silence).
    ///
    /// When a song was playing it is archived with `outgoing_tally`, overwriting any
    /// record that was never announced. The outstanding timer is always cancelled.
    pub fn song_changed(
        &mut self,
        next: Option<SongIdentity>,
        outgoing_tally: VoteTally,
    ) -> Option<PlayedSongRecord> {
        self.cancel_timer();

        let previous = std::mem::replace(&mut self.phase, SongPhase::from_song(next));
        let SongPhase::Playing(outgoing) = previous else {
            return None;
        };

        let record = PlayedSongRecord::archive(outgoing, outgoing_tally);
        if let Some(stale) = self.archived.replace(record.clone()) {
            debug!(record = %stale.id, "overwrote unannounced song record");
        }
        Some(record)
    }

    /// Re-derive the phase after the document was replaced by a reconnect snapshot.
    ///
    /// Nothing is archived: the final tally of a song that ended while disconnected
    /// is unknown. The timer is cancelled unless the same song is still playing.
    pub fn resync(&mut self, current: Option<SongIdentity>) -> Resync {
        let outcome = match (&self.phase, &current) {
            (_, None) => Resync::NothingPlaying,
            (SongPhase::Playing(before), Some(now)) if before.same_song(now) => Resync::SameSong,
            _ => Resync::NewSong,
        };
        if outcome != Resync::SameSong {
            self.cancel_timer();
        }
        self.phase = SongPhase::from_song(current);
        outcome
    }

    /// Fold late vote corrections into the archived record.
    ///
    /// Returns `false` when no record is archived (the live document already
    /// reflects the change) or when there was nothing to merge.
    pub fn merge_votes(&mut self, updates: &[TallyUpdate]) -> bool {
        let Some(record) = self.archived.as_mut() else {
            return false;
        };
        updates
            .iter()
            .for_each(|update| record.vote_counts.merge(*update));
        !updates.is_empty()
    }

    /// Credit a star reaction to the archived record when `user_uuid` is its DJ.
    pub fn credit_star_to_archived(&mut self, user_uuid: &str) -> bool {
        match self.archived.as_mut() {
            Some(record) if record.played_by(user_uuid) => {
                record.vote_counts.add_star();
                true
            }
            _ => false,
        }
    }

    /// Consume the archived record if it is still the one identified by `id`.
    pub fn take_archived(&mut self, id: RecordId) -> Option<PlayedSongRecord> {
        if self.archived.as_ref().is_some_and(|record| record.id == id) {
            self.archived.take()
        } else {
            None
        }
    }

    /// Arm a new song timer, cancelling the outstanding one first.
    ///
    /// `spawn` receives the id of the new timer and returns the task driving it.
    pub fn arm_timer<F>(&mut self, spawn: F) -> TimerId
    where
        F: FnOnce(TimerId) -> JoinHandle<()>,
    {
        self.cancel_timer();
        let id = Uuid::new_v4();
        let handle = spawn(id);
        self.timer = Some(SongTimer { id, handle });
        id
    }

    /// Cancel the outstanding timer, if any.
    pub fn cancel_timer(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.handle.abort();
                debug!(timer = %timer.id, "cancelled song timer");
                true
            }
            None => false,
        }
    }

    /// Identifier of the outstanding timer.
    pub fn active_timer(&self) -> Option<TimerId> {
        self.timer.as_ref().map(|timer| timer.id)
    }

    /// Record that timer `id` fired.
    ///
    /// Returns `true` exactly once for the current timer while a song is playing;
    /// superseded or already-fired timers get `false`.
    pub fn timer_fired(&mut self, id: TimerId) -> bool {
        if self.active_timer() != Some(id) {
            return false;
        }
        self.timer = None;
        matches!(self.phase, SongPhase::Playing(_))
    }
}

impl Drop for SongTracker {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
