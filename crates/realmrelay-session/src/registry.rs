//! The presence registry: who is in the realm right now.
//!
//! Presence events from the game are noisy. The same participant can be
//! reported as joining several times, and removes can arrive for people
//! we never saw. The registry absorbs all of that:
//!
//! - a join for an id that is already present is a duplicate and changes
//!   nothing
//! - a leave for an unknown id is a no-op
//! - a rejoin shortly after a previous join is flagged, but still allowed
//!
//! # Concurrency note
//!
//! Plain `HashMap`s, no locking. The registry is owned by the engine's
//! single processing task and never shared.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use realmrelay_protocol::{Device, ParticipantId};

use crate::{ParticipantSession, PresenceConfig};

/// Result of [`PresenceRegistry::on_join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new session was created.
    Created,

    /// The id is already present. Nothing was changed.
    DuplicateIgnored,

    /// A new session was created, but the id's previous join was only
    /// `since_previous` ago. A security signal, not a block.
    RapidRejoin { since_previous: Duration },
}

impl JoinOutcome {
    /// `true` when the join produced a session.
    pub fn is_new_session(&self) -> bool {
        !matches!(self, Self::DuplicateIgnored)
    }
}

/// Authoritative map of present participants.
///
/// ## Lifecycle
///
/// ```text
/// on_join() ──→ [present] ──→ on_leave() ──→ [gone, last join remembered]
///     │                                            │
///     └── DuplicateIgnored                         └── on_join() within
///         while present                                threshold → RapidRejoin
/// ```
///
/// `reset_all()` forgets everything, including remembered joins.
pub struct PresenceRegistry {
    /// Present participants, keyed by id.
    sessions: HashMap<ParticipantId, ParticipantSession>,

    /// Timestamp of each id's most recent join. Survives the leave so a
    /// quick rejoin can be compared against it.
    last_joins: HashMap<ParticipantId, Instant>,

    /// Next registration sequence number.
    next_seq: u64,

    config: PresenceConfig,
}

impl PresenceRegistry {
    /// Creates an empty registry.
    pub fn new(config: PresenceConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            last_joins: HashMap::new(),
            next_seq: 0,
            config,
        }
    }

    /// Records a join.
    ///
    /// `now` is supplied by the caller so the rapid-rejoin window can be
    /// tested without sleeping.
    pub fn on_join(
        &mut self,
        id: ParticipantId,
        display_name: impl Into<String>,
        device: Device,
        now: Instant,
    ) -> JoinOutcome {
        if self.sessions.contains_key(&id) {
            tracing::debug!(participant_id = %id, "duplicate join ignored");
            return JoinOutcome::DuplicateIgnored;
        }

        let threshold = self.config.rapid_rejoin_threshold;
        let outcome = match self.last_joins.get(&id) {
            Some(previous) => {
                let since_previous = now.saturating_duration_since(*previous);
                if since_previous < threshold {
                    JoinOutcome::RapidRejoin { since_previous }
                } else {
                    JoinOutcome::Created
                }
            }
            None => JoinOutcome::Created,
        };

        // Remembered joins of absent ids only matter inside the window.
        let sessions = &self.sessions;
        self.last_joins.retain(|known, at| {
            sessions.contains_key(known)
                || now.saturating_duration_since(*at) < threshold
        });

        let seq = self.next_seq;
        self.next_seq += 1;
        let display_name = display_name.into();
        tracing::info!(
            participant_id = %id,
            name = %display_name,
            %device,
            "participant joined"
        );
        self.last_joins.insert(id.clone(), now);
        self.sessions.insert(
            id.clone(),
            ParticipantSession {
                id,
                display_name,
                device,
                joined_at: now,
                kick_pending: false,
                seq,
            },
        );

        outcome
    }

    /// Removes a participant and returns their session.
    ///
    /// Returns `None` (and changes nothing) if the id is not present.
    pub fn on_leave(&mut self, id: &ParticipantId) -> Option<ParticipantSession> {
        let removed = self.sessions.remove(id);
        match &removed {
            Some(session) => tracing::info!(
                participant_id = %id,
                name = %session.display_name,
                "participant left"
            ),
            None => {
                tracing::debug!(participant_id = %id, "leave for untracked participant")
            }
        }
        removed
    }

    /// Present participants in the order they joined.
    pub fn list(&self) -> Vec<&ParticipantSession> {
        let mut all: Vec<_> = self.sessions.values().collect();
        all.sort_by_key(|s| s.seq);
        all
    }

    /// The most recently registered participant still present.
    ///
    /// Used to attribute abuse signals that carry no sender. Best effort
    /// only: under concurrent joins this can name the wrong person.
    pub fn most_recent(&self) -> Option<&ParticipantSession> {
        self.sessions.values().max_by_key(|s| s.seq)
    }

    /// Finds a present participant by display name.
    ///
    /// Names are not unique; the latest registration wins.
    pub fn find_by_name(&self, name: &str) -> Option<&ParticipantSession> {
        self.sessions
            .values()
            .filter(|s| s.display_name == name)
            .max_by_key(|s| s.seq)
    }

    /// Looks up a present participant by id.
    pub fn get(&self, id: &ParticipantId) -> Option<&ParticipantSession> {
        self.sessions.get(id)
    }

    /// Marks a participant as having a kick issued.
    ///
    /// Returns `true` the first time, `false` if already marked or if the
    /// participant is not present.
    pub fn mark_kick_pending(&mut self, id: &ParticipantId) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) if !session.kick_pending => {
                session.kick_pending = true;
                true
            }
            _ => false,
        }
    }

    /// Forgets every participant and every remembered join.
    pub fn reset_all(&mut self) {
        tracing::debug!(cleared = self.sessions.len(), "presence registry reset");
        self.sessions.clear();
        self.last_joins.clear();
    }

    /// Returns the number of present participants.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nobody is present.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
