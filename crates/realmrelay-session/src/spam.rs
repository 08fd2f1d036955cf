//! Abuse-signal suppression.
//!
//! The game can emit the same abuse signal many times a second. The
//! relay wants to react to it once per participant, not once per line.

use std::collections::HashSet;

use realmrelay_protocol::ParticipantId;

/// Remembers which participants have already been reported.
///
/// Flags last for one connection generation: they are cleared per id
/// when that participant leaves and wholesale on a full connection reset.
#[derive(Debug, Default)]
pub struct SpamGuard {
    flagged: HashSet<ParticipantId>,
}

impl SpamGuard {
    /// Creates an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags `id`. Returns `true` only if it was not already flagged.
    pub fn flag_once(&mut self, id: &ParticipantId) -> bool {
        if self.flagged.contains(id) {
            return false;
        }
        self.flagged.insert(id.clone());
        true
    }

    /// Forgets the flag for one participant.
    pub fn clear(&mut self, id: &ParticipantId) {
        self.flagged.remove(id);
    }

    /// Forgets every flag.
    pub fn clear_all(&mut self) {
        self.flagged.clear();
    }

    /// Returns `true` if `id` is currently flagged.
    pub fn is_flagged(&self, id: &ParticipantId) -> bool {
        self.flagged.contains(id)
    }
}
