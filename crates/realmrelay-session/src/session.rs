//! Session types: the record of one participant in the realm.

use std::time::{Duration, Instant};

use realmrelay_protocol::{Device, ParticipantId};

// ---------------------------------------------------------------------------
// PresenceConfig
// ---------------------------------------------------------------------------

/// Configuration for presence tracking.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// A rejoin closer than this to the participant's previous join is
    /// reported as [`JoinOutcome::RapidRejoin`](crate::JoinOutcome).
    ///
    /// Default: 7 seconds.
    pub rapid_rejoin_threshold: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            rapid_rejoin_threshold: Duration::from_secs(7),
        }
    }
}

// ---------------------------------------------------------------------------
// ParticipantSession
// ---------------------------------------------------------------------------

/// One currently present participant.
///
/// Created on the first join of an unseen id, destroyed on leave. The
/// name and device are only ever refreshed by a leave-then-join cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSession {
    /// Stable id, unique within the session.
    pub id: ParticipantId,

    /// Name shown in chat.
    pub display_name: String,

    /// Classified platform.
    pub device: Device,

    /// When this session's join was processed.
    pub joined_at: Instant,

    /// Set once the relay has issued a kick for this participant, so a
    /// repeated policy hit does not kick twice. Dies with the session.
    pub kick_pending: bool,

    /// Registration order, used to list participants and to find the most
    /// recent one.
    pub(crate) seq: u64,
}
