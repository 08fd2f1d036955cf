//! Effects: what the router asks the engine to do.
//!
//! Handlers return effects in the order they must be performed. The
//! engine runs them in that order; the router never awaits anything.

use realmrelay_protocol::{Device, GameCommand, KickReason, Notification, ParticipantId};
use serde::{Deserialize, Serialize};

/// Kind of presence change written to the history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEvent {
    Join,
    Leave,
}

/// One join/leave history entry, minus the timestamp.
///
/// The store stamps wall-clock time when it appends the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub event: HistoryEvent,
    pub name: String,
    pub device: Device,
}

/// A side effect produced by [`RelayRouter`](crate::RelayRouter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver to the bound chat channel.
    Notify(Notification),

    /// Run a command in the game session.
    Command(GameCommand),

    /// Remove a participant from the game session.
    Kick {
        id: ParticipantId,
        name: String,
        reason: KickReason,
    },

    /// Append to the join/leave history.
    Record(HistoryRecord),

    /// Leave the realm, as if the operator had asked.
    Leave,
}

impl Effect {
    /// The notification, if this effect is one.
    pub fn as_notification(&self) -> Option<&Notification> {
        match self {
            Self::Notify(notification) => Some(notification),
            _ => None,
        }
    }
}
