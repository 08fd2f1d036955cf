//! Unified error type for RealmRelay.

use realmrelay_protocol::ProtocolError;
use realmrelay_reconnect::SupervisorError;
use realmrelay_router::RouterError;
use realmrelay_transport::TransportError;

use crate::{ConfigError, StoreError};

/// Top-level error that wraps all crate-specific errors.
///
/// Operator commands on [`RelayHandle`](crate::RelayHandle) return this.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A game-session or notification-sink failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A wire-format failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// `connect`/`disconnect` in the wrong state.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// A rejected moderation-list edit.
    #[error(transparent)]
    Router(#[from] RouterError),

    /// Persisting state failed. The in-memory change still applies.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configuration file is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The command makes no sense right now (bad argument, no channel).
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// The command needs a live game session.
    #[error("not connected to a realm")]
    NotConnected,

    /// The engine task is gone.
    #[error("relay engine has stopped")]
    EngineStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Transport(_)));
        assert!(relay_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidFrame("bad".into());
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Protocol(_)));
    }

    #[test]
    fn test_from_supervisor_error() {
        let relay_err: RelayError = SupervisorError::AlreadyConnected.into();
        assert!(matches!(relay_err, RelayError::Supervisor(_)));
        assert_eq!(relay_err.to_string(), "already connected to the realm");
    }

    #[test]
    fn test_from_router_error() {
        let relay_err: RelayError = RouterError::UnknownDevice("Toaster".into()).into();
        assert!(matches!(relay_err, RelayError::Router(_)));
    }

    #[test]
    fn test_command_rejected_display() {
        let err = RelayError::CommandRejected("empty message".into());
        assert_eq!(err.to_string(), "command rejected: empty message");
    }
}
