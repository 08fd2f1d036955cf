//! Error types for the reconnect supervisor.

use crate::SupervisorState;

/// An operator command that is invalid in the current state.
///
/// These are reported back to the operator, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupervisorError {
    /// `connect()` while a session is up.
    #[error("already connected to the realm")]
    AlreadyConnected,

    /// `connect()` while a connect or retry is in progress.
    #[error("a connection attempt is already in progress")]
    AlreadyConnecting,

    /// `leave()` while there is nothing to leave.
    #[error("not connected to a realm (state: {0})")]
    NotConnected(SupervisorState),
}
