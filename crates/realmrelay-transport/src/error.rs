use realmrelay_protocol::ProtocolError;

/// Errors that can occur at the collaborator boundaries.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Establishing the game session failed. Transient; the reconnect
    /// supervisor decides whether to try again.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The connection is already closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Writing to the game session failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The chat channel could not take the notification.
    #[error("notification sink unavailable: {0}")]
    SinkUnavailable(String),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
