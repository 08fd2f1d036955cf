//! Collaborator boundaries for RealmRelay.
//!
//! The relay core talks to two things it does not implement:
//!
//! - the **game session**: reached through a [`SessionConnector`] that
//!   yields a [`SessionConnection`] (commands out) plus an
//!   [`EventStream`] (typed events in);
//! - the **chat channel**: a [`NotificationSink`] that accepts
//!   notifications for a channel.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketConnector`], a game-session link
//!   to a JSON bridge sidecar via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod events;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use events::{EventSender, EventStream};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;

use realmrelay_protocol::{ChannelId, KickReason, Notification, ParticipantId};

/// Opaque identifier for one game-session connection.
///
/// Every (re)connect produces a new id, which lets the engine tell a
/// fresh connection apart from a stale one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opens game sessions.
///
/// The connector carries whatever it needs to reach the realm (invite
/// code, bridge URL, credentials). Each successful call returns a new
/// connection and a new, independent event stream.
///
/// Methods return `impl Future + Send` so the engine can drive them from
/// spawned tasks; implementors may still write `async fn`.
pub trait SessionConnector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: SessionConnection;

    /// Establishes a session.
    ///
    /// # Errors
    /// [`TransportError::ConnectFailed`] when the realm cannot be reached.
    fn connect(
        &self,
    ) -> impl Future<
        Output = Result<(Self::Connection, EventStream), TransportError>,
    > + Send;
}

/// An established game session the relay can issue commands on.
pub trait SessionConnection: Send + Sync + 'static {
    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Runs a chat command line as the relay's own player.
    fn send_command(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Removes a participant from the realm.
    fn send_moderation_action(
        &self,
        participant: &ParticipantId,
        name: &str,
        reason: KickReason,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Leaves the realm. The event stream ends afterwards.
    fn disconnect(
        &self,
        reason: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// The chat-gateway side: somewhere notifications can be posted.
pub trait NotificationSink: Send + Sync + 'static {
    /// Posts `notification` to `channel`.
    fn send(
        &self,
        channel: &ChannelId,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_equality() {
        let a = ConnectionId::new(1);
        let b = ConnectionId::new(1);
        let c = ConnectionId::new(2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
