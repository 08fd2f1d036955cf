//! `RelayHandle`: the operator's remote control for a running engine.

use std::sync::Arc;

use realmrelay_protocol::{ChannelId, GatewayMessage};
use realmrelay_reconnect::SupervisorState;
use realmrelay_router::{ModerationList, ModerationLists};
use realmrelay_session::ParticipantSession;
use tokio::sync::{mpsc, oneshot};

use crate::RelayError;

/// Commands sent to the engine actor through its channel.
///
/// The `oneshot::Sender` in most variants is the reply channel: the
/// caller sends a command and waits for the response on it.
pub(crate) enum EngineCommand {
    Connect {
        reply: oneshot::Sender<Result<(), RelayError>>,
    },
    Disconnect {
        reply: oneshot::Sender<Result<(), RelayError>>,
    },
    BindChannel {
        channel: ChannelId,
        reply: oneshot::Sender<Result<(), RelayError>>,
    },
    Participants {
        reply: oneshot::Sender<Vec<ParticipantSession>>,
    },
    SendRaw {
        text: String,
        reply: oneshot::Sender<Result<(), RelayError>>,
    },
    AdjustModeration {
        list: ModerationList,
        value: String,
        present: bool,
        reply: oneshot::Sender<Result<Arc<ModerationLists>, RelayError>>,
    },
    Gateway {
        message: GatewayMessage,
    },
    Status {
        reply: oneshot::Sender<RelayStatus>,
    },
    Shutdown,
}

/// A snapshot of the relay for the `status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayStatus {
    pub state: SupervisorState,
    pub attempts: u32,
    pub max_attempts: u32,
    pub retry_pending: bool,
    pub participants: usize,
    pub channel: Option<ChannelId>,
}

/// Handle to a running [`RelayEngine`](crate::RelayEngine).
///
/// Cheap to clone; it's just an `mpsc::Sender` wrapper. Every method
/// fails with [`RelayError::EngineStopped`] once the engine is gone.
#[derive(Clone)]
pub struct RelayHandle {
    sender: mpsc::Sender<EngineCommand>,
}

impl RelayHandle {
    pub(crate) fn new(sender: mpsc::Sender<EngineCommand>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| RelayError::EngineStopped)?;
        reply_rx.await.map_err(|_| RelayError::EngineStopped)
    }

    /// Starts connecting with a fresh retry budget.
    ///
    /// Returns once the attempt is started, not when it succeeds; the
    /// outcome shows up as a notification and in [`status`](Self::status).
    pub async fn connect(&self) -> Result<(), RelayError> {
        self.request(|reply| EngineCommand::Connect { reply }).await?
    }

    /// Leaves the realm, cancels any scheduled retry and clears all
    /// presence and spam state.
    pub async fn disconnect(&self) -> Result<(), RelayError> {
        self.request(|reply| EngineCommand::Disconnect { reply }).await?
    }

    /// Makes `channel` the notification destination and persists it.
    pub async fn bind_channel(&self, channel: ChannelId) -> Result<(), RelayError> {
        self.request(|reply| EngineCommand::BindChannel { channel, reply })
            .await?
    }

    /// Present participants in join order.
    pub async fn participants(&self) -> Result<Vec<ParticipantSession>, RelayError> {
        self.request(|reply| EngineCommand::Participants { reply }).await
    }

    /// Says `text` in-game as the relay's own player.
    pub async fn send_raw(&self, text: impl Into<String>) -> Result<(), RelayError> {
        let text = text.into();
        self.request(|reply| EngineCommand::SendRaw { text, reply })
            .await?
    }

    /// Adds `value` to (`present = true`) or removes it from `list`.
    ///
    /// Returns the new snapshot. It applies to later joins only.
    pub async fn adjust_moderation(
        &self,
        list: ModerationList,
        value: impl Into<String>,
        present: bool,
    ) -> Result<Arc<ModerationLists>, RelayError> {
        let value = value.into();
        self.request(|reply| EngineCommand::AdjustModeration {
            list,
            value,
            present,
            reply,
        })
        .await?
    }

    /// Feeds a chat-gateway message to the engine (fire-and-forget).
    pub async fn gateway_message(&self, message: GatewayMessage) -> Result<(), RelayError> {
        self.sender
            .send(EngineCommand::Gateway { message })
            .await
            .map_err(|_| RelayError::EngineStopped)
    }

    pub async fn status(&self) -> Result<RelayStatus, RelayError> {
        self.request(|reply| EngineCommand::Status { reply }).await
    }

    /// Stops the engine. Pending notifications are still delivered.
    pub async fn shutdown(&self) -> Result<(), RelayError> {
        self.sender
            .send(EngineCommand::Shutdown)
            .await
            .map_err(|_| RelayError::EngineStopped)
    }
}
