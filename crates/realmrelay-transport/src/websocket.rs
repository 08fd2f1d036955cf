//! Game-session link to a JSON bridge sidecar over WebSocket.
//!
//! The sidecar speaks the real game protocol and exposes the session as
//! [`BridgeFrame`]s: events arrive as `{"op":"event",...}` text frames,
//! commands leave as `command`/`kick`/`disconnect` frames.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use realmrelay_protocol::{
    BridgeFrame, Codec, JsonCodec, KickReason, ParticipantId, SessionEvent,
};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{
    ConnectionId, EventSender, EventStream, SessionConnection,
    SessionConnector, TransportError,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Default capacity of each connection's event stream.
const DEFAULT_EVENT_CAPACITY: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Opens bridge connections to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    event_capacity: usize,
}

impl WebSocketConnector {
    /// Creates a connector for `url` (e.g. `ws://127.0.0.1:7420/realm/ABC`).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Sets the bounded capacity of each event stream.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

impl SessionConnector for WebSocketConnector {
    type Connection = WebSocketConnection;

    async fn connect(
        &self,
    ) -> Result<(WebSocketConnection, EventStream), TransportError> {
        let (ws, _response) =
            tokio_tungstenite::connect_async(self.url.as_str())
                .await
                .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, url = %self.url, "bridge connection opened");

        let (sink, stream) = ws.split();
        let (tx, events) = EventStream::channel(self.event_capacity);
        let reader = tokio::spawn(read_loop(id, stream, tx));

        let conn = WebSocketConnection {
            id,
            sink: Arc::new(Mutex::new(sink)),
            reader,
        };
        Ok((conn, events))
    }
}

/// One live bridge connection.
///
/// Dropping it stops the background reader.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Arc<Mutex<WsSink>>,
    reader: JoinHandle<()>,
}

impl WebSocketConnection {
    async fn send_frame(&self, frame: &BridgeFrame) -> Result<(), TransportError> {
        let bytes = JsonCodec.encode(frame)?;
        let text = String::from_utf8(bytes).map_err(|e| {
            TransportError::SendFailed(format!("frame is not utf-8: {e}"))
        })?;
        self.sink
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

impl SessionConnection for WebSocketConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send_command(&self, text: &str) -> Result<(), TransportError> {
        self.send_frame(&BridgeFrame::Command {
            request_id: request_id(),
            text: text.to_string(),
        })
        .await
    }

    async fn send_moderation_action(
        &self,
        participant: &ParticipantId,
        name: &str,
        reason: KickReason,
    ) -> Result<(), TransportError> {
        self.send_frame(&BridgeFrame::Kick {
            request_id: request_id(),
            participant_id: participant.clone(),
            name: name.to_string(),
            reason,
        })
        .await
    }

    async fn disconnect(&self, reason: &str) -> Result<(), TransportError> {
        let frame = BridgeFrame::Disconnect {
            reason: reason.to_string(),
        };
        // Best effort: the bridge may already be gone.
        if let Err(e) = self.send_frame(&frame).await {
            tracing::debug!(id = %self.id, error = %e, "disconnect frame not sent");
        }
        let result = self
            .sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::ConnectionClosed(e.to_string()));
        self.reader.abort();
        result
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Pumps bridge frames into the event stream until the session ends.
///
/// Always finishes with exactly one terminal event (unless the consumer
/// has already gone away).
async fn read_loop(
    id: ConnectionId,
    mut stream: SplitStream<WsStream>,
    tx: EventSender,
) {
    let terminal = loop {
        let data = match stream.next().await {
            Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
            Some(Ok(Message::Binary(data))) => data.to_vec(),
            Some(Ok(Message::Close(_))) | None => break SessionEvent::Ended,
            Some(Ok(_)) => continue, // ping/pong/frame
            Some(Err(e)) => {
                break SessionEvent::Error {
                    detail: e.to_string(),
                };
            }
        };

        let event = match JsonCodec.decode::<BridgeFrame>(&data) {
            Ok(BridgeFrame::Event(event)) => event,
            Ok(other) => {
                tracing::debug!(%id, frame = ?other, "ignoring outbound-only frame from bridge");
                continue;
            }
            Err(e) => {
                // A bridge that sends garbage is treated as a protocol failure.
                break SessionEvent::Error {
                    detail: e.to_string(),
                };
            }
        };

        let terminal = event.is_terminal();
        if tx.send(event).await.is_err() {
            tracing::debug!(%id, "event stream dropped, stopping reader");
            return;
        }
        if terminal {
            return;
        }
    };

    tracing::debug!(%id, event = ?terminal, "bridge connection ended");
    let _ = tx.send(terminal).await;
}

/// Random 16-hex-char id so the bridge can correlate command responses.
fn request_id() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
