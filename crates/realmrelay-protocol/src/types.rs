//! Core protocol types: identities, session events, and notifications.
//!
//! These are the structures that move between layers. Session events
//! flow in from the game, notifications flow out to the chat channel,
//! and bridge frames travel over the wire to a game-session bridge.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Stable identifier of a participant within one realm session.
///
/// The game hands these out as opaque strings (UUIDs in practice). The
/// relay never parses them; it only compares and hashes them.
///
/// `#[serde(transparent)]` serializes this as the bare string, so
/// `ParticipantId("abc")` becomes `"abc"` in JSON.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Creates an id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id used for a chat source that is not in the presence registry.
    ///
    /// The game sometimes names a sender that never appeared in a
    /// presence record. Those senders still need a key so repeated abuse
    /// signals can be suppressed; the `unlisted:` prefix keeps them from
    /// colliding with real ids.
    pub fn unlisted(name: &str) -> Self {
        Self(format!("unlisted:{name}"))
    }

    /// Returns the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a chat-gateway channel (the relay destination).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    /// Creates a channel id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Session events (game → relay)
// ---------------------------------------------------------------------------

/// One entry of a presence-add batch.
///
/// `platform` is the raw build-platform code the game reports. It is
/// classified into a [`Device`](crate::Device) by a
/// [`DeviceTable`](crate::DeviceTable), never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub id: ParticipantId,
    pub name: String,
    pub platform: i32,
}

/// A typed event emitted by the game session.
///
/// The connection produces these as a lazy, non-restartable stream.
/// Once `Ended` or `Error` is seen the stream is finished; a reconnect
/// yields a brand new stream.
///
/// `#[serde(tag = "type")]` gives the internally tagged JSON form the
/// bridge speaks: `{"type": "chat", "source_name": "Steve", "text": "hi"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A chat line. `source_name` is empty when the game omitted it.
    Chat {
        #[serde(default)]
        source_name: String,
        text: String,
    },

    /// A server "translation" line (system messages, deaths, ...).
    Translation { text: String },

    /// Participants appeared. Records are processed in order.
    PresenceAdd { records: Vec<PresenceRecord> },

    /// Participants disappeared. Ids are processed in order.
    PresenceRemove { ids: Vec<ParticipantId> },

    /// The peer closed the session.
    Ended,

    /// The session failed (network or protocol error).
    Error { detail: String },
}

impl SessionEvent {
    /// Returns `true` for the two events that terminate a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Error { .. })
    }
}

// ---------------------------------------------------------------------------
// Gateway messages (chat channel → relay)
// ---------------------------------------------------------------------------

/// A message seen on the chat gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Channel the message was posted in.
    pub channel: ChannelId,
    /// Author's display tag (e.g. `alex#0001`).
    pub author_tag: String,
    /// `true` when the relay itself (or another bot) wrote it.
    pub from_bot: bool,
    /// Raw message text.
    pub content: String,
}

// ---------------------------------------------------------------------------
// Moderation vocabulary
// ---------------------------------------------------------------------------

/// Why a participant is being kicked.
///
/// Serialized as the kebab-case reason string (`"banned-device"`,
/// `"blocked-name"`), which is also what shows up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KickReason {
    BannedDevice,
    BlockedName,
}

impl KickReason {
    /// The stable reason string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BannedDevice => "banned-device",
            Self::BlockedName => "blocked-name",
        }
    }
}

impl fmt::Display for KickReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Notifications (relay → chat channel)
// ---------------------------------------------------------------------------

/// How loud a notification is. The chat front end maps this to a color.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Plain relayed traffic (chat lines, listings).
    #[default]
    Info,
    /// Something completed as asked (join, channel bound).
    Success,
    /// Worth a look (leave, rapid rejoin).
    Warning,
    /// Enforcement or failure (kick, spam, death, give-up).
    Danger,
    /// Low-importance chatter.
    Muted,
}

impl Severity {
    /// RGB color conventionally used for this severity in embeds.
    pub fn color(&self) -> u32 {
        match self {
            Self::Info => 0x3498db,
            Self::Success => 0x57f287,
            Self::Warning => 0xfee75c,
            Self::Danger => 0xed4245,
            Self::Muted => 0x95a5a6,
        }
    }
}

/// A message for the bound chat channel.
///
/// Structured notifications carry a title; relayed chat lines do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: Option<String>,
    pub body: String,
    pub severity: Severity,
}

impl Notification {
    /// A titled notification (rendered as an embed by chat front ends).
    pub fn titled(
        title: impl Into<String>,
        body: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            title: Some(title.into()),
            body: body.into(),
            severity,
        }
    }

    /// An untitled line, used for relayed chat.
    pub fn plain(body: impl Into<String>) -> Self {
        Self {
            title: None,
            body: body.into(),
            severity: Severity::Info,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "[{title}] {}", self.body),
            None => f.write_str(&self.body),
        }
    }
}

// ---------------------------------------------------------------------------
// Bridge frames (wire format)
// ---------------------------------------------------------------------------

/// A frame exchanged with a game-session bridge.
///
/// The bridge is a sidecar that speaks the real game protocol and
/// exposes it as JSON frames. Events flow in as [`BridgeFrame::Event`];
/// everything else flows out.
///
/// Adjacently tagged (`{"op": "command", "d": {...}}`) so the nested,
/// internally tagged [`SessionEvent`] keeps its own `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum BridgeFrame {
    /// Inbound: a session event.
    Event(SessionEvent),

    /// Outbound: run a chat command as the relay's own player.
    Command { request_id: String, text: String },

    /// Outbound: remove a participant from the realm.
    Kick {
        request_id: String,
        participant_id: ParticipantId,
        name: String,
        reason: KickReason,
    },

    /// Outbound: leave the realm.
    Disconnect { reason: String },
}
