//! Shared vocabulary for RealmRelay.
//!
//! This crate defines the "language" every other layer speaks:
//!
//! - **Identity and presence** ([`ParticipantId`], [`PresenceRecord`],
//!   [`Device`], [`DeviceTable`]): who is in the realm and what they
//!   play on.
//! - **Events** ([`SessionEvent`]): what the game session reports.
//! - **Outputs** ([`Notification`], [`GameCommand`], [`KickReason`]):
//!   what the relay sends to the chat channel and back into the game.
//! - **Wire frames** ([`BridgeFrame`]) and the [`Codec`] trait: how
//!   commands travel to a game-session bridge.
//!
//! # Architecture
//!
//! ```text
//! Transport (bridge link) → Protocol (this crate) → Session / Router
//! ```
//!
//! Nothing here does I/O or holds state. It only describes data.

mod codec;
mod command;
mod device;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use command::{GameCommand, sanitize_line};
pub use device::{Device, DeviceTable, DeviceTableKind};
pub use error::ProtocolError;
pub use types::{
    BridgeFrame, ChannelId, GatewayMessage, KickReason, Notification, ParticipantId,
    PresenceRecord, SessionEvent, Severity,
};
