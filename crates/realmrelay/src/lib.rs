//! # RealmRelay
//!
//! A bidirectional relay between a multiplayer game session and a chat
//! channel. Game chat, joins, leaves and deaths show up in the channel;
//! channel messages show up in game. Joins are checked against
//! moderation lists and offenders are kicked.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use realmrelay::prelude::*;
//!
//! let config = RelayConfig::from_file("config.json")?;
//! let store = JsonFileStore::new(
//!     &config.relay_channel_file,
//!     &config.player_log_file,
//!     &config.moderation_file,
//! );
//! let (engine, handle) = RelayEngineBuilder::new()
//!     .config(&config)
//!     .build(WebSocketConnector::new(&config.bridge_url), my_sink, store)
//!     .await?;
//! engine.spawn();
//! handle.connect().await?;
//! ```
//!
//! ## Layers
//!
//! | Crate | Job |
//! |-------|-----|
//! | `realmrelay-protocol` | shared vocabulary and wire frames |
//! | `realmrelay-transport` | game-session and chat-sink boundaries |
//! | `realmrelay-session` | who is present, spam flags |
//! | `realmrelay-router` | events → effects, moderation policy |
//! | `realmrelay-reconnect` | connection state machine, retry timer |
//! | `realmrelay` (this crate) | engine actor, operator handle, config, state files |

mod config;
mod engine;
mod error;
mod handle;
mod store;

pub use config::{ConfigError, RelayConfig};
pub use engine::{RelayEngine, RelayEngineBuilder};
pub use error::RelayError;
pub use handle::{RelayHandle, RelayStatus};
pub use store::{HistoryEntry, JsonFileStore, MemoryStore, StateStore, StoreError};

pub use realmrelay_protocol as protocol;
pub use realmrelay_reconnect as reconnect;
pub use realmrelay_router as router;
pub use realmrelay_session as session;
pub use realmrelay_transport as transport;

/// The types most programs need.
pub mod prelude {
    pub use crate::{
        JsonFileStore, MemoryStore, RelayConfig, RelayEngine, RelayEngineBuilder, RelayError,
        RelayHandle, RelayStatus, StateStore,
    };
    pub use realmrelay_protocol::{
        ChannelId, Device, GatewayMessage, Notification, ParticipantId, Severity,
    };
    pub use realmrelay_reconnect::SupervisorState;
    pub use realmrelay_router::ModerationList;
    pub use realmrelay_transport::{
        NotificationSink, SessionConnection, SessionConnector, WebSocketConnector,
    };
}
