//! File configuration.
//!
//! One JSON file drives a deployment. Every key has a default except
//! `bridge_url`, so a minimal file is:
//!
//! ```json
//! { "realm_code": "AbCdEfGhIjKlMnO", "bridge_url": "ws://127.0.0.1:7420" }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use realmrelay_protocol::{Device, DeviceTable, DeviceTableKind};
use realmrelay_reconnect::ReconnectConfig;
use realmrelay_router::{ModerationLists, RouterConfig};
use realmrelay_session::PresenceConfig;
use serde::{Deserialize, Serialize};

/// Errors loading or validating a [`RelayConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for this schema.
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Deployment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Invite code of the realm to join.
    pub realm_code: String,

    /// WebSocket URL of the game-session bridge.
    pub bridge_url: String,

    /// Consecutive connection endings tolerated before giving up.
    pub reconnect_attempts: u32,

    pub reconnect_interval_ms: u64,

    /// Prefix of operator commands typed in the chat channel.
    pub bot_prefix: String,

    /// Names exempt from every moderation check.
    pub whitelisted_players: BTreeSet<String>,

    /// Devices that may not join, by label (`"Windows x64"`).
    pub banned_devices: BTreeSet<Device>,

    /// Names that may not join.
    pub block_list: BTreeSet<String>,

    /// Where the bound channel is remembered.
    pub relay_channel_file: PathBuf,

    /// Append-only join/leave history.
    pub player_log_file: PathBuf,

    /// Operator edits to the moderation lists.
    pub moderation_file: PathBuf,

    pub rapid_rejoin_threshold_ms: u64,

    /// Which platform-code table to use.
    pub device_table: DeviceTableKind,

    /// Per-code patches on top of `device_table`.
    pub device_overrides: BTreeMap<i32, Device>,

    pub announce_in_game: bool,

    pub flag_windows_devices: bool,

    /// Game chat keyword that makes the relay leave. Empty disables it.
    pub in_game_leave_command: String,

    /// Upper bound on a single outbound send.
    pub send_timeout_ms: u64,

    /// Capacity of the outbound notification queue.
    pub notification_queue: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            realm_code: String::new(),
            bridge_url: "ws://127.0.0.1:7420".into(),
            reconnect_attempts: 3,
            reconnect_interval_ms: 5_000,
            bot_prefix: "!".into(),
            whitelisted_players: BTreeSet::new(),
            banned_devices: BTreeSet::new(),
            block_list: BTreeSet::new(),
            relay_channel_file: "relayChannel.json".into(),
            player_log_file: "player-log.json".into(),
            moderation_file: "moderation.json".into(),
            rapid_rejoin_threshold_ms: 7_000,
            device_table: DeviceTableKind::Extended,
            device_overrides: BTreeMap::new(),
            announce_in_game: true,
            flag_windows_devices: false,
            in_game_leave_command: "-leave".into(),
            send_timeout_ms: 5_000,
            notification_queue: 64,
        }
    }
}

impl RelayConfig {
    /// Reads and validates a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parses and validates a config document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the relay cannot run with.
    ///
    /// `reconnect_attempts = 0` is accepted and means "never retry".
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge_url.trim().is_empty() {
            return Err(ConfigError::Invalid("bridge_url must not be empty".into()));
        }
        if self.notification_queue == 0 {
            return Err(ConfigError::Invalid(
                "notification_queue must be at least 1".into(),
            ));
        }
        if self.bot_prefix.chars().count() > 3 {
            return Err(ConfigError::Invalid(format!(
                "bot_prefix {:?} is longer than 3 characters",
                self.bot_prefix
            )));
        }
        if self.realm_code.len() != 15 || !self.realm_code.chars().all(|c| c.is_ascii_alphanumeric()) {
            tracing::warn!(
                realm_code = %self.realm_code,
                "realm code is not 15 alphanumeric characters"
            );
        }
        Ok(())
    }

    pub fn reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig {
            max_attempts: self.reconnect_attempts,
            interval: Duration::from_millis(self.reconnect_interval_ms),
        }
    }

    pub fn router_config(&self) -> RouterConfig {
        let device_table = self
            .device_overrides
            .iter()
            .fold(DeviceTable::for_kind(self.device_table), |table, (code, device)| {
                table.with_override(*code, *device)
            });
        let leave = self.in_game_leave_command.trim();

        RouterConfig {
            presence: PresenceConfig {
                rapid_rejoin_threshold: Duration::from_millis(self.rapid_rejoin_threshold_ms),
            },
            device_table,
            announce_in_game: self.announce_in_game,
            flag_windows_devices: self.flag_windows_devices,
            in_game_leave_command: (!leave.is_empty()).then(|| leave.to_string()),
            ..RouterConfig::default()
        }
    }

    /// The moderation lists as configured, before any operator edits.
    pub fn moderation_lists(&self) -> ModerationLists {
        ModerationLists {
            allow_list: self.whitelisted_players.clone(),
            banned_devices: self.banned_devices.clone(),
            block_list: self.block_list.clone(),
        }
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}
