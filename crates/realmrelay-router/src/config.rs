//! Router configuration.

use realmrelay_protocol::DeviceTable;
use realmrelay_session::PresenceConfig;

/// Settings for a [`RelayRouter`](crate::RelayRouter).
///
/// Built from the facade's file config; `Default` gives the behavior of a
/// stock deployment.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Presence tracking (rapid-rejoin threshold).
    pub presence: PresenceConfig,

    /// Maps raw platform codes to devices.
    pub device_table: DeviceTable,

    /// Chat lines starting with any of these are not real chat. The game
    /// emits them when an outside client injects messages, so they are
    /// treated as the abuse signal instead of being relayed.
    pub synthetic_prefixes: Vec<String>,

    /// A translation event containing this substring is a death message.
    pub death_marker: String,

    /// Push `/me` join and leave announcements into the game.
    pub announce_in_game: bool,

    /// Warn when a participant joins from a Windows-family device.
    pub flag_windows_devices: bool,

    /// A game chat line equal to this (after trimming) makes the relay
    /// leave the realm. `None` disables it.
    pub in_game_leave_command: Option<String>,
}

impl RouterConfig {
    /// Returns `true` if `text` starts with a synthetic-origin prefix.
    pub fn is_synthetic(&self, text: &str) -> bool {
        self.synthetic_prefixes
            .iter()
            .any(|prefix| text.starts_with(prefix.as_str()))
    }

    /// Returns `true` if `text` is the in-game leave keyword.
    pub fn is_leave_command(&self, text: &str) -> bool {
        self.in_game_leave_command
            .as_deref()
            .is_some_and(|keyword| !keyword.is_empty() && text.trim() == keyword)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            presence: PresenceConfig::default(),
            device_table: DeviceTable::default(),
            synthetic_prefixes: vec!["* External".into(), "<External>".into()],
            death_marker: "death".into(),
            announce_in_game: true,
            flag_windows_devices: false,
            in_game_leave_command: Some("-leave".into()),
        }
    }
}
