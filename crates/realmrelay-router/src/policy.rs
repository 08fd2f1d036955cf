//! Moderation policy: who gets kicked on join.
//!
//! Three lists drive it:
//!
//! - **allow-list**: names that are never kicked, whatever else matches
//! - **banned devices**: device labels that may not join
//! - **block list**: names that may not join
//!
//! A check is a pure function of the lists, the device and the name.
//! The router evaluates the allow-list first and only then asks
//! [`ModerationLists::decide`], so the allow-list overrides both other
//! lists equally.

use std::collections::BTreeSet;

use realmrelay_protocol::{Device, KickReason};
use serde::{Deserialize, Serialize};

use crate::RouterError;

/// Result of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Kick(KickReason),
}

/// Names one of the three lists, for operator edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationList {
    AllowList,
    BannedDevices,
    BlockList,
}

impl ModerationList {
    /// Parses the names operators type: `whitelist`/`allow`,
    /// `devices`/`banned-devices`, `blocklist`/`block`.
    pub fn from_name(name: &str) -> Result<Self, RouterError> {
        match name.to_ascii_lowercase().as_str() {
            "whitelist" | "allow" | "allow-list" | "allow_list" => Ok(Self::AllowList),
            "devices" | "banned-devices" | "banned_devices" => Ok(Self::BannedDevices),
            "blocklist" | "block" | "block-list" | "block_list" => Ok(Self::BlockList),
            _ => Err(RouterError::UnknownList(name.to_string())),
        }
    }
}

/// The moderation lists.
///
/// Shared as an immutable `Arc` snapshot. Edits go through
/// [`with_entry`](Self::with_entry), which builds a new snapshot instead
/// of mutating the shared one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationLists {
    #[serde(default, rename = "whitelisted_players")]
    pub allow_list: BTreeSet<String>,

    #[serde(default)]
    pub banned_devices: BTreeSet<Device>,

    #[serde(default)]
    pub block_list: BTreeSet<String>,
}

impl ModerationLists {
    /// Returns `true` if `name` is exempt from every check.
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allow_list.contains(name)
    }

    /// Checks `device` and `name` against the banned-device and block
    /// lists. A banned device wins over a blocked name.
    ///
    /// This does not look at the allow-list; see [`evaluate`](Self::evaluate).
    pub fn decide(&self, device: Device, name: &str) -> Verdict {
        if self.banned_devices.contains(&device) {
            Verdict::Kick(KickReason::BannedDevice)
        } else if self.block_list.contains(name) {
            Verdict::Kick(KickReason::BlockedName)
        } else {
            Verdict::Allow
        }
    }

    /// Full check: allow-list exemption first, then [`decide`](Self::decide).
    pub fn evaluate(&self, device: Device, name: &str) -> Verdict {
        if self.is_allowed(name) {
            return Verdict::Allow;
        }
        self.decide(device, name)
    }

    /// Returns a copy with `value` added to (`present = true`) or removed
    /// from `list`.
    ///
    /// For [`ModerationList::BannedDevices`], `value` must be a device
    /// label such as `"Windows x64"`.
    pub fn with_entry(
        &self,
        list: ModerationList,
        value: &str,
        present: bool,
    ) -> Result<Self, RouterError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RouterError::EmptyEntry);
        }

        let mut next = self.clone();
        match list {
            ModerationList::AllowList => toggle(&mut next.allow_list, value.to_string(), present),
            ModerationList::BlockList => toggle(&mut next.block_list, value.to_string(), present),
            ModerationList::BannedDevices => {
                let device = Device::from_label(value)
                    .ok_or_else(|| RouterError::UnknownDevice(value.to_string()))?;
                toggle(&mut next.banned_devices, device, present);
            }
        }
        Ok(next)
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T, present: bool) {
    if present {
        set.insert(value);
    } else {
        set.remove(&value);
    }
}
