//! Device classification: raw platform codes → [`Device`].
//!
//! The game reports a numeric build-platform code for every participant.
//! Two different code tables are in circulation and they disagree (code
//! 7 is "Windows x64" in one and plain "Windows" in the other), so the
//! table is data, chosen by configuration, rather than a hard-coded
//! `match`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A classified client platform.
///
/// This is a closed set. Every code maps to exactly one variant; codes a
/// table does not know map to that table's fallback (`Other` or
/// `Unknown`). The serde names are the human-readable labels, so a
/// config file can list banned devices as `["Windows x64", "Linux"]`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
pub enum Device {
    #[serde(rename = "Unknown")]
    Unknown,
    #[serde(rename = "Android")]
    Android,
    #[serde(rename = "iOS")]
    Ios,
    #[serde(rename = "OSX (macOS)")]
    MacOs,
    #[serde(rename = "FireOS")]
    FireOs,
    #[serde(rename = "GearVR")]
    GearVr,
    #[serde(rename = "Hololens")]
    Hololens,
    #[serde(rename = "Windows")]
    Windows,
    #[serde(rename = "Windows x64")]
    WindowsX64,
    #[serde(rename = "Windows x86")]
    WindowsX86,
    #[serde(rename = "Dedicated Server")]
    DedicatedServer,
    #[serde(rename = "TvOS (Apple TV)")]
    TvOs,
    #[serde(rename = "PlayStation")]
    PlayStation,
    #[serde(rename = "Nintendo Switch")]
    NintendoSwitch,
    #[serde(rename = "Xbox")]
    Xbox,
    #[serde(rename = "Windows Phone")]
    WindowsPhone,
    #[serde(rename = "Linux")]
    Linux,
    #[serde(rename = "Other")]
    Other,
}

impl Device {
    /// Every variant, in code order of the extended table.
    pub const ALL: [Device; 18] = [
        Self::Unknown,
        Self::Android,
        Self::Ios,
        Self::MacOs,
        Self::FireOs,
        Self::GearVr,
        Self::Hololens,
        Self::Windows,
        Self::WindowsX64,
        Self::WindowsX86,
        Self::DedicatedServer,
        Self::TvOs,
        Self::PlayStation,
        Self::NintendoSwitch,
        Self::Xbox,
        Self::WindowsPhone,
        Self::Linux,
        Self::Other,
    ];

    /// Parses a label as produced by [`label`](Self::label). Exact match.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.label() == label)
    }

    /// Human-readable label. Matches the serde name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Android => "Android",
            Self::Ios => "iOS",
            Self::MacOs => "OSX (macOS)",
            Self::FireOs => "FireOS",
            Self::GearVr => "GearVR",
            Self::Hololens => "Hololens",
            Self::Windows => "Windows",
            Self::WindowsX64 => "Windows x64",
            Self::WindowsX86 => "Windows x86",
            Self::DedicatedServer => "Dedicated Server",
            Self::TvOs => "TvOS (Apple TV)",
            Self::PlayStation => "PlayStation",
            Self::NintendoSwitch => "Nintendo Switch",
            Self::Xbox => "Xbox",
            Self::WindowsPhone => "Windows Phone",
            Self::Linux => "Linux",
            Self::Other => "Other",
        }
    }

    /// Desktop Windows builds, whichever table produced them.
    pub fn is_windows_family(&self) -> bool {
        matches!(self, Self::Windows | Self::WindowsX64 | Self::WindowsX86)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which built-in code table to start from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTableKind {
    /// The full 16-code table (0 = Unknown, anything unlisted = Other).
    #[default]
    Extended,
    /// The short 7-code table (anything unlisted = Unknown).
    Legacy,
}

/// A total function from platform code to [`Device`].
///
/// Built from one of the known tables, optionally patched per code.
///
/// ```rust
/// use realmrelay_protocol::{Device, DeviceTable};
///
/// let table = DeviceTable::extended();
/// assert_eq!(table.classify(7), Device::WindowsX64);
/// assert_eq!(table.classify(99), Device::Other);
/// ```
#[derive(Debug, Clone)]
pub struct DeviceTable {
    codes: HashMap<i32, Device>,
    fallback: Device,
}

impl DeviceTable {
    /// The full table.
    pub fn extended() -> Self {
        let codes = [
            (0, Device::Unknown),
            (1, Device::Android),
            (2, Device::Ios),
            (3, Device::MacOs),
            (4, Device::FireOs),
            (5, Device::GearVr),
            (6, Device::Hololens),
            (7, Device::WindowsX64),
            (8, Device::WindowsX86),
            (9, Device::DedicatedServer),
            (10, Device::TvOs),
            (11, Device::PlayStation),
            (12, Device::NintendoSwitch),
            (13, Device::Xbox),
            (14, Device::WindowsPhone),
            (15, Device::Linux),
        ];
        Self {
            codes: codes.into_iter().collect(),
            fallback: Device::Other,
        }
    }

    /// The short table.
    pub fn legacy() -> Self {
        let codes = [
            (1, Device::Ios),
            (2, Device::Android),
            (3, Device::PlayStation),
            (4, Device::NintendoSwitch),
            (5, Device::Xbox),
            (6, Device::Linux),
            (7, Device::Windows),
        ];
        Self {
            codes: codes.into_iter().collect(),
            fallback: Device::Unknown,
        }
    }

    /// Builds the table for `kind`.
    pub fn for_kind(kind: DeviceTableKind) -> Self {
        match kind {
            DeviceTableKind::Extended => Self::extended(),
            DeviceTableKind::Legacy => Self::legacy(),
        }
    }

    /// Replaces (or adds) the mapping for one code.
    pub fn with_override(mut self, code: i32, device: Device) -> Self {
        self.codes.insert(code, device);
        self
    }

    /// Classifies a raw code. Never fails.
    pub fn classify(&self, code: i32) -> Device {
        self.codes.get(&code).copied().unwrap_or(self.fallback)
    }
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self::extended()
    }
}
