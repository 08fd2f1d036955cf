//! Error types for the router layer.

/// Errors from moderation-list edits.
///
/// Event handling itself never fails: malformed or unattributable events
/// are logged and dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// A banned-device entry did not name a known device label.
    #[error("unknown device label: {0:?}")]
    UnknownDevice(String),

    /// The list name is not one of the moderation lists.
    #[error("unknown moderation list: {0:?}")]
    UnknownList(String),

    /// Names and labels cannot be empty.
    #[error("moderation entry cannot be empty")]
    EmptyEntry,
}
