//! Error types for the protocol layer.
//!
//! Each crate in RealmRelay defines its own error enum. A
//! `ProtocolError` always means a problem turning frames into bytes or
//! back, never a networking or state problem.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of a frame failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization of a frame failed.
    ///
    /// Common causes: malformed JSON from the bridge, an unknown event
    /// `type` tag, or missing fields.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but makes no sense at the protocol level,
    /// e.g. an outbound-only frame arriving from the bridge.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
