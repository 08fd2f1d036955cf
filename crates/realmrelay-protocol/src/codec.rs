//! Codec trait and implementations for bridge frames.
//!
//! A codec converts between frames and raw bytes. The transport does not
//! care which one is used; it only needs something implementing
//! [`Codec`].

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because a codec lives inside long-running
/// connection tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not match `T`.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`. Bridges speak JSON text frames.
///
/// ```rust
/// use realmrelay_protocol::{BridgeFrame, Codec, JsonCodec, SessionEvent};
///
/// let codec = JsonCodec;
/// let frame = BridgeFrame::Event(SessionEvent::Ended);
/// let bytes = codec.encode(&frame).unwrap();
/// let back: BridgeFrame = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, back);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
