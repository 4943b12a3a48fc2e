//! Codec trait and the JSON implementation.
//!
//! The server never calls `serde_json` directly; it goes through a
//! [`Codec`] so the framing used on the socket is chosen in one place.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into an owned value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not match `T`.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Whether `encode` always yields UTF-8 text, so frames can go out as
    /// WebSocket text messages. Binary codecs keep the default.
    fn is_text(&self) -> bool {
        false
    }
}

/// A [`Codec`] backed by `serde_json`.
///
/// JSON is what browser clients speak natively, so this is the only codec
/// the server ships with.
///
/// ```rust
/// use uttt_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg: ClientMessage = codec.decode(br#"{"event":"join"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::Join);
///
/// let bytes = codec.encode(&msg).unwrap();
/// assert_eq!(bytes, br#"{"event":"join"}"#);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    fn is_text(&self) -> bool {
        true
    }
}
