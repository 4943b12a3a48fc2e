//! Error types for the protocol layer.

/// Errors raised while turning wire events into bytes or back.
///
/// A decode failure on an inbound frame is not a client-visible error:
/// the server logs it and drops the frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes were not valid JSON, or not the expected shape
    /// (unknown event name, non-integer index, missing field).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
