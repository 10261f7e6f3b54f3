//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding documents.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or an
    /// unknown `action`.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The document decoded but violates a protocol rule, such as an
    /// empty player name.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
