//! Error types for the client.

use std::time::Duration;

use ringside_protocol::{ErrorBody, ErrorCode, ProtocolError};
use ringside_transport::TransportError;

/// Errors a client call or session step can return.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The coordinator answered with an error document.
    #[error("server rejected request ({code:?}): {message}")]
    Server { code: ErrorCode, message: String },

    /// No reply within the request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The sync loop has failed too many cycles in a row. It keeps
    /// retrying; this clears on the next successful cycle.
    #[error("lost contact with the coordinator")]
    Disconnected,

    /// The opponent left mid-match and the sync task has exited.
    #[error("opponent left the room")]
    OpponentLeft,

    /// The sync task has exited (quit, or the handle was dropped).
    #[error("sync task has stopped")]
    Stopped,

    /// Connecting, sending, or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The reply could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A configuration variable held an unusable value.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidConfig {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ClientError {
    /// The server's error code, if this is a server-sent error.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<ErrorBody> for ClientError {
    fn from(body: ErrorBody) -> Self {
        Self::Server {
            code: body.code,
            message: body.message,
        }
    }
}
