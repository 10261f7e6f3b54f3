//! Error types for the room layer.

use ringside_protocol::{CallerId, ErrorCode, PlayerId, RoomId};

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist, or was removed while the request was in
    /// flight.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room exists but the player token does not belong to it.
    #[error("player {0} not in room {1}")]
    PlayerNotFound(PlayerId, RoomId),

    /// Both slots are occupied.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The joining caller is the room's host.
    #[error("caller cannot join its own room {0}")]
    SelfJoin(RoomId),

    /// The caller already holds `limit` open rooms.
    #[error("caller {caller} already has {limit} open rooms")]
    CapacityExceeded { caller: CallerId, limit: usize },

    /// A field failed validation (empty or overlong name, etc.).
    #[error("invalid request: {0}")]
    InvalidInput(String),
}

impl RoomError {
    /// The wire error code this error is reported as.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) | Self::PlayerNotFound(..) => ErrorCode::NotFound,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::SelfJoin(_) => ErrorCode::SelfJoin,
            Self::CapacityExceeded { .. } => ErrorCode::CapacityExceeded,
            Self::InvalidInput(_) => ErrorCode::MalformedRequest,
        }
    }
}

impl From<ringside_protocol::ProtocolError> for RoomError {
    fn from(err: ringside_protocol::ProtocolError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
