//! Unified error type for Ringside.

use ringside_client::ClientError;
use ringside_protocol::ProtocolError;
use ringside_room::RoomError;
use ringside_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes let `?` convert sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum RingsideError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry error (not found, full, self-join, capacity).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A client-side error.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A listener or the reaper task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Reading a listener's bound address failed.
    #[error("listener address unavailable: {0}")]
    Io(#[from] std::io::Error),
}
