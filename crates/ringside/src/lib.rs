//! # Ringside
//!
//! Room coordinator and state relay for two-player fighting games.
//!
//! The coordinator keeps every match in a [`RoomRegistry`]: a player
//! creates a room, shares its six-character id, the opponent joins, both
//! declare ready, and from then on each client pushes its own combat
//! snapshot and pulls the other's at a fixed rate. The server never
//! simulates anything; it stores the latest snapshot per slot and hands it
//! to the other side.
//!
//! This crate ties the layers together:
//!
//! ```text
//! transport (bytes) → protocol (Request / Response) → dispatch → registry
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ringside::prelude::*;
//!
//! # async fn start() -> Result<(), RingsideError> {
//! let server = RingsideServerBuilder::new()
//!     .config(ServerConfig::default())
//!     .build::<TcpTransport>()
//!     .await?;
//! let (_stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//! server.run(stop_rx).await
//! # }
//! ```
//!
//! Clients use [`ringside_client`] (re-exported in the prelude).

pub mod config;
pub mod dispatch;
mod error;
mod handler;
pub mod reaper;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::RingsideError;
pub use server::{RingsideServer, RingsideServerBuilder, ServerHandle};

pub use ringside_client as client;
pub use ringside_protocol as protocol;
pub use ringside_room::RoomRegistry;
pub use ringside_transport as transport;

/// Installs the global `tracing` subscriber. `RUST_LOG` wins over
/// `default_filter`.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Everything a server binary or a game client usually needs.
pub mod prelude {
    pub use crate::{
        ConfigError, RingsideError, RingsideServer, RingsideServerBuilder, ServerConfig,
        ServerHandle,
    };
    pub use ringside_client::{
        ClientConfig, ClientError, CoordinatorClient, LivenessProber, MatchSession, PlayerProfile,
        Role, SyncHandle, SyncStatus,
    };
    pub use ringside_protocol::{
        CallerId, Facing, PlayerId, RoomId, RoomStatus, StateSnapshot, Vec2,
    };
    pub use ringside_room::{RegistryConfig, RoomRegistry};
    pub use ringside_transport::{TcpConnector, TcpTransport, Transport, TransportLimits};
    #[cfg(feature = "websocket")]
    pub use ringside_transport::{WebSocketConnector, WebSocketTransport};
}
