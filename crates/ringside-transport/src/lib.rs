//! Transport layer for Ringside.
//!
//! Every exchange with the coordinator is a single request and a single
//! response on a fresh connection. This crate provides both sides of that:
//!
//! - [`Transport`] / [`Connection`]: the server side (bind, accept, read
//!   one payload, write one payload, close).
//! - [`Connector`]: the client side (connect, send, read the reply).
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket framing via `tokio-tungstenite`,
//!   in addition to the always-available raw TCP transport.

mod error;
mod tcp;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpConnector, TcpTransport};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

/// Opaque identifier for an accepted connection. Used for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Size bounds applied to every payload read from the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportLimits {
    /// Largest payload accepted in either direction.
    pub max_message_bytes: usize,
}

impl TransportLimits {
    /// Default bound: 16 KiB, far above the largest request document.
    pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 16 * 1024;
}

impl Default for TransportLimits {
    fn default() -> Self {
        Self {
            max_message_bytes: Self::DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

/// Accepts incoming connections.
pub trait Transport: Sized + Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Binds a listener to `addr` (`"127.0.0.1:0"` picks a free port).
    fn bind(
        addr: &str,
        limits: TransportLimits,
    ) -> impl Future<Output = Result<Self, TransportError>> + Send;

    /// Waits for and accepts the next incoming connection.
    ///
    /// Must not perform any per-connection I/O beyond the TCP accept, so a
    /// client that connects and goes silent cannot stall the accept loop.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// The address the listener is bound to.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// One accepted connection, carrying a single request/response exchange.
pub trait Connection: Send + Sync + 'static {
    /// Reads the request payload.
    ///
    /// Returns `Ok(None)` when the peer closed without sending anything.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Writes the response payload.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The remote address, for logging.
    fn peer_addr(&self) -> SocketAddr;
}

/// Client side of the one-shot exchange.
///
/// Each call opens a new connection, sends `request`, reads the full
/// reply, and closes. Callers apply their own deadline.
pub trait Connector: Send + Sync + 'static {
    /// Performs one request/response exchange against `addr`.
    fn exchange(
        &self,
        addr: &str,
        request: &[u8],
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}
