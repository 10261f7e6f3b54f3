//! WebSocket transport using `tokio-tungstenite`: one binary frame each
//! way, then close.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::error::CapacityError;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::{Connection, ConnectionId, Connector, Transport, TransportError, TransportLimits};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// Caps tungstenite's own message and frame buffers at the transport limit,
/// so oversized payloads are refused while reading rather than after.
fn ws_config(limits: TransportLimits) -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(limits.max_message_bytes))
        .max_frame_size(Some(limits.max_message_bytes))
}

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    limits: TransportLimits,
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn bind(addr: &str, limits: TransportLimits) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener, limits })
    }

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, "accepted WebSocket connection");

        // The upgrade handshake happens on first recv, inside the
        // per-connection task, so it falls under that task's deadline.
        Ok(WebSocketConnection {
            id,
            peer,
            limits: self.limits,
            state: Mutex::new(WsState::Handshake(stream)),
        })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

enum WsState {
    Handshake(TcpStream),
    Open(WsStream),
    Closed,
}

/// A single WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    limits: TransportLimits,
    state: Mutex<WsState>,
}

/// Completes the server-side upgrade if it has not happened yet.
async fn open(
    state: &mut WsState,
    limits: TransportLimits,
) -> Result<&mut WsStream, TransportError> {
    if matches!(state, WsState::Handshake(_)) {
        if let WsState::Handshake(stream) = std::mem::replace(state, WsState::Closed) {
            let ws = tokio_tungstenite::accept_async_with_config(stream, Some(ws_config(limits)))
                .await
                .map_err(|e| {
                    TransportError::AcceptFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        e,
                    ))
                })?;
            *state = WsState::Open(ws);
        }
    }
    match state {
        WsState::Open(ws) => Ok(ws),
        _ => Err(TransportError::ConnectionClosed("websocket closed".into())),
    }
}

fn send_error(e: WsError) -> TransportError {
    TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
}

fn recv_error(e: WsError, limit: usize) -> TransportError {
    if matches!(e, WsError::Capacity(CapacityError::MessageTooLong { .. })) {
        return TransportError::MessageTooLarge { limit };
    }
    TransportError::ReceiveFailed(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        e,
    ))
}

/// Reads the next data frame, skipping control frames.
async fn next_payload<S>(
    ws: &mut tokio_tungstenite::WebSocketStream<S>,
    limit: usize,
) -> Result<Option<Vec<u8>>, TransportError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    loop {
        let data: Vec<u8> = match ws.next().await {
            Some(Ok(Message::Binary(data))) => data.into(),
            Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
            Some(Ok(Message::Close(_))) | None => return Ok(None),
            Some(Ok(_)) => continue, // ping/pong/frame
            Some(Err(e)) => return Err(recv_error(e, limit)),
        };
        if data.len() > limit {
            return Err(TransportError::MessageTooLarge { limit });
        }
        return Ok(Some(data));
    }
}

impl Connection for WebSocketConnection {
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut state = self.state.lock().await;
        let ws = open(&mut state, self.limits).await?;
        next_payload(ws, self.limits.max_message_bytes).await
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        let ws = open(&mut state, self.limits).await?;
        ws.send(Message::Binary(data.to_vec().into()))
            .await
            .map_err(send_error)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, WsState::Closed) {
            WsState::Open(mut ws) => ws.close(None).await.map_err(send_error),
            WsState::Handshake(_) | WsState::Closed => Ok(()),
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

/// Client half of the WebSocket transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector {
    limits: TransportLimits,
}

impl WebSocketConnector {
    /// Creates a connector that rejects replies larger than `limits` allows.
    pub fn new(limits: TransportLimits) -> Self {
        Self { limits }
    }
}

impl Connector for WebSocketConnector {
    async fn exchange(&self, addr: &str, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let url = format!("ws://{addr}");
        let (mut ws, _) =
            tokio_tungstenite::connect_async_with_config(&url, Some(ws_config(self.limits)), true)
                .await
                .map_err(|e| TransportError::ConnectFailed {
                    addr: addr.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e),
                })?;

        ws.send(Message::Binary(request.to_vec().into()))
            .await
            .map_err(send_error)?;

        let reply = next_payload(&mut ws, self.limits.max_message_bytes).await?;
        let _ = ws.close(None).await;
        reply.ok_or_else(|| TransportError::ConnectionClosed("peer closed without replying".into()))
    }
}
