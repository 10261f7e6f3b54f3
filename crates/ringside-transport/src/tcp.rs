//! Raw TCP transport: the request is everything the client writes before
//! half-closing its side, the response is everything the server writes
//! before closing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, Connector, Transport, TransportError, TransportLimits};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

const READ_CHUNK: usize = 4096;

/// A TCP [`Transport`] that listens for incoming connections.
pub struct TcpTransport {
    listener: TcpListener,
    limits: TransportLimits,
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;

    async fn bind(addr: &str, limits: TransportLimits) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener, limits })
    }

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        let _ = stream.set_nodelay(true);

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, "accepted TCP connection");

        Ok(TcpConnection {
            id,
            peer,
            limits: self.limits,
            stream: Mutex::new(stream),
        })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single accepted TCP connection.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    limits: TransportLimits,
    stream: Mutex<TcpStream>,
}

impl Connection for TcpConnection {
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut stream = self.stream.lock().await;
        let data = read_bounded(&mut *stream, self.limits.max_message_bytes).await?;
        Ok(if data.is_empty() { None } else { Some(data) })
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut stream = self.stream.lock().await;
        stream
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)?;
        stream.flush().await.map_err(TransportError::SendFailed)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.stream
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

/// Client half of the TCP transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector {
    limits: TransportLimits,
}

impl TcpConnector {
    /// Creates a connector that rejects replies larger than `limits` allows.
    pub fn new(limits: TransportLimits) -> Self {
        Self { limits }
    }
}

impl Connector for TcpConnector {
    async fn exchange(&self, addr: &str, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut stream =
            TcpStream::connect(addr)
                .await
                .map_err(|source| TransportError::ConnectFailed {
                    addr: addr.to_string(),
                    source,
                })?;
        let _ = stream.set_nodelay(true);

        stream
            .write_all(request)
            .await
            .map_err(TransportError::SendFailed)?;
        // Half-close: EOF on the server side marks the end of the request.
        stream.shutdown().await.map_err(TransportError::SendFailed)?;

        let reply = read_bounded(&mut stream, self.limits.max_message_bytes).await?;
        if reply.is_empty() {
            return Err(TransportError::ConnectionClosed(
                "peer closed without replying".into(),
            ));
        }
        Ok(reply)
    }
}

/// Reads until EOF, failing once more than `limit` bytes have arrived.
pub(crate) async fn read_bounded<R>(reader: &mut R, limit: usize) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(limit.min(READ_CHUNK));
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Ok(buf);
        }
        if buf.len() + n > limit {
            return Err(TransportError::MessageTooLarge { limit });
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_bounded_reads_to_eof() {
        let mut input: &[u8] = b"hello world";
        let data = read_bounded(&mut input, 64).await.unwrap();
        assert_eq!(data, b"hello world");
    }

    #[tokio::test]
    async fn test_read_bounded_empty_input() {
        let mut input: &[u8] = b"";
        let data = read_bounded(&mut input, 64).await.unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn test_read_bounded_rejects_oversized_payload() {
        let big = vec![b'x'; 100];
        let mut input: &[u8] = &big;
        let err = read_bounded(&mut input, 10).await.unwrap_err();
        assert!(matches!(err, TransportError::MessageTooLarge { limit: 10 }));
    }

    #[tokio::test]
    async fn test_read_bounded_accepts_exact_limit() {
        let exact = vec![b'y'; 10];
        let mut input: &[u8] = &exact;
        let data = read_bounded(&mut input, 10).await.unwrap();
        assert_eq!(data.len(), 10);
    }
}
