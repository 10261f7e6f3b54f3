//! Per-connection handlers, one per listener.
//!
//! Every accepted connection carries exactly one exchange:
//!   1. Read one payload, bounded in size and by `io_timeout`
//!   2. Compute the reply (dispatch, `PONG`, or stats)
//!   3. Write it and close
//!
//! Errors are returned to the accept loop, which logs them at `debug`.

use std::sync::Arc;
use std::time::Duration;

use ringside_protocol::{Codec, JsonCodec, PROBE_PING, PROBE_PONG};
use ringside_room::RoomRegistry;
use ringside_transport::{Connection, TransportError};

use crate::{RingsideError, dispatch};

/// Coordinator listener: decode, dispatch, answer.
pub(crate) async fn handle_request<C: Connection>(
    conn: C,
    registry: Arc<RoomRegistry>,
    io_timeout: Duration,
) -> Result<(), RingsideError> {
    let reply = match read(&conn, io_timeout).await {
        Ok(Some(payload)) => dispatch::handle_payload(&registry, &payload),
        Ok(None) => {
            tracing::debug!(conn_id = %conn.id(), "empty request");
            dispatch::malformed("empty request")
        }
        Err(TransportError::MessageTooLarge { limit }) => {
            tracing::debug!(conn_id = %conn.id(), peer = %conn.peer_addr(), limit, "oversized request");
            dispatch::malformed(format!("request exceeds {limit} bytes"))
        }
        Err(e) => {
            let _ = close(&conn, io_timeout).await;
            return Err(e.into());
        }
    };
    reply_and_close(&conn, &reply, io_timeout).await
}

/// Liveness listener: `PING` gets `PONG`, anything else gets nothing.
pub(crate) async fn handle_liveness<C: Connection>(
    conn: C,
    io_timeout: Duration,
) -> Result<(), RingsideError> {
    match read(&conn, io_timeout).await {
        Ok(Some(payload)) if payload == PROBE_PING => {
            reply_and_close(&conn, PROBE_PONG, io_timeout).await
        }
        Ok(_) => {
            tracing::debug!(conn_id = %conn.id(), "liveness request was not PING");
            close(&conn, io_timeout).await
        }
        Err(e) => {
            let _ = close(&conn, io_timeout).await;
            Err(e.into())
        }
    }
}

/// Stats listener: any request, including an empty one, gets the counters.
pub(crate) async fn handle_stats<C: Connection>(
    conn: C,
    registry: Arc<RoomRegistry>,
    io_timeout: Duration,
) -> Result<(), RingsideError> {
    match read(&conn, io_timeout).await {
        Ok(_) | Err(TransportError::MessageTooLarge { .. }) => {}
        Err(e) => {
            let _ = close(&conn, io_timeout).await;
            return Err(e.into());
        }
    }
    let body = JsonCodec.encode(&registry.stats())?;
    reply_and_close(&conn, &body, io_timeout).await
}

async fn read<C: Connection>(
    conn: &C,
    io_timeout: Duration,
) -> Result<Option<Vec<u8>>, TransportError> {
    tokio::time::timeout(io_timeout, conn.recv())
        .await
        .map_err(|_| TransportError::Timeout(io_timeout))?
}

async fn reply_and_close<C: Connection>(
    conn: &C,
    reply: &[u8],
    io_timeout: Duration,
) -> Result<(), RingsideError> {
    let sent = tokio::time::timeout(io_timeout, conn.send(reply))
        .await
        .map_err(|_| TransportError::Timeout(io_timeout))
        .and_then(|sent| sent);
    let closed = close(conn, io_timeout).await;
    sent?;
    closed
}

async fn close<C: Connection>(conn: &C, io_timeout: Duration) -> Result<(), RingsideError> {
    tokio::time::timeout(io_timeout, conn.close())
        .await
        .map_err(|_| TransportError::Timeout(io_timeout))??;
    Ok(())
}
