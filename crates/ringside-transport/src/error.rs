use std::time::Duration;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the connection before a complete exchange.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Opening an outbound connection failed (refused, unreachable).
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The exchange did not complete within its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The payload exceeded the configured size bound.
    #[error("message exceeds {limit} bytes")]
    MessageTooLarge { limit: usize },
}

impl TransportError {
    /// Returns `true` for failures a retry on the next cycle may fix
    /// (everything except an oversized payload, which will not shrink).
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::MessageTooLarge { .. })
    }
}
