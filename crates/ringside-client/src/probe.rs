//! Liveness prober: measures the round trip to the coordinator's liveness
//! listener on its own task, independent of the sync loop.

use std::sync::Arc;
use std::time::Duration;

use ringside_protocol::{PROBE_PING, PROBE_PONG, ProtocolError};
use ringside_tick::{TickConfig, Ticker};
use ringside_transport::Connector;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::{ClientConfig, ClientError};

/// Sends one `PING` to `addr` and returns the round-trip time.
///
/// # Errors
/// [`ClientError::Timeout`] past `timeout`, transport errors as-is, and
/// [`ClientError::Protocol`] if the reply is not `PONG`.
pub async fn probe_once<C: Connector>(
    connector: &C,
    addr: &str,
    timeout: Duration,
) -> Result<Duration, ClientError> {
    let started = Instant::now();
    let reply = tokio::time::timeout(timeout, connector.exchange(addr, PROBE_PING))
        .await
        .map_err(|_| ClientError::Timeout(timeout))??;
    if reply != PROBE_PONG {
        return Err(ProtocolError::InvalidMessage(format!(
            "expected PONG, got {} bytes",
            reply.len()
        ))
        .into());
    }
    Ok(started.elapsed())
}

/// A background task publishing the latest measured latency.
///
/// `None` means the last probe failed (or none has completed yet). Stops
/// when dropped.
pub struct LivenessProber {
    latency_rx: watch::Receiver<Option<Duration>>,
    stop_tx: watch::Sender<bool>,
}

impl LivenessProber {
    /// Starts probing `config.liveness_addr` every `config.probe_interval`.
    pub fn spawn<C: Connector>(connector: C, config: &ClientConfig) -> Self {
        let (latency_tx, latency_rx) = watch::channel(None);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let connector = Arc::new(connector);
        let addr = config.liveness_addr.clone();
        let timeout = config.request_timeout;
        let interval = config.probe_interval;
        let mut ticker = Ticker::new(TickConfig::every(interval).with_jitter(interval / 4));

        tokio::spawn(async move {
            let probing = async {
                loop {
                    ticker.wait_for_tick().await;
                    let latency = match probe_once(connector.as_ref(), &addr, timeout).await {
                        Ok(rtt) => Some(rtt),
                        Err(e) => {
                            tracing::debug!(%addr, error = %e, "liveness probe failed");
                            None
                        }
                    };
                    latency_tx.send_replace(latency);
                }
            };
            tokio::select! {
                biased;
                _ = stop_rx.wait_for(|stop| *stop) => {}
                _ = probing => {}
            }
        });

        Self { latency_rx, stop_tx }
    }

    /// The most recent round-trip time.
    pub fn latency(&self) -> Option<Duration> {
        *self.latency_rx.borrow()
    }

    /// A receiver for latency updates.
    pub fn watch(&self) -> watch::Receiver<Option<Duration>> {
        self.latency_rx.clone()
    }

    /// Stops probing.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for LivenessProber {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}
