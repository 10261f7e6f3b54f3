//! `RingsideServer` builder and server loop.
//!
//! One server owns three listeners on the same [`Transport`]:
//!
//! - **coordinator**: room requests, answered by [`dispatch`](crate::dispatch)
//! - **liveness**: `PING` → `PONG`
//! - **stats** (optional): registry counters as JSON
//!
//! plus the reaper task. All of them share one `Arc<RoomRegistry>` and stop
//! together when the shutdown signal flips.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ringside_room::RoomRegistry;
use ringside_transport::{Connection, Transport};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::handler::{handle_liveness, handle_request, handle_stats};
use crate::{RingsideError, ServerConfig, reaper};

/// Pause after a failed accept, so a persistent error (e.g. out of file
/// descriptors) does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Builder for configuring and starting a Ringside server.
///
/// # Example
///
/// ```rust,ignore
/// use ringside::prelude::*;
///
/// let server = RingsideServerBuilder::new()
///     .config(ServerConfig::from_env()?)
///     .build::<TcpTransport>()
///     .await?;
/// server.run(shutdown_rx).await
/// ```
#[derive(Debug, Default)]
pub struct RingsideServerBuilder {
    config: ServerConfig,
    bind_addr: Option<String>,
    liveness_addr: Option<String>,
    stats_addr: Option<String>,
    registry: Option<Arc<RoomRegistry>>,
}

impl RingsideServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration. Addresses set with
    /// [`bind`](Self::bind) and friends still take precedence.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Coordinator listener address, overriding `host:port`.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = Some(addr.to_string());
        self
    }

    /// Liveness listener address, overriding `host:liveness_port`.
    pub fn liveness(mut self, addr: &str) -> Self {
        self.liveness_addr = Some(addr.to_string());
        self
    }

    /// Enables the stats listener on `addr`.
    pub fn stats(mut self, addr: &str) -> Self {
        self.stats_addr = Some(addr.to_string());
        self
    }

    /// Serves an existing registry instead of creating one from the
    /// configuration.
    pub fn registry(mut self, registry: Arc<RoomRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Binds every listener.
    pub async fn build<T: Transport>(self) -> Result<RingsideServer<T>, RingsideError> {
        let config = self.config;
        let limits = config.limits;

        let bind_addr = self.bind_addr.unwrap_or_else(|| config.coordinator_addr());
        let liveness_addr = self.liveness_addr.unwrap_or_else(|| config.liveness_addr());
        let stats_addr = self.stats_addr.or_else(|| config.stats_addr());

        let coordinator = T::bind(&bind_addr, limits).await?;
        let liveness = T::bind(&liveness_addr, limits).await?;
        let stats = match stats_addr {
            Some(addr) => Some(T::bind(&addr, limits).await?),
            None => None,
        };

        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(RoomRegistry::new(config.registry.clone())));

        Ok(RingsideServer {
            coordinator,
            liveness,
            stats,
            registry,
            config,
        })
    }
}

/// A bound Ringside server.
///
/// Call [`run()`](Self::run) to start accepting connections, or
/// [`spawn()`](Self::spawn) to run it on a background task.
pub struct RingsideServer<T: Transport> {
    coordinator: T,
    liveness: T,
    stats: Option<T>,
    registry: Arc<RoomRegistry>,
    config: ServerConfig,
}

impl<T: Transport> RingsideServer<T> {
    /// Creates a new builder.
    pub fn builder() -> RingsideServerBuilder {
        RingsideServerBuilder::new()
    }

    /// Returns the local address of the coordinator listener.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.coordinator.local_addr()
    }

    /// Returns the local address of the liveness listener.
    pub fn liveness_addr(&self) -> std::io::Result<SocketAddr> {
        self.liveness.local_addr()
    }

    /// Returns the local address of the stats listener, if enabled.
    pub fn stats_addr(&self) -> std::io::Result<Option<SocketAddr>> {
        self.stats.as_ref().map(|s| s.local_addr()).transpose()
    }

    /// The registry this server serves.
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Runs every listener and the reaper until `shutdown` turns `true`
    /// (or its sender is dropped).
    ///
    /// Connections already accepted finish their exchange on their own
    /// tasks.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), RingsideError> {
        tracing::info!(
            coordinator = %self.local_addr()?,
            liveness = %self.liveness_addr()?,
            stats = ?self.stats_addr()?,
            "ringside server running"
        );

        let Self {
            coordinator,
            liveness,
            stats,
            registry,
            config,
        } = self;
        let io_timeout = config.io_timeout;

        let reaper = reaper::spawn_reaper(Arc::clone(&registry), config.reap_interval, shutdown.clone());

        let liveness = tokio::spawn(accept_loop(
            liveness,
            "liveness",
            shutdown.clone(),
            move |conn| handle_liveness(conn, io_timeout),
        ));

        let stats = stats.map(|listener| {
            let registry = Arc::clone(&registry);
            tokio::spawn(accept_loop(listener, "stats", shutdown.clone(), move |conn| {
                handle_stats(conn, Arc::clone(&registry), io_timeout)
            }))
        });

        accept_loop(coordinator, "coordinator", shutdown, move |conn| {
            handle_request(conn, Arc::clone(&registry), io_timeout)
        })
        .await;

        liveness.await?;
        if let Some(stats) = stats {
            stats.await?;
        }
        reaper.await?;
        tracing::info!("ringside server stopped");
        Ok(())
    }

    /// Runs the server on a background task.
    pub fn spawn(self) -> Result<ServerHandle, RingsideError> {
        let addr = self.local_addr()?;
        let liveness_addr = self.liveness_addr()?;
        let stats_addr = self.stats_addr()?;
        let registry = Arc::clone(&self.registry);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));

        Ok(ServerHandle {
            addr,
            liveness_addr,
            stats_addr,
            registry,
            shutdown_tx,
            task,
        })
    }
}

/// A server running on a background task. Dropping the handle stops it.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    liveness_addr: SocketAddr,
    stats_addr: Option<SocketAddr>,
    registry: Arc<RoomRegistry>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<Result<(), RingsideError>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn liveness_addr(&self) -> SocketAddr {
        self.liveness_addr
    }

    pub fn stats_addr(&self) -> Option<SocketAddr> {
        self.stats_addr
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Signals shutdown and waits for every listener and the reaper to
    /// stop.
    pub async fn shutdown(self) -> Result<(), RingsideError> {
        self.shutdown_tx.send_replace(true);
        self.task.await?
    }
}

/// Accepts until shutdown, spawning `serve` for every connection.
async fn accept_loop<T, F, Fut>(
    mut listener: T,
    name: &'static str,
    mut shutdown: watch::Receiver<bool>,
    serve: F,
) where
    T: Transport,
    F: Fn(T::Connection) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), RingsideError>> + Send + 'static,
{
    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.wait_for(|stop| *stop) => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok(conn) => {
                let conn_id = conn.id();
                let peer = conn.peer_addr();
                let exchange = serve(conn);
                tokio::spawn(async move {
                    if let Err(e) = exchange.await {
                        tracing::debug!(
                            listener = name,
                            %conn_id,
                            %peer,
                            error = %e,
                            "connection ended with error"
                        );
                    }
                });
            }
            Err(e) => {
                tracing::error!(listener = name, error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
    tracing::debug!(listener = name, "listener stopped");
}
