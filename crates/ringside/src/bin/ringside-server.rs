use clap::{Parser, ValueEnum};
use ringside::prelude::*;
use tokio::sync::watch;

/// Wire framing shared by every listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Framing {
    Tcp,
    Websocket,
}

/// Ringside room coordinator.
///
/// Everything else is configured through `RINGSIDE_*` variables (a `.env`
/// file is read if present).
#[derive(Debug, Parser)]
#[command(name = "ringside-server", version)]
struct Args {
    /// Framing for the coordinator, liveness and stats listeners.
    #[arg(long, env = "RINGSIDE_TRANSPORT", value_enum, default_value_t = Framing::Tcp)]
    transport: Framing,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = ServerConfig::from_env()?;
    ringside::init_tracing(&config.log_level);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                stop_tx.send_replace(true);
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for ctrl-c, running until killed");
                std::future::pending::<()>().await;
            }
        }
    });

    match args.transport {
        Framing::Tcp => serve::<TcpTransport>(config, stop_rx).await,
        Framing::Websocket => {
            #[cfg(feature = "websocket")]
            {
                serve::<WebSocketTransport>(config, stop_rx).await
            }
            #[cfg(not(feature = "websocket"))]
            {
                anyhow::bail!("built without the websocket feature")
            }
        }
    }
}

async fn serve<T: Transport>(config: ServerConfig, stop_rx: watch::Receiver<bool>) -> anyhow::Result<()> {
    let server = RingsideServerBuilder::new()
        .config(config)
        .build::<T>()
        .await?;
    server.run(stop_rx).await?;
    Ok(())
}
