//! A scripted client: takes a seat, waits for an opponent, then shadow-boxes
//! for a while, logging what it sees of the other side.
//!
//! ```text
//! ringside-duel --name Ryu --fighter ryu            # hosts, logs the room id
//! ringside-duel --name Ken --fighter ken --room k3x9qa
//! ```

use std::time::Duration;

use clap::Parser;
use ringside::prelude::*;
use ringside::transport::Connector;
use ringside_tick::{TickConfig, Ticker};
use tokio::sync::watch;

const FRAME: Duration = Duration::from_millis(16);
const FRAMES_PER_REPORT: u64 = 60;

#[derive(Debug, Parser)]
#[command(name = "ringside-duel", version, about = "Scripted Ringside client")]
struct Args {
    /// Coordinator address.
    #[arg(long, env = "RINGSIDE_SERVER")]
    server: Option<String>,

    /// Liveness listener address.
    #[arg(long, env = "RINGSIDE_LIVENESS_SERVER")]
    liveness: Option<String>,

    /// Room to join; omit to host a new one.
    #[arg(long)]
    room: Option<String>,

    #[arg(long, default_value = "Player")]
    name: String,

    #[arg(long, default_value = "ryu")]
    fighter: String,

    /// How long to fight once both players are ready.
    #[arg(long, default_value_t = 30)]
    seconds: u64,

    /// Talk WebSocket instead of raw TCP.
    #[arg(long)]
    websocket: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    ringside::init_tracing("info");

    let mut config = ClientConfig::from_env()?;
    if let Some(server) = &args.server {
        config.server_addr = server.clone();
    }
    if let Some(liveness) = &args.liveness {
        config.liveness_addr = liveness.clone();
    }

    let limits = TransportLimits::default();
    if args.websocket {
        #[cfg(feature = "websocket")]
        {
            let connector = WebSocketConnector::new(limits);
            return duel(&args, config, connector, connector).await;
        }
        #[cfg(not(feature = "websocket"))]
        anyhow::bail!("built without the websocket feature");
    }
    let connector = TcpConnector::new(limits);
    duel(&args, config, connector, connector).await
}

async fn duel<C: Connector>(
    args: &Args,
    config: ClientConfig,
    rpc: C,
    probe: C,
) -> anyhow::Result<()> {
    let client = CoordinatorClient::new(rpc, config.server_addr.clone(), config.request_timeout);
    let profile = PlayerProfile::new(args.name.clone(), args.fighter.clone());
    let room = args.room.as_deref().map(RoomId::from);

    let session = MatchSession::open(client, config.clone(), room, &profile).await?;
    match (session.role(), session.host_details()) {
        (Role::Guest, Some(host)) => tracing::info!(
            room_id = %session.room_id(),
            host = %host.name,
            fighter = %host.fighter,
            "joined room"
        ),
        _ => tracing::info!(room_id = %session.room_id(), "room open, share the id with your opponent"),
    }

    let ready = session.ready().await?;
    tracing::info!(opponent_ready = ready.opponent_ready, status = %ready.room_status, "ready");

    let prober = LivenessProber::spawn(probe, &config);
    let (local_tx, local_rx) = watch::channel(StateSnapshot {
        position: Vec2::new(200.0, 0.0),
        health: 100.0,
        stamina: 100.0,
        action: "idle".into(),
        ..StateSnapshot::default()
    });
    let sync = session.start(local_rx);

    let started = tokio::select! {
        ready = sync.wait_for(SyncStatus::Synchronizing) => ready.is_ok(),
        _ = tokio::signal::ctrl_c() => false,
    };
    if !started {
        tracing::info!(status = %sync.status(), "leaving before the fight");
        sync.shutdown().await;
        return Ok(());
    }
    tracing::info!("fight");

    let total_frames = args.seconds * 1000 / FRAME.as_millis() as u64;
    let mut frames = Ticker::new(TickConfig::every(FRAME));
    let interrupted = tokio::select! {
        _ = async {
            for frame in 0..total_frames {
                frames.wait_for_tick().await;
                local_tx.send_modify(|snapshot| choreograph(frame, snapshot));
                if frame % FRAMES_PER_REPORT == 0 {
                    report(&sync, &prober);
                }
            }
        } => false,
        _ = tokio::signal::ctrl_c() => true,
    };

    tracing::info!(interrupted, "bout over, leaving room");
    prober.stop();
    sync.shutdown().await;
    Ok(())
}

/// Walks back and forth and throws a jab every second and a half.
fn choreograph(frame: u64, snapshot: &mut StateSnapshot) {
    let t = frame as f32 * FRAME.as_secs_f32();
    snapshot.position.x = 200.0 + 80.0 * t.sin();
    snapshot.velocity.x = 80.0 * t.cos();
    snapshot.facing = if snapshot.velocity.x >= 0.0 {
        Facing::Right
    } else {
        Facing::Left
    };

    let phase = frame % 90;
    snapshot.attacking = phase < 12;
    snapshot.action = if snapshot.attacking { "light_punch" } else { "walk" }.into();
    snapshot.frame = (phase % 12) as u32;
    snapshot.stamina = if snapshot.attacking {
        (snapshot.stamina - 0.5).max(0.0)
    } else {
        (snapshot.stamina + 0.25).min(100.0)
    };
}

fn report(sync: &SyncHandle, prober: &LivenessProber) {
    let latency_ms = prober.latency().map(|rtt| rtt.as_millis());
    match sync.opponent() {
        Some(opponent) => tracing::info!(
            status = %sync.status(),
            ?latency_ms,
            x = opponent.position.x,
            health = opponent.health,
            action = %opponent.action,
            "opponent"
        ),
        None => tracing::info!(status = %sync.status(), ?latency_ms, "no opponent state yet"),
    }
}
