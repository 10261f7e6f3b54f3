//! Integration tests: a real server on loopback, real client connectors.

use std::time::Duration;

use ringside::client::probe_once;
use ringside::prelude::*;
use ringside::protocol::{ErrorCode, PROBE_PONG, RegistryStats};
use ringside::transport::Connector;
use serde_json::Value;
use tokio::io::AsyncReadExt;

const WAIT: Duration = Duration::from_secs(5);

// =========================================================================
// Helpers
// =========================================================================

async fn start_with<T: Transport>(config: ServerConfig) -> ServerHandle {
    RingsideServerBuilder::new()
        .config(config)
        .bind("127.0.0.1:0")
        .liveness("127.0.0.1:0")
        .stats("127.0.0.1:0")
        .build::<T>()
        .await
        .expect("should bind")
        .spawn()
        .expect("should spawn")
}

async fn start() -> ServerHandle {
    start_with::<TcpTransport>(ServerConfig::default()).await
}

fn client(server: &ServerHandle) -> CoordinatorClient<TcpConnector> {
    CoordinatorClient::new(
        TcpConnector::default(),
        server.addr().to_string(),
        Duration::from_secs(2),
    )
}

fn fast_client_config(server: &ServerHandle) -> ClientConfig {
    ClientConfig {
        server_addr: server.addr().to_string(),
        liveness_addr: server.liveness_addr().to_string(),
        ready_poll_interval: Duration::from_millis(20),
        sync_interval: Duration::from_millis(20),
        probe_interval: Duration::from_millis(50),
        ..ClientConfig::default()
    }
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// =========================================================================
// Coordinator
// =========================================================================

#[tokio::test]
async fn test_match_flow_over_tcp() {
    let server = start().await;
    let a = client(&server);
    let b = client(&server);

    let created = a.create_room("Ryu", "ryu", CallerId::random()).await.unwrap();
    let room = created.room_id;
    let joined = b.join_room(&room, "Ken", "ken", CallerId::random()).await.unwrap();
    assert_eq!(joined.host_name, "Ryu");
    assert_eq!(joined.host_fighter, "ryu");

    let first = a.set_ready(&room, &created.player_id, true).await.unwrap();
    assert!(!first.opponent_ready);
    let second = b.set_ready(&room, &joined.player_id, true).await.unwrap();
    assert!(second.opponent_ready);
    assert_eq!(second.room_status, RoomStatus::Playing);

    let seen_by_a = a.check_opponent_ready(&room, &created.player_id).await.unwrap();
    let seen_by_b = b.check_opponent_ready(&room, &joined.player_id).await.unwrap();
    assert!(seen_by_a.opponent_ready && seen_by_b.opponent_ready);

    assert_eq!(b.get_opponent_state(&room, &joined.player_id).await.unwrap(), None);

    let pushed = StateSnapshot {
        position: Vec2::new(120.5, 0.0),
        health: 100.0,
        stamina: 80.0,
        facing: Facing::Left,
        action: "idle".into(),
        ..StateSnapshot::default()
    };
    a.update_state(&room, &created.player_id, pushed.clone()).await.unwrap();
    let pulled = b.get_opponent_state(&room, &joined.player_id).await.unwrap();
    assert_eq!(pulled, Some(pushed));

    let left = a.leave_room(&room, &created.player_id).await.unwrap();
    assert!(!left.room_removed);
    let left = b.leave_room(&room, &joined.player_id).await.unwrap();
    assert!(left.room_removed);
    assert!(!server.registry().contains(&room));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_error_codes_over_tcp() {
    let server = start().await;
    let client = client(&server);
    let host = CallerId::random();

    let created = client.create_room("Ryu", "ryu", host).await.unwrap();
    let err = client
        .join_room(&created.room_id, "Ryu", "ryu", host)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::SelfJoin));

    client.join_room(&created.room_id, "Ken", "ken", CallerId::random()).await.unwrap();
    let err = client
        .join_room(&created.room_id, "Guile", "guile", CallerId::random())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::RoomFull));

    let err = client
        .join_room(&RoomId::from("nope00"), "Ken", "ken", CallerId::random())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NotFound));

    client.create_room("Ryu", "ryu", host).await.unwrap();
    client.create_room("Ryu", "ryu", host).await.unwrap();
    let err = client.create_room("Ryu", "ryu", host).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::CapacityExceeded));
}

#[tokio::test]
async fn test_malformed_request_gets_error_document() {
    let server = start().await;
    let reply = TcpConnector::default()
        .exchange(&server.addr().to_string(), b"{\"action\":")
        .await
        .unwrap();
    let reply: Value = serde_json::from_slice(&reply).unwrap();
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["code"], "MalformedRequest");
}

#[tokio::test]
async fn test_empty_request_gets_error_document() {
    let server = start().await;
    let reply = TcpConnector::default()
        .exchange(&server.addr().to_string(), b"")
        .await
        .expect("empty request should still be answered");
    let reply: Value = serde_json::from_slice(&reply).unwrap();
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["code"], "MalformedRequest");
}

#[tokio::test]
async fn test_silent_client_does_not_block_others() {
    let server = start_with::<TcpTransport>(ServerConfig {
        io_timeout: Duration::from_millis(200),
        ..ServerConfig::default()
    })
    .await;

    let mut silent = tokio::net::TcpStream::connect(server.addr()).await.unwrap();
    client(&server)
        .create_room("Ryu", "ryu", CallerId::random())
        .await
        .expect("other clients are served while one is silent");

    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(WAIT, silent.read(&mut buf))
        .await
        .expect("server should drop the silent connection");
    assert_eq!(read.unwrap_or(0), 0);
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_rooms() {
    let server = start().await;
    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let client = client(&server);
            tokio::spawn(async move {
                client
                    .create_room("Ryu", "ryu", CallerId::random())
                    .await
                    .unwrap()
                    .room_id
            })
        })
        .collect();

    let mut ids = std::collections::HashSet::new();
    for task in tasks {
        ids.insert(task.await.unwrap());
    }
    assert_eq!(ids.len(), 32);
    assert_eq!(server.registry().room_count(), 32);
}

// =========================================================================
// Sessions and sync
// =========================================================================

#[tokio::test]
async fn test_sessions_sync_snapshots_end_to_end() {
    let server = start().await;
    let config = fast_client_config(&server);

    let host = MatchSession::host(
        client(&server),
        config.clone(),
        &PlayerProfile::new("Ryu", "ryu"),
    )
    .await
    .unwrap();
    let guest = MatchSession::join(
        client(&server),
        config.clone(),
        host.room_id().clone(),
        &PlayerProfile::new("Ken", "ken"),
    )
    .await
    .unwrap();
    assert_eq!(guest.role(), Role::Guest);
    assert_eq!(guest.host_details().unwrap().name, "Ryu");
    let room_id = host.room_id().clone();

    host.ready().await.unwrap();
    guest.ready().await.unwrap();

    let (host_tx, host_rx) = tokio::sync::watch::channel(StateSnapshot {
        health: 100.0,
        action: "idle".into(),
        ..StateSnapshot::default()
    });
    let (_guest_tx, guest_rx) = tokio::sync::watch::channel(StateSnapshot::default());
    let host = host.start(host_rx);
    let guest = guest.start(guest_rx);

    tokio::time::timeout(WAIT, guest.wait_for(SyncStatus::Synchronizing))
        .await
        .unwrap()
        .unwrap();
    tokio::time::timeout(WAIT, host.wait_for(SyncStatus::Synchronizing))
        .await
        .unwrap()
        .unwrap();

    let mut seen = guest.opponent_watch();
    tokio::time::timeout(WAIT, seen.wait_for(|o| o.as_ref().is_some_and(|s| s.health == 100.0)))
        .await
        .expect("guest should see the host's snapshot")
        .unwrap();

    host_tx.send_modify(|s| {
        s.health = 72.5;
        s.action = "block".into();
        s.blocking = true;
    });
    tokio::time::timeout(WAIT, seen.wait_for(|o| o.as_ref().is_some_and(|s| s.blocking)))
        .await
        .expect("guest should see the update")
        .unwrap();
    assert_eq!(guest.opponent().unwrap().health, 72.5);

    host.quit();
    let mut guest_status = guest.status_watch();
    tokio::time::timeout(WAIT, guest_status.wait_for(|s| s.is_final()))
        .await
        .expect("guest should notice the host leaving")
        .unwrap();
    assert_eq!(guest.status(), SyncStatus::OpponentLeft);
    assert_eq!(guest.opponent(), None);

    guest.shutdown().await;
    let registry = std::sync::Arc::clone(server.registry());
    wait_until(|| !registry.contains(&room_id)).await;
}

// =========================================================================
// Liveness and stats
// =========================================================================

#[tokio::test]
async fn test_liveness_ping_pong() {
    let server = start().await;
    let rtt = probe_once(
        &TcpConnector::default(),
        &server.liveness_addr().to_string(),
        Duration::from_secs(2),
    )
    .await
    .unwrap();
    assert!(rtt < Duration::from_secs(2));
}

#[tokio::test]
async fn test_liveness_rejects_other_tokens() {
    let server = start().await;
    let reply = TcpConnector::default()
        .exchange(&server.liveness_addr().to_string(), b"HELLO")
        .await;
    assert_ne!(reply.ok().as_deref(), Some(PROBE_PONG));
}

#[tokio::test]
async fn test_prober_reports_latency() {
    let server = start().await;
    let prober = LivenessProber::spawn(TcpConnector::default(), &fast_client_config(&server));
    let mut latency = prober.watch();
    tokio::time::timeout(WAIT, latency.wait_for(Option::is_some))
        .await
        .expect("prober should measure a round trip")
        .unwrap();
}

#[tokio::test]
async fn test_stats_listener_reports_counts() {
    let server = start().await;
    let client = client(&server);
    let created = client.create_room("Ryu", "ryu", CallerId::random()).await.unwrap();
    client.create_room("Ken", "ken", CallerId::random()).await.unwrap();
    client
        .join_room(&created.room_id, "Guile", "guile", CallerId::random())
        .await
        .unwrap();

    let stats_addr = server.stats_addr().expect("stats listener enabled");
    let reply = TcpConnector::default()
        .exchange(&stats_addr.to_string(), b"stats")
        .await
        .unwrap();
    let stats: RegistryStats = serde_json::from_slice(&reply).unwrap();
    assert_eq!(
        stats,
        RegistryStats {
            rooms: 2,
            waiting: 2,
            playing: 0,
            finished: 0,
            players: 3,
        }
    );
}

#[tokio::test]
async fn test_stats_listener_off_by_default() {
    let server = RingsideServerBuilder::new()
        .bind("127.0.0.1:0")
        .liveness("127.0.0.1:0")
        .build::<TcpTransport>()
        .await
        .unwrap();
    assert_eq!(server.stats_addr().unwrap(), None);
}

// =========================================================================
// WebSocket framing
// =========================================================================

#[cfg(feature = "websocket")]
#[tokio::test]
async fn test_match_flow_over_websocket() {
    let server = start_with::<WebSocketTransport>(ServerConfig::default()).await;
    let client = CoordinatorClient::new(
        WebSocketConnector::default(),
        server.addr().to_string(),
        Duration::from_secs(2),
    );

    let created = client.create_room("Ryu", "ryu", CallerId::random()).await.unwrap();
    let joined = client
        .join_room(&created.room_id, "Ken", "ken", CallerId::random())
        .await
        .unwrap();
    client
        .update_state(
            &created.room_id,
            &created.player_id,
            StateSnapshot {
                health: 100.0,
                ..StateSnapshot::default()
            },
        )
        .await
        .unwrap();
    let pulled = client
        .get_opponent_state(&created.room_id, &joined.player_id)
        .await
        .unwrap();
    assert_eq!(pulled.map(|s| s.health), Some(100.0));

    probe_once(
        &WebSocketConnector::default(),
        &server.liveness_addr().to_string(),
        Duration::from_secs(2),
    )
    .await
    .expect("liveness over websocket");

    server.shutdown().await.unwrap();
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_shutdown_stops_listeners() {
    let server = start().await;
    let addr = server.addr();
    let liveness = server.liveness_addr();

    server.shutdown().await.unwrap();

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    assert!(tokio::net::TcpStream::connect(liveness).await.is_err());
}
