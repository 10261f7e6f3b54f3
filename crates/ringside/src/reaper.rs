//! Background sweep that removes rooms nobody has touched in a while.

use std::sync::Arc;
use std::time::Duration;

use ringside_room::RoomRegistry;
use ringside_tick::{TickConfig, Ticker};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Spawns the reaper. It sweeps every `interval`, removing rooms idle for
/// longer than the registry's `idle_timeout`, until `shutdown` turns
/// `true` or its sender is dropped.
pub fn spawn_reaper(
    registry: Arc<RoomRegistry>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(run(registry, interval, shutdown))
}

async fn run(registry: Arc<RoomRegistry>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let idle_timeout = registry.config().idle_timeout;
    let mut ticker = Ticker::new(TickConfig::every(interval).delayed_start());
    tracing::debug!(
        interval_secs = interval.as_secs(),
        idle_timeout_secs = idle_timeout.as_secs(),
        "reaper started"
    );

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait_for(|stop| *stop) => break,
            _ = ticker.wait_for_tick() => {
                let reaped = registry.reap_idle(idle_timeout);
                if !reaped.is_empty() {
                    tracing::info!(count = reaped.len(), remaining = registry.room_count(), "reaper sweep");
                }
            }
        }
    }
    tracing::debug!("reaper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringside_protocol::CallerId;
    use ringside_room::RegistryConfig;

    fn registry(idle_secs: u64) -> Arc<RoomRegistry> {
        Arc::new(RoomRegistry::new(RegistryConfig {
            idle_timeout: Duration::from_secs(idle_secs),
            ..RegistryConfig::default()
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_removes_idle_room_after_one_sweep() {
        let registry = registry(60);
        let created = registry.create_room("Ryu", "ryu", CallerId::random()).unwrap();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = spawn_reaper(Arc::clone(&registry), Duration::from_secs(10), stop_rx);

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert!(registry.contains(&created.room_id));

        tokio::time::sleep(Duration::from_secs(40)).await;
        assert!(!registry.contains(&created.room_id));

        stop_tx.send_replace(true);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_spares_active_room() {
        let registry = registry(60);
        let created = registry.create_room("Ryu", "ryu", CallerId::random()).unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let _task = spawn_reaper(Arc::clone(&registry), Duration::from_secs(10), stop_rx);

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_secs(40)).await;
            registry
                .update_state(&created.room_id, &created.player_id, Default::default())
                .unwrap();
        }
        assert!(registry.contains(&created.room_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_stops_on_shutdown() {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = spawn_reaper(registry(60), Duration::from_secs(10), stop_rx);
        stop_tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("reaper did not stop")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_stops_when_sender_dropped() {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = spawn_reaper(registry(60), Duration::from_secs(10), stop_rx);
        drop(stop_tx);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("reaper did not stop")
            .unwrap();
    }
}
