//! The background synchronization task.
//!
//! Once a player is ready, [`MatchSession::start`](crate::MatchSession::start)
//! spawns one task that runs two phases on its own tickers:
//!
//! 1. **Rendezvous**: ask `CheckOpponentReady` every `ready_poll_interval`
//!    until the opponent is ready.
//! 2. **Sync**: every `sync_interval`, push the latest local snapshot and
//!    pull the opponent's. A pulled snapshot replaces the opponent model
//!    wholesale; "no data yet" keeps the previous one. Every
//!    `ready_poll_interval` it also re-checks the room: if the opponent has
//!    left (room back to `Waiting`, opponent not ready), the opponent model
//!    is cleared, the status turns [`SyncStatus::OpponentLeft`] and the
//!    task exits.
//!
//! The game loop never waits on the network: it reads the opponent model
//! and the [`SyncStatus`] from `watch` receivers, and writes its own state
//! into a `watch` sender the task samples each cycle.
//!
//! A failed cycle is skipped. After `max_consecutive_failures` failures in
//! a row the status turns [`SyncStatus::Disconnected`]; the loop keeps
//! going and flips back on the next success.

use std::fmt;

use ringside_protocol::{PlayerId, ReadyState, RoomId, RoomStatus, StateSnapshot};
use ringside_tick::{TickConfig, Ticker};
use ringside_transport::Connector;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{ClientConfig, ClientError, CoordinatorClient};

/// Where the sync task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Ready, polling until the opponent is too.
    WaitingForOpponent,
    /// Exchanging snapshots at the sync rate.
    Synchronizing,
    /// Too many consecutive failed cycles; still retrying.
    Disconnected,
    /// The opponent left mid-match. The task has exited and the opponent
    /// model is empty.
    OpponentLeft,
    /// The task has exited.
    Stopped,
}

impl SyncStatus {
    /// Whether the task has exited.
    pub fn is_final(self) -> bool {
        matches!(self, Self::OpponentLeft | Self::Stopped)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForOpponent => write!(f, "WaitingForOpponent"),
            Self::Synchronizing => write!(f, "Synchronizing"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::OpponentLeft => write!(f, "OpponentLeft"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Handle to a running sync task.
///
/// Dropping it (or calling [`quit`](Self::quit)) stops the task and sends
/// a best-effort `LeaveRoom` without waiting for the reply.
pub struct SyncHandle {
    status_rx: watch::Receiver<SyncStatus>,
    opponent_rx: watch::Receiver<Option<StateSnapshot>>,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    leave: Option<Box<dyn FnOnce() + Send>>,
}

impl SyncHandle {
    /// Current status.
    pub fn status(&self) -> SyncStatus {
        *self.status_rx.borrow()
    }

    /// A receiver for status changes.
    pub fn status_watch(&self) -> watch::Receiver<SyncStatus> {
        self.status_rx.clone()
    }

    /// The latest opponent snapshot, if any has arrived.
    pub fn opponent(&self) -> Option<StateSnapshot> {
        self.opponent_rx.borrow().clone()
    }

    /// A receiver for opponent model updates.
    pub fn opponent_watch(&self) -> watch::Receiver<Option<StateSnapshot>> {
        self.opponent_rx.clone()
    }

    /// `Ok` while the task is waiting or synchronizing.
    pub fn health(&self) -> Result<(), ClientError> {
        match self.status() {
            SyncStatus::WaitingForOpponent | SyncStatus::Synchronizing => Ok(()),
            SyncStatus::Disconnected => Err(ClientError::Disconnected),
            SyncStatus::OpponentLeft => Err(ClientError::OpponentLeft),
            SyncStatus::Stopped => Err(ClientError::Stopped),
        }
    }

    /// Waits until the status equals `want`.
    ///
    /// # Errors
    /// [`ClientError::OpponentLeft`] or [`ClientError::Stopped`] if the
    /// task exits first.
    pub async fn wait_for(&self, want: SyncStatus) -> Result<(), ClientError> {
        let mut rx = self.status_rx.clone();
        let seen = rx
            .wait_for(|s| *s == want || s.is_final())
            .await
            .map(|s| *s)
            .unwrap_or(SyncStatus::Stopped);
        match seen {
            s if s == want => Ok(()),
            SyncStatus::OpponentLeft => Err(ClientError::OpponentLeft),
            _ => Err(ClientError::Stopped),
        }
    }

    /// Stops the task and leaves the room in the background.
    pub fn quit(self) {
        drop(self);
    }

    /// Stops the task and waits for it to exit. Still leaves the room in
    /// the background.
    pub async fn shutdown(mut self) {
        self.stop_tx.send_replace(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
        if let Some(leave) = self.leave.take() {
            leave();
        }
    }
}

/// Spawns the sync task. Must be called inside a Tokio runtime.
pub(crate) fn spawn<C: Connector>(
    client: CoordinatorClient<C>,
    config: &ClientConfig,
    room_id: RoomId,
    player_id: PlayerId,
    local_rx: watch::Receiver<StateSnapshot>,
) -> SyncHandle {
    let (status_tx, status_rx) = watch::channel(SyncStatus::WaitingForOpponent);
    let (opponent_tx, opponent_rx) = watch::channel(None);
    let (stop_tx, stop_rx) = watch::channel(false);

    let sync = SyncLoop {
        client: client.clone(),
        config: config.clone(),
        room_id: room_id.clone(),
        player_id: player_id.clone(),
        local_rx,
        status_tx,
        opponent_tx,
        failures: 0,
    };
    let task = tokio::spawn(sync.run(stop_rx));

    let leave = move || {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        runtime.spawn(async move {
            match client.leave_room(&room_id, &player_id).await {
                Ok(left) => tracing::debug!(%room_id, room_removed = left.room_removed, "left room"),
                Err(e) => tracing::debug!(%room_id, error = %e, "leave request failed"),
            }
        });
    };

    SyncHandle {
        status_rx,
        opponent_rx,
        stop_tx,
        task: Some(task),
        leave: Some(Box::new(leave)),
    }
}

struct SyncLoop<C> {
    client: CoordinatorClient<C>,
    config: ClientConfig,
    room_id: RoomId,
    player_id: PlayerId,
    local_rx: watch::Receiver<StateSnapshot>,
    status_tx: watch::Sender<SyncStatus>,
    opponent_tx: watch::Sender<Option<StateSnapshot>>,
    failures: u32,
}

impl<C: Connector> SyncLoop<C> {
    async fn run(mut self, mut stop_rx: watch::Receiver<bool>) {
        let room_id = self.room_id.clone();
        let last = tokio::select! {
            biased;
            _ = stop_rx.wait_for(|stop| *stop) => SyncStatus::Stopped,
            () = self.drive() => SyncStatus::OpponentLeft,
        };
        if last == SyncStatus::OpponentLeft {
            self.opponent_tx.send_replace(None);
        }
        self.status_tx.send_replace(last);
        tracing::debug!(%room_id, status = %last, "sync task stopped");
    }

    /// Runs both phases. Returns only when the opponent has left.
    async fn drive(&mut self) {
        let poll = self.config.ready_poll_interval;
        let mut ticker = Ticker::new(TickConfig::every(poll).with_jitter(poll / 4));
        loop {
            ticker.wait_for_tick().await;
            let result = self
                .client
                .check_opponent_ready(&self.room_id, &self.player_id)
                .await;
            match result {
                Ok(state) if state.opponent_ready => {
                    tracing::info!(room_id = %self.room_id, round = state.round, "opponent ready, synchronizing");
                    break;
                }
                Ok(_) => self.succeeded(SyncStatus::WaitingForOpponent),
                Err(e) => self.failed(&e),
            }
        }

        self.failures = 0;
        self.status_tx.send_replace(SyncStatus::Synchronizing);

        let mut sync = Ticker::new(TickConfig::every(self.config.sync_interval));
        let mut presence = Ticker::new(TickConfig::every(poll).delayed_start());
        loop {
            tokio::select! {
                biased;
                info = sync.wait_for_tick() => {
                    if info.overrun {
                        tracing::trace!(room_id = %self.room_id, tick = info.tick, "sync cycle ran past its period");
                    }
                    match self.exchange().await {
                        Ok(()) => self.succeeded(SyncStatus::Synchronizing),
                        Err(e) => self.failed(&e),
                    }
                }
                _ = presence.wait_for_tick() => {
                    let result = self
                        .client
                        .check_opponent_ready(&self.room_id, &self.player_id)
                        .await;
                    match result {
                        Ok(state) if opponent_left(&state) => {
                            tracing::info!(room_id = %self.room_id, round = state.round, "opponent left the room");
                            return;
                        }
                        Ok(_) => self.succeeded(SyncStatus::Synchronizing),
                        Err(e) => self.failed(&e),
                    }
                }
            }
        }
    }

    /// One push/pull cycle.
    async fn exchange(&mut self) -> Result<(), ClientError> {
        let local = self.local_rx.borrow_and_update().clone();
        self.client
            .update_state(&self.room_id, &self.player_id, local)
            .await?;
        let opponent = self
            .client
            .get_opponent_state(&self.room_id, &self.player_id)
            .await?;
        if let Some(snapshot) = opponent {
            self.opponent_tx.send_replace(Some(snapshot));
        }
        Ok(())
    }

    fn succeeded(&mut self, phase: SyncStatus) {
        self.failures = 0;
        let previous = self.status_tx.send_replace(phase);
        if previous == SyncStatus::Disconnected {
            tracing::info!(room_id = %self.room_id, status = %phase, "coordinator reachable again");
        }
    }

    fn failed(&mut self, error: &ClientError) {
        self.failures = self.failures.saturating_add(1);
        tracing::debug!(room_id = %self.room_id, failures = self.failures, error = %error, "sync cycle failed");
        if self.failures == self.config.max_consecutive_failures {
            self.status_tx.send_replace(SyncStatus::Disconnected);
            tracing::warn!(
                room_id = %self.room_id,
                failures = self.failures,
                "coordinator unreachable, still retrying"
            );
        }
    }
}

/// A departure resets the room to `Waiting` with the remaining player not
/// ready. A finished round shows up as `Finished` instead.
fn opponent_left(state: &ReadyState) -> bool {
    state.room_status == RoomStatus::Waiting && !state.opponent_ready
}
