//! A single match room: two slots and the readiness state machine.
//!
//! `Room` is plain data with synchronous methods. It knows nothing about
//! locking; the registry wraps each room in its own mutex and passes the
//! current time in, so every transition here is deterministic.

use std::time::Duration;

use ringside_protocol::{
    CallerId, PlayerId, ReadyState, RoomId, RoomJoined, RoomStatus, StateSnapshot,
};
use tokio::time::Instant;

use crate::RoomError;

/// One occupied player slot.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub(crate) player_id: PlayerId,
    pub(crate) caller: CallerId,
    pub(crate) player_name: String,
    pub(crate) fighter: String,
    pub(crate) ready: bool,
    pub(crate) last_active_at: Instant,
    pub(crate) snapshot: Option<StateSnapshot>,
}

impl Slot {
    pub(crate) fn new(
        player_id: PlayerId,
        caller: CallerId,
        player_name: String,
        fighter: String,
        now: Instant,
    ) -> Self {
        Self {
            player_id,
            caller,
            player_name,
            fighter,
            ready: false,
            last_active_at: now,
            snapshot: None,
        }
    }

    /// Back to a fresh arrival: not ready, nothing pushed.
    fn reset(&mut self) {
        self.ready = false;
        self.snapshot = None;
    }
}

/// Which of the two slots a player holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Host,
    Guest,
}

impl Side {
    fn other(self) -> Self {
        match self {
            Self::Host => Self::Guest,
            Self::Guest => Self::Host,
        }
    }
}

/// What `leave` did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Departure {
    /// One player remains.
    Vacated,
    /// Nobody is left; the room must be removed.
    Emptied,
}

/// A snapshot of room metadata, for tooling and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub status: RoomStatus,
    pub round: u32,
    /// Occupied slots (0–2; 0 only for a room about to be removed).
    pub players: usize,
    pub host_name: Option<String>,
    pub guest_name: Option<String>,
    pub host_ready: bool,
    pub guest_ready: bool,
    pub age: Duration,
    pub idle_for: Duration,
}

/// A two-slot match room.
#[derive(Debug)]
pub(crate) struct Room {
    id: RoomId,
    host: Option<Slot>,
    guest: Option<Slot>,
    status: RoomStatus,
    round: u32,
    created_at: Instant,
    last_activity_at: Instant,
}

impl Room {
    /// Opens a room with `host` in the host slot.
    pub(crate) fn new(id: RoomId, host: Slot, now: Instant) -> Self {
        Self {
            id,
            host: Some(host),
            guest: None,
            status: RoomStatus::Waiting,
            round: 0,
            created_at: now,
            last_activity_at: now,
        }
    }

    pub(crate) fn status(&self) -> RoomStatus {
        self.status
    }

    /// The caller currently holding the host slot.
    pub(crate) fn host_caller(&self) -> Option<CallerId> {
        self.host.as_ref().map(|s| s.caller)
    }

    pub(crate) fn occupied(&self) -> usize {
        usize::from(self.host.is_some()) + usize::from(self.guest.is_some())
    }

    pub(crate) fn last_activity_at(&self) -> Instant {
        self.last_activity_at
    }

    fn slot(&self, side: Side) -> Option<&Slot> {
        match side {
            Side::Host => self.host.as_ref(),
            Side::Guest => self.guest.as_ref(),
        }
    }

    fn slot_mut(&mut self, side: Side) -> Option<&mut Slot> {
        match side {
            Side::Host => self.host.as_mut(),
            Side::Guest => self.guest.as_mut(),
        }
    }

    /// Which slot `player_id` holds.
    pub(crate) fn side_of(&self, player_id: &PlayerId) -> Result<Side, RoomError> {
        if self.host.as_ref().is_some_and(|s| &s.player_id == player_id) {
            Ok(Side::Host)
        } else if self.guest.as_ref().is_some_and(|s| &s.player_id == player_id) {
            Ok(Side::Guest)
        } else {
            Err(RoomError::PlayerNotFound(player_id.clone(), self.id.clone()))
        }
    }

    /// Resolves the player and records activity, for every player-addressed
    /// operation.
    fn touch(&mut self, player_id: &PlayerId, now: Instant) -> Result<Side, RoomError> {
        let side = self.side_of(player_id)?;
        self.last_activity_at = now;
        if let Some(slot) = self.slot_mut(side) {
            slot.last_active_at = now;
        }
        Ok(side)
    }

    fn ready_state(&self, side: Side) -> ReadyState {
        ReadyState {
            opponent_ready: self.slot(side.other()).is_some_and(|s| s.ready),
            round: self.round,
            room_status: self.status,
        }
    }

    /// Seats `guest` in the join slot.
    ///
    /// Checks self-join before fullness, so a host retrying its own code
    /// always hears `SelfJoin`.
    pub(crate) fn join(&mut self, guest: Slot, now: Instant) -> Result<RoomJoined, RoomError> {
        let Some(host) = self.host.as_ref() else {
            return Err(RoomError::NotFound(self.id.clone()));
        };
        if host.caller == guest.caller {
            return Err(RoomError::SelfJoin(self.id.clone()));
        }
        if self.guest.is_some() {
            return Err(RoomError::RoomFull(self.id.clone()));
        }

        let joined = RoomJoined {
            player_id: guest.player_id.clone(),
            host_fighter: host.fighter.clone(),
            host_caller: host.caller,
            host_name: host.player_name.clone(),
        };
        self.guest = Some(guest);
        self.last_activity_at = now;
        Ok(joined)
    }

    /// Sets the player's ready flag and starts the round when both are in.
    ///
    /// Returns the new state and whether this call started a round.
    pub(crate) fn set_ready(
        &mut self,
        player_id: &PlayerId,
        ready: bool,
        now: Instant,
    ) -> Result<(ReadyState, bool), RoomError> {
        let side = self.touch(player_id, now)?;

        if ready && self.status == RoomStatus::Finished {
            self.status = RoomStatus::Waiting;
        }
        if let Some(slot) = self.slot_mut(side) {
            slot.ready = ready;
        }

        let both_ready = matches!(
            (&self.host, &self.guest),
            (Some(h), Some(g)) if h.ready && g.ready
        );
        let started = both_ready && self.status != RoomStatus::Playing;
        if started {
            self.status = RoomStatus::Playing;
            self.round += 1;
        }
        Ok((self.ready_state(side), started))
    }

    pub(crate) fn check_opponent_ready(
        &mut self,
        player_id: &PlayerId,
        now: Instant,
    ) -> Result<ReadyState, RoomError> {
        let side = self.touch(player_id, now)?;
        Ok(self.ready_state(side))
    }

    /// Replaces the player's snapshot wholesale.
    pub(crate) fn update_state(
        &mut self,
        player_id: &PlayerId,
        snapshot: StateSnapshot,
        now: Instant,
    ) -> Result<(), RoomError> {
        let side = self.touch(player_id, now)?;
        if let Some(slot) = self.slot_mut(side) {
            slot.snapshot = Some(snapshot);
        }
        Ok(())
    }

    /// The other slot's last snapshot, or `None` if it has not pushed one
    /// or is empty.
    pub(crate) fn opponent_state(
        &mut self,
        player_id: &PlayerId,
        now: Instant,
    ) -> Result<Option<StateSnapshot>, RoomError> {
        let side = self.touch(player_id, now)?;
        Ok(self
            .slot(side.other())
            .and_then(|slot| slot.snapshot.clone()))
    }

    /// Vacates the player's slot.
    ///
    /// A remaining guest is promoted to host. Whoever remains starts over:
    /// not ready, no snapshot, room back to `Waiting`.
    pub(crate) fn leave(&mut self, player_id: &PlayerId, now: Instant) -> Result<Departure, RoomError> {
        let side = self.touch(player_id, now)?;
        match side {
            Side::Host => self.host = self.guest.take(),
            Side::Guest => self.guest = None,
        }

        if let Some(remaining) = self.host.as_mut() {
            remaining.reset();
        }
        self.status = RoomStatus::Waiting;

        Ok(if self.occupied() == 0 {
            Departure::Emptied
        } else {
            Departure::Vacated
        })
    }

    /// Ends the current round. Returns `true` if a round was in progress.
    pub(crate) fn finish(&mut self, player_id: &PlayerId, now: Instant) -> Result<bool, RoomError> {
        self.touch(player_id, now)?;
        if self.status != RoomStatus::Playing {
            return Ok(false);
        }
        self.status = RoomStatus::Finished;
        for slot in [self.host.as_mut(), self.guest.as_mut()].into_iter().flatten() {
            slot.ready = false;
        }
        Ok(true)
    }

    pub(crate) fn info(&self, now: Instant) -> RoomInfo {
        RoomInfo {
            room_id: self.id.clone(),
            status: self.status,
            round: self.round,
            players: self.occupied(),
            host_name: self.host.as_ref().map(|s| s.player_name.clone()),
            guest_name: self.guest.as_ref().map(|s| s.player_name.clone()),
            host_ready: self.host.as_ref().is_some_and(|s| s.ready),
            guest_ready: self.guest.as_ref().is_some_and(|s| s.ready),
            age: now.saturating_duration_since(self.created_at),
            idle_for: now.saturating_duration_since(self.last_activity_at),
        }
    }
}
