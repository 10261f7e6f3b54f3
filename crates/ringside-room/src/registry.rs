//! The session registry: every live room, keyed by room id.
//!
//! # Locking
//!
//! The map sits behind a `parking_lot::RwLock`; each room behind its own
//! `parking_lot::Mutex`. Per-room operations hold the read lock only long
//! enough to clone the entry's `Arc`, then work under the room mutex, so
//! two matches never wait on each other. Creating and removing rooms take
//! the write lock.
//!
//! Lock order is always map, then room. An operation that empties a room
//! marks the entry closed under the room mutex, releases it, and only then
//! takes the write lock to unlink it. Requests that grabbed the `Arc`
//! before the unlink see the closed flag and report `NotFound`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use ringside_protocol::{
    CallerId, PlayerId, ReadyState, RegistryStats, RoomCreated, RoomId, RoomJoined, RoomLeft,
    RoomStatus, StateSnapshot, validate_label,
};
use tokio::time::Instant;

use crate::room::{Departure, Room, RoomInfo, Slot};
use crate::{RegistryConfig, RoomError};

/// A room plus the flag set once it has been removed.
#[derive(Debug)]
struct RoomEntry {
    closed: AtomicBool,
    room: Mutex<Room>,
}

impl RoomEntry {
    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

/// Owns every room. Share it as `Arc<RoomRegistry>`.
#[derive(Debug)]
pub struct RoomRegistry {
    config: RegistryConfig,
    rooms: RwLock<HashMap<RoomId, Arc<RoomEntry>>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// The registry's configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Opens a room with the caller in the host slot.
    ///
    /// # Errors
    /// - [`RoomError::InvalidInput`] for an empty or overlong name/fighter.
    /// - [`RoomError::CapacityExceeded`] if `caller` already hosts
    ///   `max_rooms_per_caller` open rooms. A promoted guest's rooms count
    ///   against the guest's caller, not the departed creator's.
    pub fn create_room(
        &self,
        player_name: &str,
        fighter: &str,
        caller: CallerId,
    ) -> Result<RoomCreated, RoomError> {
        validate_label("playerName", player_name)?;
        validate_label("fighterSelection", fighter)?;

        let now = Instant::now();
        let player_id = generate_token();
        let mut rooms = self.rooms.write();

        let open = rooms
            .values()
            .filter(|e| e.is_open() && e.room.lock().host_caller() == Some(caller))
            .count();
        if open >= self.config.max_rooms_per_caller {
            tracing::warn!(%caller, open, "room creation rejected, caller at capacity");
            return Err(RoomError::CapacityExceeded {
                caller,
                limit: self.config.max_rooms_per_caller,
            });
        }

        let room_id = loop {
            let candidate = generate_room_id(self.config.room_id_len);
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let host = Slot::new(
            player_id.clone(),
            caller,
            player_name.to_string(),
            fighter.to_string(),
            now,
        );
        rooms.insert(
            room_id.clone(),
            Arc::new(RoomEntry {
                closed: AtomicBool::new(false),
                room: Mutex::new(Room::new(room_id.clone(), host, now)),
            }),
        );

        tracing::info!(%room_id, %player_id, %caller, "room created");
        Ok(RoomCreated { room_id, player_id })
    }

    /// Seats the caller in the room's join slot.
    ///
    /// # Errors
    /// Checked in order: [`RoomError::NotFound`], [`RoomError::SelfJoin`],
    /// [`RoomError::RoomFull`]. Input is validated first.
    pub fn join_room(
        &self,
        room_id: &RoomId,
        player_name: &str,
        fighter: &str,
        caller: CallerId,
    ) -> Result<RoomJoined, RoomError> {
        validate_label("playerName", player_name)?;
        validate_label("fighterSelection", fighter)?;

        let player_id = generate_token();
        let joined = self.with_room(room_id, |room, now| {
            let guest = Slot::new(
                player_id.clone(),
                caller,
                player_name.to_string(),
                fighter.to_string(),
                now,
            );
            room.join(guest, now)
        })?;

        tracing::info!(%room_id, %player_id, %caller, "player joined room");
        Ok(joined)
    }

    /// Sets or clears the player's ready flag.
    pub fn set_ready(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
        ready: bool,
    ) -> Result<ReadyState, RoomError> {
        let (state, started) =
            self.with_room(room_id, |room, now| room.set_ready(player_id, ready, now))?;

        tracing::debug!(%room_id, %player_id, ready, "ready flag set");
        if started {
            tracing::info!(%room_id, round = state.round, "match started");
        }
        Ok(state)
    }

    /// Reports whether the other slot is ready.
    pub fn check_opponent_ready(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> Result<ReadyState, RoomError> {
        self.with_room(room_id, |room, now| room.check_opponent_ready(player_id, now))
    }

    /// Replaces the player's stored snapshot.
    pub fn update_state(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
        snapshot: StateSnapshot,
    ) -> Result<(), RoomError> {
        self.with_room(room_id, |room, now| room.update_state(player_id, snapshot, now))
    }

    /// The other slot's stored snapshot; `None` means no data yet.
    pub fn get_opponent_state(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> Result<Option<StateSnapshot>, RoomError> {
        self.with_room(room_id, |room, now| room.opponent_state(player_id, now))
    }

    /// Vacates the player's slot, removing the room if it is now empty.
    pub fn leave_room(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<RoomLeft, RoomError> {
        let entry = self.entry(room_id)?;
        let departure = {
            let mut room = entry.room.lock();
            if !entry.is_open() {
                return Err(RoomError::NotFound(room_id.clone()));
            }
            let departure = room.leave(player_id, Instant::now())?;
            if departure == Departure::Emptied {
                entry.closed.store(true, Ordering::Release);
            }
            departure
        };

        tracing::info!(%room_id, %player_id, "player left room");
        let room_removed = departure == Departure::Emptied;
        if room_removed {
            self.unlink(room_id, &entry);
            tracing::info!(%room_id, "room removed, last player left");
        }
        Ok(RoomLeft { room_removed })
    }

    /// Ends the current round. A no-op outside `Playing`.
    pub fn finish_match(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<(), RoomError> {
        let finished = self.with_room(room_id, |room, now| room.finish(player_id, now))?;
        if finished {
            tracing::info!(%room_id, %player_id, "match finished");
        }
        Ok(())
    }

    /// Removes every room idle for longer than `idle_timeout`, whatever its
    /// status. Returns the removed ids.
    pub fn reap_idle(&self, idle_timeout: Duration) -> Vec<RoomId> {
        let now = Instant::now();
        let mut reaped = Vec::new();
        let mut rooms = self.rooms.write();

        rooms.retain(|room_id, entry| {
            let room = entry.room.lock();
            let idle_for = now.saturating_duration_since(room.last_activity_at());
            if idle_for <= idle_timeout {
                return true;
            }
            entry.closed.store(true, Ordering::Release);
            tracing::info!(
                %room_id,
                status = %room.status(),
                idle_secs = idle_for.as_secs(),
                "reaped idle room"
            );
            reaped.push(room_id.clone());
            false
        });
        reaped
    }

    /// Registry-wide counters.
    pub fn stats(&self) -> RegistryStats {
        let rooms = self.rooms.read();
        let mut stats = RegistryStats::default();
        for entry in rooms.values().filter(|e| e.is_open()) {
            let room = entry.room.lock();
            stats.rooms += 1;
            stats.players += room.occupied();
            match room.status() {
                RoomStatus::Waiting => stats.waiting += 1,
                RoomStatus::Playing => stats.playing += 1,
                RoomStatus::Finished => stats.finished += 1,
            }
        }
        stats
    }

    /// Metadata for one room. Does not count as activity.
    pub fn room_info(&self, room_id: &RoomId) -> Result<RoomInfo, RoomError> {
        let entry = self.entry(room_id)?;
        let room = entry.room.lock();
        if !entry.is_open() {
            return Err(RoomError::NotFound(room_id.clone()));
        }
        Ok(room.info(Instant::now()))
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    /// Whether `room_id` is currently registered.
    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.read().contains_key(room_id)
    }

    // -- internals --------------------------------------------------------

    fn entry(&self, room_id: &RoomId) -> Result<Arc<RoomEntry>, RoomError> {
        self.rooms
            .read()
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Runs `f` on an open room under its mutex.
    fn with_room<T>(
        &self,
        room_id: &RoomId,
        f: impl FnOnce(&mut Room, Instant) -> Result<T, RoomError>,
    ) -> Result<T, RoomError> {
        let entry = self.entry(room_id)?;
        let mut room = entry.room.lock();
        if !entry.is_open() {
            return Err(RoomError::NotFound(room_id.clone()));
        }
        f(&mut room, Instant::now())
    }

    /// Drops `entry` from the map if it is still the one registered under
    /// `room_id`.
    fn unlink(&self, room_id: &RoomId, entry: &Arc<RoomEntry>) {
        let mut rooms = self.rooms.write();
        if rooms.get(room_id).is_some_and(|current| Arc::ptr_eq(current, entry)) {
            rooms.remove(room_id);
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

/// Generates a 32-character hex player token (128 random bits).
fn generate_token() -> PlayerId {
    let bytes: [u8; 16] = rand::rng().random();
    PlayerId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

/// Generates a room id of `len` characters from the room id alphabet.
fn generate_room_id(len: usize) -> RoomId {
    let alphabet = RegistryConfig::ROOM_ID_ALPHABET;
    let mut rng = rand::rng();
    let id = (0..len)
        .map(|_| char::from(alphabet[rng.random_range(0..alphabet.len())]))
        .collect();
    RoomId(id)
}
