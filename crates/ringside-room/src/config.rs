//! Registry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for a [`RoomRegistry`](crate::RoomRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// How many open rooms one caller may have created at a time. A create
    /// beyond this is rejected with `CapacityExceeded`; nothing is evicted.
    pub max_rooms_per_caller: usize,

    /// Rooms with no activity for longer than this are removed by the
    /// reaper, whatever their status.
    pub idle_timeout: Duration,

    /// Length of generated room ids.
    pub room_id_len: usize,
}

impl RegistryConfig {
    /// Characters room ids are drawn from.
    pub const ROOM_ID_ALPHABET: &'static [u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_rooms_per_caller: 3,
            idle_timeout: Duration::from_secs(300),
            room_id_len: 6,
        }
    }
}
