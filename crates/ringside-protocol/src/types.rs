//! Core protocol types shared by the coordinator and its clients.
//!
//! Everything here travels "on the wire": identifiers, the room status
//! enum, and the [`StateSnapshot`] that two peers exchange twenty times a
//! second during a match.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The short token that names a room, e.g. `"k3x9qa"`.
///
/// Room ids are generated by the registry and are the only handle a client
/// ever has on a room. They are shared out-of-band (read aloud, pasted in
/// chat), which is why they are short and lowercase.
///
/// `#[serde(transparent)]` serializes this as the bare string, not as
/// `{ "0": "k3x9qa" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Borrows the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque per-room player token, issued by `CreateRoom` / `JoinRoom`.
///
/// Every later request for that room must carry it. It is only meaningful
/// inside the room that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Borrows the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full tokens are 32 hex chars; logs only need enough to correlate.
        let short = self.0.get(..8).unwrap_or(&self.0);
        write!(f, "P-{short}")
    }
}

/// Client installation id, generated once per client process.
///
/// Used by the coordinator to refuse self-joins and to cap how many rooms
/// one caller may hold open at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(pub Uuid);

impl CallerId {
    /// Generates a fresh random caller id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0.simple())
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a room.
///
/// ```text
/// Waiting ──(both present and ready)──→ Playing ──(FinishMatch)──→ Finished
///    ↑                                                                 │
///    └──────────────────────(a player readies again)───────────────────┘
/// ```
///
/// Any state can end with the room being removed (both players left, or
/// the reaper judged it idle). Removal is not a status: the room is simply
/// gone from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RoomStatus {
    #[default]
    Waiting,
    Playing,
    Finished,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Playing => write!(f, "Playing"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// StateSnapshot
// ---------------------------------------------------------------------------

/// Which way a fighter is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// A 2D vector in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One player's complete combat state at an instant.
///
/// Snapshots are replicated last-writer-wins: each push replaces the
/// previous snapshot for that slot wholesale, and readers overwrite their
/// opponent model with whatever they pull. Because a snapshot is never a
/// delta, a lost or reordered push is corrected by the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub position: Vec2,
    pub velocity: Vec2,
    pub health: f32,
    pub stamina: f32,
    pub facing: Facing,
    /// Current action label, e.g. `"idle"`, `"light_punch"`.
    pub action: String,
    /// Animation frame index within `action`.
    pub frame: u32,
    pub attacking: bool,
    pub blocking: bool,
    pub airborne: bool,
}
