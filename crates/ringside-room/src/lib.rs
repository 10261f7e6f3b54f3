//! Room registry for Ringside.
//!
//! The coordinator's only state: a map of short room ids to two-slot match
//! rooms, each with its own readiness state machine and the last snapshot
//! each player pushed. Everything is in memory and lost on restart.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: create, join, ready, sync, leave, reap
//! - [`RegistryConfig`]: per-caller cap, idle timeout, id length
//! - [`RoomInfo`]: read-only room metadata
//! - [`RoomError`]: failures, each mapped to a wire error code

mod config;
mod error;
mod registry;
mod room;

pub use config::RegistryConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::RoomInfo;
