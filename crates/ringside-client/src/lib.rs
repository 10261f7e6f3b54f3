//! Client side of Ringside.
//!
//! A game client uses this crate to get from "I want to play" to a running
//! state exchange with its opponent:
//!
//! 1. **Setup**: [`MatchSession::host`] creates a room, [`MatchSession::join`]
//!    takes the second seat of a room whose id was shared out of band.
//! 2. **Rendezvous**: [`MatchSession::ready`], then [`MatchSession::start`]
//!    spawns the task that waits for the opponent.
//! 3. **Sync**: the same task pushes the local snapshot and pulls the
//!    opponent's at a fixed rate. The game reads the result through the
//!    [`SyncHandle`] without ever blocking on the network.
//!
//! [`LivenessProber`] runs beside it and reports round-trip latency.
//!
//! ```text
//! game loop ──watch──→ sync task ──Connector──→ coordinator
//!     ↑                    │
//!     └──────watch─────────┘  (opponent snapshot, SyncStatus)
//! ```

mod config;
mod error;
mod probe;
mod rpc;
mod session;
mod sync;

pub use config::ClientConfig;
pub use error::ClientError;
pub use probe::{LivenessProber, probe_once};
pub use rpc::CoordinatorClient;
pub use session::{HostDetails, MatchSession, PlayerProfile, Role};
pub use sync::{SyncHandle, SyncStatus};
