//! Match setup: create or join a room, declare readiness, start syncing.
//!
//! ```text
//!   host / join ──→ ready ──→ start ──→ SyncHandle
//!        │            │
//!        └── errors surface to the caller immediately
//! ```

use ringside_protocol::{CallerId, PlayerId, ReadyState, RoomId, RoomLeft, StateSnapshot};
use ringside_transport::Connector;
use tokio::sync::watch;

use crate::sync::{self, SyncHandle};
use crate::{ClientConfig, ClientError, CoordinatorClient};

/// Who this client is, as sent on create and join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    pub name: String,
    pub fighter: String,
    pub caller: CallerId,
}

impl PlayerProfile {
    /// A profile with a freshly generated caller id.
    pub fn new(name: impl Into<String>, fighter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fighter: fighter.into(),
            caller: CallerId::random(),
        }
    }
}

/// Which slot this client occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

/// What a joining player learns about the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDetails {
    pub name: String,
    pub fighter: String,
    pub caller: CallerId,
}

/// A seat in a room, before the sync loop starts.
#[derive(Debug)]
pub struct MatchSession<C> {
    client: CoordinatorClient<C>,
    config: ClientConfig,
    room_id: RoomId,
    player_id: PlayerId,
    role: Role,
    host: Option<HostDetails>,
}

impl<C: Connector> MatchSession<C> {
    /// Creates a room and takes its host slot.
    pub async fn host(
        client: CoordinatorClient<C>,
        config: ClientConfig,
        profile: &PlayerProfile,
    ) -> Result<Self, ClientError> {
        let created = client
            .create_room(&profile.name, &profile.fighter, profile.caller)
            .await?;
        tracing::info!(room_id = %created.room_id, "hosting room");
        Ok(Self {
            client,
            config,
            room_id: created.room_id,
            player_id: created.player_id,
            role: Role::Host,
            host: None,
        })
    }

    /// Joins an existing room by id.
    pub async fn join(
        client: CoordinatorClient<C>,
        config: ClientConfig,
        room_id: RoomId,
        profile: &PlayerProfile,
    ) -> Result<Self, ClientError> {
        let joined = client
            .join_room(&room_id, &profile.name, &profile.fighter, profile.caller)
            .await?;
        tracing::info!(%room_id, host = %joined.host_name, "joined room");
        Ok(Self {
            client,
            config,
            room_id,
            player_id: joined.player_id,
            role: Role::Guest,
            host: Some(HostDetails {
                name: joined.host_name,
                fighter: joined.host_fighter,
                caller: joined.host_caller,
            }),
        })
    }

    /// Joins `room_id` if given, otherwise hosts a new room.
    pub async fn open(
        client: CoordinatorClient<C>,
        config: ClientConfig,
        room_id: Option<RoomId>,
        profile: &PlayerProfile,
    ) -> Result<Self, ClientError> {
        match room_id {
            Some(room_id) => Self::join(client, config, room_id, profile).await,
            None => Self::host(client, config, profile).await,
        }
    }

    /// Marks this player ready.
    pub async fn ready(&self) -> Result<ReadyState, ClientError> {
        self.client
            .set_ready(&self.room_id, &self.player_id, true)
            .await
    }

    /// Clears this player's ready flag.
    pub async fn unready(&self) -> Result<ReadyState, ClientError> {
        self.client
            .set_ready(&self.room_id, &self.player_id, false)
            .await
    }

    /// Ends the current round.
    pub async fn finish_match(&self) -> Result<(), ClientError> {
        self.client.finish_match(&self.room_id, &self.player_id).await
    }

    /// Spawns the sync task, sampling local state from `local`.
    ///
    /// The handle owns the seat from here on: dropping it leaves the room.
    pub fn start(self, local: watch::Receiver<StateSnapshot>) -> SyncHandle {
        sync::spawn(
            self.client,
            &self.config,
            self.room_id,
            self.player_id,
            local,
        )
    }

    /// Leaves the room and waits for the answer.
    pub async fn leave(self) -> Result<RoomLeft, ClientError> {
        self.client.leave_room(&self.room_id, &self.player_id).await
    }

    /// The room id, to share with the opponent.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The host's details; `None` when this client is the host.
    pub fn host_details(&self) -> Option<&HostDetails> {
        self.host.as_ref()
    }

    /// The underlying coordinator client.
    pub fn client(&self) -> &CoordinatorClient<C> {
        &self.client
    }
}
