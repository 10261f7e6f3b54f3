//! Typed calls against the coordinator.
//!
//! Every method is one request on a fresh connection, bounded by the
//! request timeout. The reply is decoded as the payload type of the action
//! that was sent; a server error document becomes [`ClientError::Server`].

use std::sync::Arc;
use std::time::Duration;

use ringside_protocol::{
    Ack, CallerId, Codec, JsonCodec, OpponentState, PlayerId, ReadyState, Request, Response,
    RoomCreated, RoomId, RoomJoined, RoomLeft, StateSnapshot,
};
use ringside_transport::Connector;
use serde::de::DeserializeOwned;

use crate::ClientError;

/// A handle for issuing coordinator requests. Cheap to clone.
#[derive(Debug)]
pub struct CoordinatorClient<C> {
    connector: Arc<C>,
    addr: Arc<str>,
    timeout: Duration,
    codec: JsonCodec,
}

impl<C> Clone for CoordinatorClient<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            addr: Arc::clone(&self.addr),
            timeout: self.timeout,
            codec: self.codec,
        }
    }
}

impl<C: Connector> CoordinatorClient<C> {
    /// Creates a client that talks to the coordinator at `addr`.
    pub fn new(connector: C, addr: impl Into<String>, timeout: Duration) -> Self {
        let addr: String = addr.into();
        Self {
            connector: Arc::new(connector),
            addr: Arc::from(addr),
            timeout,
            codec: JsonCodec,
        }
    }

    /// The coordinator address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The per-request deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call<T: DeserializeOwned>(&self, request: &Request) -> Result<T, ClientError> {
        let bytes = self.codec.encode(request)?;
        let reply = tokio::time::timeout(self.timeout, self.connector.exchange(&self.addr, &bytes))
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))??;
        let response: Response<T> = self.codec.decode(&reply)?;
        Ok(response.into_result()?)
    }

    pub async fn create_room(
        &self,
        player_name: &str,
        fighter: &str,
        caller: CallerId,
    ) -> Result<RoomCreated, ClientError> {
        self.call(&Request::CreateRoom {
            player_name: player_name.to_string(),
            fighter: fighter.to_string(),
            caller,
        })
        .await
    }

    pub async fn join_room(
        &self,
        room_id: &RoomId,
        player_name: &str,
        fighter: &str,
        caller: CallerId,
    ) -> Result<RoomJoined, ClientError> {
        self.call(&Request::JoinRoom {
            room_id: room_id.clone(),
            player_name: player_name.to_string(),
            fighter: fighter.to_string(),
            caller,
        })
        .await
    }

    pub async fn set_ready(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
        ready: bool,
    ) -> Result<ReadyState, ClientError> {
        self.call(&Request::SetReady {
            room_id: room_id.clone(),
            player_id: player_id.clone(),
            ready,
        })
        .await
    }

    pub async fn check_opponent_ready(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> Result<ReadyState, ClientError> {
        self.call(&Request::CheckOpponentReady {
            room_id: room_id.clone(),
            player_id: player_id.clone(),
        })
        .await
    }

    pub async fn update_state(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
        snapshot: StateSnapshot,
    ) -> Result<(), ClientError> {
        let Ack {} = self
            .call(&Request::UpdateState {
                room_id: room_id.clone(),
                player_id: player_id.clone(),
                snapshot,
            })
            .await?;
        Ok(())
    }

    /// The opponent's latest snapshot; `None` if there is none yet.
    pub async fn get_opponent_state(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> Result<Option<StateSnapshot>, ClientError> {
        let reply: OpponentState = self
            .call(&Request::GetOpponentState {
                room_id: room_id.clone(),
                player_id: player_id.clone(),
            })
            .await?;
        Ok(reply.opponent_state)
    }

    pub async fn leave_room(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> Result<RoomLeft, ClientError> {
        self.call(&Request::LeaveRoom {
            room_id: room_id.clone(),
            player_id: player_id.clone(),
        })
        .await
    }

    pub async fn finish_match(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<(), ClientError> {
        let Ack {} = self
            .call(&Request::FinishMatch {
                room_id: room_id.clone(),
                player_id: player_id.clone(),
            })
            .await?;
        Ok(())
    }
}
