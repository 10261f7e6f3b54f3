//! Request and response documents.
//!
//! Every exchange is one [`Request`] followed by one [`Response`] on a
//! fresh connection. Requests are internally tagged by `action`:
//!
//! ```json
//! { "action": "SetReady", "roomId": "k3x9qa", "playerId": "9f…", "ready": true }
//! ```
//!
//! Responses are internally tagged by `status`. On success the operation's
//! payload fields sit next to the tag; on failure a `code` and a `message`
//! do:
//!
//! ```json
//! { "status": "success", "opponentReady": true, "round": 1, "roomStatus": "Playing" }
//! { "status": "error", "code": "RoomFull", "message": "room k3x9qa is full" }
//! ```
//!
//! The client knows which action it sent, so it decodes the response as
//! `Response<T>` for that action's payload type `T`. The server encodes
//! `Response<Reply>`, where [`Reply`] is the untagged union of all payloads.

use serde::{Deserialize, Serialize};

use crate::{CallerId, PlayerId, RoomId, RoomStatus, StateSnapshot};

/// Token a liveness probe sends.
pub const PROBE_PING: &[u8] = b"PING";

/// Token the liveness listener answers with.
pub const PROBE_PONG: &[u8] = b"PONG";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A coordinator operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all_fields = "camelCase")]
pub enum Request {
    /// Open a new room with the caller in the host slot.
    CreateRoom {
        player_name: String,
        #[serde(rename = "fighterSelection")]
        fighter: String,
        #[serde(rename = "callerUUID")]
        caller: CallerId,
    },

    /// Take the join slot of an existing room.
    JoinRoom {
        room_id: RoomId,
        player_name: String,
        #[serde(rename = "fighterSelection")]
        fighter: String,
        #[serde(rename = "callerUUID")]
        caller: CallerId,
    },

    /// Set or clear the caller's ready flag.
    SetReady {
        room_id: RoomId,
        player_id: PlayerId,
        ready: bool,
    },

    /// Ask whether the other slot is ready.
    CheckOpponentReady { room_id: RoomId, player_id: PlayerId },

    /// Replace the caller's stored snapshot.
    UpdateState {
        room_id: RoomId,
        player_id: PlayerId,
        snapshot: StateSnapshot,
    },

    /// Fetch the other slot's stored snapshot.
    GetOpponentState { room_id: RoomId, player_id: PlayerId },

    /// Vacate the caller's slot.
    LeaveRoom { room_id: RoomId, player_id: PlayerId },

    /// End the current round (`Playing → Finished`).
    FinishMatch { room_id: RoomId, player_id: PlayerId },
}

impl Request {
    /// The `action` tag, for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "CreateRoom",
            Self::JoinRoom { .. } => "JoinRoom",
            Self::SetReady { .. } => "SetReady",
            Self::CheckOpponentReady { .. } => "CheckOpponentReady",
            Self::UpdateState { .. } => "UpdateState",
            Self::GetOpponentState { .. } => "GetOpponentState",
            Self::LeaveRoom { .. } => "LeaveRoom",
            Self::FinishMatch { .. } => "FinishMatch",
        }
    }

    /// The room this request addresses, if any.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::CreateRoom { .. } => None,
            Self::JoinRoom { room_id, .. }
            | Self::SetReady { room_id, .. }
            | Self::CheckOpponentReady { room_id, .. }
            | Self::UpdateState { room_id, .. }
            | Self::GetOpponentState { room_id, .. }
            | Self::LeaveRoom { room_id, .. }
            | Self::FinishMatch { room_id, .. } => Some(room_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Error codes the coordinator can send.
///
/// `Timeout` and `Disconnected` are absent on purpose: those are observed
/// by the client, never reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Unknown room, or unknown player within the room.
    NotFound,
    /// Both slots are occupied.
    RoomFull,
    /// The caller tried to join its own room.
    SelfJoin,
    /// The caller already holds the maximum number of open rooms.
    CapacityExceeded,
    /// The request could not be read, decoded, or validated.
    MalformedRequest,
}

/// The body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// A response document carrying either `T` or an [`ErrorBody`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response<T> {
    Success(T),
    Error(ErrorBody),
}

impl<T> Response<T> {
    /// Builds an error response.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorBody {
            code,
            message: message.into(),
        })
    }

    /// Converts into a `Result`, for `?` at call sites.
    pub fn into_result(self) -> Result<T, ErrorBody> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Error(body) => Err(body),
        }
    }
}

/// Payload of a successful `CreateRoom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreated {
    pub room_id: RoomId,
    pub player_id: PlayerId,
}

/// Payload of a successful `JoinRoom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoined {
    pub player_id: PlayerId,
    #[serde(rename = "hostFighterSelection")]
    pub host_fighter: String,
    #[serde(rename = "hostUUID")]
    pub host_caller: CallerId,
    pub host_name: String,
}

/// Payload of `SetReady` and `CheckOpponentReady`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyState {
    pub opponent_ready: bool,
    /// Number of rounds started in this room so far.
    pub round: u32,
    pub room_status: RoomStatus,
}

/// Payload of `GetOpponentState`.
///
/// `opponentState` is always present in the document: `null` means the
/// opponent has not pushed a snapshot yet, which is distinct from any real
/// snapshot (including an all-zero one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentState {
    pub opponent_state: Option<StateSnapshot>,
}

/// Payload of `LeaveRoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomLeft {
    /// `true` if this departure emptied the room and it was deleted.
    pub room_removed: bool,
}

/// Payload of operations with nothing to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Ack {}

/// Every success payload the coordinator can produce.
///
/// Serialize-only: untagged, so the fields land directly next to
/// `"status": "success"`. Clients decode the specific payload type instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Created(RoomCreated),
    Joined(RoomJoined),
    Ready(ReadyState),
    Opponent(OpponentState),
    Left(RoomLeft),
    Ack(Ack),
}

/// Registry-wide counters served on the stats listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RegistryStats {
    pub rooms: usize,
    pub waiting: usize,
    pub playing: usize,
    pub finished: usize,
    /// Occupied slots across all rooms.
    pub players: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Facing, Vec2};

    fn caller() -> CallerId {
        CallerId(uuid::Uuid::from_u128(0x1234))
    }

    #[test]
    fn test_create_room_request_json_format() {
        let req = Request::CreateRoom {
            player_name: "Ryu".into(),
            fighter: "karateka".into(),
            caller: caller(),
        };
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["action"], "CreateRoom");
        assert_eq!(json["playerName"], "Ryu");
        assert_eq!(json["fighterSelection"], "karateka");
        assert_eq!(json["callerUUID"], "00000000-0000-0000-0000-000000001234");
    }

    #[test]
    fn test_join_room_request_parses_from_wire() {
        let raw = r#"{
            "action": "JoinRoom",
            "roomId": "abc123",
            "playerName": "Ken",
            "fighterSelection": "brawler",
            "callerUUID": "00000000-0000-0000-0000-000000001234"
        }"#;
        let req: Request = serde_json::from_str(raw).unwrap();
        assert_eq!(
            req,
            Request::JoinRoom {
                room_id: RoomId::from("abc123"),
                player_name: "Ken".into(),
                fighter: "brawler".into(),
                caller: caller(),
            }
        );
        assert_eq!(req.action(), "JoinRoom");
        assert_eq!(req.room_id(), Some(&RoomId::from("abc123")));
    }

    #[test]
    fn test_set_ready_request_json_format() {
        let req = Request::SetReady {
            room_id: RoomId::from("abc123"),
            player_id: PlayerId("p1".into()),
            ready: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["action"], "SetReady");
        assert_eq!(json["roomId"], "abc123");
        assert_eq!(json["playerId"], "p1");
        assert_eq!(json["ready"], true);
    }

    #[test]
    fn test_update_state_request_round_trip() {
        let req = Request::UpdateState {
            room_id: RoomId::from("abc123"),
            player_id: PlayerId("p1".into()),
            snapshot: StateSnapshot {
                position: Vec2::new(10.0, 0.0),
                health: 100.0,
                facing: Facing::Left,
                action: "walk".into(),
                ..StateSnapshot::default()
            },
        };
        let bytes = serde_json::to_vec(&req).unwrap();
        let back: Request = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let raw = r#"{"action": "DeleteEverything", "roomId": "abc123"}"#;
        assert!(serde_json::from_str::<Request>(raw).is_err());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let raw = r#"{"action": "SetReady", "roomId": "abc123", "playerId": "p1"}"#;
        assert!(serde_json::from_str::<Request>(raw).is_err());
    }

    #[test]
    fn test_create_room_has_no_room_id() {
        let req = Request::CreateRoom {
            player_name: "Ryu".into(),
            fighter: "karateka".into(),
            caller: caller(),
        };
        assert_eq!(req.room_id(), None);
    }

    #[test]
    fn test_success_reply_fields_sit_next_to_status() {
        let resp: Response<Reply> = Response::Success(Reply::Created(RoomCreated {
            room_id: RoomId::from("abc123"),
            player_id: PlayerId("p1".into()),
        }));
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["roomId"], "abc123");
        assert_eq!(json["playerId"], "p1");
    }

    #[test]
    fn test_server_reply_decodes_as_client_payload() {
        let resp: Response<Reply> = Response::Success(Reply::Joined(RoomJoined {
            player_id: PlayerId("p2".into()),
            host_fighter: "karateka".into(),
            host_caller: caller(),
            host_name: "Ryu".into(),
        }));
        let bytes = serde_json::to_vec(&resp).unwrap();

        let decoded: Response<RoomJoined> = serde_json::from_slice(&bytes).unwrap();
        let joined = decoded.into_result().unwrap();
        assert_eq!(joined.host_fighter, "karateka");
        assert_eq!(joined.host_caller, caller());
    }

    #[test]
    fn test_join_reply_uses_wire_field_names() {
        let resp: Response<Reply> = Response::Success(Reply::Joined(RoomJoined {
            player_id: PlayerId("p2".into()),
            host_fighter: "karateka".into(),
            host_caller: caller(),
            host_name: "Ryu".into(),
        }));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["hostFighterSelection"], "karateka");
        assert_eq!(json["hostUUID"], "00000000-0000-0000-0000-000000001234");
        assert_eq!(json["hostName"], "Ryu");
    }

    #[test]
    fn test_error_response_json_format() {
        let resp: Response<Reply> = Response::error(ErrorCode::RoomFull, "room abc123 is full");
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "RoomFull");
        assert_eq!(json["message"], "room abc123 is full");
    }

    #[test]
    fn test_error_response_decodes_for_any_payload_type() {
        let bytes = br#"{"status":"error","code":"SelfJoin","message":"nope"}"#;
        let decoded: Response<RoomJoined> = serde_json::from_slice(bytes).unwrap();
        let err = decoded.into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::SelfJoin);
        assert_eq!(err.message, "nope");
    }

    #[test]
    fn test_opponent_state_absent_is_explicit_null() {
        let resp: Response<Reply> = Response::Success(Reply::Opponent(OpponentState {
            opponent_state: None,
        }));
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("opponentState").is_some());
        assert!(json["opponentState"].is_null());

        let decoded: Response<OpponentState> =
            serde_json::from_slice(&serde_json::to_vec(&resp).unwrap()).unwrap();
        assert_eq!(decoded.into_result().unwrap().opponent_state, None);
    }

    #[test]
    fn test_opponent_state_zero_snapshot_is_not_null() {
        let resp: Response<Reply> = Response::Success(Reply::Opponent(OpponentState {
            opponent_state: Some(StateSnapshot::default()),
        }));
        let bytes = serde_json::to_vec(&resp).unwrap();
        let decoded: Response<OpponentState> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            decoded.into_result().unwrap().opponent_state,
            Some(StateSnapshot::default())
        );
    }

    #[test]
    fn test_ack_reply_is_bare_status() {
        let resp: Response<Reply> = Response::Success(Reply::Ack(Ack {}));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "success" }));

        let decoded: Response<Ack> = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, Response::Success(Ack {}));
    }

    #[test]
    fn test_ready_state_json_format() {
        let resp: Response<Reply> = Response::Success(Reply::Ready(ReadyState {
            opponent_ready: true,
            round: 2,
            room_status: RoomStatus::Playing,
        }));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["opponentReady"], true);
        assert_eq!(json["round"], 2);
        assert_eq!(json["roomStatus"], "Playing");
    }

    #[test]
    fn test_registry_stats_round_trip() {
        let stats = RegistryStats {
            rooms: 3,
            waiting: 1,
            playing: 2,
            finished: 0,
            players: 5,
        };
        let bytes = serde_json::to_vec(&stats).unwrap();
        let back: RegistryStats = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, stats);
    }
}
