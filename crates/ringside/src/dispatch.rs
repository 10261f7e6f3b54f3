//! Request dispatch: one decoded [`Request`] in, one [`Response`] out.
//!
//! Nothing here touches a socket. The server feeds it the bytes of a
//! request and writes back whatever it returns, so every failure mode
//! (bad JSON, unknown room, full room) ends as a structured error document.

use ringside_protocol::{
    Ack, Codec, ErrorCode, JsonCodec, OpponentState, Reply, Request, Response,
};
use ringside_room::{RoomError, RoomRegistry};

/// Sent if encoding a response ever fails.
const ENCODE_FAILED: &[u8] =
    br#"{"status":"error","code":"MalformedRequest","message":"response could not be encoded"}"#;

/// Runs `request` against the registry.
pub fn dispatch(registry: &RoomRegistry, request: Request) -> Response<Reply> {
    let action = request.action();
    let result = match request {
        Request::CreateRoom {
            player_name,
            fighter,
            caller,
        } => registry
            .create_room(&player_name, &fighter, caller)
            .map(Reply::Created),
        Request::JoinRoom {
            room_id,
            player_name,
            fighter,
            caller,
        } => registry
            .join_room(&room_id, &player_name, &fighter, caller)
            .map(Reply::Joined),
        Request::SetReady {
            room_id,
            player_id,
            ready,
        } => registry
            .set_ready(&room_id, &player_id, ready)
            .map(Reply::Ready),
        Request::CheckOpponentReady { room_id, player_id } => registry
            .check_opponent_ready(&room_id, &player_id)
            .map(Reply::Ready),
        Request::UpdateState {
            room_id,
            player_id,
            snapshot,
        } => registry
            .update_state(&room_id, &player_id, snapshot)
            .map(|()| Reply::Ack(Ack {})),
        Request::GetOpponentState { room_id, player_id } => registry
            .get_opponent_state(&room_id, &player_id)
            .map(|opponent_state| Reply::Opponent(OpponentState { opponent_state })),
        Request::LeaveRoom { room_id, player_id } => registry
            .leave_room(&room_id, &player_id)
            .map(Reply::Left),
        Request::FinishMatch { room_id, player_id } => registry
            .finish_match(&room_id, &player_id)
            .map(|()| Reply::Ack(Ack {})),
    };

    match result {
        Ok(reply) => Response::Success(reply),
        Err(e) => {
            log_rejection(action, &e);
            Response::error(e.code(), e.to_string())
        }
    }
}

/// Decodes `payload`, dispatches it and encodes the answer.
pub fn handle_payload(registry: &RoomRegistry, payload: &[u8]) -> Vec<u8> {
    let codec = JsonCodec;
    let response = match codec.decode::<Request>(payload) {
        Ok(request) => {
            tracing::debug!(
                action = request.action(),
                room_id = request.room_id().map(|r| r.as_str()),
                "request"
            );
            dispatch(registry, request)
        }
        Err(e) => {
            tracing::debug!(error = %e, bytes = payload.len(), "undecodable request");
            Response::error(ErrorCode::MalformedRequest, e.to_string())
        }
    };
    encode(&codec, &response)
}

/// An encoded `MalformedRequest` error with `message`.
pub fn malformed(message: impl Into<String>) -> Vec<u8> {
    let response: Response<Reply> = Response::error(ErrorCode::MalformedRequest, message);
    encode(&JsonCodec, &response)
}

fn encode(codec: &JsonCodec, response: &Response<Reply>) -> Vec<u8> {
    codec.encode(response).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to encode response");
        ENCODE_FAILED.to_vec()
    })
}

fn log_rejection(action: &'static str, error: &RoomError) {
    match error {
        RoomError::CapacityExceeded { .. } | RoomError::SelfJoin(_) => {
            tracing::warn!(action, error = %error, "request rejected");
        }
        _ => tracing::debug!(action, error = %error, "request failed"),
    }
}
