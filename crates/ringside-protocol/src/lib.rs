//! Wire protocol for Ringside.
//!
//! This crate defines what the coordinator and its clients say to each
//! other:
//!
//! - **Types** ([`RoomId`], [`PlayerId`], [`CallerId`], [`RoomStatus`],
//!   [`StateSnapshot`]): the values that travel on the wire.
//! - **Messages** ([`Request`], [`Response`], and one payload type per
//!   operation): the documents exchanged.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how documents become
//!   bytes.
//!
//! It knows nothing about sockets or rooms.
//!
//! ```text
//! Transport (bytes) → Protocol (Request / Response) → Registry (rooms)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{
    Ack, ErrorBody, ErrorCode, OpponentState, PROBE_PING, PROBE_PONG, ReadyState, RegistryStats,
    Reply, Request, Response, RoomCreated, RoomJoined, RoomLeft,
};
pub use types::{CallerId, Facing, PlayerId, RoomId, RoomStatus, StateSnapshot, Vec2};

/// Longest accepted player name or fighter selection, in characters.
pub const MAX_LABEL_CHARS: usize = 32;

/// Checks a player name or fighter selection: 1 to [`MAX_LABEL_CHARS`]
/// characters, not all whitespace.
///
/// # Errors
/// Returns [`ProtocolError::InvalidMessage`] naming `field` otherwise.
pub fn validate_label(field: &str, value: &str) -> Result<(), ProtocolError> {
    let chars = value.chars().count();
    if value.trim().is_empty() {
        return Err(ProtocolError::InvalidMessage(format!("{field} must not be empty")));
    }
    if chars > MAX_LABEL_CHARS {
        return Err(ProtocolError::InvalidMessage(format!(
            "{field} is {chars} characters, limit is {MAX_LABEL_CHARS}"
        )));
    }
    Ok(())
}
