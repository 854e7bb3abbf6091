//! Room-server wire messages.
//!
//! Every frame payload is `[version: u8] [postcard-encoded Message]`.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::framing::{FrameConfig, FrameError, read_frame, write_frame};

/// Wire-protocol version prepended to every payload.
pub const PROTOCOL_VERSION: u8 = 1;

/// Messages exchanged with the room server. The enum discriminant is the
/// type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Client asks to join (or create) a room.
    JoinRoom(JoinRoom),
    /// Server placed the client in a room.
    RoomJoined(RoomJoined),
    /// Server refused the join.
    JoinRejected(JoinRejected),
    /// Heartbeat request; either side may send it.
    Ping(Ping),
    /// Echo of a [`Ping`].
    Pong(Pong),
    /// Client is leaving the room.
    Leave(Leave),
    /// Server removed the client from the room.
    Kicked(Kicked),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoom {
    pub app_id: String,
    pub app_version: String,
    pub user_id: String,
    /// `None` lets the server pick or create a room.
    pub room_name: Option<String>,
    pub region: Option<String>,
    pub max_players: u8,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomJoined {
    pub room_name: String,
    pub region: String,
    /// Slot the server assigned to this client.
    pub player_slot: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRejected {
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping {
    /// Sender-local timestamp in microseconds, echoed back in the pong.
    pub sent_at_us: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    pub sent_at_us: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leave {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kicked {
    pub reason: String,
}

impl Message {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::JoinRoom(_) => "JoinRoom",
            Message::RoomJoined(_) => "RoomJoined",
            Message::JoinRejected(_) => "JoinRejected",
            Message::Ping(_) => "Ping",
            Message::Pong(_) => "Pong",
            Message::Leave(_) => "Leave",
            Message::Kicked(_) => "Kicked",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("empty payload, no version byte")]
    EmptyPayload,

    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Encode a message into a versioned payload.
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>, MessageError> {
    let body = postcard::to_allocvec(msg)?;
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(PROTOCOL_VERSION);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a versioned payload.
pub fn deserialize_message(data: &[u8]) -> Result<Message, MessageError> {
    let (&version, body) = data.split_first().ok_or(MessageError::EmptyPayload)?;
    if version != PROTOCOL_VERSION {
        return Err(MessageError::UnsupportedVersion(version));
    }
    Ok(postcard::from_bytes(body)?)
}

/// Read one frame and decode it.
pub async fn read_message<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    config: &FrameConfig,
) -> Result<Message, MessageError> {
    let payload = read_frame(reader, config).await?;
    deserialize_message(&payload)
}

/// Encode `msg` and write it as one frame.
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &Message,
    config: &FrameConfig,
) -> Result<(), MessageError> {
    let payload = serialize_message(msg)?;
    write_frame(writer, &payload, config).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[test]
    fn test_payload_starts_with_version() {
        let bytes = serialize_message(&Message::Ping(Ping { sent_at_us: 5 })).unwrap();
        assert_eq!(bytes[0], PROTOCOL_VERSION);
    }

    #[test]
    fn test_join_room_survives_encoding() {
        let msg = Message::JoinRoom(JoinRoom {
            app_id: "app".to_string(),
            app_version: "0.1.0".to_string(),
            user_id: "Pilot0042".to_string(),
            room_name: None,
            region: Some("eu".to_string()),
            max_players: 6,
            visible: true,
        });
        let decoded = deserialize_message(&serialize_message(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_rejects_empty_and_foreign_versions() {
        assert!(matches!(
            deserialize_message(&[]),
            Err(MessageError::EmptyPayload)
        ));
        let mut bytes = serialize_message(&Message::Pong(Pong { sent_at_us: 1 })).unwrap();
        bytes[0] = PROTOCOL_VERSION + 1;
        assert!(matches!(
            deserialize_message(&bytes),
            Err(MessageError::UnsupportedVersion(v)) if v == PROTOCOL_VERSION + 1
        ));
    }

    #[test]
    fn test_garbage_body_is_an_error() {
        assert!(matches!(
            deserialize_message(&[PROTOCOL_VERSION, 0xff, 0xff, 0xff]),
            Err(MessageError::Postcard(_))
        ));
    }

    #[tokio::test]
    async fn test_messages_over_a_stream() {
        let (mut client, mut server) = duplex(1024);
        let config = FrameConfig::default();
        let kicked = Message::Kicked(Kicked {
            reason: "room closed".to_string(),
        });

        write_message(&mut client, &kicked, &config).await.unwrap();
        write_message(&mut client, &Message::Pong(Pong { sent_at_us: 9 }), &config)
            .await
            .unwrap();

        assert_eq!(read_message(&mut server, &config).await.unwrap(), kicked);
        assert_eq!(
            read_message(&mut server, &config).await.unwrap().kind(),
            "Pong"
        );
    }
}
