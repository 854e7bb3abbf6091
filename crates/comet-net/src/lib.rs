//! TCP client for the room server: framing, wire messages, and a
//! [`SessionService`](comet_session::SessionService) built on them.

pub mod client;
pub mod error;
pub mod framing;
pub mod messages;

pub use client::{NetConfig, TcpConnection, TcpSessionService};
pub use error::NetError;
pub use framing::{FrameConfig, FrameError, read_frame, write_frame};
pub use messages::{
    JoinRejected, JoinRoom, Kicked, Leave, Message, MessageError, PROTOCOL_VERSION, Ping, Pong,
    RoomJoined, deserialize_message, read_message, serialize_message, write_message,
};
