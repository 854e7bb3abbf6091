use std::time::Duration;

use crate::messages::MessageError;

/// Errors from connecting to or talking with the room server.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error("no response from {address} within {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    #[error("connect cancelled")]
    Cancelled,

    #[error("join rejected: {0}")]
    Rejected(String),

    #[error("unexpected {0} during handshake")]
    Unexpected(&'static str),
}
