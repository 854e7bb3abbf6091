//! Session error types.

/// Boxed error returned by external services at the injection seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by [`SessionController`](crate::SessionController).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Required configuration is missing. Nothing was attempted.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The matchmaking service could not be reached or refused the join.
    #[error("connection failed: {0}")]
    Connection(#[source] BoxError),

    /// The simulation runner failed to start or to register a player.
    #[error("simulation start failed: {0}")]
    Start(#[source] BoxError),

    /// The service closed an established connection.
    #[error("disconnected by server: {0}")]
    ServerDisconnect(String),

    /// The attempt was cancelled by a concurrent shutdown.
    #[error("connect attempt cancelled")]
    Cancelled,
}

impl SessionError {
    /// Whether the attempt was cancelled rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
