//! Narrow interfaces to the external matchmaking service and simulation host.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;
use crate::params::{ConnectArgs, RuntimePlayer, StartRequest};

/// A joined matchmaking/transport room.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Name of the joined room.
    fn room_name(&self) -> String;

    /// Region the room lives in.
    fn region(&self) -> String;

    /// Latest measured round-trip time.
    fn round_trip_time(&self) -> Duration;

    /// Resolves with a reason once the service drops the connection.
    /// Never resolves for a connection closed locally.
    async fn closed(&self) -> String;

    /// Leave the room and close the transport.
    async fn disconnect(&self) -> Result<(), BoxError>;
}

/// Matchmaking/session service.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Connect and join (or create) a room. Must stop promptly once
    /// `cancel` fires.
    async fn connect(
        &self,
        args: ConnectArgs,
        cancel: CancellationToken,
    ) -> Result<Arc<dyn Connection>, BoxError>;
}

/// A started deterministic simulation session.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Register a local player in `slot`.
    async fn add_player(&self, slot: usize, player: RuntimePlayer) -> Result<(), BoxError>;

    /// Stop the simulation and release its resources.
    async fn shutdown(&self) -> Result<(), BoxError>;
}

/// Host that starts simulation runners.
#[async_trait]
pub trait SimulationHost: Send + Sync {
    /// Start a runner. Must stop promptly once `cancel` fires.
    async fn start(
        &self,
        request: StartRequest,
        cancel: CancellationToken,
    ) -> Result<Arc<dyn Runner>, BoxError>;
}
