//! Session lifecycle: connect to the matchmaking service, start the
//! deterministic simulation runner, register players, and tear it all down.
//!
//! The state machine is `Idle → Starting → Running → ShuttingDown → Idle`.
//! The matchmaking service and the simulation host are injected through the
//! narrow [`SessionService`] and [`SimulationHost`] traits so the controller
//! can run against fakes in tests and against real transports in the game.

mod controller;
mod error;
mod params;
mod popup;
mod service;
mod state;

pub use controller::SessionController;
pub use error::{BoxError, SessionError};
pub use params::{
    ConnectArgs, DEFAULT_MAP, ErrorCallback, GameMode, RuntimeConfig, RuntimePlayer,
    SimSessionConfig, SimulationConfig, StartParameter, StartRequest,
};
pub use popup::Popup;
pub use service::{Connection, Runner, SessionService, SimulationHost};
pub use state::{LifecycleState, LifecycleWatch};
