//! Asteroids gameplay: ECS components, per-tick ship systems, and a local
//! simulation host that runs them on a fixed tick.

mod components;
mod host;
mod input;
mod resources;
mod simulation;
mod systems;

pub use components::{PhysicsBody2D, PlayerLink, PlayerRef, Ship, Transform2D};
pub use host::{HostError, IdleInput, InputSource, LocalHost, LocalRunner, Telemetry};
pub use input::{InputBuffer, ShipInput};
pub use resources::{AvatarRegistry, AvatarTemplate, JoinQueue, PlayerJoined, ShipSpec, SimClock};
pub use simulation::{ShipSnapshot, Simulation};
pub use systems::{
    apply_ship_input, integrate_bodies_system, player_join_system, ship_movement_system,
};
