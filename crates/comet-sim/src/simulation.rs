//! ECS world plus the fixed-step schedule that advances it.

use bevy_ecs::prelude::*;
use comet_session::SimulationConfig;
use glam::Vec2;

use crate::components::{PhysicsBody2D, PlayerLink, PlayerRef, Ship, Transform2D};
use crate::input::{InputBuffer, ShipInput};
use crate::resources::{AvatarRegistry, JoinQueue, PlayerJoined, ShipSpec, SimClock};
use crate::systems::{integrate_bodies_system, player_join_system, ship_movement_system};

/// Observable state of one ship after a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipSnapshot {
    pub player: PlayerRef,
    pub position: Vec2,
    pub rotation: f32,
    pub velocity: Vec2,
    pub angular_velocity: f32,
}

/// A deterministic asteroids simulation.
///
/// Each [`step`](Self::step) runs join → movement → integration once for
/// the current frame, then advances the frame counter.
pub struct Simulation {
    world: World,
    schedule: Schedule,
}

impl Simulation {
    /// Build a simulation with the stock avatar templates.
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_avatars(config, AvatarRegistry::with_defaults(&config.ship))
    }

    /// Build a simulation with a custom avatar registry.
    pub fn with_avatars(config: &SimulationConfig, avatars: AvatarRegistry) -> Self {
        let mut world = World::new();
        world.insert_resource(SimClock::new(config.tick_rate));
        world.insert_resource(ShipSpec::from(&config.ship));
        world.insert_resource(InputBuffer::default());
        world.insert_resource(JoinQueue::default());
        world.insert_resource(avatars);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                player_join_system,
                ship_movement_system,
                integrate_bodies_system,
            )
                .chain(),
        );

        Self { world, schedule }
    }

    /// Frame that the next [`step`](Self::step) will simulate.
    pub fn frame(&self) -> u64 {
        self.world.resource::<SimClock>().frame
    }

    /// Seconds per frame.
    pub fn dt(&self) -> f32 {
        self.world.resource::<SimClock>().dt
    }

    /// Whether `avatar` names a known template.
    pub fn has_avatar(&self, avatar: &str) -> bool {
        self.world.resource::<AvatarRegistry>().contains(avatar)
    }

    /// Queue a player-join notification for the next step.
    pub fn join(&mut self, player: PlayerRef, avatar: impl Into<String>) {
        self.world.resource_mut::<JoinQueue>().push(PlayerJoined {
            player,
            avatar: avatar.into(),
        });
    }

    /// Record `player`'s input for `frame`.
    pub fn push_input(&mut self, player: PlayerRef, frame: u64, input: ShipInput) {
        self.world
            .resource_mut::<InputBuffer>()
            .insert(player, frame, input);
    }

    /// Simulate the current frame and advance to the next one.
    pub fn step(&mut self) {
        self.schedule.run(&mut self.world);

        let next = {
            let mut clock = self.world.resource_mut::<SimClock>();
            clock.frame += 1;
            clock.frame
        };
        self.world.resource_mut::<InputBuffer>().prune_before(next);
    }

    /// Snapshot every player ship, ordered by player.
    pub fn ships(&mut self) -> Vec<ShipSnapshot> {
        let mut query = self
            .world
            .query_filtered::<(&PlayerLink, &Transform2D, &PhysicsBody2D), With<Ship>>();
        let mut ships: Vec<ShipSnapshot> = query
            .iter(&self.world)
            .map(|(link, transform, body)| ShipSnapshot {
                player: link.0,
                position: transform.position,
                rotation: transform.rotation,
                velocity: body.velocity,
                angular_velocity: body.angular_velocity,
            })
            .collect();
        ships.sort_by_key(|ship| ship.player);
        ships
    }

    /// Underlying ECS world, for inspection.
    pub fn world(&self) -> &World {
        &self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thrust() -> ShipInput {
        ShipInput {
            accelerate: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_joined_player_gets_one_ship() {
        let mut sim = Simulation::new(&SimulationConfig::default());
        sim.join(PlayerRef(0), "ship");
        sim.step();
        sim.step();

        let ships = sim.ships();
        assert_eq!(ships.len(), 1);
        assert_eq!(ships[0].player, PlayerRef(0));
        assert_eq!(sim.frame(), 2);
    }

    #[test]
    fn test_ship_without_input_drifts_unchanged() {
        let mut sim = Simulation::new(&SimulationConfig::default());
        sim.join(PlayerRef(0), "ship");
        for _ in 0..10 {
            sim.step();
        }
        let ship = sim.ships()[0];
        assert_eq!(ship.position, Vec2::ZERO);
        assert_eq!(ship.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_thrust_moves_ship_forward() {
        let mut sim = Simulation::new(&SimulationConfig::default());
        sim.join(PlayerRef(0), "ship");
        for frame in 0..30 {
            sim.push_input(PlayerRef(0), frame, thrust());
            sim.step();
        }
        let ship = sim.ships()[0];
        assert!(ship.velocity.y > 0.0);
        assert!(ship.position.y > 0.0);
        assert!(ship.position.x.abs() < 1e-4);
    }

    #[test]
    fn test_turning_is_bounded_by_max_angular_speed() {
        let config = SimulationConfig::default();
        let max = config.ship.max_angular_speed;
        let mut sim = Simulation::new(&config);
        sim.join(PlayerRef(0), "ship");
        let turn = ShipInput {
            turn_left: true,
            ..Default::default()
        };
        for frame in 0..600 {
            sim.push_input(PlayerRef(0), frame, turn);
            sim.step();
        }
        // Clamped each tick before integration adds at most one tick of torque.
        let per_tick = config.ship.turn_torque / config.ship.inertia * sim.dt();
        assert!(sim.ships()[0].angular_velocity <= max + per_tick + 1e-4);
    }

    #[test]
    fn test_identical_inputs_give_identical_results() {
        let run = || {
            let mut sim = Simulation::new(&SimulationConfig::default());
            sim.join(PlayerRef(0), "ship");
            sim.join(PlayerRef(1), "interceptor");
            for frame in 0..120 {
                let input = ShipInput {
                    accelerate: frame % 3 == 0,
                    turn_left: frame % 5 == 0,
                    turn_right: frame % 7 == 0,
                };
                sim.push_input(PlayerRef(0), frame, input);
                sim.push_input(PlayerRef(1), frame, input);
                sim.step();
            }
            sim.ships()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_consumed_inputs_are_pruned() {
        let mut sim = Simulation::new(&SimulationConfig::default());
        sim.push_input(PlayerRef(0), 0, thrust());
        sim.push_input(PlayerRef(0), 5, thrust());
        sim.step();
        assert_eq!(sim.world().resource::<InputBuffer>().len(), 1);
    }
}
