//! Per-tick gameplay systems.
//!
//! Movement and integration do a fixed amount of work per entity and no
//! I/O, so they are safe inside the deterministic tick.

use bevy_ecs::prelude::*;

use crate::components::{PhysicsBody2D, PlayerLink, Ship, Transform2D};
use crate::input::{InputBuffer, ShipInput};
use crate::resources::{AvatarRegistry, JoinQueue, ShipSpec, SimClock};

/// Apply one frame of input to a ship body.
///
/// Turn-left and turn-right torques are both accumulated when both are
/// held; the net torque is their sum. Angular velocity is clamped after
/// the force and torque are applied.
pub fn apply_ship_input(
    spec: &ShipSpec,
    transform: &Transform2D,
    body: &mut PhysicsBody2D,
    input: ShipInput,
) {
    if input.accelerate {
        body.add_force(transform.up() * spec.acceleration);
    }
    if input.turn_left {
        body.add_torque(spec.turn_torque);
    }
    if input.turn_right {
        body.add_torque(-spec.turn_torque);
    }
    body.angular_velocity = body
        .angular_velocity
        .clamp(-spec.max_angular_speed, spec.max_angular_speed);
}

/// Drive every ship from its player's input for the current frame.
/// Ships without a player, or whose player sent nothing this frame, are
/// left untouched.
pub fn ship_movement_system(
    clock: Res<SimClock>,
    inputs: Res<InputBuffer>,
    spec: Res<ShipSpec>,
    mut ships: Query<(&Transform2D, &mut PhysicsBody2D, &PlayerLink), With<Ship>>,
) {
    for (transform, mut body, link) in &mut ships {
        if let Some(input) = inputs.get(link.0, clock.frame) {
            apply_ship_input(&spec, transform, &mut body, input);
        }
    }
}

/// Spawn the configured avatar for each player that joined since the last
/// tick. Unknown templates are skipped with a warning.
pub fn player_join_system(
    mut commands: Commands,
    mut joins: ResMut<JoinQueue>,
    avatars: Res<AvatarRegistry>,
) {
    for joined in joins.drain() {
        match avatars.get(&joined.avatar) {
            Some(template) => {
                let entity = commands.spawn(template.instantiate(joined.player)).id();
                tracing::debug!(player = joined.player.0, avatar = %joined.avatar, ?entity, "spawned avatar");
            }
            None => {
                tracing::warn!(player = joined.player.0, avatar = %joined.avatar, "unknown avatar template");
            }
        }
    }
}

/// Semi-implicit Euler step over accumulated forces, then clear them.
pub fn integrate_bodies_system(
    clock: Res<SimClock>,
    mut bodies: Query<(&mut Transform2D, &mut PhysicsBody2D)>,
) {
    let dt = clock.dt;
    for (mut transform, mut body) in &mut bodies {
        let inv_mass = if body.mass > 0.0 { body.mass.recip() } else { 0.0 };
        let inv_inertia = if body.inertia > 0.0 {
            body.inertia.recip()
        } else {
            0.0
        };

        let acceleration = body.force * inv_mass;
        body.velocity += acceleration * dt;
        let angular_acceleration = body.torque * inv_inertia;
        body.angular_velocity += angular_acceleration * dt;

        transform.position += body.velocity * dt;
        transform.rotation =
            (transform.rotation + body.angular_velocity * dt).rem_euclid(std::f32::consts::TAU);

        body.force = glam::Vec2::ZERO;
        body.torque = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::PlayerRef;
    use glam::Vec2;

    fn spec() -> ShipSpec {
        ShipSpec {
            acceleration: 10.0,
            turn_torque: 4.0,
            max_angular_speed: 2.0,
        }
    }

    fn input(accelerate: bool, turn_left: bool, turn_right: bool) -> ShipInput {
        ShipInput {
            accelerate,
            turn_left,
            turn_right,
        }
    }

    #[test]
    fn test_accelerate_pushes_along_facing() {
        let transform = Transform2D::new(Vec2::ZERO, std::f32::consts::PI);
        let mut body = PhysicsBody2D::default();
        apply_ship_input(&spec(), &transform, &mut body, input(true, false, false));
        assert!((body.force - Vec2::new(0.0, -10.0)).length() < 1e-4);
        assert_eq!(body.torque, 0.0);
    }

    #[test]
    fn test_turns_apply_signed_torque() {
        let transform = Transform2D::default();
        let mut left = PhysicsBody2D::default();
        apply_ship_input(&spec(), &transform, &mut left, input(false, true, false));
        assert_eq!(left.torque, 4.0);

        let mut right = PhysicsBody2D::default();
        apply_ship_input(&spec(), &transform, &mut right, input(false, false, true));
        assert_eq!(right.torque, -4.0);
    }

    #[test]
    fn test_both_turns_accumulate_additively() {
        let transform = Transform2D::default();
        let mut body = PhysicsBody2D::default();
        body.add_torque(1.5);
        apply_ship_input(&spec(), &transform, &mut body, input(false, true, true));
        // Both contributions land on top of what was already accumulated.
        assert_eq!(body.torque, 1.5 + 4.0 - 4.0);
    }

    #[test]
    fn test_angular_velocity_is_clamped() {
        let transform = Transform2D::default();
        let mut body = PhysicsBody2D::default();
        body.angular_velocity = 9.0;
        apply_ship_input(&spec(), &transform, &mut body, ShipInput::default());
        assert_eq!(body.angular_velocity, 2.0);

        body.angular_velocity = -9.0;
        apply_ship_input(&spec(), &transform, &mut body, ShipInput::default());
        assert_eq!(body.angular_velocity, -2.0);
    }

    #[test]
    fn test_movement_system_ignores_missing_input() {
        let mut world = World::new();
        world.insert_resource(SimClock::new(60));
        world.insert_resource(spec());
        let mut buffer = InputBuffer::default();
        buffer.insert(PlayerRef(0), 0, input(true, true, false));
        world.insert_resource(buffer);

        let driven = world
            .spawn((Ship, Transform2D::default(), PhysicsBody2D::default(), PlayerLink(PlayerRef(0))))
            .id();
        let idle = world
            .spawn((Ship, Transform2D::default(), PhysicsBody2D::default(), PlayerLink(PlayerRef(1))))
            .id();
        let unlinked = world
            .spawn((Ship, Transform2D::default(), PhysicsBody2D::default()))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(ship_movement_system);
        schedule.run(&mut world);

        let driven = world.get::<PhysicsBody2D>(driven).unwrap();
        assert!(driven.force.y > 0.0);
        assert_eq!(driven.torque, 4.0);
        assert_eq!(*world.get::<PhysicsBody2D>(idle).unwrap(), PhysicsBody2D::default());
        assert_eq!(*world.get::<PhysicsBody2D>(unlinked).unwrap(), PhysicsBody2D::default());
    }

    #[test]
    fn test_integration_moves_body_and_clears_accumulators() {
        let mut world = World::new();
        world.insert_resource(SimClock::new(10));
        let mut body = PhysicsBody2D::default();
        body.add_force(Vec2::new(0.0, 10.0));
        body.add_torque(1.0);
        let entity = world.spawn((Transform2D::default(), body)).id();

        let mut schedule = Schedule::default();
        schedule.add_systems(integrate_bodies_system);
        schedule.run(&mut world);

        let body = world.get::<PhysicsBody2D>(entity).unwrap();
        assert!((body.velocity.y - 1.0).abs() < 1e-5);
        assert!((body.angular_velocity - 0.1).abs() < 1e-5);
        assert_eq!(body.force, Vec2::ZERO);
        assert_eq!(body.torque, 0.0);
        let transform = world.get::<Transform2D>(entity).unwrap();
        assert!((transform.position.y - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_join_spawns_linked_avatar_once() {
        let mut world = World::new();
        world.insert_resource(AvatarRegistry::with_defaults(&comet_config::ShipSettings::default()));
        let mut joins = JoinQueue::default();
        joins.push(crate::resources::PlayerJoined {
            player: PlayerRef(2),
            avatar: "ship".to_string(),
        });
        joins.push(crate::resources::PlayerJoined {
            player: PlayerRef(3),
            avatar: "freighter".to_string(),
        });
        world.insert_resource(joins);

        let mut schedule = Schedule::default();
        schedule.add_systems(player_join_system);
        schedule.run(&mut world);
        schedule.run(&mut world);

        let links: Vec<PlayerLink> = world
            .query_filtered::<&PlayerLink, With<Ship>>()
            .iter(&world)
            .copied()
            .collect();
        assert_eq!(links, vec![PlayerLink(PlayerRef(2))]);
        assert!(world.resource::<JoinQueue>().is_empty());
    }
}
